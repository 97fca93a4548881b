use crate::core::compare::compare;
use crate::domain::model::{Field, FieldValue, RecordIndex, RecordKey};
use crate::domain::report::{Classification, ComparisonRow, Report};

/// 以 promesas 為主做 left join，每筆 promesa 產生一列
///
/// 找不到對應 certificado 的列只填 promesa 的部門、姓名與 RUT，不做欄位比對。
pub fn build_report(promises: &RecordIndex, certificates: &RecordIndex) -> Report {
    let rows = promises
        .iter()
        .map(|(key, promise)| match certificates.get(key) {
            None => ComparisonRow {
                departamento: promise.departamento.clone(),
                nombre_promesa: promise.nombre.clone(),
                rut_promesa: promise.rut.clone(),
                missing_cert: true,
                ..ComparisonRow::default()
            },
            Some(certificate) => {
                let (breakdown, mismatches) = compare(promise, certificate);
                let mut row = ComparisonRow {
                    mismatches,
                    ..ComparisonRow::default()
                };
                for entry in breakdown {
                    match entry.field {
                        Field::Nombre => {
                            row.nombre_promesa = text(entry.left);
                            row.nombre_cert = text(entry.right);
                        }
                        Field::Rut => {
                            row.rut_promesa = text(entry.left);
                            row.rut_cert = text(entry.right);
                        }
                        Field::Departamento => row.departamento = text(entry.left),
                        Field::MontoCredito => {
                            row.monto_promesa = amount(entry.left);
                            row.monto_cert = amount(entry.right);
                        }
                        Field::Fecha => {
                            row.fecha_promesa = text(entry.left);
                            row.fecha_cert = text(entry.right);
                        }
                    }
                }
                row
            }
        })
        .collect();

    Report { rows }
}

fn text(value: Option<FieldValue>) -> Option<String> {
    match value? {
        FieldValue::Text(text) => Some(text),
        FieldValue::Amount(amount) => Some(amount.to_string()),
    }
}

fn amount(value: Option<FieldValue>) -> Option<i64> {
    match value? {
        FieldValue::Amount(amount) => Some(amount),
        FieldValue::Text(_) => None,
    }
}

/// 決定列的樣式分類，所有輸出格式都用同一個結果
pub fn classify(row: &ComparisonRow) -> Classification {
    if row.missing_cert {
        Classification::Missing
    } else if !row.mismatches.is_empty() {
        Classification::Mismatched
    } else {
        Classification::Ok
    }
}

/// 沒有任何 promesa 對應的 certificados，不會出現在報表中
pub fn orphan_certificates<'a>(
    promises: &RecordIndex,
    certificates: &'a RecordIndex,
) -> Vec<&'a RecordKey> {
    certificates
        .keys()
        .filter(|key| !promises.contains_key(key))
        .collect()
}
