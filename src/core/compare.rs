use crate::domain::model::{ExtractedRecord, Field, FieldValue};

/// 單一欄位兩邊的值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldComparison {
    pub field: Field,
    pub left: Option<FieldValue>,
    pub right: Option<FieldValue>,
}

impl FieldComparison {
    pub fn matches(&self) -> bool {
        self.left == self.right
    }
}

pub type FieldBreakdown = Vec<FieldComparison>;

/// 逐欄比對兩筆紀錄，回傳每個欄位的明細與不一致的欄位 (依 `Field::ALL` 順序)
///
/// 比對是嚴格的：除了上游已清理過的 RUT 以外不做任何正規化，
/// 缺值等於缺值，但缺值不等於空字串。
pub fn compare(left: &ExtractedRecord, right: &ExtractedRecord) -> (FieldBreakdown, Vec<Field>) {
    let mut breakdown = Vec::with_capacity(Field::ALL.len());
    let mut mismatches = Vec::new();

    for field in Field::ALL {
        let entry = FieldComparison {
            field,
            left: left.get(field),
            right: right.get(field),
        };
        if !entry.matches() {
            mismatches.push(field);
        }
        breakdown.push(entry);
    }

    (breakdown, mismatches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> ExtractedRecord {
        ExtractedRecord {
            nombre: Some("Ana Diaz".to_string()),
            rut: Some("12345678k".to_string()),
            departamento: Some("101".to_string()),
            monto_credito: Some(50_000_000),
            fecha: Some("2024-01-10".to_string()),
        }
    }

    #[test]
    fn test_self_compare_has_no_mismatches() {
        let record = ana();
        let (breakdown, mismatches) = compare(&record, &record);
        assert!(mismatches.is_empty());
        assert_eq!(breakdown.len(), 5);
        assert!(breakdown.iter().all(FieldComparison::matches));

        let partial = ExtractedRecord {
            rut: Some("1".to_string()),
            ..ExtractedRecord::default()
        };
        assert!(compare(&partial, &partial).1.is_empty());
    }

    #[test]
    fn test_breakdown_follows_fixed_field_order() {
        let (breakdown, _) = compare(&ana(), &ExtractedRecord::default());
        let fields: Vec<Field> = breakdown.iter().map(|entry| entry.field).collect();
        assert_eq!(fields, Field::ALL.to_vec());
        assert_eq!(breakdown[3].left, Some(FieldValue::Amount(50_000_000)));
        assert_eq!(breakdown[3].right, None);
    }

    #[test]
    fn test_amount_mismatch() {
        let mut certificate = ana();
        certificate.monto_credito = Some(48_000_000);
        let (_, mismatches) = compare(&ana(), &certificate);
        assert_eq!(mismatches, vec![Field::MontoCredito]);
    }

    #[test]
    fn test_mismatches_keep_field_order() {
        let mut certificate = ana();
        certificate.fecha = None;
        certificate.nombre = Some("ANA DIAZ".to_string());
        let (_, mismatches) = compare(&ana(), &certificate);
        assert_eq!(mismatches, vec![Field::Nombre, Field::Fecha]);
    }

    #[test]
    fn test_missing_is_not_empty_string() {
        let left = ExtractedRecord {
            fecha: None,
            ..ana()
        };
        let right = ExtractedRecord {
            fecha: Some(String::new()),
            ..ana()
        };
        assert_eq!(compare(&left, &right).1, vec![Field::Fecha]);

        let both_missing = ExtractedRecord {
            fecha: None,
            ..ana()
        };
        assert!(compare(&left, &both_missing).1.is_empty());
    }
}
