use crate::domain::model::Field;
use serde::Serialize;
use std::fmt;

/// 報表中的一列：一筆 promesa 與其 certificado (若有) 的比對結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    pub departamento: Option<String>,
    pub nombre_promesa: Option<String>,
    pub rut_promesa: Option<String>,
    pub nombre_cert: Option<String>,
    pub rut_cert: Option<String>,
    pub monto_promesa: Option<i64>,
    pub monto_cert: Option<i64>,
    pub fecha_promesa: Option<String>,
    pub fecha_cert: Option<String>,
    pub missing_cert: bool,
    pub mismatches: Vec<Field>,
}

impl ComparisonRow {
    /// 輸出欄位名稱，順序即報表欄位順序
    pub const COLUMNS: [&'static str; 11] = [
        "departamento",
        "nombre_promesa",
        "rut_promesa",
        "nombre_cert",
        "rut_cert",
        "monto_promesa",
        "monto_cert",
        "fecha_promesa",
        "fecha_cert",
        "missing_cert",
        "mismatches",
    ];

    pub fn missing_counterpart(&self) -> bool {
        self.missing_cert
    }

    pub fn classification(&self) -> Classification {
        crate::core::report::classify(self)
    }

    /// 以 ", " 串接的不一致欄位
    pub fn mismatch_summary(&self) -> String {
        self.mismatches
            .iter()
            .map(Field::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 每個欄位的儲存格內容，依 `COLUMNS` 順序
    pub fn cells(&self) -> [Cell<'_>; 11] {
        [
            Cell::text(&self.departamento),
            Cell::text(&self.nombre_promesa),
            Cell::text(&self.rut_promesa),
            Cell::text(&self.nombre_cert),
            Cell::text(&self.rut_cert),
            Cell::amount(self.monto_promesa),
            Cell::amount(self.monto_cert),
            Cell::text(&self.fecha_promesa),
            Cell::text(&self.fecha_cert),
            Cell::Flag(self.missing_cert),
            Cell::Summary(self.mismatch_summary()),
        ]
    }
}

/// 渲染器共用的儲存格型別
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Empty,
    Text(&'a str),
    Amount(i64),
    Flag(bool),
    Summary(String),
}

impl<'a> Cell<'a> {
    fn text(value: &'a Option<String>) -> Self {
        value.as_deref().map_or(Cell::Empty, Cell::Text)
    }

    fn amount(value: Option<i64>) -> Self {
        value.map_or(Cell::Empty, Cell::Amount)
    }
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Amount(amount) => write!(f, "{}", amount),
            Cell::Flag(flag) => write!(f, "{}", flag),
            Cell::Summary(summary) => f.write_str(summary),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Missing,
    Mismatched,
    Ok,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Missing => "MISSING",
            Classification::Mismatched => "MISMATCHED",
            Classification::Ok => "OK",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub rows: usize,
    pub ok: usize,
    pub mismatched: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub rows: Vec<ComparisonRow>,
}

impl Report {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            rows: self.rows.len(),
            ..ReportSummary::default()
        };
        for row in &self.rows {
            match row.classification() {
                Classification::Missing => summary.missing += 1,
                Classification::Mismatched => summary.mismatched += 1,
                Classification::Ok => summary.ok += 1,
            }
        }
        summary
    }
}
