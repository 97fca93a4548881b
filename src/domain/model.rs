use crate::core::normalize::normalize;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 兩種文件共同擁有的欄位，順序固定 (比對與報表都依此順序)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Nombre,
    Rut,
    Departamento,
    MontoCredito,
    Fecha,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Nombre,
        Field::Rut,
        Field::Departamento,
        Field::MontoCredito,
        Field::Fecha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Nombre => "nombre",
            Field::Rut => "rut",
            Field::Departamento => "departamento",
            Field::MontoCredito => "monto_credito",
            Field::Fecha => "fecha",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Amount(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Amount(amount) => write!(f, "{}", amount),
        }
    }
}

/// 單一文件擷取出來的欄位，缺少的欄位就是 `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    #[serde(
        default,
        deserialize_with = "text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub nombre: Option<String>,
    #[serde(
        default,
        deserialize_with = "text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub rut: Option<String>,
    #[serde(
        default,
        deserialize_with = "text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub departamento: Option<String>,
    #[serde(
        default,
        deserialize_with = "amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub monto_credito: Option<i64>,
    #[serde(
        default,
        deserialize_with = "text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub fecha: Option<String>,
}

impl ExtractedRecord {
    pub fn get(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Nombre => self.nombre.clone().map(FieldValue::Text),
            Field::Rut => self.rut.clone().map(FieldValue::Text),
            Field::Departamento => self.departamento.clone().map(FieldValue::Text),
            Field::MontoCredito => self.monto_credito.map(FieldValue::Amount),
            Field::Fecha => self.fecha.clone().map(FieldValue::Text),
        }
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|field| self.get(*field).is_none())
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::for_record(self)
    }
}

// LLM 有時把部門或 RUT 當成數字回傳；其他型別只丟棄該欄位
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(text)) => Ok(Some(text)),
        Some(serde_json::Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => {
            tracing::warn!("⚠️ Dropping field: expected text, found {}", other);
            Ok(None)
        }
    }
}

// 金額可能是整數，或帶有千分位符號的字串 ("$50.000.000")
fn amount<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(number)) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.is_finite() && value.abs() < i64::MAX as f64)
                .map(|value| value.trunc() as i64)
        }),
        Some(serde_json::Value::String(text)) => parse_amount(&text),
        Some(other) => {
            tracing::warn!("⚠️ Dropping monto_credito: expected an amount, found {}", other);
            None
        }
    };
    Ok(parsed)
}

/// 解析金額字串，捨去小數 (`,00` 或 `.00`)
///
/// 最後一個分隔符號後只有一或兩位數字時視為小數，其餘分隔符號都是千分位。
/// 無法解析時回傳 `None`。
pub fn parse_amount(text: &str) -> Option<i64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let integer_part = match cleaned.rfind(['.', ',']) {
        Some(at) if (2..=3).contains(&(cleaned.len() - at)) => &cleaned[..at],
        _ => cleaned.as_str(),
    };

    let digits: String = integer_part
        .chars()
        .filter(|c| !matches!(c, '.' | ','))
        .collect();
    let value = if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        None
    } else {
        digits.parse::<i64>().ok()
    };

    if value.is_none() {
        tracing::warn!("⚠️ Dropping monto_credito: cannot read amount {:?}", text);
    }
    value
}

/// 配對用的複合鍵：`normalize(rut) + "_" + departamento`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    pub const SEPARATOR: char = '_';

    pub fn new(identifier: &str, department: &str) -> Self {
        Self(format!("{}{}{}", normalize(identifier), Self::SEPARATOR, department))
    }

    pub fn for_record(record: &ExtractedRecord) -> Self {
        Self::new(
            record.rut.as_deref().unwrap_or(""),
            record.departamento.as_deref().unwrap_or(""),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// 依插入順序保存的 RecordKey → ExtractedRecord 對照表
///
/// 同一個 key 再次插入時採 last-write-wins：值被取代，但保留第一次出現的位置。
#[derive(Debug, Clone, Default)]
pub struct RecordIndex {
    entries: Vec<(RecordKey, ExtractedRecord)>,
    positions: HashMap<RecordKey, usize>,
}

impl RecordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入並回傳被取代的舊紀錄 (若有)
    pub fn insert(&mut self, key: RecordKey, record: ExtractedRecord) -> Option<ExtractedRecord> {
        match self.positions.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, record)),
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, record));
                None
            }
        }
    }

    pub fn insert_record(&mut self, record: ExtractedRecord) -> Option<ExtractedRecord> {
        self.insert(record.key(), record)
    }

    pub fn get(&self, key: &RecordKey) -> Option<&ExtractedRecord> {
        self.positions
            .get(key)
            .map(|&position| &self.entries[position].1)
    }

    pub fn contains_key(&self, key: &RecordKey) -> bool {
        self.positions.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &ExtractedRecord)> {
        self.entries.iter().map(|(key, record)| (key, record))
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(RecordKey, ExtractedRecord)> for RecordIndex {
    fn from_iter<I: IntoIterator<Item = (RecordKey, ExtractedRecord)>>(iter: I) -> Self {
        let mut index = RecordIndex::new();
        for (key, record) in iter {
            index.insert(key, record);
        }
        index
    }
}

/// 文件的兩個來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Promises,
    Certificates,
}

impl Collection {
    /// 使用者訊息中顯示的名稱
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Promises => "promesas",
            Collection::Certificates => "certificados",
        }
    }
}

/// 一個來源資料夾擷取完成後的結果
#[derive(Debug, Clone)]
pub struct CollectionExtraction {
    pub collection: Collection,
    pub index: RecordIndex,
    pub documents: usize,
    pub failures: usize,
    pub collisions: Vec<RecordKey>,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub promises: CollectionExtraction,
    pub certificates: CollectionExtraction,
}
