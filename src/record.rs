//! 物件レコードの型定義
//!
//! フィールド名は Airtable テーブルの列名（ドイツ語）そのもの。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const TITEL: &str = "Titel";
pub const KATEGORIE: &str = "Kategorie";
pub const WEBSEITE: &str = "Webseite";
pub const OBJEKTNUMMER: &str = "Objektnummer";
pub const BESCHREIBUNG: &str = "Beschreibung";
pub const BILD: &str = "Bild";
pub const ALLE_BILDER: &str = "Alle_Bilder";
pub const ANZAHL_BILDER: &str = "Anzahl_Bilder";
pub const PREIS: &str = "Preis";
pub const STANDORT: &str = "Standort";
pub const WOHNFLAECHE: &str = "Wohnfläche";
pub const GRUNDSTUECKSFLAECHE: &str = "Grundstücksfläche";
pub const ZIMMER: &str = "Zimmer";
pub const BAUJAHR: &str = "Baujahr";
pub const OBJEKTART: &str = "Objektart";

/// CSV出力の列順
pub const COLUMNS: [&str; 15] = [
    TITEL,
    KATEGORIE,
    WEBSEITE,
    OBJEKTNUMMER,
    BESCHREIBUNG,
    BILD,
    ALLE_BILDER,
    ANZAHL_BILDER,
    PREIS,
    STANDORT,
    WOHNFLAECHE,
    GRUNDSTUECKSFLAECHE,
    ZIMMER,
    BAUJAHR,
    OBJEKTART,
];

/// 取引区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Kaufen")]
    Buy,
    #[serde(rename = "Mieten")]
    Rent,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Buy => "Kaufen",
            Category::Rent => "Mieten",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Kaufen" => Some(Category::Buy),
            "Mieten" => Some(Category::Rent),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// フィールド値
///
/// リモート側にユーザーが追加した列（添付ファイル等）は `Json` として素通しする。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Json(serde_json::Value),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// 空文字・空白のみ・null・空配列は「値なし」とみなす
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Json(v) => match v {
                serde_json::Value::Null => true,
                serde_json::Value::String(s) => s.trim().is_empty(),
                serde_json::Value::Array(a) => a.is_empty(),
                serde_json::Value::Object(o) => o.is_empty(),
                _ => false,
            },
            FieldValue::Bool(_) | FieldValue::Number(_) => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<usize> for FieldValue {
    fn from(n: usize) -> Self {
        FieldValue::Number(n as f64)
    }
}

/// 正規化済みの物件レコード（フィールド名 → 値）
///
/// キー順は常にソート済みなので、シリアライズ結果は挿入順に依存しない。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// 値をセットする。空の値は保持しない（リモートを空で上書きしないため）
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        if value.is_empty() {
            self.fields.remove(&name);
        } else {
            self.fields.insert(name, value);
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// テキスト値（前後の空白を除去、空なら None）
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(FieldValue::as_text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// 空でない値を持つフィールド数
    pub fn populated(&self) -> usize {
        self.fields.values().filter(|v| !v.is_empty()).count()
    }

    /// 説明文の長さ（文字数）。重複解決の優先度に使う
    pub fn description_len(&self) -> usize {
        self.text(BESCHREIBUNG).map(|s| s.chars().count()).unwrap_or(0)
    }

    pub fn category(&self) -> Option<Category> {
        self.text(KATEGORIE).and_then(Category::parse)
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.set(name, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_drops_empty_values() {
        let mut record = Record::new().with(TITEL, "Haus").with(ZIMMER, "4");
        record.set(ZIMMER, "   ");

        assert_eq!(record.text(TITEL), Some("Haus"));
        assert!(!record.contains(ZIMMER));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_field_value_from_json() {
        let json = r#"{"Titel":"A","Preis":100,"Aktiv":true,"Anhang":[{"url":"x"}]}"#;
        let record: Record = serde_json::from_str(json).unwrap();

        assert_eq!(record.get(TITEL), Some(&FieldValue::Text("A".into())));
        assert_eq!(record.get(PREIS), Some(&FieldValue::Number(100.0)));
        assert_eq!(record.get("Aktiv"), Some(&FieldValue::Bool(true)));
        assert!(matches!(record.get("Anhang"), Some(FieldValue::Json(_))));
    }

    #[test]
    fn test_integer_and_float_prices_compare_equal() {
        let from_remote: Record = serde_json::from_str(r#"{"Preis":250000}"#).unwrap();
        let local = Record::new().with(PREIS, 250000.0);
        assert_eq!(from_remote.get(PREIS), local.get(PREIS));
    }

    #[test]
    fn test_display_number_without_fraction() {
        assert_eq!(FieldValue::Number(120.0).to_string(), "120");
        assert_eq!(FieldValue::Number(99.5).to_string(), "99.5");
    }

    #[test]
    fn test_category_round_trip_names() {
        assert_eq!(Category::parse("Mieten"), Some(Category::Rent));
        assert_eq!(Category::Buy.as_str(), "Kaufen");
        assert_eq!(Category::parse("rent"), None);
    }

    #[test]
    fn test_description_len_counts_chars() {
        let record = Record::new().with(BESCHREIBUNG, "Grünfläche");
        assert_eq!(record.description_len(), 10);
    }
}
