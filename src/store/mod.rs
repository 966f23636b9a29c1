//! リモートストア
//!
//! - `AirtableClient`: Airtable REST API
//! - `MemoryStore`: プロセス内ストア（テスト・ドライラン用）

mod airtable;
mod memory;

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::record::Record;

pub use airtable::{AirtableClient, AirtableConfig};
pub use memory::{MemoryStore, StoreCall};

/// Airtable の1リクエストあたりの上限件数
pub const MAX_BATCH_SIZE: usize = 10;

/// Airtable への連続リクエストの間隔（一覧のページ送り・書き込みバッチ共通）
pub const DEFAULT_RATE_PAUSE: Duration = Duration::from_millis(200);

/// リモート側の行ID（不透明）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 同期済みの行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRow {
    pub id: RemoteId,
    #[serde(default)]
    pub fields: Record,
}

/// 部分更新（差分フィールドのみ）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowUpdate {
    pub id: RemoteId,
    pub fields: Record,
}

/// 既存行に現れる列名の和集合
///
/// Airtable は空のセルをレスポンスから省くため、先頭行だけでは列を取りこぼす。
pub fn observed_fields(rows: &[RemoteRow]) -> BTreeSet<String> {
    rows.iter()
        .flat_map(|row| row.fields.names().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_fields_is_union_of_rows() {
        let rows = vec![
            RemoteRow {
                id: RemoteId::new("rec1"),
                fields: Record::new().with("Titel", "A"),
            },
            RemoteRow {
                id: RemoteId::new("rec2"),
                fields: Record::new().with("Preis", 1.0).with("Titel", "B"),
            },
        ];

        let fields = observed_fields(&rows);
        assert_eq!(
            fields.into_iter().collect::<Vec<_>>(),
            vec!["Preis".to_string(), "Titel".to_string()]
        );
    }

    #[test]
    fn test_remote_row_deserializes_without_fields() {
        let row: RemoteRow = serde_json::from_str(r#"{"id":"rec9"}"#).unwrap();
        assert_eq!(row.id.as_str(), "rec9");
        assert!(row.fields.is_empty());
    }
}
