use std::collections::HashMap;

use tracing::info;

use crate::record::{Record, BESCHREIBUNG};
use crate::store::RemoteRow;
use crate::sync::{resolve, IdentityKey};

/// 識別キー → 説明文
///
/// 実行開始時にリモートの内容から一度だけ作り、以降は読み取り専用。
/// 同期と同じキーで引くので、物件番号のない物件（URLキー）も対象になる。
#[derive(Debug, Clone, Default)]
pub struct DescriptionCache {
    entries: HashMap<IdentityKey, String>,
}

impl DescriptionCache {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 同じキーの行が複数あれば最初の行を使う（同期側と同じ）
    pub fn from_rows(rows: &[RemoteRow]) -> Self {
        let mut entries = HashMap::new();
        for row in rows {
            if let Some(text) = row.fields.text(BESCHREIBUNG) {
                entries
                    .entry(resolve(&row.fields))
                    .or_insert_with(|| text.to_string());
            }
        }
        info!(entries = entries.len(), "Loaded description cache");
        Self { entries }
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// レコード自身の識別キーで引く
    pub fn lookup(&self, record: &Record) -> Option<&str> {
        self.get(&resolve(record))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
