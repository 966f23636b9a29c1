//! 識別キーの導出
//!
//! 実行をまたいで同じ物件を同じキーに対応付ける。優先順位は
//! オブジェクト番号 > URL > 全フィールドのハッシュ。

use std::fmt;

use sha2::{Digest, Sha256};

use crate::record::{FieldValue, Record, OBJEKTNUMMER, WEBSEITE};

/// 重複排除・突き合わせ用のキー
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// レコード自身のフィールドだけから決定的にキーを求める
pub fn resolve(record: &Record) -> IdentityKey {
    if let Some(obj) = anchor(record, OBJEKTNUMMER) {
        return IdentityKey(format!("obj:{}", obj));
    }
    if let Some(url) = anchor(record, WEBSEITE) {
        return IdentityKey(format!("url:{}", url));
    }
    IdentityKey(format!("hash:{}", content_hash(record)))
}

/// 数値列として保存されたオブジェクト番号も文字列として扱う
fn anchor(record: &Record, name: &str) -> Option<String> {
    match record.get(name)? {
        FieldValue::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        FieldValue::Number(n) => Some(FieldValue::Number(*n).to_string()),
        _ => None,
    }
}

/// キー順にソートされた JSON 表現の SHA256
fn content_hash(record: &Record) -> String {
    // Record は BTreeMap なのでキー順は常に一定
    let canonical = serde_json::to_string(record).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}
