//! 不正行の掃除
//!
//! 識別キーではなく行の妥当性で判定する独立したスイープ。必須フィールドの
//! 欠落、または値の入ったフィールドが少なすぎる行を削除対象にする。

use tracing::{info, warn};

use crate::error::StoreError;
use crate::record::TITEL;
use crate::store::{RemoteId, RemoteRow};
use crate::traits::RemoteStore;

use super::apply::{delete_in_batches, ApplyOptions};

const DEFAULT_MIN_POPULATED: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityPolicy {
    pub required_fields: Vec<String>,
    pub min_populated: usize,
}

impl Default for ValidityPolicy {
    fn default() -> Self {
        Self {
            required_fields: vec![TITEL.to_string()],
            min_populated: DEFAULT_MIN_POPULATED,
        }
    }
}

impl ValidityPolicy {
    pub fn is_valid(&self, row: &RemoteRow) -> bool {
        let has_required = self.required_fields.iter().all(|name| {
            row.fields
                .get(name)
                .map(|value| !value.is_empty())
                .unwrap_or(false)
        });
        has_required && row.fields.populated() >= self.min_populated
    }
}

pub fn invalid_rows(rows: &[RemoteRow], policy: &ValidityPolicy) -> Vec<RemoteId> {
    rows.iter()
        .filter(|row| !policy.is_valid(row))
        .map(|row| row.id.clone())
        .collect()
}

/// 現在のリモート状態を読み直し、不正行を削除する。削除件数を返す
pub async fn sweep_invalid(
    store: &dyn RemoteStore,
    policy: &ValidityPolicy,
    options: &ApplyOptions,
) -> Result<usize, StoreError> {
    let rows = store.list_all().await?;
    let ids = invalid_rows(&rows, policy);
    if ids.is_empty() {
        info!("Cleanup: no invalid rows");
        return Ok(0);
    }

    warn!(count = ids.len(), "Cleanup: deleting invalid rows");
    delete_in_batches(store, &ids, options).await?;
    Ok(ids.len())
}
