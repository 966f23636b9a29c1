//! 差分計算
//!
//! 今回スクレイプした物件集合とリモートの全行を識別キーで突き合わせ、
//! 作成・更新・削除の最小集合を求める。ここでは一切通信しない。

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::record::Record;
use crate::store::{RemoteId, RemoteRow, RowUpdate};

use super::identity::{resolve, IdentityKey};

/// 新規作成
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOp {
    pub key: IdentityKey,
    pub fields: Record,
}

/// 差分更新
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOp {
    pub key: IdentityKey,
    pub id: RemoteId,
    /// 値が変わったフィールドのみ
    pub fields: Record,
}

/// 削除
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOp {
    pub key: IdentityKey,
    pub id: RemoteId,
}

/// 同期計画
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub to_create: Vec<CreateOp>,
    pub to_update: Vec<UpdateOp>,
    pub to_delete: Vec<DeleteOp>,
    /// リモートに既に存在し、今回も残るキー（更新有無を問わない）
    pub kept: BTreeSet<IdentityKey>,
    /// 同じキーを持つ2行目以降のリモート行
    pub redundant: Vec<DeleteOp>,
}

impl SyncPlan {
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty()
            && self.to_update.is_empty()
            && self.to_delete.is_empty()
            && self.redundant.is_empty()
    }

    pub fn update_batch(&self) -> Vec<RowUpdate> {
        self.to_update
            .iter()
            .map(|op| RowUpdate {
                id: op.id.clone(),
                fields: op.fields.clone(),
            })
            .collect()
    }

    /// 削除対象ID（通常の削除 → 重複行の順）
    pub fn delete_ids(&self) -> Vec<RemoteId> {
        self.to_delete
            .iter()
            .chain(self.redundant.iter())
            .map(|op| op.id.clone())
            .collect()
    }
}

/// リモートが受け付ける列
///
/// 空集合は「制限なし」。空テーブルへの初回投入ではスキーマを知る手段がないため。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldWhitelist(BTreeSet<String>);

impl FieldWhitelist {
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    pub fn allows(&self, name: &str) -> bool {
        self.0.is_empty() || self.0.contains(name)
    }

    pub fn sanitize(&self, record: &Record) -> Record {
        if self.is_unrestricted() {
            return record.clone();
        }
        record
            .iter()
            .filter(|(name, _)| self.0.contains(name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldWhitelist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.trim().is_empty())
                .collect(),
        )
    }
}

/// キーごとに1件へ絞る。説明文が長い方を残し、同じ長さなら先勝ち
///
/// 返り値は最初に現れた順。
pub fn dedupe_desired(records: Vec<Record>) -> Vec<(IdentityKey, Record)> {
    let mut order: Vec<IdentityKey> = Vec::new();
    let mut by_key: HashMap<IdentityKey, Record> = HashMap::new();

    for record in records {
        let key = resolve(&record);
        match by_key.get(&key) {
            Some(current) => {
                if record.description_len() > current.description_len() {
                    debug!(key = %key, "Duplicate listing replaced by richer description");
                    by_key.insert(key, record);
                } else {
                    debug!(key = %key, "Duplicate listing dropped");
                }
            }
            None => {
                order.push(key.clone());
                by_key.insert(key, record);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key).map(|record| (key, record)))
        .collect()
}

/// リモート値と異なるフィールドだけを取り出す
pub fn field_diff(desired: &Record, current: &Record) -> Record {
    desired
        .iter()
        .filter(|(name, value)| current.get(name) != Some(*value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// 作成・更新・削除を計算する
pub fn reconcile(
    desired: Vec<Record>,
    remote_rows: &[RemoteRow],
    whitelist: &FieldWhitelist,
) -> SyncPlan {
    let mut plan = SyncPlan::default();

    // 1. 既存行をキーで引けるようにする（同一キーの2行目以降は重複扱い）
    let mut existing_order: Vec<IdentityKey> = Vec::new();
    let mut existing_by_key: HashMap<IdentityKey, &RemoteRow> = HashMap::new();
    for row in remote_rows {
        let key = resolve(&row.fields);
        if existing_by_key.contains_key(&key) {
            plan.redundant.push(DeleteOp {
                key,
                id: row.id.clone(),
            });
            continue;
        }
        existing_order.push(key.clone());
        existing_by_key.insert(key, row);
    }

    // 2. 今回の集合。キーはサニタイズ前の完全なレコードから求める
    let desired_by_key: Vec<(IdentityKey, Record)> = dedupe_desired(desired)
        .into_iter()
        .map(|(key, record)| {
            let sanitized = whitelist.sanitize(&record);
            (key, sanitized)
        })
        .collect();

    // 3. 作成 / 更新
    for (key, fields) in desired_by_key {
        match existing_by_key.get(&key) {
            Some(row) => {
                let diff = field_diff(&fields, &row.fields);
                if !diff.is_empty() {
                    plan.to_update.push(UpdateOp {
                        key: key.clone(),
                        id: row.id.clone(),
                        fields: diff,
                    });
                }
                plan.kept.insert(key);
            }
            None => plan.to_create.push(CreateOp { key, fields }),
        }
    }

    // 4. 残らなかった既存行は削除
    let kept: HashSet<&IdentityKey> = plan.kept.iter().collect();
    let to_delete: Vec<DeleteOp> = existing_order
        .iter()
        .filter(|key| !kept.contains(key))
        .filter_map(|key| {
            existing_by_key.get(key).map(|row| DeleteOp {
                key: key.clone(),
                id: row.id.clone(),
            })
        })
        .collect();
    plan.to_delete = to_delete;

    plan
}
