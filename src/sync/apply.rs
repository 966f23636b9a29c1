//! 同期計画の適用
//!
//! 作成 → 更新 → 削除の順に、固定サイズのバッチで送る。失敗したバッチで
//! 即中断する（再試行もロールバックもしない）。途中で止まった場合は次回の
//! 実行が現在のリモート状態から計画を立て直して収束させる。

use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{RemoteId, DEFAULT_RATE_PAUSE, MAX_BATCH_SIZE};
use crate::traits::RemoteStore;

use super::reconcile::SyncPlan;

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub batch_size: usize,
    /// バッチ間の待機（レート制限対策）
    pub batch_pause: Duration,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            batch_pause: DEFAULT_RATE_PAUSE,
        }
    }
}

impl ApplyOptions {
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    fn chunk_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }
}

/// 適用結果の件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// 重複キーで削除した行
    pub pruned: usize,
    /// 検証スイープで削除した行
    pub cleaned: usize,
}

pub async fn apply_plan(
    store: &dyn RemoteStore,
    plan: &SyncPlan,
    options: &ApplyOptions,
) -> Result<SyncSummary, StoreError> {
    let size = options.chunk_size();
    info!(
        create = plan.to_create.len(),
        update = plan.to_update.len(),
        delete = plan.to_delete.len(),
        redundant = plan.redundant.len(),
        "Applying sync plan"
    );

    let mut pacer = Pacer::new(options);

    let creates: Vec<_> = plan.to_create.iter().map(|op| op.fields.clone()).collect();
    for (i, batch) in creates.chunks(size).enumerate() {
        pacer.wait().await;
        debug!(batch = i + 1, count = batch.len(), "Creating records");
        store.batch_create(batch).await?;
    }

    let updates = plan.update_batch();
    for (i, batch) in updates.chunks(size).enumerate() {
        pacer.wait().await;
        debug!(batch = i + 1, count = batch.len(), "Updating records");
        store.batch_update(batch).await?;
    }

    delete_batches(store, &plan.delete_ids(), options, &mut pacer).await?;

    Ok(SyncSummary {
        created: plan.to_create.len(),
        updated: plan.to_update.len(),
        deleted: plan.to_delete.len(),
        pruned: plan.redundant.len(),
        cleaned: 0,
    })
}

pub async fn delete_in_batches(
    store: &dyn RemoteStore,
    ids: &[RemoteId],
    options: &ApplyOptions,
) -> Result<(), StoreError> {
    delete_batches(store, ids, options, &mut Pacer::new(options)).await
}

async fn delete_batches(
    store: &dyn RemoteStore,
    ids: &[RemoteId],
    options: &ApplyOptions,
    pacer: &mut Pacer,
) -> Result<(), StoreError> {
    for (i, batch) in ids.chunks(options.chunk_size()).enumerate() {
        pacer.wait().await;
        debug!(batch = i + 1, count = batch.len(), "Deleting records");
        store.batch_delete(batch).await?;
    }
    Ok(())
}

/// 書き込み呼び出しの間隔（作成・更新・削除をまたいで数える）
struct Pacer {
    pause: Duration,
    writes: usize,
}

impl Pacer {
    fn new(options: &ApplyOptions) -> Self {
        Self {
            pause: options.batch_pause,
            writes: 0,
        }
    }

    /// 2回目以降の書き込みの前に待つ
    async fn wait(&mut self) {
        if self.writes > 0 && !self.pause.is_zero() {
            sleep(self.pause).await;
        }
        self.writes += 1;
    }
}
