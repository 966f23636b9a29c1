//! プロセス内ストア
//!
//! Airtable と同じ契約（バッチ上限・部分更新・不明IDでの失敗）を持つ。

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::Record;
use crate::traits::RemoteStore;

use super::{RemoteId, RemoteRow, RowUpdate, MAX_BATCH_SIZE};

/// 受け付けた呼び出しの記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Create(usize),
    Update(usize),
    Delete(usize),
}

#[derive(Debug, Default)]
struct State {
    rows: Vec<RemoteRow>,
    calls: Vec<StoreCall>,
    next_id: usize,
    /// n 回目の書き込み呼び出しで失敗させる（0始まり）
    fail_on_write: Option<usize>,
    writes: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存行を持つストアを作る。IDは `rec1`, `rec2`, ... の順
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            for fields in records {
                let id = Self::allocate_id(&mut state);
                state.rows.push(RemoteRow { id, fields });
            }
        }
        store
    }

    /// `n` 回目（0始まり）の書き込みバッチを失敗させる
    pub fn fail_on_write(self, n: usize) -> Self {
        self.lock().fail_on_write = Some(n);
        self
    }

    pub fn rows(&self) -> Vec<RemoteRow> {
        self.lock().rows.clone()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // テスト用途なので poison は引き継がない
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn allocate_id(state: &mut State) -> RemoteId {
        state.next_id += 1;
        RemoteId::new(format!("rec{}", state.next_id))
    }

    fn begin_write(state: &mut State, len: usize, call: StoreCall) -> Result<(), StoreError> {
        if len > MAX_BATCH_SIZE {
            return Err(StoreError::BatchTooLarge {
                size: len,
                max: MAX_BATCH_SIZE,
            });
        }
        let n = state.writes;
        state.writes += 1;
        if state.fail_on_write == Some(n) {
            return Err(StoreError::Api {
                status: 500,
                message: format!("injected failure on write #{}", n),
            });
        }
        state.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<RemoteRow>, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::List);
        Ok(state.rows.clone())
    }

    async fn batch_create(&self, records: &[Record]) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::begin_write(&mut state, records.len(), StoreCall::Create(records.len()))?;
        for fields in records {
            let id = Self::allocate_id(&mut state);
            state.rows.push(RemoteRow {
                id,
                fields: fields.clone(),
            });
        }
        Ok(())
    }

    async fn batch_update(&self, updates: &[RowUpdate]) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(missing) = updates
            .iter()
            .find(|u| !state.rows.iter().any(|row| row.id == u.id))
        {
            return Err(StoreError::Api {
                status: 404,
                message: format!("record not found: {}", missing.id),
            });
        }
        Self::begin_write(&mut state, updates.len(), StoreCall::Update(updates.len()))?;
        for update in updates {
            if let Some(row) = state.rows.iter_mut().find(|row| row.id == update.id) {
                for (name, value) in update.fields.iter() {
                    row.fields.set(name.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn batch_delete(&self, ids: &[RemoteId]) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::begin_write(&mut state, ids.len(), StoreCall::Delete(ids.len()))?;
        state.rows.retain(|row| !ids.contains(&row.id));
        Ok(())
    }
}
