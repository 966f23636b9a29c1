//! リモートストアとの差分同期
//!
//! - `identity`: 識別キー
//! - `reconcile`: 作成/更新/削除の計算（純粋関数）
//! - `apply`: バッチ適用
//! - `cleanup`: 妥当性による削除スイープ

pub mod apply;
pub mod cleanup;
pub mod identity;
pub mod reconcile;

pub use apply::{apply_plan, ApplyOptions, SyncSummary};
pub use cleanup::{invalid_rows, sweep_invalid, ValidityPolicy};
pub use identity::{resolve, IdentityKey};
pub use reconcile::{reconcile, CreateOp, DeleteOp, FieldWhitelist, SyncPlan, UpdateOp};
