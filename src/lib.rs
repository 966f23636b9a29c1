//! HEYEN Immobilien スクレイパー + Airtable 同期ライブラリ
//!
//! - 物件一覧（Kaufen / Mieten）から詳細ページを取得して項目を抽出
//! - CSV スナップショットを出力
//! - 識別キーに基づく差分同期でリモートの表を最新の取得結果に収束させる
//!
//! # 使用例
//!
//! ```rust,ignore
//! use immo_sync::{AppConfig, SyncRequest, SyncService};
//! use tower::Service;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = AppConfig::from_env();
//!     let mut service = SyncService::from_config(config).unwrap();
//!
//!     let request = SyncRequest::new()
//!         .with_output("./heyen_immobilien.csv")
//!         .with_dry_run(true);
//!
//!     let report = service.call(request).await.unwrap();
//!     println!("Extracted: {}, plan: {:?}", report.extracted, report.plan);
//! }
//! ```
//!
//! # 同期計画のみ
//!
//! ```rust,ignore
//! use immo_sync::sync::{reconcile, FieldWhitelist};
//!
//! let plan = reconcile(desired, &remote_rows, &FieldWhitelist::allow_all());
//! println!("create={} update={} delete={}",
//!     plan.to_create.len(), plan.to_update.len(), plan.to_delete.len());
//! ```

pub mod config;
pub mod enrich;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod heyen;
pub mod normalize;
pub mod record;
pub mod service;
pub mod store;
pub mod sync;
pub mod traits;

// 主要な型をリエクスポート
pub use config::AppConfig;
pub use error::{EnrichError, RunError, ScraperError, StoreError};
pub use heyen::{HeyenConfig, HeyenScraper};
pub use record::{Category, FieldValue, Record};
pub use service::{PlanCounts, RunReport, SyncRequest, SyncService};
pub use traits::{Enricher, PageFetcher, RemoteStore};

// 同期関連の型もリエクスポート
pub use store::{AirtableClient, AirtableConfig, MemoryStore, RemoteId, RemoteRow};
pub use sync::{reconcile, IdentityKey, SyncPlan, SyncSummary};
