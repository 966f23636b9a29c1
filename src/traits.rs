use async_trait::async_trait;

use crate::error::{EnrichError, ScraperError, StoreError};
use crate::record::Record;
use crate::store::{RemoteId, RemoteRow, RowUpdate};

/// ページ取得
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// URLのHTMLを取得
    async fn fetch(&self, url: &str) -> Result<String, ScraperError>;
}

/// リモートの表形式ストア
///
/// 書き込み系は1回の呼び出しで1バッチ分のみ扱う。分割と待機は呼び出し側
/// (`sync::apply`) の責務。
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// ページングを辿って全行を取得
    async fn list_all(&self) -> Result<Vec<RemoteRow>, StoreError>;

    /// 行を作成
    async fn batch_create(&self, records: &[Record]) -> Result<(), StoreError>;

    /// 差分フィールドのみ更新
    async fn batch_update(&self, updates: &[RowUpdate]) -> Result<(), StoreError>;

    /// 行を削除
    async fn batch_delete(&self, ids: &[RemoteId]) -> Result<(), StoreError>;
}

/// 説明文の生成
#[async_trait]
pub trait Enricher: Send + Sync {
    /// 抽出済みフィールドから説明文を作る
    async fn describe(&self, record: &Record) -> Result<String, EnrichError>;
}
