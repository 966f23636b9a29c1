//! Airtable REST API クライアント

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::record::Record;
use crate::traits::RemoteStore;

use super::{RemoteId, RemoteRow, RowUpdate, DEFAULT_RATE_PAUSE, MAX_BATCH_SIZE};

const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";
const PAGE_SIZE: u32 = 100;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Airtable 接続設定
#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub token: String,
    /// ベースID (app...)
    pub base_id: String,
    /// テーブルID (tbl...) またはテーブル名
    pub table_id: String,
    pub api_url: String,
    /// ページング時のリクエスト間隔
    pub page_pause: Duration,
}

impl AirtableConfig {
    pub fn new(
        token: impl Into<String>,
        base_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            base_id: base_id.into(),
            table_id: table_id.into(),
            api_url: DEFAULT_API_URL.to_string(),
            page_pause: DEFAULT_RATE_PAUSE,
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_page_pause(mut self, pause: Duration) -> Self {
        self.page_pause = pause;
        self
    }

    /// `{api_url}/{base}/{table}`
    pub fn table_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.api_url.trim_end_matches('/'),
            self.base_id,
            self.table_id
        )
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<RemoteRow>,
    offset: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateRecord<'a> {
    fields: &'a Record,
}

#[derive(Debug, Serialize)]
struct CreatePayload<'a> {
    records: Vec<CreateRecord<'a>>,
}

#[derive(Debug, Serialize)]
struct UpdatePayload<'a> {
    records: &'a [RowUpdate],
}

pub struct AirtableClient {
    client: Client,
    config: AirtableConfig,
}

impl AirtableClient {
    pub fn new(config: AirtableConfig) -> Result<Self, StoreError> {
        if config.token.is_empty() || config.base_id.is_empty() || config.table_id.is_empty() {
            return Err(StoreError::Config(
                "AIRTABLE_TOKEN / AIRTABLE_BASE / AIRTABLE_TABLE_ID が未設定です".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AirtableConfig {
        &self.config
    }

    fn check_batch(len: usize) -> Result<(), StoreError> {
        if len > MAX_BATCH_SIZE {
            return Err(StoreError::BatchTooLarge {
                size: len,
                max: MAX_BATCH_SIZE,
            });
        }
        Ok(())
    }

    /// 2xx 以外はステータスと本文を持つエラーにする
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        warn!(status = %status, error = %message, "Airtable API error");
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteStore for AirtableClient {
    async fn list_all(&self) -> Result<Vec<RemoteRow>, StoreError> {
        let url = self.config.table_url();
        let mut rows = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(cursor) = &offset {
                query.push(("offset", cursor.clone()));
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.config.token)
                .query(&query)
                .send()
                .await?;
            let page: ListResponse = Self::ensure_success(response)
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Parse(e.to_string()))?;

            debug!(count = page.records.len(), has_more = page.offset.is_some(), "Fetched Airtable page");
            rows.extend(page.records);

            match page.offset {
                Some(next) => {
                    offset = Some(next);
                    sleep(self.config.page_pause).await;
                }
                None => break,
            }
        }

        info!(rows = rows.len(), "Loaded Airtable table");
        Ok(rows)
    }

    async fn batch_create(&self, records: &[Record]) -> Result<(), StoreError> {
        Self::check_batch(records.len())?;
        let payload = CreatePayload {
            records: records.iter().map(|fields| CreateRecord { fields }).collect(),
        };

        let response = self
            .client
            .post(self.config.table_url())
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await?;
        Self::ensure_success(response).await?;

        debug!(count = records.len(), "Created Airtable records");
        Ok(())
    }

    async fn batch_update(&self, updates: &[RowUpdate]) -> Result<(), StoreError> {
        Self::check_batch(updates.len())?;
        let payload = UpdatePayload { records: updates };

        let response = self
            .client
            .patch(self.config.table_url())
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await?;
        Self::ensure_success(response).await?;

        debug!(count = updates.len(), "Updated Airtable records");
        Ok(())
    }

    async fn batch_delete(&self, ids: &[RemoteId]) -> Result<(), StoreError> {
        Self::check_batch(ids.len())?;
        let query: Vec<(&str, &str)> = ids.iter().map(|id| ("records[]", id.as_str())).collect();

        let response = self
            .client
            .delete(self.config.table_url())
            .bearer_auth(&self.config.token)
            .query(&query)
            .send()
            .await?;
        Self::ensure_success(response).await?;

        debug!(count = ids.len(), "Deleted Airtable records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url() {
        let config = AirtableConfig::new("key", "appX", "tblY").with_api_url("http://localhost:9/v0/");
        assert_eq!(config.table_url(), "http://localhost:9/v0/appX/tblY");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let result = AirtableClient::new(AirtableConfig::new("", "appX", "tblY"));
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_batch_limit() {
        assert!(AirtableClient::check_batch(10).is_ok());
        assert!(matches!(
            AirtableClient::check_batch(11),
            Err(StoreError::BatchTooLarge { size: 11, max: 10 })
        ));
    }

    #[test]
    fn test_list_response_parsing() {
        let json = r#"{
            "records": [
                {"id": "rec1", "createdTime": "2024-01-01T00:00:00.000Z", "fields": {"Titel": "A", "Preis": 100}},
                {"id": "rec2", "fields": {}}
            ],
            "offset": "itr123/rec2"
        }"#;
        let page: ListResponse = serde_json::from_str(json).unwrap();

        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].id.as_str(), "rec1");
        assert_eq!(page.records[0].fields.text("Titel"), Some("A"));
        assert_eq!(page.offset.as_deref(), Some("itr123/rec2"));
    }

    #[test]
    fn test_update_payload_shape() {
        let updates = vec![RowUpdate {
            id: RemoteId::new("rec1"),
            fields: Record::new().with("Preis", 120.0),
        }];
        let json = serde_json::to_value(UpdatePayload { records: &updates }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"records": [{"id": "rec1", "fields": {"Preis": 120.0}}]})
        );
    }
}
