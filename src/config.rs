use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::enrich::DEFAULT_MODEL;
use crate::store::{AirtableConfig, DEFAULT_RATE_PAUSE};
use crate::sync::ApplyOptions;

pub const DEFAULT_OUTPUT_CSV: &str = "heyen_immobilien.csv";
const DEFAULT_REQUEST_DELAY_MS: u64 = 1500;

/// 実行設定
///
/// 環境変数（`.env` を含む）から読み込み、`with_*` で上書きする。
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 3つの Airtable 変数がすべて揃ったときだけ Some
    pub airtable: Option<AirtableConfig>,
    /// ページ取得の間隔
    pub request_delay: Duration,
    /// Airtable への連続リクエストの間隔（ページ送り・書き込みバッチ）
    pub store_pause: Duration,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    /// 宣言されたリモートのフィールド名（空ならリモート行から推定）
    pub declared_fields: Vec<String>,
    pub chrome_path: Option<PathBuf>,
    pub output_csv: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            airtable: None,
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            store_pause: DEFAULT_RATE_PAUSE,
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            declared_fields: Vec::new(),
            chrome_path: None,
            output_csv: PathBuf::from(DEFAULT_OUTPUT_CSV),
        }
    }
}

impl AppConfig {
    /// プロセス環境から読み込む（`.env` があれば先に読む）
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から読み込む。空文字は未設定と同じ扱い
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        match (
            get("AIRTABLE_TOKEN"),
            get("AIRTABLE_BASE"),
            get("AIRTABLE_TABLE_ID"),
        ) {
            (Some(token), Some(base), Some(table)) => {
                config.airtable = Some(AirtableConfig::new(token, base, table));
            }
            (None, None, None) => {}
            _ => warn!("Airtable configuration incomplete, sync disabled"),
        }

        if let Some(delay) = get("REQUEST_DELAY").and_then(|raw| seconds("REQUEST_DELAY", &raw)) {
            config.request_delay = delay;
        }
        if let Some(pause) = get("AIRTABLE_PAUSE").and_then(|raw| seconds("AIRTABLE_PAUSE", &raw)) {
            config.store_pause = pause;
        }

        config.openai_api_key = get("OPENAI_API_KEY");
        if let Some(model) = get("OPENAI_MODEL") {
            config.openai_model = model;
        }
        if let Some(fields) = get("AIRTABLE_FIELDS") {
            config.declared_fields = fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect();
        }
        config.chrome_path = get("CHROME_PATH").map(PathBuf::from);
        if let Some(path) = get("OUTPUT_CSV") {
            config.output_csv = PathBuf::from(path);
        }

        config
    }

    pub fn with_airtable(mut self, airtable: AirtableConfig) -> Self {
        self.airtable = Some(airtable);
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_store_pause(mut self, pause: Duration) -> Self {
        self.store_pause = pause;
        self
    }

    pub fn with_output_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_csv = path.into();
        self
    }

    pub fn with_declared_fields(mut self, fields: Vec<String>) -> Self {
        self.declared_fields = fields;
        self
    }

    pub fn sync_configured(&self) -> bool {
        self.airtable.is_some()
    }

    /// ページ送りの間隔を反映した接続設定
    pub fn airtable_config(&self) -> Option<AirtableConfig> {
        self.airtable
            .clone()
            .map(|airtable| airtable.with_page_pause(self.store_pause))
    }

    /// 書き込みバッチの間隔を反映した適用設定
    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions::default().with_batch_pause(self.store_pause)
    }
}

/// 秒数（小数可）。不正な値は警告して無視
fn seconds(key: &str, raw: &str) -> Option<Duration> {
    match raw.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Some(Duration::from_secs_f64(secs)),
        _ => {
            warn!(key, value = %raw, "Invalid duration, using default");
            None
        }
    }
}
