use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::Service;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::enrich::{enrich_descriptions, DescriptionCache, EnrichStats, OpenAiEnricher, TemplateEnricher};
use crate::error::RunError;
use crate::export::write_csv_file;
use crate::fetch::{BrowserOptions, HttpFetcher, LazyBrowserFetcher};
use crate::heyen::{FailedPage, HeyenConfig, HeyenScraper};
use crate::normalize::normalize;
use crate::record::{Category, Record, ANZAHL_BILDER};
use crate::store::{observed_fields, AirtableClient, RemoteRow};
use crate::sync::{
    apply_plan, invalid_rows, reconcile, sweep_invalid, ApplyOptions, FieldWhitelist, SyncPlan,
    SyncSummary, ValidityPolicy,
};
use crate::traits::{Enricher, PageFetcher, RemoteStore};

/// 同期リクエスト
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    /// CSV出力先（None なら設定値）
    pub output: Option<PathBuf>,
    /// リモートへは一切アクセスしない
    pub no_sync: bool,
    /// 計画を出すだけで適用しない
    pub dry_run: bool,
    /// 同期後に不正行を掃除する
    pub cleanup: bool,
    /// HTTPでリンクが取れない一覧ページをブラウザで再取得する
    pub browser_fallback: bool,
    /// 詳細ページ数の上限
    pub limit: Option<usize>,
}

impl SyncRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn with_no_sync(mut self, no_sync: bool) -> Self {
        self.no_sync = no_sync;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_browser_fallback(mut self, enabled: bool) -> Self {
        self.browser_fallback = enabled;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// 同期計画の件数（ドライラン時の出力）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanCounts {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub redundant: usize,
    pub invalid: usize,
}

impl From<&SyncPlan> for PlanCounts {
    fn from(plan: &SyncPlan) -> Self {
        Self {
            create: plan.to_create.len(),
            update: plan.to_update.len(),
            delete: plan.to_delete.len(),
            redundant: plan.redundant.len(),
            invalid: 0,
        }
    }
}

/// 実行結果
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub extracted: usize,
    pub failures: Vec<FailedPage>,
    pub buy: usize,
    pub rent: usize,
    pub images: usize,
    pub csv_path: Option<PathBuf>,
    pub enrich: EnrichStats,
    /// 適用結果（同期しなかった場合は None）
    pub sync: Option<SyncSummary>,
    /// ドライラン時の計画
    pub plan: Option<PlanCounts>,
    pub dry_run: bool,
}

impl RunReport {
    fn new(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            extracted: 0,
            failures: Vec::new(),
            buy: 0,
            rent: 0,
            images: 0,
            csv_path: None,
            enrich: EnrichStats::default(),
            sync: None,
            plan: None,
            dry_run,
        }
    }

    fn count(&mut self, records: &[Record]) {
        self.extracted = records.len();
        self.buy = count_category(records, Category::Buy);
        self.rent = count_category(records, Category::Rent);
        self.images = records
            .iter()
            .filter_map(|r| r.get(ANZAHL_BILDER).and_then(|v| v.as_number()))
            .map(|n| n as usize)
            .sum();
    }
}

fn count_category(records: &[Record], category: Category) -> usize {
    records
        .iter()
        .filter(|r| r.category() == Some(category))
        .count()
}

/// tower::Service を実装した同期サービス
///
/// 1回の呼び出しで「取得 → 正規化 → 説明文補完 → CSV → 同期」を順に実行する。
#[derive(Clone)]
pub struct SyncService {
    config: AppConfig,
    site: HeyenConfig,
    fetcher: Arc<dyn PageFetcher>,
    store: Option<Arc<dyn RemoteStore>>,
    enricher: Arc<dyn Enricher>,
    apply_options: ApplyOptions,
    validity: ValidityPolicy,
}

impl SyncService {
    /// 設定から本番用の取得器・ストア・生成器を組み立てる
    pub fn from_config(config: AppConfig) -> Result<Self, RunError> {
        let fetcher = Arc::new(HttpFetcher::new(config.request_delay)?);

        let store: Option<Arc<dyn RemoteStore>> = match config.airtable_config() {
            Some(airtable) => Some(Arc::new(AirtableClient::new(airtable)?)),
            None => None,
        };

        let enricher: Arc<dyn Enricher> = match &config.openai_api_key {
            Some(key) => match OpenAiEnricher::new(key.clone(), config.openai_model.clone()) {
                Ok(openai) => {
                    info!(model = openai.model(), "Using OpenAI for missing descriptions");
                    Arc::new(openai)
                }
                Err(e) => {
                    warn!(error = %e, "OpenAI client unavailable, using template");
                    Arc::new(TemplateEnricher)
                }
            },
            None => Arc::new(TemplateEnricher),
        };

        Ok(Self::new(config, fetcher)
            .with_store(store)
            .with_enricher(enricher))
    }

    pub fn new(config: AppConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let apply_options = config.apply_options();
        Self {
            config,
            site: HeyenConfig::default(),
            fetcher,
            store: None,
            enricher: Arc::new(TemplateEnricher),
            apply_options,
            validity: ValidityPolicy::default(),
        }
    }

    pub fn with_store(mut self, store: Option<Arc<dyn RemoteStore>>) -> Self {
        self.store = store;
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn with_site(mut self, site: HeyenConfig) -> Self {
        self.site = site;
        self
    }

    pub fn with_apply_options(mut self, options: ApplyOptions) -> Self {
        self.apply_options = options;
        self
    }

    pub fn with_validity(mut self, policy: ValidityPolicy) -> Self {
        self.validity = policy;
        self
    }

    fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            chrome_path: self.config.chrome_path.clone(),
            delay: self.config.request_delay,
            ..Default::default()
        }
    }

    fn whitelist(&self, rows: &[RemoteRow]) -> FieldWhitelist {
        if self.config.declared_fields.is_empty() {
            observed_fields(rows).into_iter().collect()
        } else {
            self.config.declared_fields.iter().cloned().collect()
        }
    }

    async fn run(self, req: SyncRequest) -> Result<RunReport, RunError> {
        let mut report = RunReport::new(req.dry_run);

        let store = match (&self.store, req.no_sync) {
            (Some(store), false) => Some(store.clone()),
            (Some(_), true) => {
                info!("Sync disabled by request");
                None
            }
            (None, _) => {
                if !req.no_sync {
                    warn!("Airtable not configured (AIRTABLE_TOKEN / AIRTABLE_BASE / AIRTABLE_TABLE_ID), sync skipped");
                }
                None
            }
        };

        // 説明文キャッシュはここで1回だけ読み込む。読めなくても取得と CSV 出力は続ける
        let initial_rows = match &store {
            Some(store) => match store.list_all().await {
                Ok(rows) => {
                    info!(rows = rows.len(), "Remote rows loaded");
                    Some(rows)
                }
                Err(e) => {
                    warn!(error = %e, "Remote rows unavailable, continuing without description cache");
                    None
                }
            },
            None => None,
        };
        let cache = initial_rows
            .as_deref()
            .map(DescriptionCache::from_rows)
            .unwrap_or_default();

        let site = self
            .site
            .clone()
            .with_max_details(req.limit.or(self.site.max_details));
        let fallback = req
            .browser_fallback
            .then(|| LazyBrowserFetcher::new(self.browser_options()));

        let mut scraper = HeyenScraper::new(site, self.fetcher.as_ref());
        if let Some(browser) = &fallback {
            scraper = scraper.with_fallback(browser);
        }
        let outcome = scraper.run().await;
        if let Some(browser) = fallback {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Failed to close browser");
            }
        }

        report.failures = outcome.failures;
        let mut records: Vec<Record> = outcome.listings.iter().map(normalize).collect();
        if records.is_empty() {
            warn!(failed = report.failures.len(), "No listings extracted, nothing to export or sync");
            return Ok(report);
        }

        report.enrich = enrich_descriptions(&mut records, &cache, self.enricher.as_ref()).await;
        report.count(&records);

        let csv_path = req.output.clone().unwrap_or_else(|| self.config.output_csv.clone());
        write_csv_file(&csv_path, &records)?;
        report.csv_path = Some(csv_path);

        info!(
            extracted = report.extracted,
            failed = report.failures.len(),
            buy = report.buy,
            rent = report.rent,
            images = report.images,
            "Scrape summary"
        );

        let Some(store) = store else {
            return Ok(report);
        };

        // 最初の読み込みに失敗していたら同期の直前に読み直す（ここでの失敗は致命的）
        let remote_rows = match initial_rows {
            Some(rows) => rows,
            None => store.list_all().await?,
        };

        let whitelist = self.whitelist(&remote_rows);
        if whitelist.is_unrestricted() {
            info!("No remote schema known, all fields are synced");
        }
        let plan = reconcile(records, &remote_rows, &whitelist);

        if req.dry_run {
            let mut counts = PlanCounts::from(&plan);
            if req.cleanup {
                counts.invalid = invalid_rows(&remote_rows, &self.validity).len();
            }
            info!(
                create = counts.create,
                update = counts.update,
                delete = counts.delete,
                redundant = counts.redundant,
                invalid = counts.invalid,
                "Dry run, plan not applied"
            );
            report.plan = Some(counts);
            return Ok(report);
        }

        let mut summary = if plan.is_noop() {
            info!("Remote table already up to date");
            SyncSummary::default()
        } else {
            apply_plan(store.as_ref(), &plan, &self.apply_options).await?
        };

        if req.cleanup {
            summary.cleaned = sweep_invalid(store.as_ref(), &self.validity, &self.apply_options).await?;
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            pruned = summary.pruned,
            cleaned = summary.cleaned,
            "Sync complete"
        );
        report.sync = Some(summary);
        Ok(report)
    }
}

impl Service<SyncRequest> for SyncService {
    type Response = RunReport;
    type Error = RunError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: SyncRequest) -> Self::Future {
        info!(
            dry_run = req.dry_run,
            no_sync = req.no_sync,
            cleanup = req.cleanup,
            "同期リクエスト受信"
        );
        let service = self.clone();
        Box::pin(service.run(req))
    }
}
