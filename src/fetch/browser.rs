//! ヘッドレスブラウザによる取得
//!
//! JavaScript で物件一覧を描画するページ向けのフォールバック。

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::ScraperError;
use crate::traits::PageFetcher;

/// 描画完了を待つ時間
const RENDER_WAIT_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    /// デバッグ時は取得ごとにスクリーンショットをログへ出す
    pub debug: bool,
    pub request_timeout: Duration,
    pub delay: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            debug: false,
            request_timeout: Duration::from_secs(60),
            delay: Duration::from_millis(1500),
        }
    }
}

pub struct BrowserFetcher {
    browser: Browser,
    handler: JoinHandle<()>,
    options: BrowserOptions,
}

impl BrowserFetcher {
    /// ブラウザを起動
    pub async fn launch(options: BrowserOptions) -> Result<Self, ScraperError> {
        info!("Launching headless browser...");

        let mut builder = BrowserConfig::builder()
            .window_size(1280, 800)
            .no_sandbox()
            .request_timeout(options.request_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if let Some(path) = &options.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if !options.headless {
            builder = builder.with_head();
        }

        let config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        info!("Browser ready");
        Ok(Self {
            browser,
            handler,
            options,
        })
    }

    /// ブラウザを終了
    pub async fn close(mut self) -> Result<(), ScraperError> {
        self.browser
            .close()
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;
        self.handler.abort();
        info!("Browser closed");
        Ok(())
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        if !self.options.delay.is_zero() {
            sleep(self.options.delay).await;
        }
        debug!(url, "Browser GET");

        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        sleep(Duration::from_millis(RENDER_WAIT_MS)).await;

        if self.options.debug {
            if let Ok(screenshot) = page
                .screenshot(ScreenshotParams::builder().full_page(true).build())
                .await
            {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
                debug!(url, "Screenshot: data:image/png;base64,{}", encoded);
            }
        }

        let html = page
            .content()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()));

        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }

        html
    }
}

/// 最初の取得時にだけブラウザを起動する
///
/// フォールバックが不要だった実行では Chrome を起動しない。
pub struct LazyBrowserFetcher {
    options: BrowserOptions,
    browser: OnceCell<BrowserFetcher>,
}

impl LazyBrowserFetcher {
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            options,
            browser: OnceCell::new(),
        }
    }

    pub fn is_launched(&self) -> bool {
        self.browser.initialized()
    }

    pub async fn close(self) -> Result<(), ScraperError> {
        match self.browser.into_inner() {
            Some(browser) => browser.close().await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PageFetcher for LazyBrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        let browser = self
            .browser
            .get_or_try_init(|| BrowserFetcher::launch(self.options.clone()))
            .await?;
        browser.fetch(url).await
    }
}
