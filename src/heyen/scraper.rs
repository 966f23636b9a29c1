//! HEYEN Immobilien スクレイパー
//!
//! 一覧ページ（Kauf/Miete）から詳細リンクを集め、詳細ページを1件ずつ取得して
//! `RawListing` にする。取得・抽出の失敗は物件単位で記録し、処理は続ける。

use std::collections::HashSet;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::ScraperError;
use crate::extract::{parse_detail, parse_listing_links, RawListing};
use crate::traits::PageFetcher;

use super::types::{DetailLink, FailedPage, HeyenConfig, ListingPage, ScrapeOutcome};

pub struct HeyenScraper<'a> {
    config: HeyenConfig,
    fetcher: &'a dyn PageFetcher,
    fallback: Option<&'a dyn PageFetcher>,
}

impl<'a> HeyenScraper<'a> {
    pub fn new(config: HeyenConfig, fetcher: &'a dyn PageFetcher) -> Self {
        Self {
            config,
            fetcher,
            fallback: None,
        }
    }

    /// HTTPでリンクが見つからない一覧ページ用の取得器（ヘッドレスブラウザ）
    pub fn with_fallback(mut self, fallback: &'a dyn PageFetcher) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn config(&self) -> &HeyenConfig {
        &self.config
    }

    /// 全一覧ページから詳細リンクを収集
    ///
    /// 一覧ページの取得失敗は警告して次へ進む。同じURLは最初に見つかった
    /// 一覧ページの区分で1回だけ返す。
    pub async fn collect_links(&self) -> Vec<DetailLink> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for page in &self.config.listing_pages {
            let page_url = match self.config.listing_url(page) {
                Ok(url) => url,
                Err(e) => {
                    warn!(path = %page.path, error = %e, "Invalid listing page URL");
                    continue;
                }
            };

            let found = match self.links_on(&page_url).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(url = %page_url, error = %e, "Listing page failed, skipping");
                    continue;
                }
            };
            info!(url = %page_url, count = found.len(), "Listing page scanned");

            for url in found {
                if seen.insert(url.to_string()) {
                    links.push(DetailLink {
                        url,
                        category: page.category,
                    });
                }
            }
        }

        if let Some(max) = self.config.max_details {
            if links.len() > max {
                info!(total = links.len(), max, "Limiting detail pages");
                links.truncate(max);
            }
        }

        links
    }

    async fn links_on(&self, page_url: &Url) -> Result<Vec<Url>, ScraperError> {
        let body = self.fetcher.fetch(page_url.as_str()).await?;
        let links = parse_listing_links(&body, page_url);
        if !links.is_empty() {
            return Ok(links);
        }

        match self.fallback {
            Some(fallback) => {
                info!(url = %page_url, "No links via HTTP, retrying with browser");
                let body = fallback.fetch(page_url.as_str()).await?;
                Ok(parse_listing_links(&body, page_url))
            }
            None => Ok(links),
        }
    }

    /// 詳細ページを1件取得して抽出
    pub async fn scrape_detail(&self, link: &DetailLink) -> Result<RawListing, ScraperError> {
        let body = self.fetcher.fetch(link.url.as_str()).await?;
        let listing = parse_detail(&body, &link.url, Some(link.category));
        if listing.title.is_none() && listing.object_number.is_none() {
            return Err(ScraperError::Extraction(format!(
                "タイトルも物件番号も見つかりません: {}",
                link.url
            )));
        }
        Ok(listing)
    }

    /// 全詳細ページを順番に処理
    pub async fn scrape_all(&self, links: &[DetailLink]) -> ScrapeOutcome {
        let mut outcome = ScrapeOutcome::default();
        let total = links.len();

        for (i, link) in links.iter().enumerate() {
            info!("[{}/{}] {}", i + 1, total, link.url);
            match self.scrape_detail(link).await {
                Ok(listing) => {
                    debug!(
                        title = listing.title.as_deref().unwrap_or_default(),
                        images = listing.images.len(),
                        "Extracted"
                    );
                    outcome.listings.push(listing);
                }
                Err(e) => {
                    warn!(url = %link.url, error = %e, "Detail page failed");
                    outcome.failures.push(FailedPage {
                        url: link.url.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        outcome
    }

    /// リンク収集から抽出までを実行
    pub async fn run(&self) -> ScrapeOutcome {
        let links = self.collect_links().await;
        info!(count = links.len(), "Detail links collected");
        self.scrape_all(&links).await
    }

    pub fn listing_pages(&self) -> &[ListingPage] {
        &self.config.listing_pages
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::record::Category;

    /// URL → HTML の固定応答
    #[derive(Default)]
    struct FixturePages {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl FixturePages {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FixturePages {
        async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScraperError::Status {
                    status: 404,
                    url: url.to_string(),
                })
        }
    }

    const BUY: &str = "https://www.heyen-immobilien.de/kaufangebote/";
    const RENT: &str = "https://www.heyen-immobilien.de/mietangebote/";

    fn detail_page(title: &str, obj: &str) -> String {
        format!(
            "<html><body><h1>{}</h1><p>Objekt-Nr: {}</p><p>Kaufpreis: 249.000 €</p></body></html>",
            title, obj
        )
    }

    #[tokio::test]
    async fn test_collect_links_dedupes_and_carries_category() {
        let fetcher = FixturePages::default()
            .with(
                BUY,
                r#"<a href="/objekt/1/">A</a><a href="/objekt/2/">B</a><a href="/objekt/1/">A</a>"#,
            )
            .with(RENT, r#"<a href="/objekt/2/">B</a><a href="/objekt/3/">C</a>"#);
        let scraper = HeyenScraper::new(HeyenConfig::default(), &fetcher);

        let links = scraper.collect_links().await;
        let pairs: Vec<(String, Category)> = links
            .iter()
            .map(|l| (l.url.path().to_string(), l.category))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("/objekt/1/".to_string(), Category::Buy),
                ("/objekt/2/".to_string(), Category::Buy),
                ("/objekt/3/".to_string(), Category::Rent),
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_listing_page_is_skipped() {
        let fetcher = FixturePages::default().with(RENT, r#"<a href="/objekt/9/">X</a>"#);
        let scraper = HeyenScraper::new(HeyenConfig::default(), &fetcher);

        let links = scraper.collect_links().await;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].category, Category::Rent);
    }

    #[tokio::test]
    async fn test_browser_fallback_only_when_no_links() {
        let http = FixturePages::default()
            .with(BUY, "<html><body><div id=app></div></body></html>")
            .with(RENT, r#"<a href="/objekt/3/">C</a>"#);
        let browser = FixturePages::default().with(BUY, r#"<a href="/objekt/1/">A</a>"#);
        let scraper = HeyenScraper::new(HeyenConfig::default(), &http).with_fallback(&browser);

        let links = scraper.collect_links().await;

        assert_eq!(links.len(), 2);
        assert_eq!(browser.requests(), vec![BUY.to_string()]);
    }

    #[tokio::test]
    async fn test_limit_truncates_links() {
        let fetcher = FixturePages::default().with(
            BUY,
            r#"<a href="/objekt/1/">A</a><a href="/objekt/2/">B</a><a href="/objekt/3/">C</a>"#,
        );
        let config = HeyenConfig::default().with_max_details(Some(2));
        let scraper = HeyenScraper::new(config, &fetcher);

        assert_eq!(scraper.collect_links().await.len(), 2);
    }

    #[tokio::test]
    async fn test_scrape_all_records_failures_and_continues() {
        let fetcher = FixturePages::default()
            .with(BUY, r#"<a href="/objekt/1/">A</a><a href="/objekt/2/">B</a><a href="/objekt/3/">C</a>"#)
            .with(
                "https://www.heyen-immobilien.de/objekt/1/",
                &detail_page("Villa am Deich", "H-101"),
            )
            .with(
                "https://www.heyen-immobilien.de/objekt/3/",
                &detail_page("Wohnung in Leer", "H-103"),
            );
        let scraper = HeyenScraper::new(HeyenConfig::default(), &fetcher);

        let outcome = scraper.run().await;

        assert_eq!(outcome.listings.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(
            outcome.failures[0].url,
            "https://www.heyen-immobilien.de/objekt/2/"
        );
        assert_eq!(outcome.listings[0].object_number.as_deref(), Some("H-101"));
        assert_eq!(outcome.listings[1].category, Some(Category::Buy));
    }

    #[tokio::test]
    async fn test_empty_page_is_an_extraction_failure() {
        let url = "https://www.heyen-immobilien.de/objekt/7/";
        let fetcher = FixturePages::default().with(url, "<html><body></body></html>");
        let scraper = HeyenScraper::new(HeyenConfig::default(), &fetcher);
        let link = DetailLink {
            url: Url::parse(url).unwrap(),
            category: Category::Buy,
        };

        let result = scraper.scrape_detail(&link).await;
        assert!(matches!(result, Err(ScraperError::Extraction(_))));
    }
}
