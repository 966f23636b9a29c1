//! HEYEN Immobilien 関連の型定義

use serde::Serialize;
use url::Url;

use crate::extract::RawListing;
use crate::record::Category;

pub const BASE_URL: &str = "https://www.heyen-immobilien.de";

/// 一覧ページ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub path: String,
    pub category: Category,
}

/// サイト設定
#[derive(Debug, Clone)]
pub struct HeyenConfig {
    pub base_url: String,
    pub listing_pages: Vec<ListingPage>,
    /// 1回の実行で取得する詳細ページの上限
    pub max_details: Option<usize>,
}

impl Default for HeyenConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            listing_pages: vec![
                ListingPage {
                    path: "/kaufangebote/".to_string(),
                    category: Category::Buy,
                },
                ListingPage {
                    path: "/mietangebote/".to_string(),
                    category: Category::Rent,
                },
            ],
            max_details: None,
        }
    }
}

impl HeyenConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_details(mut self, max: Option<usize>) -> Self {
        self.max_details = max;
        self
    }

    pub fn listing_url(&self, page: &ListingPage) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)?.join(&page.path)
    }
}

/// 詳細ページへのリンク（一覧ページ由来の区分付き）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLink {
    pub url: Url,
    pub category: Category,
}

/// 取得に失敗した詳細ページ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPage {
    pub url: String,
    pub error: String,
}

/// 詳細ページの取得結果
#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    pub listings: Vec<RawListing>,
    pub failures: Vec<FailedPage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_urls() {
        let config = HeyenConfig::default();
        let urls: Vec<String> = config
            .listing_pages
            .iter()
            .map(|p| config.listing_url(p).unwrap().to_string())
            .collect();

        assert_eq!(
            urls,
            vec![
                "https://www.heyen-immobilien.de/kaufangebote/",
                "https://www.heyen-immobilien.de/mietangebote/",
            ]
        );
    }
}
