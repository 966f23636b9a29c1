//! 物件ページからのフィールド抽出
//!
//! 各フィールドは独立した戦略関数（`html` / `text`）で取り出し、
//! `parse_detail` がそれらを組み合わせて `RawListing` を作る。
//! 見つからないフィールドは `None` のままで、レコード全体は失敗させない。

pub mod html;
pub mod text;

use scraper::Html;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::record::Category;

/// 抽出直後の生データ（正規化前）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub url: String,
    pub title: Option<String>,
    pub object_number: Option<String>,
    pub category: Option<Category>,
    /// ページ上の価格表記（例: `249.000`, `485,50`）
    pub price: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub living_area: Option<String>,
    pub plot_area: Option<String>,
    pub rooms: Option<String>,
    pub year_built: Option<String>,
    pub property_type: Option<String>,
}

/// 詳細ページを解析する
///
/// `category_hint` は一覧ページ（Kauf/Miete）由来の区分で、本文の推定より優先する。
pub fn parse_detail(body: &str, page_url: &Url, category_hint: Option<Category>) -> RawListing {
    let document = Html::parse_document(body);
    let page_text = html::page_text(&document);
    let url = page_url.to_string();

    RawListing {
        title: html::title(&document),
        object_number: text::object_number(&page_text),
        category: Some(category_hint.unwrap_or_else(|| text::category(&url, &page_text))),
        price: text::price_text(&page_text),
        location: text::location(&page_text),
        description: html::description(&document),
        images: html::images(&document, page_url),
        living_area: text::living_area(&page_text),
        plot_area: text::plot_area(&page_text),
        rooms: text::rooms(&page_text),
        year_built: text::year_built(&page_text),
        property_type: text::property_type(&page_text),
        url,
    }
}

/// 一覧ページ中の詳細リンク
pub fn parse_listing_links(body: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(body);
    html::detail_links(&document, page_url)
}
