//! HTML 構造に対する抽出（セレクタ・リンク・画像）
//!
//! `scraper::Html` は Send ではないため、ここの関数はすべて同期で完結させ、
//! 呼び出し側の await をまたいで保持しない。

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::text::normalize_whitespace;

const TITLE_SELECTORS: [&str; 4] = ["h1", "h2", ".title", ".property-title"];
const TITLE_MIN_CHARS: usize = 5;

const DETAIL_HINTS: [&str; 4] = ["objekt", "detail", "expose", "immobilie"];
const CARD_CLASS_HINTS: [&str; 5] = ["property", "immobilie", "objekt", "listing", "card"];

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];
const IMAGE_SKIP: [&str; 3] = ["logo", "icon", "favicon"];

const DESCRIPTION_MIN_CHARS: usize = 50;
const DESCRIPTION_MAX_PARAGRAPHS: usize = 5;
const DESCRIPTION_SKIP: [&str; 3] = ["cookie", "datenschutz", "impressum"];

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(el: &ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// テキストノードを改行区切りで連結（script/style/noscript は除外）
pub fn page_text(document: &Html) -> String {
    let mut lines = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name()))
            .map(|name| matches!(name, "script" | "style" | "noscript"))
            .unwrap_or(false);
        if hidden {
            continue;
        }
        let line = text.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    lines.join("\n")
}

/// 見出し候補を順に見て、十分な長さの最初のもの
pub fn title(document: &Html) -> Option<String> {
    let mut fallback = None;
    for css in TITLE_SELECTORS {
        let Some(sel) = selector(css) else { continue };
        if let Some(el) = document.select(&sel).next() {
            let text = element_text(&el);
            if text.chars().count() > TITLE_MIN_CHARS {
                return Some(text);
            }
            if fallback.is_none() && !text.is_empty() {
                fallback = Some(text);
            }
        }
    }
    fallback
}

/// 相対URLを絶対化し、フラグメントを落とす
pub fn absolutize(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }
    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// 一覧ページから物件詳細ページへのリンクを集める（出現順・重複なし）
///
/// 1. href に詳細ページらしい語を含むリンク
/// 2. 物件カードらしい class を持つ要素内の最初のリンク
pub fn detail_links(document: &Html, page_url: &Url) -> Vec<Url> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();
    let mut push = |url: Url| {
        if url.host_str() != page_url.host_str() || url.path() == page_url.path() {
            return;
        }
        if seen.insert(url.to_string()) {
            links.push(url);
        }
    };

    if let Some(anchors) = selector("a[href]") {
        for a in document.select(&anchors) {
            let href = a.value().attr("href").unwrap_or_default();
            let lower = href.to_lowercase();
            if DETAIL_HINTS.iter().any(|hint| lower.contains(hint)) {
                if let Some(url) = absolutize(page_url, href) {
                    push(url);
                }
            }
        }
    }

    if let (Some(classed), Some(anchors)) = (selector("[class]"), selector("a[href]")) {
        for card in document.select(&classed) {
            let class = card.value().attr("class").unwrap_or_default().to_lowercase();
            if !CARD_CLASS_HINTS.iter().any(|hint| class.contains(hint)) {
                continue;
            }
            let href = card
                .select(&anchors)
                .next()
                .and_then(|a| a.value().attr("href"));
            if let Some(url) = href.and_then(|h| absolutize(page_url, h)) {
                push(url);
            }
        }
    }

    links
}

/// 物件写真のURL（ロゴ・アイコンを除く）
pub fn images(document: &Html, page_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let Some(sel) = selector("img") else {
        return out;
    };

    for img in document.select(&sel) {
        let src = img
            .value()
            .attr("src")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| img.value().attr("data-src"))
            .unwrap_or_default();
        let lower = src.to_lowercase();
        if src.is_empty() || IMAGE_SKIP.iter().any(|skip| lower.contains(skip)) {
            continue;
        }
        if !IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
            continue;
        }
        if let Some(url) = absolutize(page_url, src) {
            let url = url.to_string();
            if seen.insert(url.clone()) {
                out.push(url);
            }
        }
    }
    out
}

/// 本文らしい段落を最大5つ、空行区切りで
pub fn description(document: &Html) -> Option<String> {
    let sel = selector("p")?;
    let parts: Vec<String> = document
        .select(&sel)
        .map(|p| element_text(&p))
        .filter(|text| {
            let lower = text.to_lowercase();
            text.chars().count() > DESCRIPTION_MIN_CHARS
                && !DESCRIPTION_SKIP.iter().any(|skip| lower.contains(skip))
        })
        .take(DESCRIPTION_MAX_PARAGRAPHS)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <nav><a href="/kaufangebote/">Kaufen</a> <a href="/kontakt/">Kontakt</a></nav>
          <div class="property-card">
            <a href="/angebot/haus-am-deich/">Haus am Deich</a>
          </div>
          <a href="/objekt/villa-leer/">Villa</a>
          <a href="/objekt/villa-leer/#galerie">Villa Galerie</a>
          <a href="https://www.example.org/objekt/fremd/">Fremd</a>
          <a href="mailto:info@heyen-immobilien.de">Mail</a>
        </body></html>
    "#;

    const DETAIL: &str = r#"
        <html><head><style>.x { color: red }</style></head><body>
          <h1>Top</h1>
          <h2>Modernisiertes Einfamilienhaus in Leer</h2>
          <img src="/wp-content/uploads/logo.png">
          <img src="/wp-content/uploads/haus-1.jpg">
          <img data-src="/wp-content/uploads/haus-2.webp">
          <img src="/wp-content/uploads/haus-1.jpg">
          <img src="/wp-content/uploads/grundriss.pdf">
          <p>Kurz.</p>
          <p>Dieses gepflegte Einfamilienhaus überzeugt durch seine ruhige Lage am Stadtrand.</p>
          <p>Wir verwenden Cookies, um Ihnen das beste Erlebnis auf unserer Webseite zu bieten.</p>
          <script>var objekt = "nicht im Text";</script>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://www.heyen-immobilien.de/kaufangebote/").unwrap()
    }

    #[test]
    fn test_detail_links() {
        let doc = Html::parse_document(LISTING);
        let links: Vec<String> = detail_links(&doc, &base())
            .into_iter()
            .map(|u| u.to_string())
            .collect();

        assert_eq!(
            links,
            vec![
                "https://www.heyen-immobilien.de/objekt/villa-leer/".to_string(),
                "https://www.heyen-immobilien.de/angebot/haus-am-deich/".to_string(),
            ]
        );
    }

    #[test]
    fn test_title_prefers_long_heading() {
        let doc = Html::parse_document(DETAIL);
        assert_eq!(
            title(&doc).as_deref(),
            Some("Modernisiertes Einfamilienhaus in Leer")
        );
    }

    #[test]
    fn test_title_falls_back_to_short_heading() {
        let doc = Html::parse_document("<h1>Haus</h1>");
        assert_eq!(title(&doc).as_deref(), Some("Haus"));
    }

    #[test]
    fn test_images_filtered_and_deduplicated() {
        let doc = Html::parse_document(DETAIL);
        let url = Url::parse("https://www.heyen-immobilien.de/objekt/villa-leer/").unwrap();
        assert_eq!(
            images(&doc, &url),
            vec![
                "https://www.heyen-immobilien.de/wp-content/uploads/haus-1.jpg".to_string(),
                "https://www.heyen-immobilien.de/wp-content/uploads/haus-2.webp".to_string(),
            ]
        );
    }

    #[test]
    fn test_description_skips_short_and_boilerplate() {
        let doc = Html::parse_document(DETAIL);
        assert_eq!(
            description(&doc).as_deref(),
            Some("Dieses gepflegte Einfamilienhaus überzeugt durch seine ruhige Lage am Stadtrand.")
        );
    }

    #[test]
    fn test_page_text_ignores_scripts() {
        let doc = Html::parse_document(DETAIL);
        let text = page_text(&doc);
        assert!(text.contains("Modernisiertes Einfamilienhaus in Leer"));
        assert!(!text.contains("nicht im Text"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn test_absolutize() {
        let base = base();
        assert_eq!(
            absolutize(&base, "../objekt/1/#top").map(|u| u.to_string()),
            Some("https://www.heyen-immobilien.de/objekt/1/".to_string())
        );
        assert!(absolutize(&base, "#").is_none());
        assert!(absolutize(&base, "tel:0491123").is_none());
    }
}
