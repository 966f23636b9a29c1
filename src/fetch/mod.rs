//! ページ取得
//!
//! - `HttpFetcher`: reqwest による静的HTML取得（通常経路）
//! - `BrowserFetcher`: chromiumoxide によるヘッドレス描画（フォールバック）

mod browser;
mod http;

pub use browser::{BrowserFetcher, BrowserOptions, LazyBrowserFetcher};
pub use http::HttpFetcher;
