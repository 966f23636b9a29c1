//! HEYEN Immobilien（heyen-immobilien.de）の物件スクレイパー

mod scraper;
mod types;

pub use scraper::HeyenScraper;
pub use types::{DetailLink, FailedPage, HeyenConfig, ListingPage, ScrapeOutcome, BASE_URL};
