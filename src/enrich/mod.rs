//! 説明文の補完
//!
//! 説明文を抽出できなかった物件に対し、
//! 1. キャッシュ（前回同期済みの説明文）があればそれを使う
//! 2. なければ生成器で作る
//! 3. 生成に失敗したらテンプレートで作る
//!
//! 一度生成された文はリモートに保存され、次回はキャッシュから返るので
//! 同期は実行を重ねても揺れない。

mod cache;
mod openai;
mod template;

use serde::Serialize;
use tracing::{debug, warn};

use crate::record::{Record, BESCHREIBUNG, WEBSEITE};
use crate::traits::Enricher;

pub use cache::DescriptionCache;
pub use openai::{OpenAiEnricher, DEFAULT_MODEL};
pub use template::TemplateEnricher;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichStats {
    pub cached: usize,
    pub generated: usize,
    pub fallback: usize,
}

pub async fn enrich_descriptions(
    records: &mut [Record],
    cache: &DescriptionCache,
    enricher: &dyn Enricher,
) -> EnrichStats {
    let mut stats = EnrichStats::default();

    for record in records.iter_mut() {
        if record.text(BESCHREIBUNG).is_some() {
            continue;
        }

        let cached = cache.lookup(record).map(str::to_string);
        if let Some(text) = cached {
            record.set(BESCHREIBUNG, text);
            stats.cached += 1;
            continue;
        }

        match enricher.describe(record).await {
            Ok(text) => {
                debug!(url = record.text(WEBSEITE).unwrap_or_default(), "Generated description");
                record.set(BESCHREIBUNG, text);
                stats.generated += 1;
            }
            Err(e) => {
                warn!(
                    url = record.text(WEBSEITE).unwrap_or_default(),
                    error = %e,
                    "Description generation failed, using template"
                );
                record.set(BESCHREIBUNG, TemplateEnricher::render(record));
                stats.fallback += 1;
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::EnrichError;
    use crate::record::{OBJEKTNUMMER, TITEL};
    use crate::store::{RemoteId, RemoteRow};

    struct Failing;

    #[async_trait]
    impl Enricher for Failing {
        async fn describe(&self, _record: &Record) -> Result<String, EnrichError> {
            Err(EnrichError::Api("quota".into()))
        }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl Enricher for Fixed {
        async fn describe(&self, _record: &Record) -> Result<String, EnrichError> {
            Ok(self.0.to_string())
        }
    }

    fn cache() -> DescriptionCache {
        DescriptionCache::from_rows(&[RemoteRow {
            id: RemoteId::new("rec1"),
            fields: Record::new()
                .with(OBJEKTNUMMER, "1")
                .with(BESCHREIBUNG, "Gespeicherter Text"),
        }])
    }

    #[tokio::test]
    async fn test_existing_description_is_kept() {
        let mut records = vec![Record::new().with(OBJEKTNUMMER, "1").with(BESCHREIBUNG, "Original")];
        let stats = enrich_descriptions(&mut records, &cache(), &Fixed("neu")).await;

        assert_eq!(stats, EnrichStats::default());
        assert_eq!(records[0].text(BESCHREIBUNG), Some("Original"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_generation() {
        let mut records = vec![Record::new().with(OBJEKTNUMMER, "1")];
        let stats = enrich_descriptions(&mut records, &cache(), &Fixed("neu")).await;

        assert_eq!(stats.cached, 1);
        assert_eq!(stats.generated, 0);
        assert_eq!(records[0].text(BESCHREIBUNG), Some("Gespeicherter Text"));
    }

    #[tokio::test]
    async fn test_generation_and_fallback() {
        let mut records = vec![Record::new().with(OBJEKTNUMMER, "2").with(TITEL, "Haus")];
        let stats = enrich_descriptions(&mut records, &cache(), &Fixed("Generiert")).await;
        assert_eq!(stats.generated, 1);
        assert_eq!(records[0].text(BESCHREIBUNG), Some("Generiert"));

        let mut records = vec![Record::new().with(OBJEKTNUMMER, "3").with(TITEL, "Haus")];
        let stats = enrich_descriptions(&mut records, &cache(), &Failing).await;
        assert_eq!(stats.fallback, 1);
        assert_eq!(records[0].text(BESCHREIBUNG), Some("Haus. Immobilie."));
    }
}
