use async_trait::async_trait;

use crate::error::EnrichError;
use crate::record::{
    Category, FieldValue, Record, BAUJAHR, GRUNDSTUECKSFLAECHE, OBJEKTART, PREIS, STANDORT,
    TITEL, WOHNFLAECHE, ZIMMER,
};
use crate::traits::Enricher;

/// 抽出済みフィールドだけから説明文を組み立てる（決定的）
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEnricher;

impl TemplateEnricher {
    pub fn render(record: &Record) -> String {
        let mut sentences = Vec::new();

        if let Some(title) = record.text(TITEL) {
            sentences.push(format!("{}.", title.trim_end_matches('.')));
        }

        let kind = record.text(OBJEKTART).unwrap_or("Immobilie");
        let offer = match record.category() {
            Some(Category::Rent) => " zur Miete",
            Some(Category::Buy) => " zum Kauf",
            None => "",
        };
        let place = record
            .text(STANDORT)
            .map(|s| format!(" in {}", s))
            .unwrap_or_default();
        sentences.push(format!("{}{}{}.", kind, offer, place));

        let facts: Vec<String> = [
            (WOHNFLAECHE, "Wohnfläche"),
            (GRUNDSTUECKSFLAECHE, "Grundstück"),
            (ZIMMER, "Zimmer"),
            (BAUJAHR, "Baujahr"),
        ]
        .iter()
        .filter_map(|(field, label)| record.text(field).map(|v| format!("{}: {}", label, v)))
        .collect();
        if !facts.is_empty() {
            sentences.push(format!("{}.", facts.join(", ")));
        }

        if let Some(FieldValue::Number(price)) = record.get(PREIS) {
            let label = match record.category() {
                Some(Category::Rent) => "Kaltmiete",
                _ => "Kaufpreis",
            };
            sentences.push(format!("{}: {} €.", label, FieldValue::Number(*price)));
        }

        sentences.join(" ")
    }
}

#[async_trait]
impl Enricher for TemplateEnricher {
    async fn describe(&self, record: &Record) -> Result<String, EnrichError> {
        Ok(Self::render(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::KATEGORIE;

    #[test]
    fn test_render_full_record() {
        let record = Record::new()
            .with(TITEL, "Villa am Deich")
            .with(KATEGORIE, "Kaufen")
            .with(OBJEKTART, "Einfamilienhaus")
            .with(STANDORT, "26789 Leer")
            .with(WOHNFLAECHE, "142 m²")
            .with(ZIMMER, "5")
            .with(PREIS, 249000.0);

        assert_eq!(
            TemplateEnricher::render(&record),
            "Villa am Deich. Einfamilienhaus zum Kauf in 26789 Leer. \
             Wohnfläche: 142 m², Zimmer: 5. Kaufpreis: 249000 €."
        );
    }

    #[test]
    fn test_render_sparse_record() {
        let record = Record::new().with(KATEGORIE, "Mieten");
        assert_eq!(TemplateEnricher::render(&record), "Immobilie zur Miete.");
    }

    #[tokio::test]
    async fn test_describe_is_deterministic() {
        let record = Record::new().with(TITEL, "Haus").with(PREIS, 650.0);
        let a = TemplateEnricher.describe(&record).await.unwrap();
        let b = TemplateEnricher.describe(&record).await.unwrap();
        assert_eq!(a, b);
    }
}
