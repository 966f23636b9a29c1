//! 抽出結果を正規化されたレコードへ変換する

use crate::extract::text::{normalize_whitespace, parse_german_number};
use crate::extract::RawListing;
use crate::record::{
    Record, ALLE_BILDER, ANZAHL_BILDER, BAUJAHR, BESCHREIBUNG, BILD, GRUNDSTUECKSFLAECHE,
    KATEGORIE, OBJEKTART, OBJEKTNUMMER, PREIS, STANDORT, TITEL, WEBSEITE, WOHNFLAECHE, ZIMMER,
};

/// 価格表記を数値に（`€249.000` → 249000.0）
pub fn parse_price(price: &str) -> Option<f64> {
    parse_german_number(price)
}

/// 正規化
///
/// 空の値は出力に含めない。説明文だけは段落区切りを残す。
pub fn normalize(raw: &RawListing) -> Record {
    let mut record = Record::new();

    set_text(&mut record, TITEL, &raw.title);
    set_text(&mut record, OBJEKTNUMMER, &raw.object_number);
    set_text(&mut record, STANDORT, &raw.location);
    set_text(&mut record, WOHNFLAECHE, &raw.living_area);
    set_text(&mut record, GRUNDSTUECKSFLAECHE, &raw.plot_area);
    set_text(&mut record, ZIMMER, &raw.rooms);
    set_text(&mut record, BAUJAHR, &raw.year_built);
    set_text(&mut record, OBJEKTART, &raw.property_type);

    record.set(WEBSEITE, raw.url.trim());
    if let Some(category) = raw.category {
        record.set(KATEGORIE, category.as_str());
    }
    if let Some(price) = raw.price.as_deref().and_then(parse_price) {
        record.set(PREIS, price);
    }
    if let Some(description) = &raw.description {
        record.set(BESCHREIBUNG, description.trim());
    }

    let images: Vec<&str> = raw
        .images
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if let Some(first) = images.first() {
        record.set(BILD, *first);
        record.set(ALLE_BILDER, images.join(", "));
        record.set(ANZAHL_BILDER, images.len());
    }

    record
}

fn set_text(record: &mut Record, name: &str, value: &Option<String>) {
    if let Some(v) = value {
        record.set(name, normalize_whitespace(v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Category, FieldValue};

    fn raw() -> RawListing {
        RawListing {
            url: "https://www.heyen-immobilien.de/objekt/villa/".into(),
            title: Some("  Villa \n am  Deich ".into()),
            object_number: Some("HE-1".into()),
            category: Some(Category::Buy),
            price: Some("€249.000".into()),
            location: Some("26789 Leer".into()),
            description: Some("Absatz eins.\n\nAbsatz zwei.".into()),
            images: vec!["https://h/a.jpg".into(), "https://h/b.jpg".into()],
            rooms: Some("".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("€249.000"), Some(249000.0));
        assert_eq!(parse_price("1.250,50 €"), Some(1250.5));
        assert_eq!(parse_price("Preis auf Anfrage"), None);
    }

    #[test]
    fn test_normalize_fields() {
        let record = normalize(&raw());

        assert_eq!(record.text(TITEL), Some("Villa am Deich"));
        assert_eq!(record.text(KATEGORIE), Some("Kaufen"));
        assert_eq!(record.get(PREIS), Some(&FieldValue::Number(249000.0)));
        assert_eq!(record.text(BILD), Some("https://h/a.jpg"));
        assert_eq!(record.text(ALLE_BILDER), Some("https://h/a.jpg, https://h/b.jpg"));
        assert_eq!(record.get(ANZAHL_BILDER), Some(&FieldValue::Number(2.0)));
        assert_eq!(record.text(BESCHREIBUNG), Some("Absatz eins.\n\nAbsatz zwei."));
    }

    #[test]
    fn test_empty_values_are_absent() {
        let record = normalize(&raw());
        assert!(!record.contains(ZIMMER));
        assert!(!record.contains(WOHNFLAECHE));
    }

    #[test]
    fn test_no_images_means_no_image_fields() {
        let mut listing = raw();
        listing.images.clear();
        let record = normalize(&listing);
        assert!(!record.contains(BILD));
        assert!(!record.contains(ANZAHL_BILDER));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        assert_eq!(normalize(&raw()), normalize(&raw()));
    }
}
