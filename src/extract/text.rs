//! ページ本文（テキスト）に対する正規表現ベースの抽出

use std::sync::LazyLock;

use regex::Regex;

use crate::record::Category;

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static RE_OBJECT_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:Objekt[\s.\-]*Nr|ImmoNr|Objektnummer|ID)\b[.:\s\-]+([A-Za-z0-9][\w\-/]*)")
        .unwrap()
});

static RE_PRICES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    ["Kaufpreis", "Kaltmiete", "Preis"].map(|label| {
        Regex::new(&format!(r"(?i){}[:\s]+(?:ca\.\s*)?€?\s*([\d.,]+)\s*€?", label)).unwrap()
    })
});

static RE_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{5})[ \t]+([A-ZÄÖÜ][a-zäöüß]+(?:[ \-/][A-ZÄÖÜa-zäöüß][a-zäöüß]+)*)").unwrap()
});

static RE_RENT_WORDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:zu\s+vermieten|zur\s+miete|miete|kaltmiete)\b").unwrap()
});

static RE_LIVING_AREA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Wohnfläche|Wfl\.)[:\s]+(?:ca\.\s*)?([\d.,]+)\s*m²").unwrap()
});

static RE_PLOT_AREA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Grundstück(?:sfläche|sgröße)?[:\s]+(?:ca\.\s*)?([\d.,]+)\s*m²").unwrap()
});

static RE_ROOMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Zimmer(?:anzahl)?[:\s]+(\d+(?:[.,]5)?)\b|\b(\d+(?:[.,]5)?)\s*Zimmer)").unwrap()
});

static RE_YEAR_BUILT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Baujahr[:\s]+(?:ca\.\s*)?(\d{4})\b").unwrap());

static RE_PROPERTY_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Objektart|Immobilienart|Objekttyp)[:\s]+([^\n:]{2,40})").unwrap()
});

/// 価格として認める下限（「3 Zimmer」などの誤検出を除く）
const MIN_PRICE: f64 = 100.0;

/// 連続する空白を1つにまとめて前後を除去
pub fn normalize_whitespace(s: &str) -> String {
    RE_WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// ドイツ式の数値表記（`250.000,50`）を数値にする
pub fn parse_german_number(s: &str) -> Option<f64> {
    let clean: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !clean.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    clean.replace('.', "").replace(',', ".").parse().ok()
}

pub fn object_number(text: &str) -> Option<String> {
    RE_OBJECT_NUMBER
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
}

/// 価格ラベルの順（Kaufpreis → Kaltmiete → Preis）に探し、最初の妥当な価格表記
///
/// ページ上の表記（`485,50`）をそのまま返す。数値化は正規化で一度だけ行う。
pub fn price_text(text: &str) -> Option<String> {
    RE_PRICES.iter().find_map(|re| {
        re.captures_iter(text)
            .map(|caps| caps[1].to_string())
            .find(|raw| parse_german_number(raw).is_some_and(|value| value > MIN_PRICE))
    })
}

pub fn price(text: &str) -> Option<f64> {
    price_text(text).and_then(|raw| parse_german_number(&raw))
}

/// `PLZ Ort`
pub fn location(text: &str) -> Option<String> {
    RE_LOCATION
        .captures(text)
        .map(|caps| format!("{} {}", &caps[1], normalize_whitespace(&caps[2])))
}

/// URL か本文に賃貸を示す表現があれば Mieten
pub fn category(url: &str, text: &str) -> Category {
    if url.to_lowercase().contains("mietangebote") || RE_RENT_WORDING.is_match(text) {
        Category::Rent
    } else {
        Category::Buy
    }
}

pub fn living_area(text: &str) -> Option<String> {
    RE_LIVING_AREA
        .captures(text)
        .map(|caps| format!("{} m²", &caps[1]))
}

pub fn plot_area(text: &str) -> Option<String> {
    RE_PLOT_AREA
        .captures(text)
        .map(|caps| format!("{} m²", &caps[1]))
}

pub fn rooms(text: &str) -> Option<String> {
    RE_ROOMS.captures(text).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    })
}

pub fn year_built(text: &str) -> Option<String> {
    RE_YEAR_BUILT.captures(text).map(|caps| caps[1].to_string())
}

pub fn property_type(text: &str) -> Option<String> {
    RE_PROPERTY_TYPE
        .captures(text)
        .map(|caps| normalize_whitespace(&caps[1]))
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "Einfamilienhaus mit Garten\n\
        Objekt-Nr.: HE-4711\n\
        Kaufpreis:\n\
        249.000 €\n\
        26789 Leer\n\
        Wohnfläche: ca. 142,5 m²\n\
        Grundstücksfläche: 780 m²\n\
        Zimmer: 5\n\
        Baujahr: 1978\n\
        Objektart\nEinfamilienhaus";

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
    }

    #[test]
    fn test_parse_german_number() {
        assert_eq!(parse_german_number("249.000"), Some(249000.0));
        assert_eq!(parse_german_number("€ 1.250,50"), Some(1250.5));
        assert_eq!(parse_german_number("850"), Some(850.0));
        assert_eq!(parse_german_number("auf Anfrage"), None);
        assert_eq!(parse_german_number(""), None);
    }

    #[test]
    fn test_object_number() {
        assert_eq!(object_number(PAGE).as_deref(), Some("HE-4711"));
        assert_eq!(object_number("ImmoNr: 123").as_deref(), Some("123"));
        assert_eq!(object_number("Eine idyllische Lage"), None);
    }

    #[test]
    fn test_price_label_priority_and_minimum() {
        assert_eq!(price(PAGE), Some(249000.0));
        assert_eq!(price("Kaltmiete: 650,00 €\nNebenkosten 120 €"), Some(650.0));
        // 100 以下は価格とみなさない
        assert_eq!(price("Preis: 3"), None);
        assert_eq!(price("Preis: 3\nPreis: 1.200"), Some(1200.0));
    }

    #[test]
    fn test_location() {
        assert_eq!(location(PAGE).as_deref(), Some("26789 Leer"));
        assert_eq!(
            location("Lage: 26817 Rhauderfehn-Westrhauderfehn").as_deref(),
            Some("26817 Rhauderfehn-Westrhauderfehn")
        );
        assert_eq!(location("keine Adresse"), None);
    }

    #[test]
    fn test_category() {
        assert_eq!(category("https://h/kaufangebote/x", PAGE), Category::Buy);
        assert_eq!(category("https://h/mietangebote/x", ""), Category::Rent);
        assert_eq!(category("https://h/objekt/1", "Wohnung zur Miete"), Category::Rent);
        assert_eq!(category("https://h/objekt/1", "Mietangebote ansehen"), Category::Buy);
    }

    #[test]
    fn test_areas_rooms_year_type() {
        assert_eq!(living_area(PAGE).as_deref(), Some("142,5 m²"));
        assert_eq!(plot_area(PAGE).as_deref(), Some("780 m²"));
        assert_eq!(rooms(PAGE).as_deref(), Some("5"));
        assert_eq!(rooms("Schöne 3 Zimmer Wohnung").as_deref(), Some("3"));
        assert_eq!(year_built(PAGE).as_deref(), Some("1978"));
        assert_eq!(property_type(PAGE).as_deref(), Some("Einfamilienhaus"));
    }
}
