//! Canonical names for the three folder levels.
//!
//! Every lookup is keyed by the trimmed, lowercased, whitespace-collapsed input;
//! a second attempt drops punctuation so `U.S.A.` finds the `usa` entry. Inputs
//! missing from the tables fall back to title case, and blank input becomes
//! [`UNKNOWN`]. Every canonical value is also a key of its own table, which is
//! what makes normalizing twice a no-op.

use crate::models::{Classification, NormalizedLocation, UNKNOWN};

type AliasTable = &'static [(&'static str, &'static str)];

const CONTINENTS: AliasTable = &[
    ("africa", "Africa"),
    ("antarctica", "Antarctica"),
    ("asia", "Asia"),
    ("middle east", "Asia"),
    ("europe", "Europe"),
    ("europa", "Europe"),
    ("north america", "North America"),
    ("northam", "North America"),
    ("central america", "North America"),
    ("caribbean", "North America"),
    ("america do norte", "North America"),
    ("américa do norte", "North America"),
    ("south america", "South America"),
    ("latam", "South America"),
    ("latin america", "South America"),
    ("america do sul", "South America"),
    ("américa do sul", "South America"),
    ("sudamerica", "South America"),
    ("sudamérica", "South America"),
    ("oceania", "Oceania"),
    ("australasia", "Oceania"),
    ("other", "Other"),
];

const COUNTRIES: AliasTable = &[
    ("united states", "United States"),
    ("usa", "United States"),
    ("us", "United States"),
    ("estados unidos", "United States"),
    ("america", "United States"),
    ("united states of america", "United States"),
    ("united kingdom", "United Kingdom"),
    ("uk", "United Kingdom"),
    ("england", "United Kingdom"),
    ("britain", "United Kingdom"),
    ("great britain", "United Kingdom"),
    ("brazil", "Brazil"),
    ("brasil", "Brazil"),
    ("argentina", "Argentina"),
    ("chile", "Chile"),
    ("spain", "Spain"),
    ("espanha", "Spain"),
    ("españa", "Spain"),
    ("espana", "Spain"),
    ("china", "China"),
    ("hong kong", "China"),
    ("south korea", "South Korea"),
    ("korea", "South Korea"),
    ("republic of korea", "South Korea"),
    ("japan", "Japan"),
    ("thailand", "Thailand"),
    ("india", "India"),
    ("switzerland", "Switzerland"),
    ("suisse", "Switzerland"),
    ("schweiz", "Switzerland"),
    ("netherlands", "Netherlands"),
    ("nederland", "Netherlands"),
    ("holland", "Netherlands"),
    ("the netherlands", "Netherlands"),
    ("united arab emirates", "United Arab Emirates"),
    ("uae", "United Arab Emirates"),
    ("emirates", "United Arab Emirates"),
    ("dubai", "United Arab Emirates"),
    ("germany", "Germany"),
    ("deutschland", "Germany"),
    ("alemanha", "Germany"),
    ("france", "France"),
    ("frança", "France"),
    ("italy", "Italy"),
    ("italia", "Italy"),
    ("itália", "Italy"),
    ("mexico", "Mexico"),
    ("méxico", "Mexico"),
    ("peru", "Peru"),
    ("perú", "Peru"),
    ("portugal", "Portugal"),
];

const CITIES: AliasTable = &[
    ("rio de janeiro", "Rio de Janeiro"),
    ("rio", "Rio de Janeiro"),
    ("são paulo", "São Paulo"),
    ("sao paulo", "São Paulo"),
    ("new york", "New York"),
    ("new york city", "New York"),
    ("nyc", "New York"),
    ("washington", "Washington"),
    ("washington dc", "Washington"),
    ("mumbai", "Mumbai"),
    ("bombay", "Mumbai"),
    ("beijing", "Beijing"),
    ("peking", "Beijing"),
    ("ho chi minh city", "Ho Chi Minh City"),
    ("saigon", "Ho Chi Minh City"),
    ("mexico city", "Mexico City"),
    ("ciudad de méxico", "Mexico City"),
    ("cidade do méxico", "Mexico City"),
    ("cidade do mexico", "Mexico City"),
    ("buenos aires", "Buenos Aires"),
    ("hong kong", "Hong Kong"),
    ("kuala lumpur", "Kuala Lumpur"),
    ("lisboa", "Lisbon"),
    ("lisbon", "Lisbon"),
    ("londres", "London"),
    ("london", "London"),
];

pub fn normalize_continent(raw: &str) -> String {
    normalize_with(CONTINENTS, raw)
}

pub fn normalize_country(raw: &str) -> String {
    normalize_with(COUNTRIES, raw)
}

pub fn normalize_city(raw: &str) -> String {
    normalize_with(CITIES, raw)
}

pub fn normalize_location(classification: &Classification) -> NormalizedLocation {
    let field = |value: &Option<String>, normalize: fn(&str) -> String| {
        value.as_deref().map(normalize).unwrap_or_else(|| UNKNOWN.to_string())
    };

    NormalizedLocation {
        continent: field(&classification.continent, normalize_continent),
        country: field(&classification.country, normalize_country),
        city: field(&classification.city, normalize_city),
    }
}

fn normalize_with(table: AliasTable, raw: &str) -> String {
    if lookup_key(raw).is_empty() {
        return UNKNOWN.to_string();
    }
    if let Some(canonical) = lookup(table, raw) {
        return canonical.to_string();
    }

    // Case mapping can turn an unknown spelling into a known one
    // ("ıtalia" -> "Italia"), so the title-cased form is looked up as well.
    let titled = title_case(raw);
    match lookup(table, &titled) {
        Some(canonical) => canonical.to_string(),
        None => titled,
    }
}

/// Exact key first, then the key without punctuation.
fn lookup(table: AliasTable, raw: &str) -> Option<&'static str> {
    let key = lookup_key(raw);
    if let Some(canonical) = find(table, &key) {
        return Some(canonical);
    }
    let stripped = strip_punctuation(&key);
    if stripped.is_empty() {
        return None;
    }
    find(table, &stripped)
}

fn find(table: AliasTable, key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| *canonical)
}

fn lookup_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn strip_punctuation(key: &str) -> String {
    key.chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut upper = first.to_uppercase();
                    let head = match (upper.next(), upper.next()) {
                        (Some(single), None) => single,
                        _ => first,
                    };
                    std::iter::once(head)
                        .chain(chars.as_str().to_lowercase().chars())
                        .collect::<String>()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brasil_example_resolves_to_canonical_names() {
        let location = normalize_location(&Classification::new(
            "South America",
            "Brasil",
            "Rio de Janeiro",
        ));
        assert_eq!(location.continent, "South America");
        assert_eq!(location.country, "Brazil");
        assert_eq!(location.city, "Rio de Janeiro");
    }

    #[test]
    fn aliases_ignore_case_whitespace_and_punctuation() {
        assert_eq!(normalize_country("  U.S.A. "), "United States");
        assert_eq!(normalize_country("u.k."), "United Kingdom");
        assert_eq!(normalize_country("HOLLAND"), "Netherlands");
        assert_eq!(normalize_continent("LATAM"), "South America");
        assert_eq!(normalize_continent("NORTHAM"), "North America");
        assert_eq!(normalize_city("new   york  city"), "New York");
    }

    #[test]
    fn unmapped_names_are_title_cased() {
        assert_eq!(normalize_country("new zealand"), "New Zealand");
        assert_eq!(normalize_city("QUEENSTOWN"), "Queenstown");
        assert_eq!(normalize_city("são luís"), "São Luís");
    }

    #[test]
    fn missing_and_blank_fields_become_unknown() {
        let location = normalize_location(&Classification {
            continent: Some("Europe".to_string()),
            country: Some("   ".to_string()),
            city: None,
        });
        assert_eq!(location.country, UNKNOWN);
        assert_eq!(location.city, UNKNOWN);
    }

    #[test]
    fn normalization_is_total_and_non_empty() {
        let inputs = [
            "", " ", "\t\n", "usa", "Brasil", "ß", "İstanbul", "---", "東京", "a/b", "..",
            "\u{200b}", "x",
        ];
        for input in inputs {
            for normalize in [normalize_continent, normalize_country, normalize_city] {
                assert!(!normalize(input).is_empty(), "empty output for {input:?}");
            }
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            "", "usa", "U.S.", "brasil", "Rio de Janeiro", "rio", "saigon", "latam",
            "new zealand", "ßanta", "İstanbul", "san josé", "  mIxEd   CaSe ", "東京",
            "ıtalia", "ſpain", "ǆakarta",
        ];
        for input in inputs {
            for normalize in [normalize_continent, normalize_country, normalize_city] {
                let once = normalize(input);
                assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
            }
        }
    }

    #[test]
    fn case_mapped_spelling_reaches_its_alias() {
        assert_eq!(normalize_country("ıtalia"), "Italy");
        assert_eq!(normalize_country("Italia"), "Italy");
    }

    #[test]
    fn canonical_values_map_to_themselves() {
        for table in [CONTINENTS, COUNTRIES, CITIES] {
            for (_, canonical) in table {
                assert_eq!(normalize_with(table, canonical), *canonical);
            }
        }
    }
}
