// happiness-core/src/domain/naming.rs
//
// Column-name rules shared by the cleaner and the reconciler.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn re_camel_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([a-z0-9])([A-Z])").unwrap_or_else(|_| {
            // Hardcoded pattern, cannot fail at runtime.
            Regex::new("$^").unwrap_or_else(|_| unreachable!())
        })
    })
}

fn re_non_alnum() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[^0-9A-Za-z]+")
            .unwrap_or_else(|_| Regex::new("$^").unwrap_or_else(|_| unreachable!()))
    })
}

fn re_non_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[^\w]+")
            .unwrap_or_else(|_| Regex::new("$^").unwrap_or_else(|_| unreachable!()))
    })
}

fn re_underscores() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"_+").unwrap_or_else(|_| Regex::new("$^").unwrap_or_else(|_| unreachable!()))
    })
}

/// Bronze-side snake casing.
///
/// Splits camelCase, turns every run of non-alphanumeric characters into a
/// single underscore and lowercases the result:
/// `"Country name" -> "country_name"`, `"regionalIndicator" -> "regional_indicator"`,
/// `"Dystopia + residual" -> "dystopia_residual"`.
pub fn to_snake_case(name: &str) -> String {
    let trimmed = name.trim();
    let split = re_camel_boundary().replace_all(trimmed, "${1}_${2}");
    let replaced = re_non_alnum().replace_all(&split, "_");
    let collapsed = re_underscores().replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_lowercase()
}

/// Silver-side normalisation used to compare column names across tables.
///
/// Lowercases first (no camelCase splitting) and keeps any Unicode word
/// character, so `"Log GDP per capita"` and `"log_gdp_per_capita"` compare equal.
pub fn normalise(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let replaced = re_non_word().replace_all(&lowered, "_");
    let collapsed = re_underscores().replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

/// Maps normalised names to the first original column carrying them.
pub fn normalised_map<'a, I>(columns: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut mapping = HashMap::new();
    for column in columns {
        mapping
            .entry(normalise(column))
            .or_insert_with(|| column.to_string());
    }
    mapping
}

/// Quote an identifier for the SQL engine (`"name"`, inner quotes doubled).
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for the SQL engine (`'value'`, inner quotes doubled).
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Humanise a snake_case column for display (`ladder_score -> Ladder Score`).
pub fn label(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
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
    fn test_snake_case_world_happiness_headers() {
        assert_eq!(to_snake_case("Country name"), "country_name");
        assert_eq!(to_snake_case("Life Ladder"), "life_ladder");
        assert_eq!(to_snake_case("Log GDP per capita"), "log_gdp_per_capita");
        assert_eq!(
            to_snake_case("Explained by: Log GDP per capita"),
            "explained_by_log_gdp_per_capita"
        );
        assert_eq!(to_snake_case("Dystopia + residual"), "dystopia_residual");
        assert_eq!(to_snake_case("  upperwhisker "), "upperwhisker");
    }

    #[test]
    fn test_snake_case_splits_camel_case() {
        assert_eq!(to_snake_case("regionalIndicator"), "regional_indicator");
        assert_eq!(to_snake_case("countryName2021"), "country_name2021");
    }

    #[test]
    fn test_normalise_does_not_split_camel_case() {
        assert_eq!(normalise("Regional Indicator"), "regional_indicator");
        assert_eq!(normalise("regionalIndicator"), "regionalindicator");
        assert_eq!(normalise("__year__"), "year");
    }

    #[test]
    fn test_normalised_map_keeps_first_occurrence() {
        let map = normalised_map(["Year", "year", "Country name"]);
        assert_eq!(map.get("year").map(String::as_str), Some("Year"));
        assert_eq!(
            map.get("country_name").map(String::as_str),
            Some("Country name")
        );
    }

    #[test]
    fn test_quoting_escapes_inner_quotes() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_literal("Cote d'Ivoire"), "'Cote d''Ivoire'");
    }

    #[test]
    fn test_label() {
        assert_eq!(label("logged_gdp_per_capita"), "Logged Gdp Per Capita");
        assert_eq!(label("year"), "Year");
    }
}
