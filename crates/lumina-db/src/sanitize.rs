//! Text and number hygiene applied at the storage boundary.
//!
//! Validation already bounds lengths and cardinalities; this layer deals
//! with the residue that is legal JSON but bad row data: control
//! characters, free-form currency labels, out-of-range numbers.

/// Strip control characters (except tab and newline) and trim whitespace.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\t' || *c == '\n')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Canonicalize a currency label to a 3-letter ISO code.
///
/// Dollar-sign spellings collapse to `USD`; plausible ISO codes pass
/// through uppercased; anything else defaults to `USD`, which is the only
/// market the extraction prompts ask about.
#[must_use]
pub fn normalize_currency(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "USD".to_string();
    };
    let trimmed = raw.trim();
    match trimmed {
        "$" | "US$" | "us$" => return "USD".to_string(),
        _ => {}
    }
    if trimmed.eq_ignore_ascii_case("dollars") || trimmed.eq_ignore_ascii_case("usd") {
        return "USD".to_string();
    }
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return trimmed.to_ascii_uppercase();
    }
    "USD".to_string()
}

/// Clamp a value into `[min, max]`, tolerating NaN by pinning to `min`.
#[must_use]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// Spec-key-safe rendering of an editorial outlet name: lowercase, runs of
/// non-alphanumerics collapsed to single underscores.
#[must_use]
pub fn quote_spec_key(outlet: &str) -> String {
    let mut key = String::with_capacity(outlet.len());
    let mut last_was_sep = true;
    for c in outlet.chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            key.push('_');
            last_was_sep = true;
        }
    }
    key.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_control_chars_but_keeps_structure() {
        assert_eq!(clean_text("good\u{0001} product"), "good product");
        assert_eq!(clean_text("  line one\nline two\t!  "), "line one\nline two\t!");
    }

    #[test]
    fn dollar_spellings_normalize_to_usd() {
        assert_eq!(normalize_currency(Some("$")), "USD");
        assert_eq!(normalize_currency(Some("US$")), "USD");
        assert_eq!(normalize_currency(Some("Dollars")), "USD");
        assert_eq!(normalize_currency(Some("usd")), "USD");
    }

    #[test]
    fn iso_codes_pass_through_uppercased() {
        assert_eq!(normalize_currency(Some("eur")), "EUR");
        assert_eq!(normalize_currency(Some("GBP")), "GBP");
    }

    #[test]
    fn unknown_currency_defaults_to_usd() {
        assert_eq!(normalize_currency(Some("around twenty bucks")), "USD");
        assert_eq!(normalize_currency(None), "USD");
    }

    #[test]
    fn clamp_pins_nan_to_min() {
        assert!((clamp(f64::NAN, 0.0, 5.0)).abs() < f64::EPSILON);
        assert!((clamp(9.9, 0.0, 5.0) - 5.0).abs() < f64::EPSILON);
        assert!((clamp(-1.0, 0.0, 5.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn quote_spec_key_collapses_separators() {
        assert_eq!(quote_spec_key("Allure"), "allure");
        assert_eq!(quote_spec_key("Harper's Bazaar"), "harper_s_bazaar");
        assert_eq!(quote_spec_key("Women's Health UK "), "women_s_health_uk");
    }
}
