//! Field normalization: the deterministic cleanup applied to a raw field
//! value before it is split into q-grams, so that both parties produce the
//! same canonical string for "the same" real-world value.

use serde::{Deserialize, Serialize};

/// The normalization strategy applied to a field's raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMethod {
    /// Lowercase, strip anything but `[a-z\s]`, collapse whitespace, trim.
    Name,
    /// Parse against a set of known date formats and re-emit `YYYY-MM-DD`;
    /// falls back to `None` normalization if nothing parses.
    Date,
    /// Map common gender synonyms onto `m`, `f`, `nb`, `o` or `u`.
    Gender,
    /// Keep digits only, left-padded to, then truncated to, 5 characters.
    Zip,
    /// Lowercase and trim, nothing else.
    None,
}

/// Normalizes `raw` per `method`.
pub fn normalize(method: NormalizationMethod, raw: &str) -> String {
    match method {
        NormalizationMethod::Name => normalize_name(raw),
        NormalizationMethod::Date => normalize_date(raw),
        NormalizationMethod::Gender => normalize_gender(raw),
        NormalizationMethod::Zip => normalize_zip(raw),
        NormalizationMethod::None => normalize_none(raw),
    }
}

fn normalize_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let filtered: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_whitespace())
        .collect();
    collapse_whitespace(&filtered).trim().to_owned()
}

// Priority order matters: the first format that parses wins.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%-m/%-d/%Y",
    "%m-%d-%Y",
    "%-m-%-d-%Y",
    "%Y/%m/%d",
    "%Y/%-m/%-d",
    "%m/%d/%y",
    "%-m/%-d/%y",
];

fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, fmt) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    normalize_none(raw)
}

fn normalize_gender(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match lowered.as_str() {
        "m" | "male" | "man" | "boy" => "m".to_owned(),
        "f" | "female" | "woman" | "girl" => "f".to_owned(),
        "nb" | "nonbinary" | "non-binary" | "non binary" | "enby" => "nb".to_owned(),
        "o" | "other" => "o".to_owned(),
        "u" | "unknown" | "unspecified" | "prefer not to say" => "u".to_owned(),
        _ => match lowered.chars().next() {
            Some(c @ ('m' | 'f' | 'o' | 'u')) => c.to_string(),
            _ => "u".to_owned(),
        },
    }
}

fn normalize_zip(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.chars().take(5).collect()
}

fn normalize_none(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// Joins a record's already-normalized field values with `|` into the
/// canonical string that gets tokenized or q-grammed.
pub fn canonical_string(normalized_fields: &[&str]) -> String {
    normalized_fields.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(normalize(NormalizationMethod::Name, "O'Brien-Smith  Jr."), "obriensmith jr");
    }

    #[test]
    fn name_lowercases() {
        assert_eq!(normalize(NormalizationMethod::Name, "JANE"), "jane");
    }

    #[test]
    fn date_parses_multiple_formats_to_iso() {
        assert_eq!(normalize(NormalizationMethod::Date, "1990-01-02"), "1990-01-02");
        assert_eq!(normalize(NormalizationMethod::Date, "01/02/1990"), "1990-01-02");
        assert_eq!(normalize(NormalizationMethod::Date, "1990/01/02"), "1990-01-02");
    }

    #[test]
    fn date_falls_back_on_unparseable_input() {
        assert_eq!(normalize(NormalizationMethod::Date, "  not a date  "), "not a date");
    }

    #[test]
    fn gender_maps_synonyms() {
        assert_eq!(normalize(NormalizationMethod::Gender, "Male"), "m");
        assert_eq!(normalize(NormalizationMethod::Gender, "WOMAN"), "f");
        assert_eq!(normalize(NormalizationMethod::Gender, "non-binary"), "nb");
        assert_eq!(normalize(NormalizationMethod::Gender, ""), "u");
        assert_eq!(normalize(NormalizationMethod::Gender, "alien"), "u");
    }

    #[test]
    fn zip_keeps_digits_and_truncates_to_five() {
        assert_eq!(normalize(NormalizationMethod::Zip, "90210-1234"), "90210");
        assert_eq!(normalize(NormalizationMethod::Zip, "9021"), "9021");
    }

    #[test]
    fn none_lowercases_and_trims() {
        assert_eq!(normalize(NormalizationMethod::None, "  MixedCase  "), "mixedcase");
    }

    #[test]
    fn canonical_string_joins_with_pipe() {
        assert_eq!(canonical_string(&["jane", "doe", "1990-01-02"]), "jane|doe|1990-01-02");
    }
}
