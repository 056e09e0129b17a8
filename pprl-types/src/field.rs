//! Field specifications: the ordered `method:field-name` list that tells
//! the tokenization pipeline which normalization to apply to each column
//! of a raw record and in what order to fold them into the canonical
//! string.

use std::str::FromStr;

use pprl_core::normalize::NormalizationMethod;
use serde::{Deserialize, Serialize};

use crate::error::PprlError;

/// One entry of the configured field list: a source field name and the
/// normalization method applied to its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub method: NormalizationMethod,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, method: NormalizationMethod) -> Self {
        Self {
            name: name.into(),
            method,
        }
    }
}

impl FromStr for FieldSpec {
    type Err = PprlError;

    /// Parses a single `method:field-name` entry, e.g. `name:first_name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (method_str, name) = s.split_once(':').ok_or_else(|| {
            PprlError::ConfigInvalid(format!("field spec '{s}' is not of the form method:field-name"))
        })?;
        let method = match method_str {
            "name" => NormalizationMethod::Name,
            "date" => NormalizationMethod::Date,
            "gender" => NormalizationMethod::Gender,
            "zip" => NormalizationMethod::Zip,
            "none" => NormalizationMethod::None,
            other => {
                return Err(PprlError::ConfigInvalid(format!(
                    "unknown normalization method '{other}' in field spec '{s}'"
                )))
            }
        };
        if name.is_empty() {
            return Err(PprlError::ConfigInvalid(format!(
                "field spec '{s}' has an empty field name"
            )));
        }
        Ok(FieldSpec::new(name, method))
    }
}

/// Parses a comma-separated list of `method:field-name` entries, the shape
/// the field list takes on the command line / in an environment variable.
pub fn parse_field_list(s: &str) -> Result<Vec<FieldSpec>, PprlError> {
    s.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(FieldSpec::from_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_entry() {
        let spec: FieldSpec = "name:first_name".parse().unwrap();
        assert_eq!(spec.name, "first_name");
        assert_eq!(spec.method, NormalizationMethod::Name);
    }

    #[test]
    fn parses_a_comma_separated_list_in_order() {
        let specs = parse_field_list("name:first,name:last,date:dob,zip:postal").unwrap();
        assert_eq!(specs.len(), 4);
        assert_eq!(specs[0].name, "first");
        assert_eq!(specs[2].method, NormalizationMethod::Date);
    }

    #[test]
    fn rejects_unknown_method() {
        assert!("bogus:field".parse::<FieldSpec>().is_err());
    }

    #[test]
    fn rejects_missing_colon() {
        assert!("first_name".parse::<FieldSpec>().is_err());
    }

    #[test]
    fn rejects_empty_field_name() {
        assert!("name:".parse::<FieldSpec>().is_err());
    }
}
