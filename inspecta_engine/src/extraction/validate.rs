//! Type validation of resolved parameter values.

use inspecta_core::{BoundValue, ParameterSpec, ValueType};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("`{value}` is not a number")]
    InvalidNumber { value: String },

    #[error("`{value}` is not a date (YYYY-MM-DD, YYYY-MM or YYYY/MM/DD)")]
    InvalidDate { value: String },

    #[error("`{value}` is not one of the declared values")]
    NotAllowed { value: String },
}

#[expect(clippy::unwrap_used, reason = "Static regex is verified by tests")]
static FULL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})$").unwrap());

#[expect(clippy::unwrap_used, reason = "Static regex is verified by tests")]
static YEAR_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").unwrap());

/// Check `raw` against the parameter's value type and convert it to a bindable value.
pub fn validate(spec: &ParameterSpec, raw: &str) -> Result<BoundValue, ParameterError> {
    let value = raw.trim();
    match spec.value_type {
        ValueType::String => Ok(BoundValue::Text(value.to_string())),
        ValueType::Number => value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(BoundValue::Number)
            .ok_or_else(|| ParameterError::InvalidNumber {
                value: value.to_string(),
            }),
        ValueType::Date => normalize_date(value)
            .map(BoundValue::Text)
            .ok_or_else(|| ParameterError::InvalidDate {
                value: value.to_string(),
            }),
        ValueType::Enum => match spec.kind.allowed_values() {
            Some(allowed) if !allowed.iter().any(|v| v == value) => {
                Err(ParameterError::NotAllowed {
                    value: value.to_string(),
                })
            }
            _ => Ok(BoundValue::Text(value.to_string())),
        },
    }
}

/// Normalize a date to zero-padded `YYYY-MM-DD` or `YYYY-MM`.
#[must_use]
pub fn normalize_date(value: &str) -> Option<String> {
    if let Some(caps) = FULL_DATE.captures(value) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        let date = chrono::NaiveDate::from_ymd_opt(year, month, day)?;
        return Some(date.format("%Y-%m-%d").to_string());
    }

    let caps = YEAR_MONTH.captures(value)?;
    let month: u32 = caps[2].parse().ok()?;
    (1..=12)
        .contains(&month)
        .then(|| format!("{}-{month:02}", &caps[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_are_normalized() {
        assert_eq!(normalize_date("2024-3-5").as_deref(), Some("2024-03-05"));
        assert_eq!(normalize_date("2024/12/31").as_deref(), Some("2024-12-31"));
        assert_eq!(normalize_date("2024-07").as_deref(), Some("2024-07"));
        assert_eq!(normalize_date("2024-02-30"), None);
        assert_eq!(normalize_date("2024-13"), None);
        assert_eq!(normalize_date("昨天"), None);
    }

    #[test]
    fn numbers_must_parse() {
        let spec = ParameterSpec::regex("qty", r"(\d+)").with_type(ValueType::Number);
        assert_eq!(validate(&spec, "120"), Ok(BoundValue::Number(120.0)));
        assert!(matches!(
            validate(&spec, "many"),
            Err(ParameterError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn enum_values_must_be_declared() {
        let spec = ParameterSpec::enumeration("result", ["合格", "不合格"]);
        assert_eq!(
            validate(&spec, "合格"),
            Ok(BoundValue::Text("合格".to_string()))
        );
        assert_eq!(
            validate(&spec, "待定"),
            Err(ParameterError::NotAllowed {
                value: "待定".to_string()
            })
        );
    }
}
