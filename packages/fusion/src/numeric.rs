//! Shared coercion helpers for loosely-typed upstream fields.
//!
//! Every extractor goes through these functions so that "absent" and
//! "zero" stay distinct: a value that is missing, non-numeric or
//! non-finite is `None`, never `0.0`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Factor strings the upstream scorers emit when they have nothing to say.
const PLACEHOLDER_FACTORS: &[&str] = &["—", "-", "n/a", "na", "none", "null"];

static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?[0-9]+(?:\.[0-9]+)?)[ \t]*%").unwrap_or_else(|_| unreachable!())
});

/// Parses a JSON value into a finite `f64`.
///
/// Accepts numbers and numeric strings (surrounding whitespace, a trailing
/// `%` and thousands separators are tolerated). Booleans, nulls, objects
/// and anything non-finite yield `None`.
#[must_use]
pub fn finite_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s.trim().trim_end_matches('%').replace(',', "");
            cleaned.trim().parse::<f64>().ok()
        }
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Reads `record[key]` as a finite number.
#[must_use]
pub fn number_field(record: &Value, key: &str) -> Option<f64> {
    record.get(key).and_then(finite_number)
}

/// Reads the first of `keys` present on `record` as a finite number.
#[must_use]
pub fn first_number_field(record: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| number_field(record, key))
}

/// Reads `array[index]` as a finite number.
#[must_use]
pub fn indexed_number(array: Option<&Value>, index: usize) -> Option<f64> {
    array
        .and_then(Value::as_array)
        .and_then(|items| items.get(index))
        .and_then(finite_number)
}

/// Reads `record[key]` as non-empty, trimmed text.
#[must_use]
pub fn text_field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Reads a qualitative factor line, discarding upstream placeholders.
#[must_use]
pub fn factor_field(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| text_field(record, key))
        .find(|s| !is_placeholder(s))
        .map(String::from)
}

/// Returns `true` for factor text that carries no information.
#[must_use]
pub fn is_placeholder(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered.is_empty() || PLACEHOLDER_FACTORS.contains(&lowered.as_str())
}

/// Extracts the first percentage embedded in free text, e.g. the `42.5`
/// in `"Outbreak Risk: 42.5%"`.
#[must_use]
pub fn embedded_percent(text: &str) -> Option<f64> {
    PERCENT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Mean of the present values, `None` when nothing contributed.
#[must_use]
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0_u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// Sum of the present values, `None` when nothing contributed.
#[must_use]
pub fn total(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values
        .into_iter()
        .fold(None, |acc: Option<f64>, v| Some(acc.unwrap_or(0.0) + v))
}

/// Formats a non-negative amount with `,` thousands separators and the
/// given number of decimals.
#[must_use]
pub fn with_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = formatted
        .split_once('.')
        .map_or((formatted.as_str(), None), |(i, f)| (i, Some(f)));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    frac_part.map_or_else(
        || format!("{sign}{grouped}"),
        |frac| format!("{sign}{grouped}.{frac}"),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_numbers_and_numeric_strings() {
        assert_eq!(finite_number(&json!(4.5)), Some(4.5));
        assert_eq!(finite_number(&json!(" 12 ")), Some(12.0));
        assert_eq!(finite_number(&json!("87.5%")), Some(87.5));
        assert_eq!(finite_number(&json!("1,250")), Some(1250.0));
    }

    #[test]
    fn rejects_non_numeric_values() {
        assert_eq!(finite_number(&json!(null)), None);
        assert_eq!(finite_number(&json!(true)), None);
        assert_eq!(finite_number(&json!("abc")), None);
        assert_eq!(finite_number(&json!("NaN")), None);
        assert_eq!(finite_number(&json!("inf")), None);
        assert_eq!(finite_number(&json!({ "v": 1 })), None);
    }

    #[test]
    fn zero_is_present_not_absent() {
        assert_eq!(number_field(&json!({ "hotspots": 0 }), "hotspots"), Some(0.0));
        assert_eq!(number_field(&json!({}), "hotspots"), None);
    }

    #[test]
    fn reads_indexed_metrics() {
        let record = json!({ "metrics": [41.2, "63", null] });
        assert_eq!(indexed_number(record.get("metrics"), 0), Some(41.2));
        assert_eq!(indexed_number(record.get("metrics"), 1), Some(63.0));
        assert_eq!(indexed_number(record.get("metrics"), 2), None);
        assert_eq!(indexed_number(record.get("metrics"), 7), None);
        assert_eq!(indexed_number(None, 0), None);
    }

    #[test]
    fn discards_placeholder_factors() {
        let record = json!({ "top_factor": "—", "top_factor_line": "NH-48 (Urgency: 91%)" });
        assert_eq!(
            factor_field(&record, &["top_factor", "top_factor_line"]).as_deref(),
            Some("NH-48 (Urgency: 91%)")
        );
        assert_eq!(factor_field(&json!({ "top_factor": "N/A" }), &["top_factor"]), None);
    }

    #[test]
    fn extracts_embedded_percent() {
        assert_eq!(embedded_percent("Outbreak Risk: 42.5%"), Some(42.5));
        assert_eq!(embedded_percent("Risk 90 %"), Some(90.0));
        assert_eq!(embedded_percent("no figure here"), None);
    }

    #[test]
    fn mean_and_total_distinguish_empty() {
        assert_eq!(mean([2.0, 4.0]), Some(3.0));
        assert_eq!(mean(std::iter::empty()), None);
        assert_eq!(total([0.0]), Some(0.0));
        assert_eq!(total(std::iter::empty()), None);
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(with_thousands(1_234_567.0, 0), "1,234,567");
        assert_eq!(with_thousands(999.0, 0), "999");
        assert_eq!(with_thousands(12_345.678, 2), "12,345.68");
        assert_eq!(with_thousands(0.0, 0), "0");
    }
}
