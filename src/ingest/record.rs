//! Schema validation of inbound quote frames
//!
//! Each frame is a JSON object `{"id": <non-negative integer>, "value": <number>}`.
//! Other fields are ignored.

use serde_json::Value;

use super::error::RecordError;
use crate::math::MAX_SAFE_INTEGER;

/// Default upper bound for accepted values
pub const DEFAULT_MAX_VALUE: f64 = 1e6;

/// One validated observation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quote {
    /// Monotonic sequence number
    pub id: u64,
    /// Observed value, finite and within `[0, max_value]`
    pub value: f64,
}

/// Parse and validate a raw frame
///
/// # Example
///
/// ```
/// use quotestats::ingest::parse_quote;
///
/// let quote = parse_quote(r#"{"id": 7, "value": 12.5}"#, 1e6).unwrap();
/// assert_eq!(quote.id, 7);
/// assert_eq!(quote.value, 12.5);
///
/// assert!(parse_quote(r#"{"id": -1, "value": 1}"#, 1e6).is_err());
/// ```
pub fn parse_quote(text: &str, max_value: f64) -> Result<Quote, RecordError> {
    let record: Value = serde_json::from_str(text)?;
    let Value::Object(fields) = record else {
        return Err(RecordError::NotAnObject);
    };

    let id = fields.get("id").and_then(safe_integer).ok_or(RecordError::InvalidId)?;
    let value = fields
        .get("value")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && (0.0..=max_value).contains(v))
        .ok_or(RecordError::InvalidValue { max: max_value })?;

    Ok(Quote { id, value })
}

/// Integral JSON number in `[0, 2^53 - 1]`, whether written as `5` or `5.0`
fn safe_integer(value: &Value) -> Option<u64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(id) = number.as_u64() {
        return (id <= MAX_SAFE_INTEGER).then_some(id);
    }

    let id = number.as_f64()?;
    (id.is_finite() && id >= 0.0 && id.fract() == 0.0 && id <= MAX_SAFE_INTEGER as f64)
        .then_some(id as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Quote, RecordError> {
        parse_quote(text, DEFAULT_MAX_VALUE)
    }

    #[test]
    fn test_valid_record() {
        let quote = parse(r#"{"id":1,"value":99.5}"#).unwrap();
        assert_eq!(quote, Quote { id: 1, value: 99.5 });
    }

    #[test]
    fn test_extra_fields_ignored() {
        let quote = parse(r#"{"id":2,"value":3,"ts":"now"}"#).unwrap();
        assert_eq!(quote, Quote { id: 2, value: 3.0 });
    }

    #[test]
    fn test_integral_float_id_accepted() {
        assert_eq!(parse(r#"{"id":5.0,"value":1}"#).unwrap().id, 5);
    }

    #[test]
    fn test_bounds_inclusive() {
        assert!(parse(r#"{"id":0,"value":0}"#).is_ok());
        assert!(parse(r#"{"id":9007199254740991,"value":1000000}"#).is_ok());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse("not json"), Err(RecordError::Json(_))));
        assert!(matches!(parse(r#"{"id":1,"#), Err(RecordError::Json(_))));
    }

    #[test]
    fn test_not_an_object() {
        assert!(matches!(parse("[1, 2]"), Err(RecordError::NotAnObject)));
        assert!(matches!(parse("null"), Err(RecordError::NotAnObject)));
        assert!(matches!(parse("42"), Err(RecordError::NotAnObject)));
    }

    #[test]
    fn test_invalid_ids() {
        for text in [
            r#"{"value":1}"#,
            r#"{"id":-1,"value":1}"#,
            r#"{"id":1.5,"value":1}"#,
            r#"{"id":"1","value":1}"#,
            r#"{"id":null,"value":1}"#,
            r#"{"id":9007199254740992,"value":1}"#,
            r#"{"id":1e300,"value":1}"#,
        ] {
            assert!(matches!(parse(text), Err(RecordError::InvalidId)), "{}", text);
        }
    }

    #[test]
    fn test_invalid_values() {
        for text in [
            r#"{"id":1}"#,
            r#"{"id":1,"value":-0.01}"#,
            r#"{"id":1,"value":1000000.5}"#,
            r#"{"id":1,"value":"3"}"#,
            r#"{"id":1,"value":true}"#,
        ] {
            assert!(
                matches!(parse(text), Err(RecordError::InvalidValue { .. })),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_custom_max_value() {
        assert!(parse_quote(r#"{"id":1,"value":150}"#, 100.0).is_err());
        assert!(parse_quote(r#"{"id":1,"value":50}"#, 100.0).is_ok());
    }
}
