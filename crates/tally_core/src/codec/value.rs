//! Typed cell values.

use super::{CodecError, DateFormat, ValueType};
use chrono::NaiveDate;
use std::fmt::{Display, Formatter};

/// A typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Number(_) => ValueType::Number,
            Self::Date(_) => ValueType::Date,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(value) => Some(*value),
            _ => None,
        }
    }

    /// Converts a caller-supplied value into `value_type`.
    ///
    /// Strings are parsed with the declared type and format, so `"01"` for a
    /// number field becomes `Number(1.0)`. Numbers and dates convert to
    /// strings through their formatted text. Number <-> date conversions fail.
    pub fn coerce(self, value_type: ValueType, format: DateFormat) -> Result<Self, CodecError> {
        if self.value_type() == value_type {
            return Ok(self);
        }
        match (self, value_type) {
            (Self::String(raw), target) => parse_value(&raw, target, format),
            (other, ValueType::String) => Ok(Self::String(format_value(&other, format))),
            (other, target) => Err(CodecError::ValueParse {
                value_type: target,
                raw: format_value(&other, format),
            }),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_value(self, DateFormat::IsoDate))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

/// Parses cell text under the declared type.
///
/// Strings pass through unchanged. Numbers are trimmed and must parse to a
/// finite float. Dates must match `format` exactly.
pub fn parse_value(raw: &str, value_type: ValueType, format: DateFormat) -> Result<Value, CodecError> {
    let parse_error = || CodecError::ValueParse {
        value_type,
        raw: raw.to_string(),
    };

    match value_type {
        ValueType::String => Ok(Value::String(raw.to_string())),
        ValueType::Number => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .map(Value::Number)
            .ok_or_else(parse_error),
        ValueType::Date => format.parse(raw).map(Value::Date).ok_or_else(parse_error),
    }
}

/// Formats a value as unescaped cell text. Inverse of [`parse_value`].
pub fn format_value(value: &Value, format: DateFormat) -> String {
    match value {
        Value::String(value) => value.clone(),
        Value::Number(value) => value.to_string(),
        Value::Date(value) => format.format(*value),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_value, parse_value, Value};
    use crate::codec::{CodecError, DateFormat, ValueType};
    use chrono::NaiveDate;

    #[test]
    fn numbers_parse_as_floats_and_format_without_trailing_zero() {
        let value = parse_value("5000", ValueType::Number, DateFormat::DEFAULT).unwrap();
        assert_eq!(value, Value::Number(5000.0));
        assert_eq!(format_value(&value, DateFormat::DEFAULT), "5000");
        assert_eq!(format_value(&Value::Number(2.5), DateFormat::DEFAULT), "2.5");
        assert_eq!(
            parse_value(" 01 ", ValueType::Number, DateFormat::DEFAULT).unwrap(),
            Value::Number(1.0)
        );
    }

    #[test]
    fn non_numbers_fail_with_value_parse() {
        for raw in ["", "abc", "12abc", "NaN", "inf"] {
            let err = parse_value(raw, ValueType::Number, DateFormat::DEFAULT).unwrap_err();
            assert!(
                matches!(err, CodecError::ValueParse { value_type: ValueType::Number, .. }),
                "{raw}"
            );
        }
    }

    #[test]
    fn strings_pass_through_verbatim() {
        assert_eq!(
            parse_value(" padded ", ValueType::String, DateFormat::DEFAULT).unwrap(),
            Value::String(" padded ".to_string())
        );
    }

    #[test]
    fn dates_use_the_declared_format() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            parse_value("2024-01-01", ValueType::Date, DateFormat::IsoDate).unwrap(),
            Value::Date(date)
        );
        assert!(parse_value("2024-01-01", ValueType::Date, DateFormat::DEFAULT).is_err());
        assert_eq!(format_value(&Value::Date(date), DateFormat::DEFAULT), "01/01/2024");
    }

    #[test]
    fn coerce_parses_strings_into_the_target_type() {
        let coerced = Value::from("01")
            .coerce(ValueType::Number, DateFormat::DEFAULT)
            .unwrap();
        assert_eq!(coerced, Value::Number(1.0));

        let coerced = Value::from(7.0)
            .coerce(ValueType::String, DateFormat::DEFAULT)
            .unwrap();
        assert_eq!(coerced, Value::from("7"));
    }

    #[test]
    fn coerce_rejects_number_to_date() {
        let err = Value::from(3.0)
            .coerce(ValueType::Date, DateFormat::IsoDate)
            .unwrap_err();
        assert!(matches!(err, CodecError::ValueParse { value_type: ValueType::Date, .. }));
    }
}
