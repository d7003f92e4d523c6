//! Text codec for delimited record files.
//!
//! # Responsibility
//! - Escape and tokenize single lines (`line`).
//! - Convert between cell text and typed values (`value`, `date`).
//!
//! # Invariants
//! - Codec functions are pure; they never touch the filesystem.
//! - Typed parsing never guesses: a value either parses under its declared
//!   type and format or fails.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod date;
pub mod line;
pub mod value;

pub use date::{format_date, parse_date, DateFormat};
pub use line::{escape, parse_line, tokenize, Cell};
pub use value::{format_value, parse_value, Value};

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Date,
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Number => f.write_str("number"),
            Self::Date => f.write_str("date"),
        }
    }
}

/// Codec-level failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Cell text does not parse under its declared type.
    ValueParse { value_type: ValueType, raw: String },
    /// Date format text is not part of the catalogue.
    UnknownDateFormat(String),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValueParse { value_type, raw } => {
                write!(f, "cannot parse `{raw}` as {value_type}")
            }
            Self::UnknownDateFormat(format) => write!(f, "unknown date format `{format}`"),
        }
    }
}

impl Error for CodecError {}
