//! Fixed catalogue of textual date formats.
//!
//! # Invariants
//! - Parsing is anchored and fixed-width; a string either matches a format
//!   exactly or fails. There is no format guessing.
//! - Calendar-invalid dates (`31/02/2024`) fail even when the pattern matches.
//! - Two-digit years map into 2000-2099.
//!
//! # Limitations
//! - Formatting is lossy outside the range a pattern can express: `YY`
//!   keeps only `year % 100` (1999 reads back as 2099) and `YYYY` years
//!   beyond 9999 or below 0 produce text that no pattern parses.

use super::{CodecError, ValueType};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "June", "July", "Aug", "Sept", "Oct", "Nov", "Dec",
];

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    DateFormat::ALL
        .iter()
        .map(|format| Regex::new(&pattern_regex(format.pattern())).expect("valid date regex"))
        .collect()
});

/// Supported date layouts, named after their pattern text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateFormat {
    /// `DD/MM/YYYY`
    DaySlashMonthSlashYear,
    /// `MM/DD/YY`
    MonthSlashDaySlashShortYear,
    /// `DD.MM.YYYY`
    DayDotMonthDotYear,
    /// `MM.DD.YYYY`
    MonthDotDayDotYear,
    /// `DD-MM-YYYY`
    DayDashMonthDashYear,
    /// `YYYY/MM/DD`
    YearSlashMonthSlashDay,
    /// `YYYY-MM-DD`
    IsoDate,
    /// `DD/MM/YY`
    DaySlashMonthSlashShortYear,
    /// `DD Mon, YYYY`
    DayMonthNameYear,
}

impl DateFormat {
    /// Format used by date fields that do not declare one.
    pub const DEFAULT: Self = Self::DaySlashMonthSlashYear;

    pub const ALL: [Self; 9] = [
        Self::DaySlashMonthSlashYear,
        Self::MonthSlashDaySlashShortYear,
        Self::DayDotMonthDotYear,
        Self::MonthDotDayDotYear,
        Self::DayDashMonthDashYear,
        Self::YearSlashMonthSlashDay,
        Self::IsoDate,
        Self::DaySlashMonthSlashShortYear,
        Self::DayMonthNameYear,
    ];

    /// Pattern text, e.g. `YYYY-MM-DD`.
    pub const fn pattern(self) -> &'static str {
        match self {
            Self::DaySlashMonthSlashYear => "DD/MM/YYYY",
            Self::MonthSlashDaySlashShortYear => "MM/DD/YY",
            Self::DayDotMonthDotYear => "DD.MM.YYYY",
            Self::MonthDotDayDotYear => "MM.DD.YYYY",
            Self::DayDashMonthDashYear => "DD-MM-YYYY",
            Self::YearSlashMonthSlashDay => "YYYY/MM/DD",
            Self::IsoDate => "YYYY-MM-DD",
            Self::DaySlashMonthSlashShortYear => "DD/MM/YY",
            Self::DayMonthNameYear => "DD Mon, YYYY",
        }
    }

    /// Parses `text` against this format. Returns `None` on any mismatch.
    pub fn parse(self, text: &str) -> Option<NaiveDate> {
        let captures = DATE_PATTERNS[self as usize].captures(text)?;
        let day: u32 = captures.name("day")?.as_str().parse().ok()?;
        let month: u32 = match captures.name("month") {
            Some(month) => month.as_str().parse().ok()?,
            None => {
                let name = captures.name("month_name")?.as_str();
                let index = MONTH_NAMES.iter().position(|candidate| *candidate == name)?;
                u32::try_from(index).ok()? + 1
            }
        };
        let year_text = captures.name("year")?.as_str();
        let mut year: i32 = year_text.parse().ok()?;
        if year_text.len() == 2 {
            year += 2000;
        }
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// Renders `date` by substituting the pattern tokens with zero-padded
    /// components.
    pub fn format(self, date: NaiveDate) -> String {
        let mut out = String::with_capacity(self.pattern().len() + 2);
        for token in tokens(self.pattern()) {
            match token {
                Token::Year => out.push_str(&format!("{:04}", date.year())),
                Token::ShortYear => out.push_str(&format!("{:02}", date.year().rem_euclid(100))),
                Token::Month => out.push_str(&format!("{:02}", date.month())),
                Token::MonthName => out.push_str(MONTH_NAMES[date.month0() as usize]),
                Token::Day => out.push_str(&format!("{:02}", date.day())),
                Token::Literal(c) => out.push(c),
            }
        }
        out
    }
}

impl Display for DateFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.pattern())
    }
}

impl FromStr for DateFormat {
    type Err = CodecError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.pattern() == value)
            .ok_or_else(|| CodecError::UnknownDateFormat(value.to_string()))
    }
}

/// Parses `text` with a format given by its pattern text.
pub fn parse_date(text: &str, format: &str) -> Result<NaiveDate, CodecError> {
    let format = DateFormat::from_str(format)?;
    format.parse(text).ok_or_else(|| CodecError::ValueParse {
        value_type: ValueType::Date,
        raw: text.to_string(),
    })
}

/// Formats `date` with a format given by its pattern text.
pub fn format_date(date: NaiveDate, format: &str) -> Result<String, CodecError> {
    Ok(DateFormat::from_str(format)?.format(date))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Year,
    ShortYear,
    Month,
    MonthName,
    Day,
    Literal(char),
}

fn tokens(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = pattern;
    while let Some(c) = rest.chars().next() {
        let (token, width) = if rest.starts_with("YYYY") {
            (Token::Year, 4)
        } else if rest.starts_with("YY") {
            (Token::ShortYear, 2)
        } else if rest.starts_with("MM") {
            (Token::Month, 2)
        } else if rest.starts_with("Mon") {
            (Token::MonthName, 3)
        } else if rest.starts_with("DD") {
            (Token::Day, 2)
        } else {
            (Token::Literal(c), c.len_utf8())
        };
        tokens.push(token);
        rest = &rest[width..];
    }
    tokens
}

fn pattern_regex(pattern: &str) -> String {
    let mut regex = String::from("^");
    for token in tokens(pattern) {
        match token {
            Token::Year => regex.push_str(r"(?P<year>\d{4})"),
            Token::ShortYear => regex.push_str(r"(?P<year>\d{2})"),
            Token::Month => regex.push_str("(?P<month>0[1-9]|1[0-2])"),
            Token::MonthName => {
                regex.push_str("(?P<month_name>");
                regex.push_str(&MONTH_NAMES.join("|"));
                regex.push(')');
            }
            Token::Day => regex.push_str("(?P<day>0[1-9]|[12][0-9]|3[01])"),
            Token::Literal(c) => regex.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::{format_date, parse_date, DateFormat};
    use crate::codec::CodecError;
    use chrono::NaiveDate;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn parses_every_catalogue_format() {
        let cases = [
            ("DD/MM/YYYY", "20/04/2020"),
            ("MM/DD/YY", "04/20/20"),
            ("DD.MM.YYYY", "20.04.2020"),
            ("MM.DD.YYYY", "04.20.2020"),
            ("DD-MM-YYYY", "20-04-2020"),
            ("YYYY/MM/DD", "2020/04/20"),
            ("YYYY-MM-DD", "2020-04-20"),
            ("DD/MM/YY", "20/04/20"),
            ("DD Mon, YYYY", "20 Apr, 2020"),
        ];
        for (format, text) in cases {
            assert_eq!(parse_date(text, format).unwrap(), ymd(2020, 4, 20), "{format}");
        }
    }

    #[test]
    fn format_substitutes_zero_padded_components() {
        assert_eq!(DateFormat::IsoDate.format(ymd(2024, 1, 5)), "2024-01-05");
        assert_eq!(
            DateFormat::MonthSlashDaySlashShortYear.format(ymd(2009, 12, 3)),
            "12/03/09"
        );
        assert_eq!(
            DateFormat::DayMonthNameYear.format(ymd(2024, 9, 1)),
            "01 Sept, 2024"
        );
    }

    #[test]
    fn format_then_parse_is_identity_for_each_format() {
        let date = ymd(2031, 7, 9);
        for format in DateFormat::ALL {
            assert_eq!(format.parse(&format.format(date)), Some(date), "{format}");
        }
    }

    #[test]
    fn rejects_non_matching_text() {
        assert!(DateFormat::IsoDate.parse("2024-1-05").is_none());
        assert!(DateFormat::IsoDate.parse("2024-13-01").is_none());
        assert!(DateFormat::IsoDate.parse(" 2024-01-01").is_none());
        assert!(DateFormat::DaySlashMonthSlashYear.parse("2024-01-01").is_none());
        assert!(DateFormat::DayMonthNameYear.parse("01 April, 2024").is_none());
    }

    #[test]
    fn out_of_range_years_do_not_round_trip() {
        let short = DateFormat::DaySlashMonthSlashShortYear;
        assert_eq!(short.format(ymd(1999, 3, 4)), "04/03/99");
        assert_eq!(short.parse("04/03/99"), Some(ymd(2099, 3, 4)));

        let far = DateFormat::IsoDate.format(ymd(10000, 1, 1));
        assert_eq!(far, "10000-01-01");
        assert!(DateFormat::IsoDate.parse(&far).is_none());
    }

    #[test]
    fn rejects_calendar_invalid_dates() {
        assert!(DateFormat::DaySlashMonthSlashYear.parse("31/02/2024").is_none());
        assert!(DateFormat::DaySlashMonthSlashYear.parse("29/02/2024").is_some());
    }

    #[test]
    fn unknown_format_is_an_error_not_a_guess() {
        let err = parse_date("2024-01-01", "YYYYMMDD").unwrap_err();
        assert!(matches!(err, CodecError::UnknownDateFormat(ref f) if f == "YYYYMMDD"));
        assert!(format_date(ymd(2024, 1, 1), "D/M/Y").is_err());
    }
}
