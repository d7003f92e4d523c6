//! Line-level quoting for delimited records.
//!
//! # Invariants
//! - `escape` is the exact inverse of the quote-aware tokenizer.
//! - A record never spans physical lines; the caller splits lines first.

/// Quote character used for escaping.
pub const QUOTE: char = '"';

/// One tokenized cell: the raw text as it appeared on the line, plus its
/// decoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell<'a> {
    pub raw: &'a str,
    pub value: String,
}

/// Returns `true` when `value` must be quoted to survive a round trip.
pub fn needs_quoting(value: &str, delimiter: char) -> bool {
    value
        .chars()
        .any(|c| c == delimiter || c == QUOTE || c == '\n' || c == '\r')
}

/// Escapes one value for writing.
///
/// Wraps in quotes and doubles internal quotes iff the value contains the
/// delimiter, a quote or a newline; otherwise the value is returned as is.
pub fn escape(value: &str, delimiter: char) -> String {
    if !needs_quoting(value, delimiter) {
        return value.to_string();
    }

    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push(QUOTE);
    for c in value.chars() {
        if c == QUOTE {
            escaped.push(QUOTE);
        }
        escaped.push(c);
    }
    escaped.push(QUOTE);
    escaped
}

/// Splits one physical line into decoded cell values.
pub fn parse_line(line: &str, delimiter: char) -> Vec<String> {
    tokenize(line, delimiter)
        .into_iter()
        .map(|cell| cell.value)
        .collect()
}

/// Splits one physical line into cells, keeping the raw slice of each cell.
///
/// A quote toggles the "inside quotes" state, except a doubled quote inside
/// quotes, which is emitted literally. The delimiter only splits outside
/// quotes. An empty line yields a single empty cell.
pub fn tokenize(line: &str, delimiter: char) -> Vec<Cell<'_>> {
    let mut cells = Vec::new();
    let mut value = String::new();
    let mut in_quotes = false;
    let mut start = 0;
    let mut chars = line.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if c == QUOTE {
            if in_quotes && matches!(chars.peek(), Some((_, next)) if *next == QUOTE) {
                value.push(QUOTE);
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            cells.push(Cell {
                raw: &line[start..index],
                value: std::mem::take(&mut value),
            });
            start = index + c.len_utf8();
        } else {
            value.push(c);
        }
    }

    cells.push(Cell {
        raw: &line[start..],
        value,
    });
    cells
}

#[cfg(test)]
mod tests {
    use super::{escape, parse_line, tokenize};

    #[test]
    fn escape_leaves_plain_values_untouched() {
        assert_eq!(escape("coffee", ','), "coffee");
        assert_eq!(escape("", ','), "");
        assert_eq!(escape("a;b", ','), "a;b");
    }

    #[test]
    fn escape_quotes_delimiter_quote_and_newline() {
        assert_eq!(escape("a,b", ','), "\"a,b\"");
        assert_eq!(escape("say \"hi\"", ','), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("two\nlines", ','), "\"two\nlines\"");
        assert_eq!(escape("a;b", ';'), "\"a;b\"");
    }

    #[test]
    fn parse_line_splits_outside_quotes_only() {
        assert_eq!(
            parse_line("1,\"a,b\",c", ','),
            vec!["1".to_string(), "a,b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn parse_line_collapses_doubled_quotes() {
        assert_eq!(
            parse_line("\"say \"\"hi\"\"\",x", ','),
            vec!["say \"hi\"".to_string(), "x".to_string()]
        );
    }

    #[test]
    fn parse_line_keeps_empty_cells() {
        assert_eq!(parse_line(",,", ','), vec![String::new(); 3]);
        assert_eq!(parse_line("\"\",a", ','), vec![String::new(), "a".to_string()]);
        assert_eq!(parse_line("", ','), vec![String::new()]);
    }

    #[test]
    fn escape_round_trips_through_parse_line() {
        let samples = [
            ",", "\"", "\n", ",\"", "\"\"", "a,\"b\"\nc", "\",\n", "trailing\"", "\"leading",
        ];
        for sample in samples {
            let parsed = parse_line(&escape(sample, ','), ',');
            assert_eq!(parsed.len(), 1, "sample {sample:?}");
            assert_eq!(parsed[0], sample);
        }
    }

    #[test]
    fn tokenize_exposes_raw_cell_text() {
        let cells = tokenize("1,\"x\",\"a,b\"", ',');
        let raw: Vec<&str> = cells.iter().map(|cell| cell.raw).collect();
        assert_eq!(raw, vec!["1", "\"x\"", "\"a,b\""]);
        assert_eq!(cells[1].value, "x");
    }

    #[test]
    fn tokenize_handles_multibyte_delimiter_neighbours() {
        let cells = tokenize("café|naïve", '|');
        assert_eq!(cells[0].raw, "café");
        assert_eq!(cells[1].value, "naïve");
    }
}
