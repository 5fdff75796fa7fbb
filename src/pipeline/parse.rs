//! Delimited-record parsing: raw input bytes → [`RecordSet`].
//!
//! The splitter is RFC 4180-flavoured but deliberately forgiving:
//!
//! - a `"` toggles quoted state anywhere in a field;
//! - inside quotes the delimiter is literal content;
//! - `""` inside quotes is one literal `"` and does not toggle;
//! - end of line always closes the last field, even inside an open quote.
//!
//! A bad line is reported and dropped; it never aborts the load. Lines are
//! decoded individually so one line of invalid UTF-8 costs only that line.

use crate::error::RecordError;
use crate::record::{MalformedLine, Record, RecordSet};
use tracing::{debug, error};

/// Default field delimiter.
pub const DEFAULT_DELIMITER: char = ',';

const QUOTE: char = '"';

/// Parse a full input buffer. The first line is a header and is skipped.
pub fn parse_records(input: &[u8], delimiter: char) -> RecordSet {
    let mut set = RecordSet::default();

    for (idx, raw) in input.split(|&b| b == b'\n').enumerate() {
        let line_no = idx + 1;
        if idx == 0 {
            continue;
        }

        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        match parse_line(raw, line_no, delimiter) {
            Ok(Some(record)) => set.records.push(record),
            Ok(None) => {}
            Err(bad) => {
                error!("{} | content: {:?}", bad.error, bad.content);
                set.malformed.push(bad);
            }
        }
    }

    debug!(
        "Parsed {} records ({} malformed lines dropped)",
        set.records.len(),
        set.malformed.len()
    );
    set
}

/// Convenience wrapper for already-decoded text.
pub fn parse_str(input: &str, delimiter: char) -> RecordSet {
    parse_records(input.as_bytes(), delimiter)
}

/// Parse one data line. `Ok(None)` means the line was blank.
fn parse_line(raw: &[u8], line: usize, delimiter: char) -> Result<Option<Record>, MalformedLine> {
    let text = std::str::from_utf8(raw).map_err(|e| MalformedLine {
        line,
        content: String::from_utf8_lossy(raw).into_owned(),
        error: RecordError::Malformed {
            line,
            reason: format!("invalid UTF-8: {e}"),
        },
    })?;

    if text.trim().is_empty() {
        return Ok(None);
    }

    Record::from_fields(split_line(text, delimiter))
        .map(Some)
        .map_err(|reason| MalformedLine {
            line,
            content: text.to_string(),
            error: RecordError::Malformed { line, reason },
        })
}

/// Split one line into fields using the quoting rules in the module docs.
pub fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == QUOTE {
            if in_quotes && chars.peek() == Some(&QUOTE) {
                current.push(QUOTE);
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields
}

/// Emit a field so that [`split_line`] reads it back unchanged.
///
/// Values containing the delimiter, a quote, or surrounding whitespace are
/// wrapped in quotes with inner quotes doubled.
pub fn quote_field(value: &str, delimiter: char) -> String {
    let needs_quotes = value.contains(delimiter)
        || value.contains(QUOTE)
        || value.contains('\r')
        || value.trim() != value;
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Join fields into one line with [`quote_field`].
pub fn join_line<S: AsRef<str>>(fields: &[S], delimiter: char) -> String {
    fields
        .iter()
        .map(|f| quote_field(f.as_ref(), delimiter))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "name,flight,from,to,date,time,class,seat,barcode";

    #[test]
    fn splits_plain_fields() {
        assert_eq!(split_line("a,b,c", ','), vec!["a", "b", "c"]);
    }

    #[test]
    fn keeps_empty_trailing_field() {
        assert_eq!(split_line("a,b,", ','), vec!["a", "b", ""]);
    }

    #[test]
    fn quoted_delimiter_is_literal() {
        assert_eq!(split_line("\"a,b\",c", ','), vec!["a,b", "c"]);
    }

    #[test]
    fn doubled_quote_is_literal_quote() {
        assert_eq!(
            split_line("\"say \"\"hi\"\"\",x", ','),
            vec!["say \"hi\"", "x"]
        );
    }

    #[test]
    fn quote_mid_field_toggles() {
        assert_eq!(split_line("ab\"c,d\"e,f", ','), vec!["abc,de", "f"]);
    }

    #[test]
    fn unterminated_quote_ends_at_line_end() {
        assert_eq!(split_line("a,\"b,c", ','), vec!["a", "b,c"]);
    }

    #[test]
    fn pipe_delimiter_inside_quotes() {
        let line = "Ada,BA1,LHR,JFK,2025-10-12,08:30,First,1A,\"AA123|JFK|LAX|20251012|0830|12A\"";
        let fields = split_line(line, ',');
        assert_eq!(fields[8], "AA123|JFK|LAX|20251012|0830|12A");

        let piped = "Ada|BA1|LHR|JFK|2025-10-12|08:30|First|1A|\"AA123|JFK|LAX|20251012|0830|12A\"";
        let fields = split_line(piped, '|');
        assert_eq!(fields.len(), 9);
        assert_eq!(fields[8], "AA123|JFK|LAX|20251012|0830|12A");
    }

    #[test]
    fn header_and_blank_lines_are_skipped() {
        let input = format!(
            "{HEADER}\n\n   \nAda,BA1,LHR,JFK,2025-10-12,08:30,First,1A,X\n\n"
        );
        let set = parse_str(&input, ',');
        assert_eq!(set.len(), 1);
        assert!(set.malformed.is_empty());
    }

    #[test]
    fn header_only_yields_empty_set() {
        let set = parse_str(HEADER, ',');
        assert!(set.is_empty());
        assert!(set.malformed.is_empty());
    }

    #[test]
    fn short_line_is_reported_and_excluded() {
        let input = format!(
            "{HEADER}\nAda,BA1,LHR,JFK,2025-10-12,08:30,First,1A,X\nBad,Row,Only,Five,Fields\nBob,BA2,LHR,CDG,2025-10-13,09:00,Economy,22C,Y\n"
        );
        let set = parse_str(&input, ',');
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[0].passenger_name, "Ada");
        assert_eq!(set.records[1].passenger_name, "Bob");
        assert_eq!(set.malformed.len(), 1);
        let bad = &set.malformed[0];
        assert_eq!(bad.line, 3);
        assert_eq!(bad.content, "Bad,Row,Only,Five,Fields");
        assert!(matches!(bad.error, RecordError::Malformed { line: 3, .. }));
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let input = format!("{HEADER}\r\nAda,BA1,LHR,JFK,2025-10-12,08:30,First,1A,X\r\n");
        let set = parse_str(&input, ',');
        assert_eq!(set.records[0].barcode, "X");
    }

    #[test]
    fn invalid_utf8_line_is_isolated() {
        let mut input = format!("{HEADER}\n").into_bytes();
        input.extend_from_slice(b"Bad\xff,1,2,3,4,5,6,7,8\n");
        input.extend_from_slice(b"Ada,BA1,LHR,JFK,2025-10-12,08:30,First,1A,X\n");
        let set = parse_records(&input, ',');
        assert_eq!(set.len(), 1);
        assert_eq!(set.malformed.len(), 1);
        assert_eq!(set.malformed[0].line, 2);
    }

    #[test]
    fn quoted_fields_round_trip() {
        let originals = [
            "O'Brien, Pat",
            "say \"hi\"",
            "",
            " padded ",
            "a|b|c",
            "\"\"",
            "plain",
            "x,\"y\",z",
            "end\"",
        ];
        let line = join_line(&originals, ',');
        assert_eq!(split_line(&line, ','), originals);

        let piped = join_line(&originals, '|');
        assert_eq!(split_line(&piped, '|'), originals);
    }
}
