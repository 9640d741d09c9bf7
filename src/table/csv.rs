//! Minimal RFC 4180 codec.
//!
//! Fields are separated by `,`, records by `\n` or `\r\n`. Quoted fields may
//! contain commas, doubled quotes and line breaks. A quote that does not open
//! a field is kept as a literal character. Blank lines are skipped.

use crate::error::TableError;

/// One parsed record with the 1-based line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub line: usize,
    pub fields: Vec<String>,
}

#[derive(Default)]
struct RecordBuilder {
    records: Vec<RawRecord>,
    fields: Vec<String>,
    field: String,
    /// The current field opened with a quote.
    field_quoted: bool,
    /// Some field of the current record was quoted.
    quoted: bool,
    start_line: usize,
}

impl RecordBuilder {
    fn end_field(&mut self) {
        self.fields.push(std::mem::take(&mut self.field));
        self.field_quoted = false;
    }

    fn end_record(&mut self, next_line: usize) {
        self.end_field();
        let blank = self.fields.len() == 1 && self.fields[0].is_empty() && !self.quoted;
        if blank {
            self.fields.clear();
        } else {
            self.records.push(RawRecord {
                line: self.start_line,
                fields: std::mem::take(&mut self.fields),
            });
        }
        self.quoted = false;
        self.start_line = next_line;
    }
}

/// Parse CSV text into records. The header, if any, is the first record.
pub fn parse(content: &str) -> Result<Vec<RawRecord>, TableError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut b = RecordBuilder {
        start_line: 1,
        ..Default::default()
    };
    let mut line = 1;
    let mut in_quotes = false;
    let mut quote_line = 0;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    b.field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    b.field.push(c);
                }
                _ => b.field.push(c),
            }
            continue;
        }

        match c {
            '"' if b.field.is_empty() && !b.field_quoted => {
                in_quotes = true;
                b.field_quoted = true;
                b.quoted = true;
                quote_line = line;
            }
            ',' => b.end_field(),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                line += 1;
                b.end_record(line);
            }
            _ => b.field.push(c),
        }
    }

    if in_quotes {
        return Err(TableError::UnterminatedQuote { line: quote_line });
    }
    if !b.field.is_empty() || !b.fields.is_empty() || b.quoted {
        b.end_record(line);
    }
    Ok(b.records)
}

/// Append one record to `out`, quoting fields only where needed.
pub fn write_record<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}
