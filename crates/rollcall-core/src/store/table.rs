//! Table - flat delimited-table codec
//!
//! The roster's on-disk form is a comma-delimited table with a stable header
//! row (what operators open in a spreadsheet and what Google Sheets exports).
//! Quoting follows the usual convention: fields containing commas, quotes or
//! newlines are wrapped in double quotes, with embedded quotes doubled.

use crate::error::{Error, Result};

/// A header row plus data rows, all cells as strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column names, in file order
    pub headers: Vec<String>,
    /// Data rows; each row has exactly `headers.len()` cells
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build an empty table with the given headers
    #[must_use]
    pub fn with_headers(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Parse delimited text. The first record is the header row. Rows shorter
    /// than the header are padded with empty cells; longer rows are an error.
    pub fn parse(input: &str) -> Result<Self> {
        let mut records = parse_records(input)?;
        if records.is_empty() {
            return Err(Error::Table("empty input, no header row".to_string()));
        }
        let headers = records.remove(0);
        let width = headers.len();

        let mut rows = Vec::with_capacity(records.len());
        for (line, mut record) in records.into_iter().enumerate() {
            // Trailing blank record from a final newline
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }
            if record.len() > width {
                return Err(Error::Table(format!(
                    "row {} has {} cells, header has {}",
                    line + 2,
                    record.len(),
                    width
                )));
            }
            record.resize(width, String::new());
            rows.push(record);
        }

        Ok(Self { headers, rows })
    }

    /// Render back to delimited text with a trailing newline
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        write_record(&mut out, &self.headers);
        for row in &self.rows {
            write_record(&mut out, row);
        }
        out
    }

    /// Index of a column by exact header name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of a column, creating it (with empty cells) if missing.
    /// This is the self-healing behavior for tracking columns.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Rename a column in place
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column(from) {
            Some(idx) => {
                self.headers[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Cell accessor; empty string for out-of-range
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Set a cell; ignored when out of range
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value.into();
        }
    }

    /// Whether the table has no data rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_records(input: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => {
                if field.is_empty() {
                    in_quotes = true;
                } else {
                    return Err(Error::Table("quote inside unquoted field".to_string()));
                }
            }
            ',' => {
                record.push(std::mem::take(&mut field));
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(Error::Table("unterminated quoted field".to_string()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

fn write_record(out: &mut String, cells: &[String]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if cell.contains(',') || cell.contains('"') || cell.contains('\n') || cell.contains('\r') {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let t = Table::parse("phone,name\n123,Ana\n456,Luis\n").unwrap();
        assert_eq!(t.headers, vec!["phone", "name"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.cell(0, 1), "Ana");
    }

    #[test]
    fn test_parse_quoted_fields() {
        let t = Table::parse("phone,name\n123,\"García, Ana \"\"La Profe\"\"\"\n").unwrap();
        assert_eq!(t.cell(0, 1), "García, Ana \"La Profe\"");
    }

    #[test]
    fn test_parse_crlf_and_short_rows() {
        let t = Table::parse("phone,name,cohort\r\n123,Ana\r\n").unwrap();
        assert_eq!(t.rows[0], vec!["123", "Ana", ""]);
    }

    #[test]
    fn test_render_quotes_when_needed() {
        let mut t = Table::with_headers(vec!["phone".into(), "name".into()]);
        t.rows.push(vec!["123".into(), "García, Ana".into()]);
        assert_eq!(t.render(), "phone,name\n123,\"García, Ana\"\n");
    }

    #[test]
    fn test_round_trip_with_newline_in_cell() {
        let mut t = Table::with_headers(vec!["phone".into(), "note".into()]);
        t.rows.push(vec!["123".into(), "line1\nline2".into()]);
        let parsed = Table::parse(&t.render()).unwrap();
        assert_eq!(parsed, t);
    }

    #[test]
    fn test_ensure_column_self_heals() {
        let mut t = Table::parse("phone\n123\n").unwrap();
        let idx = t.ensure_column("reply_state");
        assert_eq!(idx, 1);
        assert_eq!(t.rows[0], vec!["123", ""]);
        // Idempotent
        assert_eq!(t.ensure_column("reply_state"), 1);
    }

    #[test]
    fn test_row_wider_than_header_is_error() {
        assert!(Table::parse("phone\n123,extra\n").is_err());
    }

    #[test]
    fn test_unterminated_quote_is_error() {
        assert!(Table::parse("phone\n\"123\n").is_err());
    }
}
