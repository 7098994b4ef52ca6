//! RFC 4180 CSV output.

use std::fmt::Write as _;

/// Builds a CSV document in memory. Rows end with CRLF.
#[derive(Debug, Default)]
pub struct CsvWriter {
    out: String,
    columns: usize,
    rows: usize,
}

impl CsvWriter {
    #[must_use]
    pub fn with_header<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut writer = Self::default();
        writer.columns = writer.write_record(header);
        writer
    }

    /// Appends a data row. Rows of the wrong width are written as given.
    pub fn row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let width = self.write_record(fields);
        if width != self.columns {
            tracing::debug!(expected = self.columns, width, "CSV row width differs from header");
        }
        self.rows += 1;
    }

    /// Data rows written so far, header excluded.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }

    fn write_record<I, S>(&mut self, fields: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut width = 0;
        for field in fields {
            if width > 0 {
                self.out.push(',');
            }
            push_field(&mut self.out, field.as_ref());
            width += 1;
        }
        self.out.push_str("\r\n");
        width
    }
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        let _ = write!(out, "\"{}\"", field.replace('"', "\"\""));
    } else {
        out.push_str(field);
    }
}
