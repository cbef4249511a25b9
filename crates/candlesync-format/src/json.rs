//! JSON output format.

use candlesync_indicators::BandPoint;
use candlesync_types::Bar;
use serde::Serialize;
use std::io::Write;

use crate::{FormatError, Formatter};

/// JSON output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    /// JSON array (standard JSON).
    #[default]
    Array,
    /// Newline-delimited JSON (NDJSON/JSONL).
    Ndjson,
}

/// JSON formatter.
///
/// Records are written with the same field names the data service uses
/// for bars, with `time` in epoch seconds.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    style: JsonStyle,
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter with default settings (array style).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            style: JsonStyle::Array,
            pretty: false,
        }
    }

    /// Creates a new NDJSON formatter.
    #[must_use]
    pub const fn ndjson() -> Self {
        Self {
            style: JsonStyle::Ndjson,
            pretty: false,
        }
    }

    /// Sets whether to pretty-print output (array style only).
    #[must_use]
    pub const fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the output style.
    #[must_use]
    pub const fn with_style(mut self, style: JsonStyle) -> Self {
        self.style = style;
        self
    }

    fn write_records<T, W>(&self, records: &[T], mut writer: W) -> Result<(), FormatError>
    where
        T: Serialize,
        W: Write,
    {
        match self.style {
            JsonStyle::Array if self.pretty => {
                serde_json::to_writer_pretty(&mut writer, records)?;
                writeln!(writer)?;
            }
            JsonStyle::Array => {
                serde_json::to_writer(&mut writer, records)?;
                writeln!(writer)?;
            }
            JsonStyle::Ndjson => {
                for record in records {
                    serde_json::to_writer(&mut writer, record)?;
                    writeln!(writer)?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }
}

impl Formatter for JsonFormatter {
    fn write_bars<W: Write + Send>(&self, bars: &[Bar], writer: W) -> Result<(), FormatError> {
        self.write_records(bars, writer)
    }

    fn write_bands<W: Write + Send>(
        &self,
        points: &[BandPoint],
        writer: W,
    ) -> Result<(), FormatError> {
        self.write_records(points, writer)
    }

    fn extension(&self) -> &str {
        match self.style {
            JsonStyle::Array => "json",
            JsonStyle::Ndjson => "ndjson",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_bar() -> Bar {
        Bar::new(1_700_000_040, 100.0, 105.0, 98.0, 101.5, 1200.0)
    }

    #[test]
    fn test_json_array() {
        let formatter = JsonFormatter::new();
        let mut output = Cursor::new(Vec::new());

        formatter.write_bars(&[sample_bar()], &mut output).unwrap();

        let result = String::from_utf8(output.into_inner()).unwrap();
        assert!(result.starts_with('['));
        assert!(result.contains("\"time\":1700000040"));
        assert!(result.contains("\"close\":101.5"));

        let parsed: Vec<Bar> = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed, vec![sample_bar()]);
    }

    #[test]
    fn test_ndjson_bands() {
        let formatter = JsonFormatter::ndjson();
        let point = BandPoint {
            time: 60,
            upper: 3.0,
            middle: 2.0,
            lower: 1.0,
        };
        let mut output = Cursor::new(Vec::new());

        formatter.write_bands(&[point, point], &mut output).unwrap();

        let result = String::from_utf8(output.into_inner()).unwrap();
        let lines: Vec<_> = result.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('{'));
        assert!(lines[1].contains("\"middle\":2.0"));
        assert_eq!(formatter.extension(), "ndjson");
    }

    #[test]
    fn test_pretty_json() {
        let formatter = JsonFormatter::new().with_pretty(true);
        let mut output = Cursor::new(Vec::new());

        formatter.write_bars(&[sample_bar()], &mut output).unwrap();

        let result = String::from_utf8(output.into_inner()).unwrap();
        assert!(result.contains("\n  "));
    }
}
