//! Format dispatch and file export.

use candlesync_indicators::BandPoint;
use candlesync_types::Bar;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::{FormatError, Formatter, OutputFormat};

enum Dispatch<'a> {
    Bars(&'a [Bar]),
    Bands(&'a [BandPoint]),
}

fn write_with<F, W>(formatter: &F, data: Dispatch<'_>, writer: W) -> Result<(), FormatError>
where
    F: Formatter,
    W: Write + Send,
{
    match data {
        Dispatch::Bars(bars) => formatter.write_bars(bars, writer),
        Dispatch::Bands(points) => formatter.write_bands(points, writer),
    }
}

fn dispatch<W: Write + Send>(
    format: OutputFormat,
    data: Dispatch<'_>,
    writer: W,
) -> Result<(), FormatError> {
    match format {
        OutputFormat::Csv => write_with(&crate::CsvFormatter::new(), data, writer),
        OutputFormat::Json => write_with(&crate::JsonFormatter::new(), data, writer),
        OutputFormat::Ndjson => write_with(&crate::JsonFormatter::ndjson(), data, writer),
        #[cfg(feature = "parquet")]
        OutputFormat::Parquet => write_with(&crate::ParquetFormatter::new(), data, writer),
        #[allow(unreachable_patterns)]
        other => Err(FormatError::Disabled(other)),
    }
}

/// Writes bars with the default formatter for `format`.
///
/// # Errors
///
/// Returns an error if the format is disabled or writing fails.
pub fn write_bars<W: Write + Send>(
    format: OutputFormat,
    bars: &[Bar],
    writer: W,
) -> Result<(), FormatError> {
    dispatch(format, Dispatch::Bars(bars), writer)
}

/// Writes band points with the default formatter for `format`.
///
/// # Errors
///
/// Returns an error if the format is disabled or writing fails.
pub fn write_bands<W: Write + Send>(
    format: OutputFormat,
    points: &[BandPoint],
    writer: W,
) -> Result<(), FormatError> {
    dispatch(format, Dispatch::Bands(points), writer)
}

/// Creates `path` and writes bars to it.
///
/// # Errors
///
/// Returns an error if the file cannot be created or writing fails.
pub fn export_bars(path: &Path, format: OutputFormat, bars: &[Bar]) -> Result<(), FormatError> {
    let file = BufWriter::new(File::create(path)?);
    write_bars(format, bars, file)
}

/// Creates `path` and writes band points to it.
///
/// # Errors
///
/// Returns an error if the file cannot be created or writing fails.
pub fn export_bands(
    path: &Path,
    format: OutputFormat,
    points: &[BandPoint],
) -> Result<(), FormatError> {
    let file = BufWriter::new(File::create(path)?);
    write_bands(format, points, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn bars() -> Vec<Bar> {
        (0..3).map(|i| Bar::flat(1_700_000_040 + i * 60, 10.0)).collect()
    }

    #[test]
    fn test_export_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");

        export_bars(&path, OutputFormat::Csv, &bars()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert!(content.contains("2023-11-14T22:16:00Z"));
    }

    #[test]
    fn test_export_bands_ndjson_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bands.ndjson");
        let points = vec![
            BandPoint {
                time: 60,
                upper: 2.0,
                middle: 1.0,
                lower: 0.0,
            };
            3
        ];

        export_bands(&path, OutputFormat::Ndjson, &points).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_export_parquet_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.parquet");

        export_bars(&path, OutputFormat::Parquet, &bars()).unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(&data[..4], b"PAR1");
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("bars.json");
        assert!(matches!(
            export_bars(&path, OutputFormat::Json, &bars()),
            Err(FormatError::Io(_))
        ));
    }
}
