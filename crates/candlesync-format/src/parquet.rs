//! Apache Parquet output format.

use arrow::array::{ArrayRef, Float64Array, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use candlesync_indicators::BandPoint;
use candlesync_types::Bar;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::io::Write;
use std::sync::Arc;

use crate::{FormatError, Formatter};

/// Parquet formatter.
#[derive(Debug, Clone)]
pub struct ParquetFormatter {
    /// Row group size (number of rows per group).
    row_group_size: usize,
    /// Compression codec.
    compression: Compression,
}

impl Default for ParquetFormatter {
    fn default() -> Self {
        Self {
            row_group_size: 100_000,
            compression: Compression::SNAPPY,
        }
    }
}

impl ParquetFormatter {
    /// Creates a new Parquet formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the row group size.
    #[must_use]
    pub const fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Sets the compression codec.
    #[must_use]
    pub const fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    fn time_field() -> Field {
        Field::new(
            "time",
            DataType::Timestamp(TimeUnit::Second, Some("UTC".into())),
            false,
        )
    }

    fn bar_schema() -> Schema {
        Schema::new(vec![
            Self::time_field(),
            Field::new("open", DataType::Float64, false),
            Field::new("high", DataType::Float64, false),
            Field::new("low", DataType::Float64, false),
            Field::new("close", DataType::Float64, false),
            Field::new("volume", DataType::Float64, false),
        ])
    }

    fn band_schema() -> Schema {
        Schema::new(vec![
            Self::time_field(),
            Field::new("upper", DataType::Float64, false),
            Field::new("middle", DataType::Float64, false),
            Field::new("lower", DataType::Float64, false),
        ])
    }

    fn bars_to_batch(schema: SchemaRef, bars: &[Bar]) -> Result<RecordBatch, FormatError> {
        let times: Vec<_> = bars.iter().map(|b| b.time).collect();
        let column = |f: fn(&Bar) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from_iter_values(bars.iter().map(f)))
        };

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampSecondArray::from(times).with_timezone("UTC")),
                column(|b| b.open),
                column(|b| b.high),
                column(|b| b.low),
                column(|b| b.close),
                column(|b| b.volume),
            ],
        )
        .map_err(|e| FormatError::Parquet(e.to_string()))
    }

    fn bands_to_batch(schema: SchemaRef, points: &[BandPoint]) -> Result<RecordBatch, FormatError> {
        let times: Vec<_> = points.iter().map(|p| p.time).collect();
        let column = |f: fn(&BandPoint) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from_iter_values(points.iter().map(f)))
        };

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampSecondArray::from(times).with_timezone("UTC")),
                column(|p| p.upper),
                column(|p| p.middle),
                column(|p| p.lower),
            ],
        )
        .map_err(|e| FormatError::Parquet(e.to_string()))
    }

    fn write_chunks<T, W, F>(
        &self,
        schema: Schema,
        rows: &[T],
        writer: W,
        to_batch: F,
    ) -> Result<(), FormatError>
    where
        W: Write + Send,
        F: Fn(SchemaRef, &[T]) -> Result<RecordBatch, FormatError>,
    {
        let schema = Arc::new(schema);
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut arrow_writer = ArrowWriter::try_new(writer, Arc::clone(&schema), Some(props))
            .map_err(|e| FormatError::Parquet(e.to_string()))?;

        for chunk in rows.chunks(self.row_group_size.max(1)) {
            let batch = to_batch(Arc::clone(&schema), chunk)?;
            arrow_writer
                .write(&batch)
                .map_err(|e| FormatError::Parquet(e.to_string()))?;
        }

        arrow_writer
            .close()
            .map_err(|e| FormatError::Parquet(e.to_string()))?;

        Ok(())
    }
}

impl Formatter for ParquetFormatter {
    fn write_bars<W: Write + Send>(&self, bars: &[Bar], writer: W) -> Result<(), FormatError> {
        self.write_chunks(Self::bar_schema(), bars, writer, Self::bars_to_batch)
    }

    fn write_bands<W: Write + Send>(
        &self,
        points: &[BandPoint],
        writer: W,
    ) -> Result<(), FormatError> {
        self.write_chunks(Self::band_schema(), points, writer, Self::bands_to_batch)
    }

    fn extension(&self) -> &str {
        "parquet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parquet_bars() {
        let formatter = ParquetFormatter::new().with_row_group_size(2);
        let bars: Vec<_> = (0..5).map(|i| Bar::flat(i * 60, 100.0 + i as f64)).collect();
        let mut output = Cursor::new(Vec::new());

        formatter.write_bars(&bars, &mut output).unwrap();

        let data = output.into_inner();
        assert!(data.len() > 8);
        assert_eq!(&data[0..4], b"PAR1");
        assert_eq!(&data[data.len() - 4..], b"PAR1");
    }

    #[test]
    fn test_bar_schema() {
        let schema = ParquetFormatter::bar_schema();
        assert_eq!(schema.fields().len(), 6);
        assert!(schema.field_with_name("time").is_ok());
        assert!(schema.field_with_name("volume").is_ok());
    }

    #[test]
    fn test_band_batch() {
        let points = vec![BandPoint {
            time: 60,
            upper: 3.0,
            middle: 2.0,
            lower: 1.0,
        }];
        let schema = Arc::new(ParquetFormatter::band_schema());
        let batch = ParquetFormatter::bands_to_batch(schema, &points).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 4);
    }
}
