use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{RentalRecord, RentalTable, REQUIRED_COLUMNS};
use crate::error::DataError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a rental table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row using the `train.csv` column names
/// * `.json`    – `[{ "datetime": "...", "season": 1, ... }, ...]`
/// * `.parquet` – same columns; `datetime` may be text or an Arrow timestamp
pub fn load_file(path: &Path) -> Result<RentalTable, DataError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(DataError::UnsupportedFormat(other.to_string())),
    }?;

    log::info!("Loaded {} rental records from {}", table.len(), path.display());
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<RentalTable, DataError> {
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    read_csv(file)
}

/// Parse CSV rows from any reader.  Required columns are checked up front so
/// a missing column is reported by name rather than as a row error.
pub fn read_csv<R: std::io::Read>(input: R) -> Result<RentalTable, DataError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);

    let headers = reader.headers()?.clone();
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(DataError::MissingColumn(required.to_string()));
        }
    }

    let records = reader
        .deserialize::<RentalRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RentalTable::new(records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, as written by `df.to_json(orient='records',
/// date_format='iso')`.
fn load_json(path: &Path) -> Result<RentalTable, DataError> {
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    let records: Vec<RentalRecord> = serde_json::from_reader(BufReader::new(file))?;
    Ok(RentalTable::new(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with the rental columns.
///
/// Integer columns may be any integer width and the weather covariates any
/// numeric type; everything is cast through Arrow before reading.  Works
/// with files written by both **Pandas** and **Polars**.
fn load_parquet(path: &Path) -> Result<RentalTable, DataError> {
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    for batch in reader {
        read_batch(&batch?, &mut records)?;
    }
    Ok(RentalTable::new(records))
}

/// Append the rows of one record batch to `out`.
pub fn read_batch(batch: &RecordBatch, out: &mut Vec<RentalRecord>) -> Result<(), DataError> {
    let offset = out.len();

    let datetime = required_column(batch, "datetime", &DataType::Utf8)?;
    let season = required_column(batch, "season", &DataType::Int64)?;
    let workingday = required_column(batch, "workingday", &DataType::Int64)?;
    let casual = required_column(batch, "casual", &DataType::Int64)?;
    let registered = required_column(batch, "registered", &DataType::Int64)?;
    let total = required_column(batch, "count", &DataType::Int64)?;

    let holiday = optional_column(batch, "holiday", &DataType::Int64)?;
    let weather = optional_column(batch, "weather", &DataType::Int64)?;
    let temp = optional_column(batch, "temp", &DataType::Float64)?;
    let atemp = optional_column(batch, "atemp", &DataType::Float64)?;
    let humidity = optional_column(batch, "humidity", &DataType::Float64)?;
    let windspeed = optional_column(batch, "windspeed", &DataType::Float64)?;

    let datetime = datetime.as_string::<i32>();

    for row in 0..batch.num_rows() {
        let abs_row = offset + row;
        let int = |col: &ArrayRef, name: &str| -> Result<i64, DataError> {
            if col.is_null(row) {
                return Err(DataError::NullValue {
                    row: abs_row,
                    column: name.to_string(),
                });
            }
            Ok(col.as_primitive::<Int64Type>().value(row))
        };
        // Same range rules as the serde path: a flag is a u8, counts are
        // non-negative.
        let narrow = |col: &ArrayRef, name: &str| -> Result<u8, DataError> {
            let value = int(col, name)?;
            u8::try_from(value).map_err(|_| out_of_range(abs_row, name, value))
        };
        let count = |col: &ArrayRef, name: &str| -> Result<u64, DataError> {
            let value = int(col, name)?;
            u64::try_from(value).map_err(|_| out_of_range(abs_row, name, value))
        };

        // A null timestamp becomes an empty string and fails in the deriver,
        // which reports it with the row number.
        let datetime = if datetime.is_null(row) {
            String::new()
        } else {
            datetime.value(row).to_string()
        };

        out.push(RentalRecord {
            datetime,
            season: int(&season, "season")?,
            holiday: optional_int(holiday.as_ref(), row),
            workingday: narrow(&workingday, "workingday")?,
            weather: optional_int(weather.as_ref(), row),
            temp: optional_float(temp.as_ref(), row),
            atemp: optional_float(atemp.as_ref(), row),
            humidity: optional_float(humidity.as_ref(), row),
            windspeed: optional_float(windspeed.as_ref(), row),
            casual: count(&casual, "casual")?,
            registered: count(&registered, "registered")?,
            total: count(&total, "count")?,
        });
    }
    Ok(())
}

// -- Arrow helpers --

fn out_of_range(row: usize, column: &str, value: i64) -> DataError {
    DataError::OutOfRange {
        row,
        column: column.to_string(),
        value,
    }
}

/// Look up a column and cast it to `to`.  Timestamp columns cast to Utf8 in
/// ISO form (`2011-01-01T00:00:00`), which the deriver accepts.
fn required_column(batch: &RecordBatch, name: &str, to: &DataType) -> Result<ArrayRef, DataError> {
    optional_column(batch, name, to)?.ok_or_else(|| DataError::MissingColumn(name.to_string()))
}

fn optional_column(
    batch: &RecordBatch,
    name: &str,
    to: &DataType,
) -> Result<Option<ArrayRef>, DataError> {
    let Some(col) = batch.column_by_name(name) else {
        return Ok(None);
    };
    if col.data_type() == to {
        return Ok(Some(Arc::clone(col)));
    }
    Ok(Some(cast(col.as_ref(), to)?))
}

fn optional_int(col: Option<&ArrayRef>, row: usize) -> Option<u8> {
    let col = col?;
    if col.is_null(row) {
        return None;
    }
    u8::try_from(col.as_primitive::<Int64Type>().value(row)).ok()
}

fn optional_float(col: Option<&ArrayRef>, row: usize) -> Option<f64> {
    let col = col?;
    if col.is_null(row) {
        return None;
    }
    Some(col.as_primitive::<Float64Type>().value(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
datetime,season,holiday,workingday,weather,temp,atemp,humidity,windspeed,casual,registered,count
2011-01-01 00:00:00,1,0,0,1,9.84,14.395,81,0,3,13,16
2011-01-01 01:00:00,1,0,0,1,9.02,13.635,80,0,8,32,40
";

    #[test]
    fn reads_kaggle_layout() {
        let table = read_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);

        let first = &table.records[0];
        assert_eq!(first.datetime, "2011-01-01 00:00:00");
        assert_eq!(first.season, 1);
        assert_eq!(first.workingday, 0);
        assert_eq!(first.temp, Some(9.84));
        assert_eq!((first.casual, first.registered, first.total), (3, 13, 16));
    }

    #[test]
    fn covariates_are_optional() {
        let csv = "datetime,season,workingday,casual,registered,count\n\
                   2012-06-01 08:00:00,2,1,10,90,100\n";
        let table = read_csv(csv.as_bytes()).unwrap();
        let rec = &table.records[0];
        assert_eq!(rec.holiday, None);
        assert_eq!(rec.windspeed, None);
        assert_eq!(rec.total, 100);
    }

    #[test]
    fn malformed_covariate_reads_as_none() {
        let csv = "datetime,season,workingday,temp,casual,registered,count\n\
                   2012-06-01 08:00:00,2,1,warm,10,90,100\n";
        let table = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.records[0].temp, None);
    }

    #[test]
    fn missing_required_column_is_named() {
        let csv = "datetime,season,workingday,casual,registered\n\
                   2012-06-01 08:00:00,2,1,10,90\n";
        let err = read_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "count"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_file(Path::new("rentals.xlsx")).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat(ref e) if e == "xlsx"));
    }

    #[test]
    fn batch_with_narrow_ints_and_timestamps() {
        use arrow::array::{Int32Array, TimestampSecondArray, UInt16Array};
        use arrow::datatypes::{Field, Schema, TimeUnit};

        let schema = Arc::new(Schema::new(vec![
            Field::new("datetime", DataType::Timestamp(TimeUnit::Second, None), true),
            Field::new("season", DataType::Int32, false),
            Field::new("workingday", DataType::Int32, false),
            Field::new("casual", DataType::UInt16, false),
            Field::new("registered", DataType::UInt16, false),
            Field::new("count", DataType::UInt16, false),
        ]));
        // 2011-01-03 08:00:00 UTC
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampSecondArray::from(vec![1_294_041_600])),
                Arc::new(Int32Array::from(vec![1])),
                Arc::new(Int32Array::from(vec![1])),
                Arc::new(UInt16Array::from(vec![5])),
                Arc::new(UInt16Array::from(vec![45])),
                Arc::new(UInt16Array::from(vec![50])),
            ],
        )
        .unwrap();

        let mut out = Vec::new();
        read_batch(&batch, &mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].datetime.starts_with("2011-01-03T08:00:00"));
        assert_eq!(out[0].total, 50);
        assert_eq!(out[0].temp, None);
    }

    fn int_batch(workingday: i64, casual: i64) -> RecordBatch {
        use arrow::array::{Int64Array, StringArray};
        use arrow::datatypes::{Field, Schema};

        let ints = |v: i64| -> ArrayRef { Arc::new(Int64Array::from(vec![v])) };
        let schema = Arc::new(Schema::new(vec![
            Field::new("datetime", DataType::Utf8, false),
            Field::new("season", DataType::Int64, false),
            Field::new("workingday", DataType::Int64, false),
            Field::new("casual", DataType::Int64, false),
            Field::new("registered", DataType::Int64, false),
            Field::new("count", DataType::Int64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["2011-01-03 08:00:00"])),
                ints(1),
                ints(workingday),
                ints(casual),
                ints(10),
                ints(5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn batch_rejects_out_of_range_flag() {
        let mut out = Vec::new();
        let err = read_batch(&int_batch(257, 0), &mut out).unwrap_err();
        assert!(matches!(
            err,
            DataError::OutOfRange { row: 0, ref column, value: 257 } if column == "workingday"
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn batch_rejects_negative_count() {
        let mut out = Vec::new();
        let err = read_batch(&int_batch(1, -5), &mut out).unwrap_err();
        assert!(matches!(
            err,
            DataError::OutOfRange { row: 0, ref column, value: -5 } if column == "casual"
        ));

        // The CSV path refuses the same row.
        let csv = "datetime,season,workingday,casual,registered,count\n\
                   2011-01-03 08:00:00,1,1,-5,10,5\n";
        assert!(read_csv(csv.as_bytes()).is_err());
    }
}
