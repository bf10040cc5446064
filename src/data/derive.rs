use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};

use super::model::{DayOfWeek, DayPeriod, EnrichedRecord, EnrichedTable, RentalRecord, RentalTable, Season};
use crate::error::ParseError;

/// Accepted naive layouts.  `%.f` also matches when there is no fraction.
const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a raw timestamp.  Offsets in RFC 3339 input are dropped and the
/// local wall-clock time is kept, since the dataset is in local time.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Derive calendar and period-of-day attributes for one record.
pub fn enrich_record(row: usize, record: &RentalRecord) -> Result<EnrichedRecord, ParseError> {
    let timestamp = parse_timestamp(&record.datetime).ok_or_else(|| ParseError {
        row,
        value: record.datetime.clone(),
    })?;
    let hour = timestamp.hour();

    Ok(EnrichedRecord {
        record: record.clone(),
        timestamp,
        year: timestamp.year(),
        month: timestamp.month(),
        hour,
        day_of_week: DayOfWeek::from(timestamp.weekday()),
        season_name: Season::from_code(record.season),
        day_period: DayPeriod::from_hour(hour),
    })
}

/// Enrich a whole table, preserving order.
///
/// The first bad timestamp aborts the derivation; no partial table is
/// returned.  Records with an unknown season code are kept with
/// `season_name == None`.
pub fn enrich(raw: &RentalTable) -> Result<EnrichedTable, ParseError> {
    let records = raw
        .records
        .iter()
        .enumerate()
        .map(|(row, record)| enrich_record(row, record))
        .collect::<Result<Vec<_>, _>>()?;

    let unknown_seasons = records.iter().filter(|r| r.season_name.is_none()).count();
    if unknown_seasons > 0 {
        log::warn!(
            "{unknown_seasons} of {} records carry a season code outside 1-4; \
             they will not match any season filter",
            records.len()
        );
    }

    let table = EnrichedTable::from_records(records);
    log::debug!(
        "Enriched {} records spanning years {:?}",
        table.len(),
        table.years().collect::<Vec<_>>()
    );
    Ok(table)
}
