use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::FilterParseError;

// ---------------------------------------------------------------------------
// RentalRecord – one row of the raw hourly table
// ---------------------------------------------------------------------------

/// A single hourly observation as it appears in the source file.
///
/// Column names follow the Kaggle `train.csv` layout; `count` is exposed as
/// [`RentalRecord::total`]. Weather covariates are optional and a malformed
/// covariate cell is read as `None` instead of failing the load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalRecord {
    /// Raw timestamp text, parsed later by the deriver.
    pub datetime: String,
    /// Season code, 1–4 in well-formed data.
    pub season: i64,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub holiday: Option<u8>,
    /// 1 when the day is neither weekend nor holiday.
    pub workingday: u8,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub weather: Option<u8>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub temp: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub atemp: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub windspeed: Option<f64>,
    pub casual: u64,
    pub registered: u64,
    /// Casual + registered.
    #[serde(rename = "count")]
    pub total: u64,
}

/// Columns every input format must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "datetime",
    "season",
    "workingday",
    "casual",
    "registered",
    "count",
];

/// The raw table exactly as loaded, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RentalTable {
    pub records: Vec<RentalRecord>,
}

impl RentalTable {
    pub fn new(records: Vec<RentalRecord>) -> Self {
        RentalTable { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Season
// ---------------------------------------------------------------------------

/// Season name as coded by the dataset (1 = Spring … 4 = Winter).
///
/// This is the dataset's own convention, not meteorological seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    /// Map a season code to its name. Codes outside 1–4 have no season.
    pub fn from_code(code: i64) -> Option<Season> {
        match code {
            1 => Some(Season::Spring),
            2 => Some(Season::Summer),
            3 => Some(Season::Fall),
            4 => Some(Season::Winter),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
        }
    }

    /// The default season selection: all four.
    pub fn all() -> BTreeSet<Season> {
        Season::ALL.into_iter().collect()
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Season {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Season::ALL
            .into_iter()
            .find(|season| season.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| FilterParseError::Season(trimmed.to_string()))
    }
}

// ---------------------------------------------------------------------------
// DayPeriod
// ---------------------------------------------------------------------------

/// Coarse four-way split of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayPeriod {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl DayPeriod {
    /// Display order for the period series.
    pub const ORDER: [DayPeriod; 4] = [
        DayPeriod::Night,
        DayPeriod::Morning,
        DayPeriod::Afternoon,
        DayPeriod::Evening,
    ];

    /// Bucket an hour of day: 0–5 Night, 6–11 Morning, 12–17 Afternoon,
    /// 18 and later Evening.
    pub fn from_hour(hour: u32) -> DayPeriod {
        match hour {
            0..=5 => DayPeriod::Night,
            6..=11 => DayPeriod::Morning,
            12..=17 => DayPeriod::Afternoon,
            _ => DayPeriod::Evening,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DayPeriod::Night => "Night",
            DayPeriod::Morning => "Morning",
            DayPeriod::Afternoon => "Afternoon",
            DayPeriod::Evening => "Evening",
        }
    }
}

impl fmt::Display for DayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// DayOfWeek
// ---------------------------------------------------------------------------

/// Calendar weekday, displayed by its full English name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// Monday-first display order.
    pub const ORDER: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// EnrichedRecord / EnrichedTable
// ---------------------------------------------------------------------------

/// A raw record plus its derived calendar attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    /// The untouched source row.
    pub record: RentalRecord,
    pub timestamp: NaiveDateTime,
    pub year: i32,
    /// 1–12.
    pub month: u32,
    /// 0–23.
    pub hour: u32,
    pub day_of_week: DayOfWeek,
    /// `None` when the season code is outside 1–4.
    pub season_name: Option<Season>,
    pub day_period: DayPeriod,
}

/// The enriched dataset with the year index pre-computed for the year selector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedTable {
    pub records: Vec<EnrichedRecord>,
    years: BTreeSet<i32>,
}

impl EnrichedTable {
    /// Build the year index from the enriched records.
    pub fn from_records(records: Vec<EnrichedRecord>) -> Self {
        let years = records.iter().map(|r| r.year).collect();
        EnrichedTable { records, years }
    }

    /// Years present in the data, ascending.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
