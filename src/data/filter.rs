use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::model::{EnrichedRecord, EnrichedTable, Season};
use crate::error::FilterParseError;

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// Year selector: everything, or one calendar year.
///
/// Serializes as `"All"` or the bare year number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum YearFilter {
    #[default]
    All,
    Year(i32),
}

impl YearFilter {
    pub fn matches(self, year: i32) -> bool {
        match self {
            YearFilter::All => true,
            YearFilter::Year(y) => y == year,
        }
    }
}

impl FromStr for YearFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") || s.eq_ignore_ascii_case("both") {
            return Ok(YearFilter::All);
        }
        s.parse()
            .map(YearFilter::Year)
            .map_err(|_| FilterParseError::Year(s.to_string()))
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::All => f.write_str("All"),
            YearFilter::Year(y) => write!(f, "{y}"),
        }
    }
}

/// Working-day selector: {All, 0, 1}.  Serializes the same way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkingDayFilter {
    #[default]
    All,
    /// Flag 0: weekend or holiday.
    NonWorking,
    /// Flag 1.
    Working,
}

impl WorkingDayFilter {
    pub fn matches(self, flag: u8) -> bool {
        match self {
            WorkingDayFilter::All => true,
            WorkingDayFilter::NonWorking => flag == 0,
            WorkingDayFilter::Working => flag == 1,
        }
    }

    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(WorkingDayFilter::NonWorking),
            1 => Some(WorkingDayFilter::Working),
            _ => None,
        }
    }
}

impl FromStr for WorkingDayFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(WorkingDayFilter::All),
            "0" => Ok(WorkingDayFilter::NonWorking),
            "1" => Ok(WorkingDayFilter::Working),
            other => Err(FilterParseError::WorkingDay(other.to_string())),
        }
    }
}

impl Serialize for YearFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            YearFilter::All => serializer.serialize_str("All"),
            YearFilter::Year(y) => serializer.serialize_i32(*y),
        }
    }
}

impl Serialize for WorkingDayFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WorkingDayFilter::All => serializer.serialize_str("All"),
            WorkingDayFilter::NonWorking => serializer.serialize_u8(0),
            WorkingDayFilter::Working => serializer.serialize_u8(1),
        }
    }
}

impl fmt::Display for WorkingDayFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkingDayFilter::All => f.write_str("All"),
            WorkingDayFilter::NonWorking => f.write_str("0"),
            WorkingDayFilter::Working => f.write_str("1"),
        }
    }
}

/// The complete selection for one render cycle.
///
/// Defaults to every year, both working-day values and all four seasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub year: YearFilter,
    pub working_day: WorkingDayFilter,
    pub seasons: BTreeSet<Season>,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            year: YearFilter::All,
            working_day: WorkingDayFilter::All,
            seasons: Season::all(),
        }
    }
}

impl FilterState {
    pub fn new(
        year: YearFilter,
        working_day: WorkingDayFilter,
        seasons: impl IntoIterator<Item = Season>,
    ) -> Self {
        FilterState {
            year,
            working_day,
            seasons: seasons.into_iter().collect(),
        }
    }

    /// A record passes when its season name is selected and the year and
    /// working-day constraints hold.  Records without a season name never
    /// pass, whatever the season selection.
    pub fn matches(&self, record: &EnrichedRecord) -> bool {
        let season_ok = record
            .season_name
            .is_some_and(|season| self.seasons.contains(&season));
        season_ok && self.year.matches(record.year) && self.working_day.matches(record.record.workingday)
    }

    /// Apply one `key=value` term, e.g. `year=2011`, `workingday=1` or
    /// `seasons=Spring,Fall`.  An empty `seasons=` clears the selection.
    pub fn apply_term(&mut self, term: &str) -> Result<(), FilterParseError> {
        let (key, value) = term
            .split_once('=')
            .ok_or_else(|| FilterParseError::Term(term.to_string()))?;

        match key.trim().to_ascii_lowercase().as_str() {
            "year" => self.year = value.parse()?,
            "workingday" | "working_day" => self.working_day = value.parse()?,
            "season" | "seasons" => {
                self.seasons = if value.trim().eq_ignore_ascii_case("all") {
                    Season::all()
                } else {
                    value
                        .split(',')
                        .filter(|s| !s.trim().is_empty())
                        .map(str::parse)
                        .collect::<Result<_, _>>()?
                };
            }
            _ => return Err(FilterParseError::Term(term.to_string())),
        }
        Ok(())
    }

    /// Parse a whitespace-separated line of terms on top of `self`.
    pub fn with_terms(&self, line: &str) -> Result<FilterState, FilterParseError> {
        let mut next = self.clone();
        for term in line.split_whitespace() {
            next.apply_term(term)?;
        }
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Applying the filter
// ---------------------------------------------------------------------------

/// Return indices of records that pass the filter, in table order.
pub fn filtered_indices(table: &EnrichedTable, filter: &FilterState) -> Vec<usize> {
    if filter.seasons.is_empty() {
        // Nothing selected → hide everything
        return Vec::new();
    }
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| filter.matches(rec))
        .map(|(i, _)| i)
        .collect()
}

/// A borrowed, read-only subset of an enriched table.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a EnrichedTable,
    indices: Vec<usize>,
    filter: FilterState,
}

impl<'a> FilteredView<'a> {
    pub fn new(table: &'a EnrichedTable, filter: &FilterState) -> Self {
        let indices = filtered_indices(table, filter);
        log::debug!(
            "Filter year={} workingday={} seasons={:?} kept {}/{} records",
            filter.year,
            filter.working_day,
            filter.seasons,
            indices.len(),
            table.len()
        );
        FilteredView {
            table,
            indices,
            filter: filter.clone(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a EnrichedRecord> + '_ {
        let table = self.table;
        self.indices.iter().map(move |&i| &table.records[i])
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::derive::enrich;
    use crate::data::model::{RentalRecord, RentalTable};

    fn raw(datetime: &str, season: i64, workingday: u8, total: u64) -> RentalRecord {
        RentalRecord {
            datetime: datetime.to_string(),
            season,
            holiday: None,
            workingday,
            weather: None,
            temp: None,
            atemp: None,
            humidity: None,
            windspeed: None,
            casual: 0,
            registered: total,
            total,
        }
    }

    fn table() -> EnrichedTable {
        enrich(&RentalTable::new(vec![
            raw("2011-01-03 08:00:00", 1, 1, 10),
            raw("2011-07-02 08:00:00", 3, 0, 20),
            raw("2012-04-10 17:00:00", 2, 1, 30),
            raw("2012-11-11 20:00:00", 4, 0, 40),
            raw("2012-05-05 09:00:00", 5, 0, 50),
        ]))
        .unwrap()
    }

    #[test]
    fn default_filter_keeps_every_valid_season() {
        let table = table();
        assert_eq!(filtered_indices(&table, &FilterState::default()), [0, 1, 2, 3]);
    }

    #[test]
    fn predicates_are_conjunctive() {
        let table = table();
        let filter = FilterState::new(
            YearFilter::Year(2012),
            WorkingDayFilter::NonWorking,
            Season::ALL,
        );
        assert_eq!(filtered_indices(&table, &filter), [3]);

        let filter = FilterState::new(YearFilter::All, WorkingDayFilter::Working, [Season::Summer]);
        assert_eq!(filtered_indices(&table, &filter), [2]);
    }

    #[test]
    fn empty_season_selection_yields_nothing() {
        let table = table();
        let filter = FilterState::new(YearFilter::All, WorkingDayFilter::All, Vec::new());
        assert!(filtered_indices(&table, &filter).is_empty());
    }

    #[test]
    fn unknown_season_never_matches() {
        let table = table();
        // Row 4 carries season code 5: present in the table, absent from
        // every season-scoped view including the all-four selection.
        assert_eq!(table.records[4].season_name, None);
        for filter in [
            FilterState::default(),
            FilterState::new(YearFilter::Year(2012), WorkingDayFilter::NonWorking, Season::ALL),
        ] {
            assert!(!filtered_indices(&table, &filter).contains(&4));
        }
    }

    #[test]
    fn view_iterates_in_table_order() {
        let table = table();
        let filter = FilterState::new(YearFilter::All, WorkingDayFilter::All, [Season::Winter, Season::Spring]);
        let view = FilteredView::new(&table, &filter);
        let totals: Vec<u64> = view.iter().map(|r| r.record.total).collect();
        assert_eq!(totals, [10, 40]);
        assert_eq!(view.filter(), &filter);
    }

    #[test]
    fn selection_serializes_as_plain_values() {
        let filter = FilterState::new(YearFilter::Year(2012), WorkingDayFilter::NonWorking, [Season::Fall]);
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "year": 2012, "working_day": 0, "seasons": ["Fall"] })
        );

        let json = serde_json::to_value(FilterState::default()).unwrap();
        assert_eq!(json["year"], "All");
        assert_eq!(json["working_day"], "All");
    }

    #[test]
    fn parses_filter_terms() {
        let base = FilterState::default();
        let next = base.with_terms("year=2011 workingday=0 seasons=spring,Fall").unwrap();
        assert_eq!(next.year, YearFilter::Year(2011));
        assert_eq!(next.working_day, WorkingDayFilter::NonWorking);
        assert_eq!(next.seasons, BTreeSet::from([Season::Spring, Season::Fall]));

        let cleared = next.with_terms("seasons= year=all").unwrap();
        assert!(cleared.seasons.is_empty());
        assert_eq!(cleared.year, YearFilter::All);

        assert_eq!(
            base.with_terms("workingday=2"),
            Err(FilterParseError::WorkingDay("2".to_string()))
        );
        assert_eq!(
            base.with_terms("colour=red"),
            Err(FilterParseError::Term("colour=red".to_string()))
        );
    }
}
