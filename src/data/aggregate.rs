use std::collections::BTreeSet;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use super::filter::{FilterState, FilteredView, WorkingDayFilter, YearFilter};
use super::model::{DayOfWeek, DayPeriod, EnrichedRecord, EnrichedTable, Season};

/// Coverage of the intervals attached to the weekday, season and day-period
/// means.
pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// Two-sided normal critical value, used if the t quantile is unavailable.
const Z_975: f64 = 1.959_963_984_540_054;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Headline numbers for the filtered subset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Indicators {
    pub total_rentals: u64,
    pub total_casual: u64,
    pub total_registered: u64,
    /// Mean hourly total, truncated.  0 for an empty subset.
    pub avg_hourly_rentals: u64,
    /// Hour with the highest mean total, lowest hour on ties.  `None` for an
    /// empty subset.
    pub peak_hour: Option<u32>,
}

/// Mean total count for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint<K> {
    pub category: K,
    pub mean: f64,
    /// Number of records behind the mean.
    pub count: usize,
}

/// A mean with a symmetric confidence interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalPoint<K> {
    pub category: K,
    pub mean: f64,
    pub count: usize,
    pub ci_low: f64,
    pub ci_high: f64,
}

impl<K> IntervalPoint<K> {
    pub fn half_width(&self) -> f64 {
        (self.ci_high - self.ci_low) / 2.0
    }
}

/// Indicators and the five grouped-mean series for one set of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub record_count: usize,
    pub indicators: Indicators,
    /// Ascending hour.
    pub by_hour: Vec<SeriesPoint<u32>>,
    /// Monday first.
    pub by_weekday: Vec<IntervalPoint<DayOfWeek>>,
    /// Ascending month.
    pub by_month: Vec<SeriesPoint<u32>>,
    /// Order in which seasons first appear in the records.
    pub by_season: Vec<IntervalPoint<Season>>,
    /// Night, Morning, Afternoon, Evening.
    pub by_day_period: Vec<IntervalPoint<DayPeriod>>,
}

/// The structured result of one render cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub filters: FilterState,
    #[serde(flatten)]
    pub summary: Summary,
}

// ---------------------------------------------------------------------------
// Group accumulator
// ---------------------------------------------------------------------------

/// Running mean and variance (Welford).
#[derive(Debug, Clone, Copy, Default)]
struct MeanAccumulator {
    count: usize,
    mean: f64,
    /// Sum of squared deviations from the running mean.
    m2: f64,
}

impl MeanAccumulator {
    fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample (n − 1) standard deviation.
    fn std_dev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).max(0.0).sqrt()
    }

    /// Half width of the two-sided Student t interval for the mean.
    fn ci_half_width(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        t_critical(n - 1.0) * self.std_dev() / n.sqrt()
    }
}

fn t_critical(degrees_of_freedom: f64) -> f64 {
    let upper = 1.0 - (1.0 - CONFIDENCE_LEVEL) / 2.0;
    StudentsT::new(0.0, 1.0, degrees_of_freedom)
        .map(|t| t.inverse_cdf(upper))
        .unwrap_or(Z_975)
}

/// Group `total` by `key`, keeping groups in order of first appearance.
/// Records for which `key` yields `None` are skipped.
fn group_totals<K, F>(records: &[&EnrichedRecord], key: F) -> Vec<(K, MeanAccumulator)>
where
    K: PartialEq + Copy,
    F: Fn(&EnrichedRecord) -> Option<K>,
{
    let mut groups: Vec<(K, MeanAccumulator)> = Vec::new();
    for rec in records {
        let Some(k) = key(*rec) else { continue };
        let slot = match groups.iter().position(|(g, _)| *g == k) {
            Some(i) => i,
            None => {
                groups.push((k, MeanAccumulator::default()));
                groups.len() - 1
            }
        };
        groups[slot].1.push(rec.record.total as f64);
    }
    groups
}

fn to_points<K>(groups: Vec<(K, MeanAccumulator)>) -> Vec<SeriesPoint<K>> {
    groups
        .into_iter()
        .map(|(category, acc)| SeriesPoint {
            category,
            mean: acc.mean(),
            count: acc.count,
        })
        .collect()
}

fn to_interval_points<K>(groups: Vec<(K, MeanAccumulator)>) -> Vec<IntervalPoint<K>> {
    groups
        .into_iter()
        .map(|(category, acc)| {
            let mean = acc.mean();
            let half = acc.ci_half_width();
            IntervalPoint {
                category,
                mean,
                count: acc.count,
                ci_low: mean - half,
                ci_high: mean + half,
            }
        })
        .collect()
}

/// Reorder groups by a fixed category order, dropping absent categories.
fn in_fixed_order<K: PartialEq + Copy>(
    groups: Vec<(K, MeanAccumulator)>,
    order: &[K],
) -> Vec<(K, MeanAccumulator)> {
    order
        .iter()
        .filter_map(|k| groups.iter().find(|(g, _)| g == k).copied())
        .collect()
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

pub fn mean_by_hour(records: &[&EnrichedRecord]) -> Vec<SeriesPoint<u32>> {
    let mut groups = group_totals(records, |r| Some(r.hour));
    groups.sort_by_key(|(hour, _)| *hour);
    to_points(groups)
}

pub fn mean_by_weekday(records: &[&EnrichedRecord]) -> Vec<IntervalPoint<DayOfWeek>> {
    let groups = group_totals(records, |r| Some(r.day_of_week));
    to_interval_points(in_fixed_order(groups, &DayOfWeek::ORDER))
}

pub fn mean_by_month(records: &[&EnrichedRecord]) -> Vec<SeriesPoint<u32>> {
    let mut groups = group_totals(records, |r| Some(r.month));
    groups.sort_by_key(|(month, _)| *month);
    to_points(groups)
}

/// Seasons in discovery order; records without a season name are skipped.
pub fn mean_by_season(records: &[&EnrichedRecord]) -> Vec<IntervalPoint<Season>> {
    to_interval_points(group_totals(records, |r| r.season_name))
}

pub fn mean_by_day_period(records: &[&EnrichedRecord]) -> Vec<IntervalPoint<DayPeriod>> {
    let groups = group_totals(records, |r| Some(r.day_period));
    to_interval_points(in_fixed_order(groups, &DayPeriod::ORDER))
}

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// First maximum over an ascending hour series.
fn peak_of(by_hour: &[SeriesPoint<u32>]) -> Option<u32> {
    let mut best: Option<&SeriesPoint<u32>> = None;
    for point in by_hour {
        match best {
            Some(b) if b.mean >= point.mean => {}
            _ => best = Some(point),
        }
    }
    best.map(|p| p.category)
}

fn indicators_with(records: &[&EnrichedRecord], by_hour: &[SeriesPoint<u32>]) -> Indicators {
    let mut ind = Indicators::default();
    for rec in records {
        ind.total_rentals += rec.record.total;
        ind.total_casual += rec.record.casual;
        ind.total_registered += rec.record.registered;
    }
    if !records.is_empty() {
        ind.avg_hourly_rentals = ind.total_rentals / records.len() as u64;
    }
    ind.peak_hour = peak_of(by_hour);
    ind
}

pub fn indicators(records: &[&EnrichedRecord]) -> Indicators {
    indicators_with(records, &mean_by_hour(records))
}

/// Compute every indicator and series over `records`.
pub fn summarize(records: &[&EnrichedRecord]) -> Summary {
    let by_hour = mean_by_hour(records);
    Summary {
        record_count: records.len(),
        indicators: indicators_with(records, &by_hour),
        by_weekday: mean_by_weekday(records),
        by_month: mean_by_month(records),
        by_season: mean_by_season(records),
        by_day_period: mean_by_day_period(records),
        by_hour,
    }
}

/// Summarize a filtered view.
pub fn aggregate(view: &FilteredView<'_>) -> DashboardView {
    let records: Vec<&EnrichedRecord> = view.iter().collect();
    DashboardView {
        filters: view.filter().clone(),
        summary: summarize(&records),
    }
}

/// Filter and summarize in one pass over an immutable table.
pub fn filter_and_aggregate(
    table: &EnrichedTable,
    year: YearFilter,
    working_day: WorkingDayFilter,
    seasons: &BTreeSet<Season>,
) -> DashboardView {
    let filter = FilterState {
        year,
        working_day,
        seasons: seasons.clone(),
    };
    aggregate(&FilteredView::new(table, &filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::derive::enrich;
    use crate::data::model::{RentalRecord, RentalTable};

    fn raw(datetime: &str, season: i64, casual: u64, registered: u64) -> RentalRecord {
        RentalRecord {
            datetime: datetime.to_string(),
            season,
            holiday: Some(0),
            workingday: 1,
            weather: Some(1),
            temp: None,
            atemp: None,
            humidity: None,
            windspeed: None,
            casual,
            registered,
            total: casual + registered,
        }
    }

    fn enriched(rows: Vec<RentalRecord>) -> EnrichedTable {
        enrich(&RentalTable::new(rows)).unwrap()
    }

    fn all(table: &EnrichedTable) -> Vec<&EnrichedRecord> {
        table.records.iter().collect()
    }

    #[test]
    fn hourly_means_and_peak() {
        let table = enriched(vec![
            raw("2011-01-03 08:00:00", 1, 2, 8),
            raw("2011-01-04 08:00:00", 1, 5, 25),
            raw("2011-01-04 20:00:00", 1, 1, 4),
        ]);
        let records = all(&table);

        let by_hour = mean_by_hour(&records);
        let pairs: Vec<(u32, f64)> = by_hour.iter().map(|p| (p.category, p.mean)).collect();
        assert_eq!(pairs, [(8, 20.0), (20, 5.0)]);
        assert_eq!(indicators(&records).peak_hour, Some(8));
    }

    #[test]
    fn peak_hour_ties_go_to_lowest_hour() {
        let table = enriched(vec![
            raw("2011-01-03 17:00:00", 1, 0, 30),
            raw("2011-01-03 07:00:00", 1, 0, 30),
            raw("2011-01-03 12:00:00", 1, 0, 10),
        ]);
        assert_eq!(indicators(&all(&table)).peak_hour, Some(7));
    }

    #[test]
    fn totals_split_into_casual_and_registered() {
        let table = enriched(vec![
            raw("2011-05-01 10:00:00", 2, 12, 40),
            raw("2011-05-01 11:00:00", 2, 30, 71),
            raw("2011-05-01 12:00:00", 2, 0, 9),
        ]);
        let ind = indicators(&all(&table));
        assert_eq!(ind.total_rentals, 162);
        assert_eq!(ind.total_rentals, ind.total_casual + ind.total_registered);
        // 162 / 3 = 54
        assert_eq!(ind.avg_hourly_rentals, 54);
    }

    #[test]
    fn average_is_truncated() {
        let table = enriched(vec![
            raw("2011-05-01 10:00:00", 2, 0, 10),
            raw("2011-05-01 11:00:00", 2, 0, 11),
        ]);
        assert_eq!(indicators(&all(&table)).avg_hourly_rentals, 10);
    }

    #[test]
    fn empty_subset_degrades_gracefully() {
        let summary = summarize(&[]);
        assert_eq!(summary.record_count, 0);
        assert_eq!(summary.indicators, Indicators::default());
        assert_eq!(summary.indicators.peak_hour, None);
        assert!(summary.by_hour.is_empty());
        assert!(summary.by_weekday.is_empty());
        assert!(summary.by_month.is_empty());
        assert!(summary.by_season.is_empty());
        assert!(summary.by_day_period.is_empty());
    }

    #[test]
    fn weekday_series_is_monday_first() {
        // Sunday 2011-01-02, Monday 2011-01-03, Wednesday 2011-01-05
        let table = enriched(vec![
            raw("2011-01-02 10:00:00", 1, 0, 4),
            raw("2011-01-05 10:00:00", 1, 0, 6),
            raw("2011-01-03 10:00:00", 1, 0, 8),
        ]);
        let days: Vec<DayOfWeek> = mean_by_weekday(&all(&table)).iter().map(|p| p.category).collect();
        assert_eq!(days, [DayOfWeek::Monday, DayOfWeek::Wednesday, DayOfWeek::Sunday]);
    }

    #[test]
    fn month_series_is_ascending() {
        let table = enriched(vec![
            raw("2011-11-02 10:00:00", 4, 0, 4),
            raw("2011-02-05 10:00:00", 1, 0, 6),
            raw("2012-02-03 10:00:00", 1, 0, 8),
        ]);
        let months: Vec<(u32, f64, usize)> = mean_by_month(&all(&table))
            .iter()
            .map(|p| (p.category, p.mean, p.count))
            .collect();
        assert_eq!(months, [(2, 7.0, 2), (11, 4.0, 1)]);
    }

    #[test]
    fn season_series_keeps_discovery_order() {
        let table = enriched(vec![
            raw("2011-09-01 10:00:00", 3, 0, 4),
            raw("2011-02-01 10:00:00", 1, 0, 6),
            raw("2011-09-02 10:00:00", 3, 0, 8),
            raw("2011-09-03 10:00:00", 9, 0, 100),
        ]);
        let seasons: Vec<(Season, f64)> = mean_by_season(&all(&table))
            .iter()
            .map(|p| (p.category, p.mean))
            .collect();
        assert_eq!(seasons, [(Season::Fall, 6.0), (Season::Spring, 6.0)]);
    }

    #[test]
    fn day_period_interval_is_symmetric() {
        let table = enriched(vec![
            raw("2011-01-03 07:00:00", 1, 0, 10),
            raw("2011-01-03 08:00:00", 1, 0, 20),
            raw("2011-01-03 09:00:00", 1, 0, 30),
            raw("2011-01-03 02:00:00", 1, 0, 3),
        ]);
        let series = mean_by_day_period(&all(&table));
        let order: Vec<DayPeriod> = series.iter().map(|p| p.category).collect();
        assert_eq!(order, [DayPeriod::Night, DayPeriod::Morning]);

        let night = &series[0];
        assert_eq!((night.ci_low, night.ci_high), (3.0, 3.0));

        // n = 3, s = 10, t(0.975, 2) ≈ 4.3027 → half width ≈ 24.841
        let morning = &series[1];
        assert_eq!(morning.mean, 20.0);
        assert!((morning.half_width() - 24.841).abs() < 1e-2);
        assert!(((morning.mean - morning.ci_low) - (morning.ci_high - morning.mean)).abs() < 1e-9);
    }

    #[test]
    fn weekday_and_season_means_carry_intervals() {
        // Mondays 2011-01-03 and 2011-01-10 (Spring), Saturday 2011-07-02 (Fall)
        let table = enriched(vec![
            raw("2011-01-03 08:00:00", 1, 0, 10),
            raw("2011-01-10 08:00:00", 1, 0, 30),
            raw("2011-07-02 08:00:00", 3, 0, 7),
        ]);
        let records = all(&table);

        // n = 2, s = 14.142, t(0.975, 1) ≈ 12.706 → half width ≈ 127.06
        let weekdays = mean_by_weekday(&records);
        assert_eq!(weekdays[0].category, DayOfWeek::Monday);
        assert_eq!(weekdays[0].mean, 20.0);
        assert!((weekdays[0].half_width() - 127.06).abs() < 0.1);
        assert_eq!((weekdays[1].ci_low, weekdays[1].ci_high), (7.0, 7.0));

        let seasons = mean_by_season(&records);
        assert_eq!(seasons[0].category, Season::Spring);
        assert!((seasons[0].half_width() - weekdays[0].half_width()).abs() < 1e-9);
        assert_eq!(seasons[1].half_width(), 0.0);
    }

    #[test]
    fn spread_is_stable_for_large_offsets() {
        // Values 1e9 + {4, 7, 13, 16}: s² = 30 exactly.
        let mut acc = MeanAccumulator::default();
        for v in [4.0, 7.0, 13.0, 16.0] {
            acc.push(1e9 + v);
        }
        assert_eq!(acc.mean(), 1e9 + 10.0);
        assert!((acc.std_dev() - 30f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn identity_filter_matches_full_table() {
        let table = enriched(vec![
            raw("2011-01-03 08:00:00", 1, 3, 7),
            raw("2011-06-04 13:00:00", 2, 9, 21),
            raw("2012-09-05 18:00:00", 3, 4, 40),
            raw("2012-12-06 23:00:00", 4, 1, 2),
        ]);
        let view = filter_and_aggregate(&table, YearFilter::All, WorkingDayFilter::All, &Season::all());
        assert_eq!(view.summary, summarize(&all(&table)));
        assert_eq!(view.filters, FilterState::default());
    }

    #[test]
    fn empty_season_list_gives_sentinel() {
        let table = enriched(vec![raw("2011-01-03 08:00:00", 1, 3, 7)]);
        let view = filter_and_aggregate(&table, YearFilter::All, WorkingDayFilter::All, &BTreeSet::new());
        assert_eq!(view.summary.indicators.total_rentals, 0);
        assert_eq!(view.summary.indicators.avg_hourly_rentals, 0);
        assert_eq!(view.summary.indicators.peak_hour, None);
    }

    #[test]
    fn view_serializes_flat() {
        let table = enriched(vec![raw("2011-01-03 08:00:00", 1, 3, 7)]);
        let view = filter_and_aggregate(&table, YearFilter::Year(2011), WorkingDayFilter::Working, &Season::all());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["record_count"], 1);
        assert_eq!(json["indicators"]["peak_hour"], 8);
        assert_eq!(json["by_season"][0]["category"], "Spring");
        assert_eq!(json["filters"]["year"], 2011);
        assert_eq!(json["filters"]["working_day"], 1);
        assert!(json["by_weekday"][0]["ci_low"].is_number());

        let view = filter_and_aggregate(&table, YearFilter::All, WorkingDayFilter::All, &Season::all());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["filters"]["year"], "All");
        assert_eq!(json["filters"]["working_day"], "All");
    }
}
