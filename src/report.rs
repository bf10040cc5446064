//! Plain-text rendering of a [`DashboardView`] for terminals.

use std::fmt::{self, Display};
use std::io;

use crate::config::OutputFormat;
use crate::data::aggregate::{DashboardView, IntervalPoint, SeriesPoint};

/// `1234567` → `"1,234,567"`.
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Peak hour as `H:00`, or `n/a` for an empty selection.
pub fn peak_hour_label(peak: Option<u32>) -> String {
    match peak {
        Some(hour) => format!("{hour}:00"),
        None => "n/a".to_string(),
    }
}

fn series<K: Display>(f: &mut fmt::Formatter<'_>, title: &str, points: &[SeriesPoint<K>]) -> fmt::Result {
    writeln!(f, "\n{title}")?;
    if points.is_empty() {
        return writeln!(f, "  (no data)");
    }
    for p in points {
        writeln!(f, "  {:<10} {:>9.1}  (n={})", p.category.to_string(), p.mean, p.count)?;
    }
    Ok(())
}

fn interval_series<K: Display>(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    points: &[IntervalPoint<K>],
) -> fmt::Result {
    writeln!(f, "\n{title} (95% CI)")?;
    if points.is_empty() {
        return writeln!(f, "  (no data)");
    }
    for p in points {
        writeln!(
            f,
            "  {:<10} {:>9.1}  [{:.1}, {:.1}]  (n={})",
            p.category.to_string(),
            p.mean,
            p.ci_low,
            p.ci_high,
            p.count
        )?;
    }
    Ok(())
}

/// Aligned text report of a view; `to_string()` gives the whole report.
pub struct TextReport<'a>(pub &'a DashboardView);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = self.0;
        let summary = &view.summary;
        let ind = &summary.indicators;
        let seasons: Vec<String> = view.filters.seasons.iter().map(|s| s.to_string()).collect();

        writeln!(
            f,
            "Filters: year={}  working day={}  seasons=[{}]  ({} records)",
            view.filters.year,
            view.filters.working_day,
            seasons.join(", "),
            thousands(summary.record_count as u64)
        )?;
        writeln!(f, "\nKey indicators")?;
        writeln!(f, "  Total rentals       {:>12}", thousands(ind.total_rentals))?;
        writeln!(f, "  Casual rentals      {:>12}", thousands(ind.total_casual))?;
        writeln!(f, "  Registered rentals  {:>12}", thousands(ind.total_registered))?;
        writeln!(f, "  Avg hourly rentals  {:>12}", ind.avg_hourly_rentals)?;
        writeln!(f, "  Peak hour           {:>12}", peak_hour_label(ind.peak_hour))?;

        series(f, "Mean rentals by hour of day", &summary.by_hour)?;
        interval_series(f, "Mean rentals by day of week", &summary.by_weekday)?;
        series(f, "Mean rentals by month", &summary.by_month)?;
        interval_series(f, "Mean rentals by season", &summary.by_season)?;
        interval_series(f, "Mean rentals by period of day", &summary.by_day_period)
    }
}

/// Render indicators and every series as an aligned text report.
pub fn render_text(view: &DashboardView) -> String {
    TextReport(view).to_string()
}

/// Write one view to `out` as text or pretty JSON, newline-terminated.
pub fn write_view(out: &mut impl io::Write, view: &DashboardView, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{}", TextReport(view)),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, view)?;
            writeln!(out)
        }
    }
}
