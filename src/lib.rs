//! Exploratory analysis core for the hourly bike-rental dataset.
//!
//! Load a table once, enrich it with calendar attributes, then filter and
//! summarize it as often as the user changes the selection:
//!
//! ```no_run
//! use std::path::Path;
//! use bikeshare_dashboard::{EnrichmentCache, FilterState, FilteredView, aggregate};
//!
//! let mut cache = EnrichmentCache::new();
//! let table = cache.get_or_load(Path::new("train.csv"))?;
//! let view = aggregate(&FilteredView::new(&table, &FilterState::default()));
//! println!("{}", bikeshare_dashboard::report::render_text(&view));
//! # Ok::<(), bikeshare_dashboard::DataError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod session;

pub use data::aggregate::{aggregate, filter_and_aggregate, DashboardView, Indicators, Summary};
pub use data::cache::EnrichmentCache;
pub use data::derive::enrich;
pub use data::filter::{FilterState, FilteredView, WorkingDayFilter, YearFilter};
pub use data::loader::load_file;
pub use data::model::{DayOfWeek, DayPeriod, EnrichedRecord, EnrichedTable, RentalRecord, RentalTable, Season};
pub use error::{ConfigError, DataError, FilterParseError, ParseError};
pub use session::{run_session, SessionOutcome};

/// Crate version, shown by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
