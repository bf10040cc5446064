//! Bike-rental dashboard CLI
//!
//! Prints the indicators and grouped means for a filter selection.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use bikeshare_dashboard::config::{DashboardConfig, OutputFormat};
use bikeshare_dashboard::report::write_view;
use bikeshare_dashboard::{
    aggregate, run_session, EnrichmentCache, FilterState, FilteredView, Season, WorkingDayFilter,
    YearFilter, VERSION,
};

#[derive(Parser)]
#[command(name = "bikeshare-dashboard")]
#[command(version = VERSION)]
#[command(about = "Exploratory analysis of hourly bike-rental data", long_about = None)]
struct Cli {
    /// JSON file with default data path, filters and output format
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute one report for the given filters
    Report {
        /// Data file (.csv, .json or .parquet)
        data: Option<PathBuf>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// List the values offered by the year selector
    Years {
        /// Data file (.csv, .json or .parquet)
        data: Option<PathBuf>,
    },

    /// Read filter lines from stdin and print a report for each
    ///
    /// Each line holds terms such as `year=2011 workingday=1 seasons=Spring,Fall`.
    /// Terms not given keep their previous value; `reset` restores the defaults.
    Session {
        /// Data file (.csv, .json or .parquet)
        data: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Year to keep, or "all"
    #[arg(long)]
    year: Option<YearFilter>,

    /// Working-day flag to keep: all, 0 or 1
    #[arg(long)]
    working_day: Option<WorkingDayFilter>,

    /// Season to keep (repeatable); defaults to all four
    #[arg(long = "season")]
    seasons: Vec<Season>,

    /// Select no season at all
    #[arg(long, conflicts_with = "seasons")]
    no_seasons: bool,
}

impl FilterArgs {
    fn apply(&self, mut filter: FilterState) -> FilterState {
        if let Some(year) = self.year {
            filter.year = year;
        }
        if let Some(working_day) = self.working_day {
            filter.working_day = working_day;
        }
        if self.no_seasons {
            filter.seasons.clear();
        } else if !self.seasons.is_empty() {
            filter.seasons = self.seasons.iter().copied().collect();
        }
        filter
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };

    match cli.command {
        Commands::Report {
            data,
            filters,
            format,
        } => {
            let path = data_path(data, &config)?;
            let filter = filters.apply(config.filter_state()?);
            cmd_report(&path, &filter, format.unwrap_or(config.format))
        }
        Commands::Years { data } => cmd_years(&data_path(data, &config)?),
        Commands::Session { data, format } => {
            let path = data_path(data, &config)?;
            cmd_session(&path, config.filter_state()?, format.unwrap_or(config.format))
        }
    }
}

fn data_path(arg: Option<PathBuf>, config: &DashboardConfig) -> Result<PathBuf> {
    match arg.or_else(|| config.data_path.clone()) {
        Some(path) => Ok(path),
        None => bail!("no data file given (pass a path or set data_path in the config)"),
    }
}

fn cmd_report(path: &Path, filter: &FilterState, format: OutputFormat) -> Result<()> {
    let mut cache = EnrichmentCache::new();
    let table = cache
        .get_or_load(path)
        .with_context(|| format!("loading {}", path.display()))?;

    let view = aggregate(&FilteredView::new(&table, filter));
    write_view(&mut io::stdout().lock(), &view, format).context("writing report")
}

fn cmd_years(path: &Path) -> Result<()> {
    let mut cache = EnrichmentCache::new();
    let table = cache
        .get_or_load(path)
        .with_context(|| format!("loading {}", path.display()))?;

    println!("All");
    for year in table.years() {
        println!("{year}");
    }
    Ok(())
}

fn cmd_session(path: &Path, defaults: FilterState, format: OutputFormat) -> Result<()> {
    let mut cache = EnrichmentCache::new();
    // The session cannot start without data.
    cache
        .get_or_load(path)
        .with_context(|| format!("loading {}", path.display()))?;

    let outcome = run_session(
        &mut cache,
        path,
        &defaults,
        format,
        io::stdin().lock(),
        io::stdout().lock(),
    )
    .context("session I/O")?;
    log::info!("Session ended: {} reports, {} errors", outcome.views, outcome.errors);
    Ok(())
}
