//! Line-driven session: one filter line in, one report out.
//!
//! Each line holds `key=value` terms (`year=2011 workingday=1
//! seasons=Spring,Fall`) applied on top of the current selection.  `reset`
//! restores the defaults, `quit`/`exit` ends the session, blank lines and
//! `#` comments are skipped.  Bad lines and failed reloads are reported on
//! the output and the session carries on.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::config::OutputFormat;
use crate::data::aggregate::aggregate;
use crate::data::cache::EnrichmentCache;
use crate::data::filter::{FilterState, FilteredView};
use crate::report::write_view;

/// What a finished session did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Reports written.
    pub views: usize,
    /// Lines rejected or skipped because the data could not be reloaded.
    pub errors: usize,
}

/// Run a session over `input`, writing reports and error lines to `out`.
///
/// The table is fetched through `cache` on every line, so it is reloaded
/// only when the file at `path` changed since the previous line.  Only I/O
/// errors on `input` or `out` end the session early.
pub fn run_session<R: BufRead, W: Write>(
    cache: &mut EnrichmentCache,
    path: &Path,
    defaults: &FilterState,
    format: OutputFormat,
    input: R,
    mut out: W,
) -> io::Result<SessionOutcome> {
    let mut outcome = SessionOutcome::default();
    let mut filter = defaults.clone();

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        if line.eq_ignore_ascii_case("reset") {
            filter = defaults.clone();
        } else {
            match filter.with_terms(line) {
                Ok(next) => filter = next,
                Err(e) => {
                    log::warn!("Ignoring filter line '{line}': {e}");
                    writeln!(out, "error: {e}")?;
                    outcome.errors += 1;
                    continue;
                }
            }
        }

        let table = match cache.get_or_load(path) {
            Ok(table) => table,
            Err(e) => {
                log::error!("Reload of {} failed: {e}", path.display());
                writeln!(out, "error: {e}")?;
                outcome.errors += 1;
                continue;
            }
        };
        let view = aggregate(&FilteredView::new(&table, &filter));
        write_view(&mut out, &view, format)?;
        outcome.views += 1;
    }

    let stats = cache.stats();
    log::debug!("Session cache: {} hits, {} misses", stats.hits, stats.misses);
    Ok(outcome)
}
