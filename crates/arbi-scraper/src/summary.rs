use std::time::Duration;

use arbi_core::StoreKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one catalog traversal, complete or partial.
///
/// `items_seen == items_accepted + items_rejected + items_failed` holds at
/// every point of a traversal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub store: StoreKind,
    pub section: String,
    pub start_url: String,
    pub started_at: DateTime<Utc>,
    /// Catalog pages fetched and processed, not counting probe fetches.
    pub pages_visited: u32,
    /// Extra fetches spent discovering the page count.
    pub probe_fetches: u32,
    pub total_pages: u32,
    pub items_seen: u32,
    pub items_accepted: u32,
    pub items_rejected: u32,
    /// Listings whose prices did not parse or whose side effects failed.
    pub items_failed: u32,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    #[must_use]
    pub fn new(store: StoreKind, section: impl Into<String>, start_url: impl Into<String>) -> Self {
        Self {
            store,
            section: section.into(),
            start_url: start_url.into(),
            started_at: Utc::now(),
            pages_visited: 0,
            probe_fetches: 0,
            total_pages: 1,
            items_seen: 0,
            items_accepted: 0,
            items_rejected: 0,
            items_failed: 0,
            cancelled: false,
            elapsed: Duration::ZERO,
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "store:    {}", self.store)?;
        writeln!(f, "section:  {}", self.section)?;
        writeln!(f, "url:      {}", self.start_url)?;
        writeln!(
            f,
            "pages:    {} of {} ({} probe fetches)",
            self.pages_visited, self.total_pages, self.probe_fetches
        )?;
        writeln!(
            f,
            "items:    {} seen, {} accepted, {} rejected, {} failed",
            self.items_seen, self.items_accepted, self.items_rejected, self.items_failed
        )?;
        write!(f, "elapsed:  {}", format_elapsed(self.elapsed))?;
        if self.cancelled {
            write!(f, "\nstatus:   cancelled")?;
        }
        Ok(())
    }
}

/// `1h 02m 05s` style, dropping leading zero units.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
