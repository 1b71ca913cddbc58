//! Collector: page through snapshot sources, keep what is newer than the
//! cutoff, insert each new snapshot once.
//!
//! Per source (collection strategy):
//! 1. fetch pages until the continuation token runs out;
//! 2. skip snapshots whose start time is at or before the cutoff;
//! 3. map the rest to store items and conditional-insert them.
//!
//! Listing errors abort the run. Store errors are per snapshot: logged,
//! counted, skipped.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::time::Duration;

use crate::config::DEFAULT_PAGE_SIZE;
use crate::metrics;
use crate::record::{SnapshotRecord, SnapshotType};
use crate::source::{PageRequest, SnapshotSource, SourceSnapshot};
use crate::store::SnapshotStore;

/// `now - lookback`, saturating at the earliest representable instant.
pub fn cutoff_from(now: DateTime<Utc>, lookback: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(lookback)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Outcome of one collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectReport {
    pub region: String,
    pub pages: u64,
    /// Snapshots returned by the sources.
    pub scanned: u64,
    /// Snapshots newer than the cutoff (one write attempt each).
    pub candidates: u64,
    /// Newly stored.
    pub stored: u64,
    pub duplicates: u64,
    pub failed: u64,
}

impl CollectReport {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            ..Self::default()
        }
    }

    /// Count of newly stored snapshots.
    pub fn count(&self) -> u64 {
        self.stored
    }

    fn absorb(&mut self, other: &CollectReport) {
        self.pages += other.pages;
        self.scanned += other.scanned;
        self.candidates += other.candidates;
        self.stored += other.stored;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
    }
}

pub struct Collector<'a> {
    store: &'a dyn SnapshotStore,
    sources: Vec<&'a dyn SnapshotSource>,
    page_size: i32,
}

impl<'a> Collector<'a> {
    pub fn new(store: &'a dyn SnapshotStore) -> Self {
        Self {
            store,
            sources: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Add a collection strategy. Strategies run in the order added.
    pub fn with_source(mut self, source: &'a dyn SnapshotSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Collect snapshots newer than `cutoff` listed in `region`.
    pub fn collect(&self, cutoff: DateTime<Utc>, region: &str) -> Result<CollectReport> {
        metrics::record_collect_run();
        let mut total = CollectReport::new(region);
        for source in &self.sources {
            let report = self.collect_from(*source, cutoff, region)?;
            total.absorb(&report);
        }
        Ok(total)
    }

    /// Run a single strategy.
    pub fn collect_from(
        &self,
        source: &dyn SnapshotSource,
        cutoff: DateTime<Utc>,
        region: &str,
    ) -> Result<CollectReport> {
        let kind = source.snapshot_type();
        info!(
            "collect: {} snapshots in {} created after {}",
            kind,
            region,
            cutoff.to_rfc3339()
        );

        let mut report = CollectReport::new(region);
        let mut token: Option<String> = None;

        loop {
            let request = PageRequest {
                page_size: self.page_size,
                next_token: token.as_deref(),
            };
            let page = source
                .fetch_page(region, request)
                .with_context(|| format!("list {} snapshots in {} (page {})", kind, region, report.pages + 1))?;

            report.pages += 1;
            metrics::record_page(page.snapshots.len());
            debug!(
                "collect: page {} of {} in {}: {} snapshot(s)",
                report.pages,
                kind,
                region,
                page.snapshots.len()
            );

            for snap in &page.snapshots {
                report.scanned += 1;
                if snap.start_time <= cutoff {
                    continue;
                }
                report.candidates += 1;
                metrics::record_candidate();
                self.store_snapshot(snap, kind, region, &mut report);
            }

            match page.next_token.filter(|t| !t.is_empty()) {
                None => break,
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    warn!(
                        "collect: {} listing in {} returned the token it was given, stopping",
                        kind, region
                    );
                    break;
                }
                Some(next) => token = Some(next),
            }
        }

        info!(
            "collect: {} in {}: {} page(s), {} scanned, {} new, {} stored, {} duplicate(s), {} failed",
            kind,
            region,
            report.pages,
            report.scanned,
            report.candidates,
            report.stored,
            report.duplicates,
            report.failed
        );
        Ok(report)
    }

    fn store_snapshot(
        &self,
        snap: &SourceSnapshot,
        kind: SnapshotType,
        region: &str,
        report: &mut CollectReport,
    ) {
        let record = SnapshotRecord::from_source(snap, kind, region);
        let item = match record.to_item() {
            Ok(item) => item,
            Err(e) => {
                report.failed += 1;
                metrics::record_store_failure();
                error!("Error storing {} snapshot {}: {:#}", kind, snap.snapshot_id, e);
                return;
            }
        };

        match self.store.put_if_absent(&item) {
            Ok(()) => {
                report.stored += 1;
                metrics::record_stored();
                debug!("collect: stored {} snapshot {}", kind, snap.snapshot_id);
            }
            Err(e) if e.is_duplicate() => {
                report.duplicates += 1;
                metrics::record_duplicate();
                error!("Error storing {} snapshot {}: {}", kind, snap.snapshot_id, e);
            }
            Err(e) => {
                report.failed += 1;
                metrics::record_store_failure();
                error!("Error storing {} snapshot {}: {}", kind, snap.snapshot_id, e);
            }
        }
    }
}
