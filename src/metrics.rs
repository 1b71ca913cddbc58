//! Lightweight process-wide counters.
//!
//! Atomic counters for the two entry points:
//! - collection (pages, snapshots seen/candidates, store outcomes)
//! - query (served, failed)
//!
//! Exposed as Prometheus text on the query server's /metrics.

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Collection -----
static COLLECT_RUNS: AtomicU64 = AtomicU64::new(0);
static PAGES_FETCHED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_SEEN: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_CANDIDATES: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_STORED: AtomicU64 = AtomicU64::new(0);
static STORE_DUPLICATES: AtomicU64 = AtomicU64::new(0);
static STORE_FAILURES: AtomicU64 = AtomicU64::new(0);

// ----- Query -----
static QUERIES_SERVED: AtomicU64 = AtomicU64::new(0);
static QUERY_ERRORS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub collect_runs: u64,
    pub pages_fetched: u64,
    pub snapshots_seen: u64,
    pub snapshots_candidates: u64,
    pub snapshots_stored: u64,
    pub store_duplicates: u64,
    pub store_failures: u64,
    pub queries_served: u64,
    pub query_errors: u64,
}

pub fn record_collect_run() {
    COLLECT_RUNS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_page(snapshots: usize) {
    PAGES_FETCHED.fetch_add(1, Ordering::Relaxed);
    SNAPSHOTS_SEEN.fetch_add(snapshots as u64, Ordering::Relaxed);
}

pub fn record_candidate() {
    SNAPSHOTS_CANDIDATES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_stored() {
    SNAPSHOTS_STORED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_duplicate() {
    STORE_DUPLICATES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_store_failure() {
    STORE_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_query(ok: bool) {
    QUERIES_SERVED.fetch_add(1, Ordering::Relaxed);
    if !ok {
        QUERY_ERRORS.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        collect_runs: COLLECT_RUNS.load(Ordering::Relaxed),
        pages_fetched: PAGES_FETCHED.load(Ordering::Relaxed),
        snapshots_seen: SNAPSHOTS_SEEN.load(Ordering::Relaxed),
        snapshots_candidates: SNAPSHOTS_CANDIDATES.load(Ordering::Relaxed),
        snapshots_stored: SNAPSHOTS_STORED.load(Ordering::Relaxed),
        store_duplicates: STORE_DUPLICATES.load(Ordering::Relaxed),
        store_failures: STORE_FAILURES.load(Ordering::Relaxed),
        queries_served: QUERIES_SERVED.load(Ordering::Relaxed),
        query_errors: QUERY_ERRORS.load(Ordering::Relaxed),
    }
}

/// Prometheus exposition text.
pub fn render_prometheus() -> String {
    let m = snapshot();
    let mut out = String::new();

    let ver = env!("CARGO_PKG_VERSION");
    out.push_str("# HELP snapwatch_build_info Build info.\n");
    out.push_str("# TYPE snapwatch_build_info gauge\n");
    out.push_str(&format!("snapwatch_build_info{{version=\"{}\"}} 1\n", ver));

    let counters: [(&str, &str, u64); 9] = [
        ("snapwatch_collect_runs_total", "Collection runs started.", m.collect_runs),
        ("snapwatch_pages_fetched_total", "Listing pages fetched.", m.pages_fetched),
        ("snapwatch_snapshots_seen_total", "Snapshots returned by sources.", m.snapshots_seen),
        ("snapwatch_snapshots_candidates_total", "Snapshots newer than the cutoff.", m.snapshots_candidates),
        ("snapwatch_snapshots_stored_total", "Snapshots newly stored.", m.snapshots_stored),
        ("snapwatch_store_duplicates_total", "Conditional inserts rejected as duplicates.", m.store_duplicates),
        ("snapwatch_store_failures_total", "Store writes failed for other reasons.", m.store_failures),
        ("snapwatch_queries_total", "Queries served.", m.queries_served),
        ("snapwatch_query_errors_total", "Queries answered with 500.", m.query_errors),
    ];
    for (name, help, value) in counters {
        out.push_str(&format!("# HELP {} {}\n", name, help));
        out.push_str(&format!("# TYPE {} counter\n", name));
        out.push_str(&format!("{} {}\n", name, value));
    }

    out
}
