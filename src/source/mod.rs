//! Snapshot sources: paginated listings of publicly restorable snapshots.
//!
//! A source is one collection strategy. The Collector drives pagination;
//! a source only answers "give me the page after this token".
//!
//! - ec2.rs: EC2 DescribeSnapshots (RestorableBy=all), behind feature "aws".

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::record::{SnapshotTag, SnapshotType};

#[cfg(feature = "aws")]
pub mod ec2;

#[cfg(feature = "aws")]
pub use ec2::Ec2SnapshotSource;

/// Provider-side snapshot metadata, already normalized to UTC.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceSnapshot {
    pub snapshot_id: String,
    pub start_time: DateTime<Utc>,
    pub volume_size: Option<i64>,
    pub description: Option<String>,
    pub tags: Vec<SnapshotTag>,
    pub encrypted: bool,
    pub owner_id: String,
    pub owner_alias: Option<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct PageRequest<'a> {
    pub page_size: i32,
    pub next_token: Option<&'a str>,
}

#[derive(Clone, Debug, Default)]
pub struct SnapshotPage {
    pub snapshots: Vec<SourceSnapshot>,
    /// Continuation token; None (or empty) means this was the last page.
    pub next_token: Option<String>,
}

pub trait SnapshotSource {
    /// Type stamped on every record this source produces.
    fn snapshot_type(&self) -> SnapshotType;

    /// Fetch one page of the listing for `region`.
    fn fetch_page(&self, region: &str, request: PageRequest<'_>) -> Result<SnapshotPage>;
}
