//! EC2 source: DescribeSnapshots restricted to snapshots restorable by all.

use anyhow::{anyhow, Result};
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::Snapshot;
use aws_sdk_ec2::Client;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{PageRequest, SnapshotPage, SnapshotSource, SourceSnapshot};
use crate::aws::AwsContext;
use crate::record::{SnapshotTag, SnapshotType};

/// `RestorableByUserIds` value selecting public snapshots.
const RESTORABLE_BY_ALL: &str = "all";

pub struct Ec2SnapshotSource {
    aws: Arc<AwsContext>,
    // one client per listed region, built on first use
    clients: Mutex<HashMap<String, Client>>,
}

impl Ec2SnapshotSource {
    pub fn new(aws: Arc<AwsContext>) -> Self {
        Self {
            aws,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client(&self, region: &str) -> Client {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        clients
            .entry(region.to_string())
            .or_insert_with(|| {
                debug!("ec2: building client for {}", region);
                Client::new(&self.aws.sdk_config(region))
            })
            .clone()
    }
}

impl SnapshotSource for Ec2SnapshotSource {
    fn snapshot_type(&self) -> SnapshotType {
        SnapshotType::Ec2
    }

    fn fetch_page(&self, region: &str, request: PageRequest<'_>) -> Result<SnapshotPage> {
        let client = self.client(region);
        let out = self
            .aws
            .block_on(
                client
                    .describe_snapshots()
                    .restorable_by_user_ids(RESTORABLE_BY_ALL)
                    .max_results(request.page_size)
                    .set_next_token(request.next_token.map(str::to_string))
                    .send(),
            )
            .map_err(|e| anyhow!("ec2 DescribeSnapshots in {}: {}", region, DisplayErrorContext(&e)))?;

        let mut snapshots = Vec::with_capacity(out.snapshots().len());
        for snap in out.snapshots() {
            match convert(snap) {
                Some(s) => snapshots.push(s),
                None => warn!(
                    "ec2: skipping snapshot without id/start time in {}: {:?}",
                    region,
                    snap.snapshot_id()
                ),
            }
        }

        Ok(SnapshotPage {
            snapshots,
            next_token: out.next_token().map(str::to_string),
        })
    }
}

fn convert(snap: &Snapshot) -> Option<SourceSnapshot> {
    let snapshot_id = snap.snapshot_id()?.to_string();
    let started = snap.start_time()?;
    let start_time = DateTime::<Utc>::from_timestamp(started.secs(), started.subsec_nanos())?;

    let tags = snap
        .tags()
        .iter()
        .map(|t| SnapshotTag {
            key: t.key().unwrap_or_default().to_string(),
            value: t.value().unwrap_or_default().to_string(),
        })
        .collect();

    Some(SourceSnapshot {
        snapshot_id,
        start_time,
        volume_size: snap.volume_size().map(i64::from),
        description: non_empty(snap.description()),
        tags,
        encrypted: snap.encrypted().unwrap_or(false),
        owner_id: snap.owner_id().unwrap_or_default().to_string(),
        owner_alias: non_empty(snap.owner_alias()),
    })
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::primitives::DateTime as SdkDateTime;
    use aws_sdk_ec2::types::Tag;

    #[test]
    fn converts_to_utc_with_subsecond_precision() {
        let snap = Snapshot::builder()
            .snapshot_id("snap-0f00")
            .start_time(SdkDateTime::from_secs_and_nanos(1_725_444_672, 250_000_000))
            .volume_size(100)
            .description("nightly")
            .tags(Tag::builder().key("Name").value("web").build())
            .encrypted(true)
            .owner_id("123456789012")
            .owner_alias("amazon")
            .build();

        let s = convert(&snap).unwrap();
        assert_eq!(s.snapshot_id, "snap-0f00");
        assert_eq!(s.start_time.to_rfc3339(), "2024-09-04T10:11:12.250+00:00");
        assert_eq!(s.volume_size, Some(100));
        assert_eq!(s.description.as_deref(), Some("nightly"));
        assert_eq!(s.tags, vec![SnapshotTag { key: "Name".into(), value: "web".into() }]);
        assert!(s.encrypted);
        assert_eq!(s.owner_alias.as_deref(), Some("amazon"));
    }

    #[test]
    fn missing_fields_fall_back() {
        let snap = Snapshot::builder()
            .snapshot_id("snap-bare")
            .start_time(SdkDateTime::from_secs(1_725_444_672))
            .owner_alias("")
            .build();

        let s = convert(&snap).unwrap();
        assert_eq!(s.volume_size, None);
        assert_eq!(s.description, None);
        assert_eq!(s.owner_alias, None);
        assert_eq!(s.owner_id, "");
        assert!(s.tags.is_empty());
        assert!(!s.encrypted);
    }

    #[test]
    fn id_and_start_time_are_required() {
        let no_id = Snapshot::builder()
            .start_time(SdkDateTime::from_secs(1_725_444_672))
            .build();
        assert!(convert(&no_id).is_none());

        let no_start = Snapshot::builder().snapshot_id("snap-x").build();
        assert!(convert(&no_start).is_none());
    }
}
