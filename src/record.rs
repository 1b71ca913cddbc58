//! SnapshotRecord: the persisted shape of one discovered snapshot.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::item::{drop_empty_strings, AttrValue, Item};
use crate::source::SourceSnapshot;

// Attribute names as stored in the table.
pub const ATTR_SNAPSHOT_ID: &str = "snapshotId";
pub const ATTR_SNAPSHOT_TYPE: &str = "snapshotType";
pub const ATTR_START_TIME: &str = "startTime";
pub const ATTR_VOLUME_SIZE: &str = "volumeSize";
pub const ATTR_DESCRIPTION: &str = "description";
pub const ATTR_TAGS: &str = "tags";
pub const ATTR_ENCRYPTED: &str = "encrypted";
pub const ATTR_AWS_REGION: &str = "awsRegion";
pub const ATTR_OWNER_ID: &str = "ownerId";
pub const ATTR_OWNER_ALIAS: &str = "ownerAlias";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SnapshotType {
    Ec2,
    Rds,
    RdsCluster,
}

impl SnapshotType {
    pub const ALL: [SnapshotType; 3] = [SnapshotType::Ec2, SnapshotType::Rds, SnapshotType::RdsCluster];

    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotType::Ec2 => "EC2",
            SnapshotType::Rds => "RDS",
            SnapshotType::RdsCluster => "RDSCluster",
        }
    }
}

impl fmt::Display for SnapshotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EC2" => Ok(SnapshotType::Ec2),
            "RDS" => Ok(SnapshotType::Rds),
            "RDSCluster" => Ok(SnapshotType::RdsCluster),
            other => Err(anyhow!("unknown snapshot type '{}'", other)),
        }
    }
}

/// Provider tag, serialized with the provider's own key casing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotRecord {
    pub snapshot_id: String,
    pub snapshot_type: SnapshotType,
    pub start_time: DateTime<Utc>,
    pub volume_size: i64,
    pub description: Option<String>,
    pub tags: Vec<SnapshotTag>,
    pub encrypted: bool,
    pub aws_region: String,
    pub owner_id: String,
    pub owner_alias: Option<String>,
}

impl SnapshotRecord {
    pub fn from_source(snap: &SourceSnapshot, snapshot_type: SnapshotType, region: &str) -> Self {
        Self {
            snapshot_id: snap.snapshot_id.clone(),
            snapshot_type,
            start_time: snap.start_time,
            volume_size: snap.volume_size.unwrap_or(0),
            description: snap.description.clone(),
            tags: snap.tags.clone(),
            encrypted: snap.encrypted,
            aws_region: region.to_string(),
            owner_id: snap.owner_id.clone(),
            owner_alias: snap.owner_alias.clone(),
        }
    }

    /// Build the store item. Empty strings never reach the store.
    pub fn to_item(&self) -> Result<Item> {
        let tags = serde_json::to_string(&self.tags).context("serialize tags")?;

        let mut item = Item::new();
        item.insert(ATTR_SNAPSHOT_ID.into(), AttrValue::S(self.snapshot_id.clone()));
        item.insert(ATTR_SNAPSHOT_TYPE.into(), AttrValue::S(self.snapshot_type.as_str().into()));
        item.insert(ATTR_START_TIME.into(), AttrValue::S(self.start_time.to_rfc3339()));
        item.insert(ATTR_VOLUME_SIZE.into(), AttrValue::number(self.volume_size));
        item.insert(
            ATTR_DESCRIPTION.into(),
            AttrValue::S(self.description.clone().unwrap_or_default()),
        );
        item.insert(ATTR_TAGS.into(), AttrValue::S(tags));
        item.insert(ATTR_ENCRYPTED.into(), AttrValue::Bool(self.encrypted));
        item.insert(ATTR_AWS_REGION.into(), AttrValue::S(self.aws_region.clone()));
        item.insert(ATTR_OWNER_ID.into(), AttrValue::S(self.owner_id.clone()));
        item.insert(
            ATTR_OWNER_ALIAS.into(),
            AttrValue::S(self.owner_alias.clone().unwrap_or_default()),
        );

        drop_empty_strings(&mut item);
        Ok(item)
    }

    /// Parse a stored item back. Optional attributes fall back to defaults.
    pub fn from_item(item: &Item) -> Result<Self> {
        let text = |name: &str| -> Option<String> {
            item.get(name).and_then(AttrValue::as_str).map(str::to_string)
        };
        let required = |name: &str| -> Result<String> {
            text(name).ok_or_else(|| anyhow!("item is missing '{}'", name))
        };

        let snapshot_id = required(ATTR_SNAPSHOT_ID)?;
        let snapshot_type: SnapshotType = required(ATTR_SNAPSHOT_TYPE)?.parse()?;
        let raw_start = required(ATTR_START_TIME)?;
        let start_time = DateTime::parse_from_rfc3339(&raw_start)
            .with_context(|| format!("bad startTime '{}' on {}", raw_start, snapshot_id))?
            .with_timezone(&Utc);
        let tags = match text(ATTR_TAGS) {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("bad tags on {}", snapshot_id))?,
            None => Vec::new(),
        };

        Ok(Self {
            volume_size: item.get(ATTR_VOLUME_SIZE).and_then(AttrValue::as_i64).unwrap_or(0),
            description: text(ATTR_DESCRIPTION),
            tags,
            encrypted: item.get(ATTR_ENCRYPTED).and_then(AttrValue::as_bool).unwrap_or(false),
            aws_region: text(ATTR_AWS_REGION).unwrap_or_default(),
            owner_id: text(ATTR_OWNER_ID).unwrap_or_default(),
            owner_alias: text(ATTR_OWNER_ALIAS),
            snapshot_id,
            snapshot_type,
            start_time,
        })
    }
}
