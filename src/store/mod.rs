//! Snapshot store: insert-only key-value table keyed by `snapshotId`.
//!
//! Layout:
//! - table.rs : LocalTable, embedded append-only table file (frame.rs + lock.rs).
//! - frame.rs : CRC32C record framing for the table file.
//! - lock.rs  : fs2 advisory lock on <root>/LOCK.
//! - dynamo.rs: DynamoStore, the managed table (feature "aws").

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::config::{SnapConfig, StoreBackend};
use crate::item::{AttrValue, Item};
use crate::record::{SnapshotType, ATTR_SNAPSHOT_ID, ATTR_SNAPSHOT_TYPE};

pub mod frame;
pub mod lock;
pub mod table;

#[cfg(feature = "aws")]
pub mod dynamo;

#[cfg(feature = "aws")]
pub use dynamo::DynamoStore;
pub use table::LocalTable;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Conditional insert rejected: the key is already present.
    #[error("snapshot {0} already exists")]
    AlreadyExists(String),

    #[error("item has no string '{}' attribute", ATTR_SNAPSHOT_ID)]
    MissingKey,

    #[error("table I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode/decode item: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("table corrupted: {0}")]
    Corrupt(String),

    #[error("table lock: {0}")]
    Lock(String),

    #[error("store backend: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }
}

/// Equality filter applied during a scan.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanFilter {
    pub attribute: String,
    pub equals: AttrValue,
}

impl ScanFilter {
    pub fn eq(attribute: impl Into<String>, equals: AttrValue) -> Self {
        Self {
            attribute: attribute.into(),
            equals,
        }
    }

    /// `snapshotType = <raw>`; the value is passed through unvalidated.
    pub fn snapshot_type(raw: &str) -> Self {
        Self::eq(ATTR_SNAPSHOT_TYPE, AttrValue::S(raw.to_string()))
    }

    pub fn for_type(t: SnapshotType) -> Self {
        Self::snapshot_type(t.as_str())
    }

    pub fn matches(&self, item: &Item) -> bool {
        item.get(&self.attribute) == Some(&self.equals)
    }
}

pub trait SnapshotStore {
    /// Insert `item` unless an item with the same `snapshotId` exists.
    fn put_if_absent(&self, item: &Item) -> Result<(), StoreError>;

    /// All items, or those matching `filter`, in store order.
    fn scan(&self, filter: Option<&ScanFilter>) -> Result<Vec<Item>, StoreError>;
}

/// Primary key of an item.
pub fn item_key(item: &Item) -> Result<&str, StoreError> {
    item.get(ATTR_SNAPSHOT_ID)
        .and_then(AttrValue::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(StoreError::MissingKey)
}

/// Open the backend selected by the configuration.
///
/// The DynamoDB backend needs an AWS context; pass the one built at startup.
#[cfg(feature = "aws")]
pub fn open_store(
    cfg: &SnapConfig,
    aws: Option<std::sync::Arc<crate::aws::AwsContext>>,
) -> Result<Box<dyn SnapshotStore>> {
    match cfg.backend {
        StoreBackend::Local => Ok(Box::new(LocalTable::open(Path::new(&cfg.table_path))?)),
        StoreBackend::DynamoDb => {
            let table = cfg
                .table_name
                .clone()
                .ok_or_else(|| anyhow!("TABLE_NAME is not set (required for the dynamodb backend)"))?;
            let aws = match aws {
                Some(a) => a,
                None => std::sync::Arc::new(crate::aws::AwsContext::new()?),
            };
            Ok(Box::new(DynamoStore::new(aws, &cfg.home_region, table)))
        }
    }
}

#[cfg(not(feature = "aws"))]
pub fn open_store(cfg: &SnapConfig) -> Result<Box<dyn SnapshotStore>> {
    match cfg.backend {
        StoreBackend::Local => Ok(Box::new(LocalTable::open(Path::new(&cfg.table_path))?)),
        StoreBackend::DynamoDb => Err(anyhow!(
            "dynamodb backend requires the \"aws\" feature; set SNAPWATCH_BACKEND=local"
        )),
    }
}
