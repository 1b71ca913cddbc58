#![allow(dead_code)]

use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};

use snapwatch::{
    Item, PageRequest, ScanFilter, SnapshotPage, SnapshotSource, SnapshotStore, SnapshotTag,
    SnapshotType, SourceSnapshot, StoreError,
};

// ---------- helpers ----------

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("snapwatch-test-{prefix}-{pid}-{t}-{id}"))
}

/// Fixed "now" so cutoffs are reproducible.
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub fn snap(id: &str, start_time: DateTime<Utc>) -> SourceSnapshot {
    SourceSnapshot {
        snapshot_id: id.to_string(),
        start_time,
        volume_size: Some(8),
        description: Some(format!("public snapshot {id}")),
        tags: vec![SnapshotTag {
            key: "Name".into(),
            value: id.to_string(),
        }],
        encrypted: false,
        owner_id: "123456789012".into(),
        owner_alias: None,
    }
}

pub fn snap_aged(id: &str, now: DateTime<Utc>, age: Duration) -> SourceSnapshot {
    snap(id, now - age)
}

// ---------- fake source ----------

/// Serves pre-built pages. Page i is reached with token "p{i}".
pub struct PagedSource {
    kind: SnapshotType,
    pages: Vec<SnapshotPage>,
    /// Tokens the collector sent, in order.
    pub seen_tokens: RefCell<Vec<Option<String>>>,
    pub seen_page_sizes: RefCell<Vec<i32>>,
    fail_on_page: Option<usize>,
}

impl PagedSource {
    pub fn ec2(pages: Vec<Vec<SourceSnapshot>>) -> Self {
        let n = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, snapshots)| SnapshotPage {
                snapshots,
                next_token: if i + 1 < n { Some(format!("p{}", i + 1)) } else { None },
            })
            .collect();
        Self::from_pages(SnapshotType::Ec2, pages)
    }

    pub fn from_pages(kind: SnapshotType, pages: Vec<SnapshotPage>) -> Self {
        Self {
            kind,
            pages,
            seen_tokens: RefCell::new(Vec::new()),
            seen_page_sizes: RefCell::new(Vec::new()),
            fail_on_page: None,
        }
    }

    pub fn failing_on_page(mut self, page: usize) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    pub fn calls(&self) -> usize {
        self.seen_tokens.borrow().len()
    }
}

impl SnapshotSource for PagedSource {
    fn snapshot_type(&self) -> SnapshotType {
        self.kind
    }

    fn fetch_page(&self, _region: &str, request: PageRequest<'_>) -> Result<SnapshotPage> {
        self.seen_tokens
            .borrow_mut()
            .push(request.next_token.map(|t| t.to_string()));
        self.seen_page_sizes.borrow_mut().push(request.page_size);

        let idx = match request.next_token {
            None => 0,
            Some(t) => t
                .strip_prefix('p')
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| anyhow!("unknown token {t}"))?,
        };
        if self.fail_on_page == Some(idx) {
            return Err(anyhow!("throttled on page {idx}"));
        }
        self.pages
            .get(idx)
            .cloned()
            .ok_or_else(|| anyhow!("page {idx} out of range"))
    }
}

// ---------- fake stores ----------

/// Rejects writes for the listed ids; everything else goes to `inner`.
pub struct FlakyStore<S> {
    pub inner: S,
    pub reject: Vec<String>,
    pub attempts: RefCell<Vec<String>>,
}

impl<S: SnapshotStore> FlakyStore<S> {
    pub fn new(inner: S, reject: &[&str]) -> Self {
        Self {
            inner,
            reject: reject.iter().map(|s| s.to_string()).collect(),
            attempts: RefCell::new(Vec::new()),
        }
    }
}

impl<S: SnapshotStore> SnapshotStore for FlakyStore<S> {
    fn put_if_absent(&self, item: &Item) -> Result<(), StoreError> {
        let key = snapwatch::store::item_key(item)?.to_string();
        self.attempts.borrow_mut().push(key.clone());
        if self.reject.contains(&key) {
            return Err(StoreError::Backend(format!("provisioned throughput exceeded for {key}")));
        }
        self.inner.put_if_absent(item)
    }

    fn scan(&self, filter: Option<&ScanFilter>) -> Result<Vec<Item>, StoreError> {
        self.inner.scan(filter)
    }
}

/// Every operation fails.
pub struct BrokenStore;

impl SnapshotStore for BrokenStore {
    fn put_if_absent(&self, _item: &Item) -> Result<(), StoreError> {
        Err(StoreError::Backend("table is unavailable".into()))
    }

    fn scan(&self, _filter: Option<&ScanFilter>) -> Result<Vec<Item>, StoreError> {
        Err(StoreError::Backend("table is unavailable".into()))
    }
}
