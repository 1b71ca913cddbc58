//! LocalTable: embedded, durable, insert-only snapshot table.
//!
//! One append-only file (<root>/snapshots.tbl, see frame.rs) plus an
//! in-memory index rebuilt from it. Every operation first catches up with
//! frames appended by other processes since the last look, so several
//! collectors may share a table directory.
//!
//! Conditional insert = exclusive lock, catch up, key check, append, fsync.
//! The lock is what makes two overlapping collectors write an id once.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::frame::{
    read_frame, read_table_header, write_frame, write_table_header, REC_PUT, TABLE_HDR_SIZE,
};
use super::lock::{acquire_lock, LockMode};
use super::{item_key, ScanFilter, SnapshotStore, StoreError};
use crate::item::Item;

pub const TABLE_FILE: &str = "snapshots.tbl";

pub struct LocalTable {
    root: PathBuf,
    table_id: u64,
    state: Mutex<TableState>,
}

struct TableState {
    file: File,
    /// Offset right after the last frame folded into the index.
    synced_to: u64,
    items: Vec<Item>,
    keys: HashSet<String>,
}

impl LocalTable {
    /// Open (creating if needed) the table under `root`.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root)?;
        let _lock = lock(root, LockMode::Exclusive)?;

        let path = root.join(TABLE_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;

        let existing = file.metadata()?.len();
        if existing < TABLE_HDR_SIZE as u64 {
            // empty, or a crash while the header was being written
            if existing > 0 {
                warn!(
                    "table: {} holds a partial header ({} byte(s)), rewriting",
                    path.display(),
                    existing
                );
                file.set_len(0)?;
            }
            let table_id = generate_table_id();
            write_table_header(&mut file, table_id)?;
            file.sync_all()?;
            info!("table: created {} (id {:016x})", path.display(), table_id);
        }
        let table_id = read_table_header(&mut file)?;

        let mut state = TableState {
            file,
            synced_to: TABLE_HDR_SIZE as u64,
            items: Vec::new(),
            keys: HashSet::new(),
        };
        state.catch_up()?;
        debug!(
            "table: opened {} with {} item(s)",
            path.display(),
            state.items.len()
        );

        Ok(Self {
            root: root.to_path_buf(),
            table_id,
            state: Mutex::new(state),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    /// Number of items, as of the latest catch-up.
    pub fn len(&self) -> Result<usize, StoreError> {
        let _lock = lock(&self.root, LockMode::Shared)?;
        let mut st = self.state()?;
        st.catch_up()?;
        Ok(st.items.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, TableState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Lock("table state mutex poisoned".into()))
    }
}

impl SnapshotStore for LocalTable {
    fn put_if_absent(&self, item: &Item) -> Result<(), StoreError> {
        let key = item_key(item)?.to_string();
        let payload = serde_json::to_vec(item)?;

        let _lock = lock(&self.root, LockMode::Exclusive)?;
        let mut st = self.state()?;
        st.catch_up()?;

        if st.keys.contains(&key) {
            return Err(StoreError::AlreadyExists(key));
        }

        let file_len = st.file.metadata()?.len();
        if file_len > st.synced_to {
            warn!(
                "table: dropping torn tail ({} byte(s) after offset {})",
                file_len - st.synced_to,
                st.synced_to
            );
            st.file.set_len(st.synced_to)?;
        }

        let pos = st.synced_to;
        st.file.seek(SeekFrom::Start(pos))?;
        write_frame(&mut st.file, REC_PUT, &payload)?;
        st.file.sync_data()?;

        st.synced_to = st.file.stream_position()?;
        st.keys.insert(key);
        st.items.push(item.clone());
        Ok(())
    }

    fn scan(&self, filter: Option<&ScanFilter>) -> Result<Vec<Item>, StoreError> {
        let _lock = lock(&self.root, LockMode::Shared)?;
        let mut st = self.state()?;
        st.catch_up()?;
        Ok(st
            .items
            .iter()
            .filter(|it| filter.map_or(true, |f| f.matches(it)))
            .cloned()
            .collect())
    }
}

impl TableState {
    /// Fold frames appended since `synced_to` into the index.
    fn catch_up(&mut self) -> Result<(), StoreError> {
        let file_len = self.file.metadata()?.len();
        let mut pos = self.synced_to;
        let mut folded = 0usize;

        while let Some((frame, next)) = read_frame(&mut self.file, pos, file_len)? {
            if frame.rec_type == REC_PUT {
                let item: Item = serde_json::from_slice(&frame.payload)?;
                let key = item_key(&item)?.to_string();
                if self.keys.insert(key) {
                    self.items.push(item);
                    folded += 1;
                } else {
                    warn!("table: duplicate key in log at pos {}, keeping first", pos);
                }
            } else {
                debug!("table: skipping unknown frame type {} at pos {}", frame.rec_type, pos);
            }
            pos = next;
        }

        self.synced_to = pos;
        if folded > 0 {
            debug!("table: caught up {} item(s), now at offset {}", folded, pos);
        }
        Ok(())
    }
}

fn lock(root: &Path, mode: LockMode) -> Result<super::lock::LockGuard, StoreError> {
    acquire_lock(root, mode).map_err(|e| StoreError::Lock(format!("{:#}", e)))
}

fn generate_table_id() -> u64 {
    use rand::RngCore;
    let mut buf = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    LittleEndian::read_u64(&buf)
}
