//! Centralized configuration for snapwatch.
//!
//! One place for tunables instead of env lookups scattered across the
//! collector and the query side. `SnapConfig::from_env()` reads:
//! - TABLE_NAME              : DynamoDB table (required for that backend)
//! - SNAPWATCH_BACKEND       : dynamodb | local (default dynamodb)
//! - SNAPWATCH_TABLE_PATH    : directory of the local table (default ./snapwatch-data)
//! - SNAPWATCH_HOME_REGION   : region addressing the store (default eu-central-1)
//! - SNAPWATCH_LOOKBACK_HOURS: collection window (default 3)
//! - SNAPWATCH_PAGE_SIZE     : listing page size (default 1000)
//! - SNAPWATCH_LISTEN        : query server address (default 0.0.0.0:8080)
//!
//! Unparseable values keep the default.

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_HOME_REGION: &str = "eu-central-1";
pub const DEFAULT_LOOKBACK_HOURS: u64 = 3;
pub const DEFAULT_PAGE_SIZE: i32 = 1000;
pub const DEFAULT_TABLE_PATH: &str = "./snapwatch-data";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    Local,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" | "ddb" => Ok(StoreBackend::DynamoDb),
            "local" | "file" => Ok(StoreBackend::Local),
            other => Err(anyhow!("unknown store backend '{}'", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreBackend::DynamoDb => "dynamodb",
            StoreBackend::Local => "local",
        })
    }
}

#[derive(Clone, Debug)]
pub struct SnapConfig {
    /// DynamoDB table name.
    /// Env: TABLE_NAME
    pub table_name: Option<String>,

    /// Env: SNAPWATCH_BACKEND (default dynamodb)
    pub backend: StoreBackend,

    /// Local table directory, used with the local backend.
    /// Env: SNAPWATCH_TABLE_PATH
    pub table_path: String,

    /// Region the store lives in, whatever region is being listed.
    /// Also the collection region when an event names none.
    /// Env: SNAPWATCH_HOME_REGION
    pub home_region: String,

    /// Snapshots older than now - lookback are ignored.
    /// Env: SNAPWATCH_LOOKBACK_HOURS
    pub lookback: Duration,

    /// Env: SNAPWATCH_PAGE_SIZE
    pub page_size: i32,

    /// Env: SNAPWATCH_LISTEN
    pub listen: String,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            table_name: None,
            backend: StoreBackend::DynamoDb,
            table_path: DEFAULT_TABLE_PATH.to_string(),
            home_region: DEFAULT_HOME_REGION.to_string(),
            lookback: Duration::from_secs(DEFAULT_LOOKBACK_HOURS * 3600),
            page_size: DEFAULT_PAGE_SIZE,
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

impl SnapConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(s) = env_nonempty("TABLE_NAME") {
            cfg.table_name = Some(s);
        }

        if let Some(s) = env_nonempty("SNAPWATCH_BACKEND") {
            if let Ok(b) = s.parse() {
                cfg.backend = b;
            }
        }

        if let Some(s) = env_nonempty("SNAPWATCH_TABLE_PATH") {
            cfg.table_path = s;
        }

        if let Some(s) = env_nonempty("SNAPWATCH_HOME_REGION") {
            cfg.home_region = s;
        }

        if let Some(s) = env_nonempty("SNAPWATCH_LOOKBACK_HOURS") {
            if let Ok(h) = s.parse::<u64>() {
                cfg.lookback = Duration::from_secs(h * 3600);
            }
        }

        if let Some(s) = env_nonempty("SNAPWATCH_PAGE_SIZE") {
            if let Ok(n) = s.parse::<i32>() {
                if n > 0 {
                    cfg.page_size = n;
                }
            }
        }

        if let Some(s) = env_nonempty("SNAPWATCH_LISTEN") {
            cfg.listen = s;
        }

        cfg
    }

    // ----- fluent overrides -----

    pub fn with_table_name<S: Into<String>>(mut self, name: Option<S>) -> Self {
        self.table_name = name.map(Into::into);
        self
    }

    pub fn with_backend(mut self, backend: StoreBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_table_path<S: Into<String>>(mut self, path: S) -> Self {
        self.table_path = path.into();
        self
    }

    pub fn with_home_region<S: Into<String>>(mut self, region: S) -> Self {
        self.home_region = region.into();
        self
    }

    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_page_size(mut self, n: i32) -> Self {
        self.page_size = n;
        self
    }

    pub fn with_listen<S: Into<String>>(mut self, addr: S) -> Self {
        self.listen = addr.into();
        self
    }
}

impl fmt::Display for SnapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SnapConfig {{ \
             backend: {}, \
             table_name: {}, \
             table_path: {}, \
             home_region: {}, \
             lookback_hours: {}, \
             page_size: {}, \
             listen: {} \
             }}",
            self.backend,
            self.table_name.as_deref().unwrap_or("(unset)"),
            self.table_path,
            self.home_region,
            self.lookback.as_secs() / 3600,
            self.page_size,
            self.listen,
        )
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_collection_window() {
        let cfg = SnapConfig::default();
        assert_eq!(cfg.home_region, "eu-central-1");
        assert_eq!(cfg.lookback, Duration::from_secs(3 * 3600));
        assert_eq!(cfg.page_size, 1000);
        assert_eq!(cfg.backend, StoreBackend::DynamoDb);
    }

    #[test]
    fn builder_overrides_and_display() {
        let cfg = SnapConfig::default()
            .with_backend(StoreBackend::Local)
            .with_table_name(Some("PublicSnapshots"))
            .with_page_size(50);
        let shown = cfg.to_string();
        assert!(shown.contains("backend: local"));
        assert!(shown.contains("table_name: PublicSnapshots"));
        assert!(shown.contains("page_size: 50"));
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!("DynamoDB".parse::<StoreBackend>().unwrap(), StoreBackend::DynamoDb);
        assert_eq!("local".parse::<StoreBackend>().unwrap(), StoreBackend::Local);
        assert!("s3".parse::<StoreBackend>().is_err());
    }
}
