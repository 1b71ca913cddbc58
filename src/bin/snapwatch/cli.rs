use clap::{Parser, Subcommand};

use snapwatch::{SnapConfig, StoreBackend};

/// Public snapshot collector and query service
#[derive(Parser, Debug)]
#[command(name = "snapwatch", version, about = "Collect and serve publicly restorable cloud snapshots")]
pub struct Cli {
    /// Store backend (overrides SNAPWATCH_BACKEND)
    #[arg(long, global = true, value_parser = parse_backend)]
    pub backend: Option<StoreBackend>,

    /// DynamoDB table name (overrides TABLE_NAME)
    #[arg(long, global = true)]
    pub table_name: Option<String>,

    /// Local table directory (overrides SNAPWATCH_TABLE_PATH)
    #[arg(long, global = true)]
    pub table_path: Option<String>,

    /// Region addressing the store (overrides SNAPWATCH_HOME_REGION)
    #[arg(long, global = true)]
    pub home_region: Option<String>,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Store snapshots created within the lookback window
    ///
    /// Examples:
    ///   snapwatch collect --region us-east-1
    ///   snapwatch collect --event '{"regions":["us-east-1","eu-west-1"]}'
    ///   snapwatch collect --event @event.json
    Collect {
        /// Single region to list (instead of an event)
        #[arg(long, conflicts_with = "event")]
        region: Option<String>,
        /// Trigger payload: JSON literal, @file, or - for stdin
        #[arg(long)]
        event: Option<String>,
        /// Print the per-region reports as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Read stored snapshots
    Query {
        /// Only this type (EC2, RDS, RDSCluster); empty means all
        #[arg(long)]
        snapshot_type: Option<String>,
        /// JSON array output
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Print the full HTTP-shaped response (statusCode/headers/body)
        #[arg(long, default_value_t = false, conflicts_with = "json")]
        envelope: bool,
    },
    /// Serve the query API over HTTP
    Serve {
        /// Listen address (overrides SNAPWATCH_LISTEN)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Item counts per snapshot type
    Status {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn parse_backend(s: &str) -> Result<StoreBackend, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

impl Cli {
    /// Environment first, then command-line overrides.
    pub fn config(&self) -> SnapConfig {
        let mut cfg = SnapConfig::from_env();
        if let Some(b) = self.backend {
            cfg = cfg.with_backend(b);
        }
        if let Some(name) = &self.table_name {
            cfg = cfg.with_table_name(Some(name.clone()));
        }
        if let Some(path) = &self.table_path {
            cfg = cfg.with_table_path(path.clone());
        }
        if let Some(region) = &self.home_region {
            cfg = cfg.with_home_region(region.clone());
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_region_and_event_are_exclusive() {
        let both = Cli::try_parse_from([
            "snapwatch", "collect", "--region", "us-east-1", "--event", r#"{"regions":["eu-west-1"]}"#,
        ]);
        assert!(both.is_err());

        let one = Cli::try_parse_from(["snapwatch", "collect", "--region", "us-east-1"]).unwrap();
        match one.cmd {
            Cmd::Collect { region, event, .. } => {
                assert_eq!(region.as_deref(), Some("us-east-1"));
                assert!(event.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn global_overrides_apply_after_subcommand() {
        let cli = Cli::try_parse_from([
            "snapwatch", "status", "--backend", "local", "--table-path", "/tmp/snapwatch-cli",
        ])
        .unwrap();
        let cfg = cli.config();
        assert_eq!(cfg.backend, StoreBackend::Local);
        assert_eq!(cfg.table_path, "/tmp/snapwatch-cli");
    }
}
