//! Collect invocation: trigger payload -> one collection run per region.
//!
//! Payloads seen in practice:
//!   {}                                      -> home region
//!   {"region": "us-east-1"}                 -> that region
//!   {"regions": ["us-east-1", "eu-west-1"]} -> each, sequentially
//!
//! A failing region is logged and does not stop the others; the invocation
//! as a whole fails if any region did.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{info_span, instrument};

use crate::collector::{cutoff_from, CollectReport, Collector};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CollectEvent {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub regions: Vec<String>,
}

impl CollectEvent {
    /// Parse a trigger payload. Blank input is an empty event.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).context("parse collect event")
    }

    pub fn for_region(region: &str) -> Self {
        Self {
            region: Some(region.to_string()),
            regions: Vec::new(),
        }
    }

    /// Regions to list, in order, without repeats; `home` when none given.
    pub fn target_regions(&self, home: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let named = self.region.iter().chain(self.regions.iter());
        for r in named.map(|r| r.trim()).filter(|r| !r.is_empty()) {
            if !out.iter().any(|seen| seen == r) {
                out.push(r.to_string());
            }
        }
        if out.is_empty() {
            out.push(home.to_string());
        }
        out
    }
}

/// Collect every region the event names, with the cutoff taken from `now`.
#[instrument(name = "collect", skip_all, fields(home_region = %home_region))]
pub fn run_collect(
    collector: &Collector<'_>,
    event: &CollectEvent,
    home_region: &str,
    now: DateTime<Utc>,
    lookback: Duration,
) -> Result<Vec<CollectReport>> {
    let started = Instant::now();
    let cutoff = cutoff_from(now, lookback);
    let regions = event.target_regions(home_region);
    info!(
        "collect: snapshots created after {} in {}",
        cutoff.to_rfc3339(),
        regions.join(",")
    );

    let mut reports = Vec::with_capacity(regions.len());
    let mut failed = Vec::new();
    for region in &regions {
        let span = info_span!("region", region = %region);
        let _enter = span.enter();
        match collector.collect(cutoff, region) {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("collect: region {} failed: {:#}", region, e);
                failed.push(region.clone());
            }
        }
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    if failed.is_empty() {
        tracing::info!(elapsed_ms, regions = regions.len(), "collect finished");
        Ok(reports)
    } else {
        tracing::warn!(elapsed_ms, failed = failed.len(), "collect finished with failures");
        Err(anyhow!(
            "collection failed in {} of {} region(s): {}",
            failed.len(),
            regions.len(),
            failed.join(",")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_shapes() {
        assert_eq!(CollectEvent::parse("").unwrap(), CollectEvent::default());
        assert_eq!(
            CollectEvent::parse(r#"{"region":"us-east-1"}"#).unwrap(),
            CollectEvent::for_region("us-east-1")
        );
        let fan = CollectEvent::parse(r#"{"regions":["us-east-1","sa-east-1"],"extra":1}"#).unwrap();
        assert_eq!(fan.regions.len(), 2);
        assert!(CollectEvent::parse("[1,2]").is_err());
    }

    #[test]
    fn target_regions_default_and_dedup() {
        assert_eq!(CollectEvent::default().target_regions("eu-central-1"), vec!["eu-central-1"]);

        let ev = CollectEvent {
            region: Some("us-east-1".into()),
            regions: vec!["us-west-2".into(), "us-east-1".into(), " ".into()],
        };
        assert_eq!(ev.target_regions("eu-central-1"), vec!["us-east-1", "us-west-2"]);
    }
}
