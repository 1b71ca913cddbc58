use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

use snapwatch::aws::AwsContext;
use snapwatch::source::Ec2SnapshotSource;
use snapwatch::store::open_store;
use snapwatch::{run_collect, CollectEvent, Collector, SnapConfig};

use crate::util::read_payload_arg;

pub fn exec(cfg: &SnapConfig, region: Option<String>, event: Option<String>, json: bool) -> Result<()> {
    // clap rejects --region together with --event
    let ev = match (region, event) {
        (Some(r), _) => CollectEvent::for_region(&r),
        (None, Some(arg)) => CollectEvent::parse(&read_payload_arg(&arg)?)?,
        (None, None) => CollectEvent::default(),
    };

    let aws = Arc::new(AwsContext::new()?);
    let store = open_store(cfg, Some(aws.clone()))?;
    let ec2 = Ec2SnapshotSource::new(aws);
    let collector = Collector::new(store.as_ref())
        .with_source(&ec2)
        .with_page_size(cfg.page_size);

    let reports = run_collect(&collector, &ev, &cfg.home_region, Utc::now(), cfg.lookback)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    let mut total = 0u64;
    for r in &reports {
        println!(
            "{:<16} pages={} scanned={} candidates={} stored={} duplicates={} failed={}",
            r.region, r.pages, r.scanned, r.candidates, r.stored, r.duplicates, r.failed
        );
        total += r.count();
    }
    println!("stored {} new snapshot(s)", total);
    Ok(())
}
