use anyhow::Result;

use snapwatch::item::items_to_json;
use snapwatch::store::open_store;
use snapwatch::{QueryRequest, QueryService, SnapConfig, SnapshotRecord};

use crate::util::clip;

pub fn exec(cfg: &SnapConfig, snapshot_type: Option<String>, json: bool, envelope: bool) -> Result<()> {
    let store = open_store(cfg, None)?;
    let service = QueryService::new(store.as_ref());

    if envelope {
        let request = match &snapshot_type {
            Some(t) => QueryRequest::for_type(t),
            None => QueryRequest::default(),
        };
        let response = service.handle(&request);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let items = service.query(snapshot_type.as_deref().filter(|t| !t.is_empty()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items_to_json(&items))?);
        return Ok(());
    }

    println!(
        "{:<24} {:<10} {:<25} {:>8} {:<5} {:<14} {}",
        "SNAPSHOT", "TYPE", "START", "SIZE", "ENC", "REGION", "DESCRIPTION"
    );
    for item in &items {
        match SnapshotRecord::from_item(item) {
            Ok(r) => println!(
                "{:<24} {:<10} {:<25} {:>8} {:<5} {:<14} {}",
                r.snapshot_id,
                r.snapshot_type,
                r.start_time.to_rfc3339(),
                r.volume_size,
                r.encrypted,
                r.aws_region,
                clip(r.description.as_deref().unwrap_or(""), 48)
            ),
            Err(e) => log::warn!("query: skipping malformed item: {:#}", e),
        }
    }
    println!("{} snapshot(s)", items.len());
    Ok(())
}
