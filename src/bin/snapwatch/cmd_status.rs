use anyhow::Result;
use serde_json::json;
use std::collections::BTreeMap;

use snapwatch::record::ATTR_SNAPSHOT_TYPE;
use snapwatch::store::open_store;
use snapwatch::{SnapConfig, SnapshotStore};

pub fn exec(cfg: &SnapConfig, json: bool) -> Result<()> {
    let store = open_store(cfg, None)?;
    let items = store.scan(None)?;

    let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
    for item in &items {
        let t = item
            .get(ATTR_SNAPSHOT_TYPE)
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        *by_type.entry(t.to_string()).or_default() += 1;
    }

    if json {
        let out = json!({
            "backend": cfg.backend.to_string(),
            "total": items.len(),
            "by_type": by_type,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Backend: {}", cfg.backend);
    match cfg.backend {
        snapwatch::StoreBackend::Local => println!("  table_path: {}", cfg.table_path),
        snapwatch::StoreBackend::DynamoDb => println!(
            "  table: {} ({})",
            cfg.table_name.as_deref().unwrap_or("-"),
            cfg.home_region
        ),
    }
    println!("Items: {}", items.len());
    for (t, n) in &by_type {
        println!("  {:<12} {}", t, n);
    }
    Ok(())
}
