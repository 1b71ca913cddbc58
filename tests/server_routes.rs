use anyhow::Result;
use chrono::Duration;

use snapwatch::server::route;
use snapwatch::{LocalTable, QueryService, SnapshotRecord, SnapshotStore, SnapshotType};

mod common;
use common::*;

fn seeded(prefix: &str) -> Result<LocalTable> {
    let table = LocalTable::open(&unique_root(prefix))?;
    for (id, kind) in [("snap-1", SnapshotType::Ec2), ("rds:db-1", SnapshotType::Rds)] {
        let s = snap_aged(id, fixed_now(), Duration::minutes(5));
        table.put_if_absent(&SnapshotRecord::from_source(&s, kind, "us-east-1").to_item()?)?;
    }
    Ok(table)
}

#[test]
fn get_query_paths() -> Result<()> {
    let table = seeded("srv-get")?;
    let service = QueryService::new(&table);

    for url in ["/", "/snapshots", "/snapshots/"] {
        let reply = route("GET", url, &service);
        assert_eq!(reply.status, 200, "{url}");
        let v: serde_json::Value = serde_json::from_str(&reply.body)?;
        assert_eq!(v.as_array().map(Vec::len), Some(2), "{url}");
    }

    let reply = route("GET", "/snapshots?snapshotType=RDS", &service);
    let v: serde_json::Value = serde_json::from_str(&reply.body)?;
    assert_eq!(v.as_array().map(Vec::len), Some(1));
    assert_eq!(v[0]["snapshotId"], "rds:db-1");
    assert_eq!(reply.header("access-control-allow-origin"), Some("*"));
    Ok(())
}

#[test]
fn preflight_and_method_errors() -> Result<()> {
    let table = seeded("srv-options")?;
    let service = QueryService::new(&table);

    let reply = route("OPTIONS", "/snapshots", &service);
    assert_eq!(reply.status, 204);
    assert_eq!(reply.header("Access-Control-Allow-Methods"), Some("GET,OPTIONS"));
    assert!(reply.body.is_empty());

    let reply = route("POST", "/snapshots", &service);
    assert_eq!(reply.status, 405);
    assert_eq!(reply.header("Allow"), Some("GET, OPTIONS"));
    Ok(())
}

#[test]
fn health_metrics_and_unknown() -> Result<()> {
    let service = QueryService::new(&BrokenStore);

    assert_eq!(route("GET", "/health", &service).body, "OK\n");
    assert_eq!(route("GET", "/ready", &service).status, 200);

    let reply = route("GET", "/metrics", &service);
    assert_eq!(reply.status, 200);
    assert!(reply.body.contains("snapwatch_"));

    assert_eq!(route("GET", "/nope", &service).status, 404);
    assert_eq!(route("GET", "/snapshots", &service).status, 500);
    Ok(())
}
