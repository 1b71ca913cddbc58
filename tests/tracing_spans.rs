use anyhow::Result;
use chrono::Duration;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use tracing::span::{Attributes, Id};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use snapwatch::{run_collect, CollectEvent, Collector, LocalTable, QueryRequest, QueryService};

mod common;
use common::*;

/// Records the name of every span opened while installed.
#[derive(Clone, Default)]
struct SpanNames(Arc<Mutex<Vec<String>>>);

impl SpanNames {
    fn names(&self) -> Vec<String> {
        self.0.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl<S: Subscriber> Layer<S> for SpanNames {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        if let Ok(mut v) = self.0.lock() {
            v.push(attrs.metadata().name().to_string());
        }
    }
}

#[test]
fn collect_runs_inside_collect_and_region_spans() -> Result<()> {
    let spans = SpanNames::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(spans.clone()));

    let root = unique_root("span-collect");
    let table = LocalTable::open(&root)?;
    let now = fixed_now();
    let source = PagedSource::ec2(vec![vec![snap_aged("snap-s", now, Duration::minutes(1))]]);
    let collector = Collector::new(&table).with_source(&source);
    let event = CollectEvent::parse(r#"{"regions":["us-east-1","eu-west-1"]}"#)?;

    run_collect(&collector, &event, "eu-central-1", now, StdDuration::from_secs(3 * 3600))?;

    assert_eq!(spans.names(), vec!["collect", "region", "region"]);
    Ok(())
}

#[test]
fn query_handling_opens_a_query_span() -> Result<()> {
    let spans = SpanNames::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(spans.clone()));

    let service = QueryService::new(&BrokenStore);
    let resp = service.handle(&QueryRequest::for_type("EC2"));
    assert_eq!(resp.status_code, 500);

    assert_eq!(spans.names(), vec!["query"]);
    Ok(())
}
