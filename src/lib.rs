// Базовые модули
pub mod config;
pub mod item;
pub mod record;
pub mod metrics;

// Источники и хранилище
pub mod source; // src/source/{mod,ec2}.rs
pub mod store;  // src/store/{mod,frame,lock,table,dynamo}.rs

// Точки входа
pub mod collector;
pub mod invoke;
pub mod query;
pub mod server;

// AWS context (runtime + SDK config), фича "aws"
#[cfg(feature = "aws")]
pub mod aws;

// Удобные реэкспорты
pub use collector::{cutoff_from, CollectReport, Collector};
pub use config::{SnapConfig, StoreBackend};
pub use invoke::{run_collect, CollectEvent};
pub use item::{AttrValue, Item};
pub use query::{QueryRequest, QueryResponse, QueryService};
pub use record::{SnapshotRecord, SnapshotTag, SnapshotType};
pub use source::{PageRequest, SnapshotPage, SnapshotSource, SourceSnapshot};
pub use store::{LocalTable, ScanFilter, SnapshotStore, StoreError};
