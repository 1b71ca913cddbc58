//! Query service: scan the snapshot table, optionally by type, answer with
//! an API-Gateway-proxy-shaped JSON response.

use anyhow::{Context, Result};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use tracing::instrument;

use crate::item::{items_to_json, Item};
use crate::metrics;
use crate::store::{ScanFilter, SnapshotStore, StoreError};

pub const PARAM_SNAPSHOT_TYPE: &str = "snapshotType";

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";
pub const CORS_ALLOW_METHODS: &str = "GET,OPTIONS";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Incoming request; only the query string matters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

impl QueryRequest {
    pub fn for_type(snapshot_type: &str) -> Self {
        let mut params = HashMap::new();
        params.insert(PARAM_SNAPSHOT_TYPE.to_string(), snapshot_type.to_string());
        Self {
            query_string_parameters: Some(params),
        }
    }

    /// Build from a raw URL query string (`snapshotType=EC2&x=y`).
    pub fn from_query_string(qs: &str) -> Self {
        let params: HashMap<String, String> = url::form_urlencoded::parse(qs.as_bytes())
            .into_owned()
            .collect();
        Self {
            query_string_parameters: if params.is_empty() { None } else { Some(params) },
        }
    }

    /// Requested type filter; an empty value means no filter.
    pub fn snapshot_type(&self) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|p| p.get(PARAM_SNAPSHOT_TYPE))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl QueryResponse {
    pub fn ok(items: &[Item]) -> Self {
        Self {
            status_code: 200,
            headers: full_cors_headers(),
            body: items_to_json(items).to_string(),
        }
    }

    /// 500 with the error message and its full cause chain.
    pub fn error(err: &anyhow::Error) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Access-Control-Allow-Origin".to_string(), CORS_ALLOW_ORIGIN.to_string());
        headers.insert("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string());
        let body = json!({
            "error": err.to_string(),
            "trace": format!("{:?}", err),
        });
        Self {
            status_code: 500,
            headers,
            body: body.to_string(),
        }
    }

    /// CORS preflight answer.
    pub fn preflight() -> Self {
        let mut headers = full_cors_headers();
        headers.remove("Content-Type");
        Self {
            status_code: 204,
            headers,
            body: String::new(),
        }
    }
}

fn full_cors_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Access-Control-Allow-Origin".to_string(), CORS_ALLOW_ORIGIN.to_string());
    headers.insert("Access-Control-Allow-Headers".to_string(), CORS_ALLOW_HEADERS.to_string());
    headers.insert("Access-Control-Allow-Methods".to_string(), CORS_ALLOW_METHODS.to_string());
    headers.insert("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string());
    headers
}

pub struct QueryService<'a> {
    store: &'a dyn SnapshotStore,
}

impl<'a> QueryService<'a> {
    pub fn new(store: &'a dyn SnapshotStore) -> Self {
        Self { store }
    }

    /// Items of the given type, or everything when `snapshot_type` is
    /// None or empty. Order is whatever the store returns.
    pub fn query(&self, snapshot_type: Option<&str>) -> Result<Vec<Item>, StoreError> {
        match snapshot_type.filter(|t| !t.is_empty()) {
            None => self.store.scan(None),
            Some(t) => self.store.scan(Some(&ScanFilter::snapshot_type(t))),
        }
    }

    /// Full request/response cycle; never fails, errors become a 500.
    #[instrument(name = "query", skip_all, fields(snapshot_type = ?request.snapshot_type()))]
    pub fn handle(&self, request: &QueryRequest) -> QueryResponse {
        info!("query: request {:?}", request.query_string_parameters);
        let filter = request.snapshot_type();

        let res: Result<Vec<Item>> = self
            .query(filter)
            .with_context(|| format!("scan snapshot table (snapshotType={:?})", filter));

        match res {
            Ok(items) => {
                metrics::record_query(true);
                debug!("query: returning {} item(s)", items.len());
                QueryResponse::ok(&items)
            }
            Err(e) => {
                metrics::record_query(false);
                error!("query: {:?}", e);
                QueryResponse::error(&e)
            }
        }
    }
}
