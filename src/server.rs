//! Blocking HTTP front end for the query service (tiny_http).
//!
//! Routes:
//! - GET /, GET /snapshots      -> query envelope (?snapshotType=...)
//! - OPTIONS /, /snapshots      -> CORS preflight
//! - GET /health, /ready        -> "OK"
//! - GET /metrics               -> Prometheus text
//!
//! `route` is the whole request -> reply mapping; `serve` only moves bytes.

use anyhow::{anyhow, Result};
use log::{info, warn};
use tiny_http::{Header, Response, Server};

use crate::metrics;
use crate::query::{QueryRequest, QueryResponse, QueryService};

#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpReply {
    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".into(), "text/plain; charset=utf-8".into())],
            body: body.to_string(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl From<QueryResponse> for HttpReply {
    fn from(r: QueryResponse) -> Self {
        Self {
            status: r.status_code,
            headers: r.headers.into_iter().collect(),
            body: r.body,
        }
    }
}

fn is_query_path(path: &str) -> bool {
    let p = path.trim_end_matches('/');
    p.is_empty() || p == "/snapshots"
}

pub fn route(method: &str, url: &str, service: &QueryService<'_>) -> HttpReply {
    let (path, qs) = match url.split_once('?') {
        Some((p, q)) => (p, q),
        None => (url, ""),
    };

    match method {
        "GET" if is_query_path(path) => service.handle(&QueryRequest::from_query_string(qs)).into(),
        "OPTIONS" if is_query_path(path) => QueryResponse::preflight().into(),
        "GET" if path == "/health" || path == "/ready" => HttpReply::text(200, "OK\n"),
        "GET" if path == "/metrics" => HttpReply {
            status: 200,
            headers: vec![("Content-Type".into(), "text/plain; version=0.0.4".into())],
            body: metrics::render_prometheus(),
        },
        _ if is_query_path(path) => {
            let mut reply = HttpReply::text(405, "method not allowed\n");
            reply.headers.push(("Allow".into(), "GET, OPTIONS".into()));
            reply
        }
        _ => HttpReply::text(404, "not found\n"),
    }
}

/// Serve until the process is stopped. One request at a time.
pub fn serve(addr: &str, service: &QueryService<'_>) -> Result<()> {
    let server = Server::http(addr).map_err(|e| anyhow!("bind http at {}: {}", addr, e))?;
    info!("snapwatch query server listening on {}", addr);

    loop {
        let rq = match server.recv() {
            Ok(rq) => rq,
            Err(e) => {
                warn!("http recv error: {}", e);
                continue;
            }
        };

        let method = rq.method().as_str().to_string();
        let url = rq.url().to_string();
        let reply = route(&method, &url, service);

        let mut resp = Response::from_string(reply.body).with_status_code(reply.status);
        for (k, v) in &reply.headers {
            match Header::from_bytes(k.as_bytes(), v.as_bytes()) {
                Ok(h) => resp.add_header(h),
                Err(()) => warn!("http: dropping invalid header {}", k),
            }
        }
        if let Err(e) = rq.respond(resp) {
            warn!("http respond error for {} {}: {}", method, url, e);
        }
    }
}
