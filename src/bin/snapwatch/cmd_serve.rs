use anyhow::Result;

use snapwatch::server;
use snapwatch::store::open_store;
use snapwatch::{QueryService, SnapConfig};

pub fn exec(cfg: &SnapConfig, addr: Option<String>) -> Result<()> {
    let store = open_store(cfg, None)?;
    let service = QueryService::new(store.as_ref());

    let addr = addr.unwrap_or_else(|| cfg.listen.clone());
    server::serve(&addr, &service)
}
