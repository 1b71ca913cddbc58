use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::{debug, error};

mod cli;
mod util;
mod cmd_collect;
mod cmd_query;
mod cmd_serve;
mod cmd_status;

fn init_logger() {
    // RUST_LOG wins; default is info.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    let cfg = cli.config();
    debug!("{}", cfg);

    match cli.cmd {
        cli::Cmd::Collect { region, event, json } =>
            cmd_collect::exec(&cfg, region, event, json),

        cli::Cmd::Query { snapshot_type, json, envelope } =>
            cmd_query::exec(&cfg, snapshot_type, json, envelope),

        cli::Cmd::Serve { addr } =>
            cmd_serve::exec(&cfg, addr),

        cli::Cmd::Status { json } =>
            cmd_status::exec(&cfg, json),
    }
}
