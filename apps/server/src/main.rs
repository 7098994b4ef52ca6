use anyhow::Context;
use clap::Parser;
use rego_logger::Logger;
use rego_server::Server;
use regocraft::domain::config::ApiConfig;
use regocraft::kernel::config::load_config;
use std::path::PathBuf;

/// RegoCraft records API.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file. Defaults to an optional `server.*` in the working directory.
    #[arg(short, long, env = "REGO_CONFIG")]
    config: Option<PathBuf>,
    /// Overrides `server.port`.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let cfg: ApiConfig =
        load_config(args.config.as_deref()).context("Critical: Configuration is malformed")?;
    let _log = Logger::builder(env!("CARGO_PKG_NAME")).config(&cfg.logging).init()?;

    let mut builder = Server::builder().config(cfg);
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    builder.build().await?.run().await
}
