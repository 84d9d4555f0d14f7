//! # cow-kv server
//!
//! 1. Initializes logging using env_logger (`RUST_LOG=info cow-kv`)
//! 2. Loads configuration from the config file and `COW_KV_*` variables
//! 3. Applies command line overrides
//! 4. Opens the selected engine and serves it over TCP
//!
//! ## Configuration Priority
//! 1. Command line arguments (highest priority)
//! 2. `COW_KV_*` environment variables
//! 3. Configuration file (config.toml)
//! 4. Default values (lowest priority)

use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use cow_kv::config::Config;
use cow_kv::server::Server;
use cow_kv::store::{open_engine, EngineKind};

#[derive(Debug, Parser)]
#[command(name = "cow-kv", version, about = "In-memory key-value server")]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Storage engine: "map" or "trie" (overrides the config file)
    #[arg(long)]
    engine: Option<EngineKind>,

    /// Address to bind (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides the config file)
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut config = Config::load(&args.config)?;

    if let Some(engine) = args.engine {
        config.engine = engine;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    info!("Using {} engine", config.engine);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let store = open_engine(config.engine);
        let server = Server::new(config, store);
        server.run().await
    })
}
