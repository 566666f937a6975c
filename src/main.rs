mod config;
mod ethereum;
mod form;
mod server;
mod session;

use anyhow::{anyhow, Result};
use clap::{Arg, Command};
use config::Config;
use server::ExplorerServer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = Command::new("contract-explorer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Interactive explorer for Ethereum smart contracts over MCP")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .help("Default RPC endpoint URL"),
        )
        .arg(
            Arg::new("address")
                .short('a')
                .long("address")
                .value_name("ADDRESS")
                .help("Contract address to start the session with"),
        )
        .arg(
            Arg::new("abi")
                .long("abi")
                .value_name("FILE")
                .help("Path to a JSON ABI to start the session with"),
        )
        .arg(
            Arg::new("allow-writes")
                .long("allow-writes")
                .help("Allow write operations (transactions)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-persist")
                .long("no-persist")
                .help("Do not save or restore session inputs")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("generate-config") {
        println!("{}", Config::generate_sample());
        return Ok(());
    }

    if matches.get_flag("config-path") {
        match Config::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("Could not determine default config path: {}", e);
                return Err(e);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut config = Config::load_or_default(config_path).await;

    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        config.rpc_url = rpc_url.clone();
    }

    if matches.get_flag("allow-writes") {
        config.security.allow_write_operations = true;
    }

    if matches.get_flag("no-persist") {
        config.session.persist = false;
    }

    let abi = match matches.get_one::<String>("abi") {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| anyhow!("Failed to read ABI file {}: {}", path, e))?,
        ),
        None => None,
    };

    info!("Default RPC endpoint: {}", config.rpc_url);
    info!(
        "Write operations allowed: {}",
        config.security.allow_write_operations
    );

    let server = ExplorerServer::new(config).await?;
    server
        .preload(
            matches.get_one::<String>("rpc-url").cloned(),
            matches.get_one::<String>("address").cloned(),
            abi,
        )
        .await?;

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
