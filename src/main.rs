mod config;
mod explorer;
mod server;

use anyhow::Result;
use clap::{Arg, Command};
use config::Config;
use server::ExplorerMcpServer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the MCP stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = Command::new("explorer-mcp")
        .version("0.1.0")
        .about("MCP server for a layer-2 block explorer backend")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("NETWORK")
                .help("Default network to use (mainnet, testnet)"),
        )
        .arg(
            Arg::new("graphql-url")
                .short('g')
                .long("graphql-url")
                .value_name("URL")
                .help("GraphQL endpoint URL of the default network"),
        )
        .arg(
            Arg::new("rest-url")
                .short('r')
                .long("rest-url")
                .value_name("URL")
                .help("REST endpoint URL of the default network"),
        )
        .arg(
            Arg::new("page-size")
                .long("page-size")
                .value_name("SIZE")
                .value_parser(clap::value_parser!(u32))
                .help("Default page size for list tools"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Print a sample configuration file, or write the defaults to --config, and exit")
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
        // With --config the defaults are written to that file instead of stdout
        if let Some(path) = matches.get_one::<String>("config") {
            Config::default().save_to_file(path).await?;
            info!("Wrote default configuration to {}", path);
        } else {
            let sample_config = Config::generate_sample();
            println!("{}", sample_config);
        }
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

    if let Some(network) = matches.get_one::<String>("network") {
        config.default_network = network.clone();
    }

    if let Some(network_config) = config.networks.get_mut(&config.default_network) {
        if let Some(url) = matches.get_one::<String>("graphql-url") {
            network_config.graphql_url = url.clone();
        }
        if let Some(url) = matches.get_one::<String>("rest-url") {
            network_config.rest_url = url.clone();
        }
    }

    if let Some(page_size) = matches.get_one::<u32>("page-size") {
        if !config.pagination.allowed_page_sizes.contains(page_size) {
            config.pagination.allowed_page_sizes.push(*page_size);
        }
        config.pagination.default_page_size = *page_size;
    }

    info!("Starting Explorer MCP Server");
    info!("Default network: {}", config.default_network);
    info!(
        "Default page size: {}",
        config.pagination.default_page_size
    );

    let server = ExplorerMcpServer::new(config)?;

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
