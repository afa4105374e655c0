//! Mauerspecht Server Binary
//!
//! Usage: mauerspecht-server [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>  Path to configuration file (default: mauerspecht.json)
//!   --example-config     Print a default configuration
//!   -h, --help           Print help information

use std::env;

use mauerspecht::protocol::ProbeConfig;
use mauerspecht::server::config::ServerConfigFile;
use mauerspecht::server::{Server, ServerConfig};

const DEFAULT_CONFIG_PATH: &str = "mauerspecht.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Respects RUST_LOG (e.g. RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None => run_server(DEFAULT_CONFIG_PATH).await?,
        Some("-h") | Some("--help") => print_usage(),
        Some("--example-config") => example_config()?,
        Some("-c") | Some("--config") => {
            let Some(path) = args.get(2) else {
                eprintln!("Error: --config requires a file path");
                std::process::exit(2);
            };
            run_server(path).await?;
        }
        Some(other) => {
            eprintln!("Unknown option: {}", other);
            print_usage();
            std::process::exit(2);
        }
    }

    Ok(())
}

fn print_usage() {
    println!(
        r#"Mauerspecht Server - HTTP channel integrity prober

USAGE:
    mauerspecht-server [OPTIONS]

OPTIONS:
    -c, --config <FILE>     Path to configuration file (default: {})
    --example-config        Print a default configuration
    -h, --help              Print help information

CONFIGURATION FILE FORMAT (JSON):
    {{
        "listen-addr": "0.0.0.0",
        "hostname": "probe.example.com",
        "http-ports": [80, 8080],
        "magic-strings": ["X5O!P%@AP[4\\PZX54(P^)7CC)7}}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*"]
    }}

EXAMPLES:
    Write a starting configuration:
        mauerspecht-server --example-config > mauerspecht.json

    Run the server:
        mauerspecht-server --config mauerspecht.json
"#,
        DEFAULT_CONFIG_PATH
    );
}

fn example_config() -> anyhow::Result<()> {
    let config = ServerConfig::new(ProbeConfig::default());
    let file = ServerConfigFile::from_config(&config);
    println!("{}", serde_json::to_string_pretty(&file)?);
    Ok(())
}

async fn run_server(config_path: &str) -> anyhow::Result<()> {
    let config = ServerConfig::load(config_path)?;

    tracing::info!("Starting Mauerspecht server on {}", config.listen_addr);
    tracing::info!("Advertised hostname: {}", config.probe.hostname);
    tracing::info!("Ports: {:?}", config.probe.ports);
    tracing::info!("Canaries: {}", config.probe.canaries.len());

    let server = Server::new(config)?;
    let running = server.bind().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupted, shutting down");
    running.shutdown().await;

    Ok(())
}
