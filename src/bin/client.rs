//! Mauerspecht Client Binary
//!
//! Usage: mauerspecht-client [OPTIONS]
//!
//! Options:
//!   -s, --server <URL>    Server URL (default: http://localhost:8080)
//!   -p, --proxy <URL>     HTTP proxy (default: system proxy settings)
//!   -t, --timeout <SECS>  Per-request timeout in seconds (default: 30)
//!   -h, --help            Print help information

use std::env;
use std::time::Duration;

use anyhow::{bail, Context};
use mauerspecht::client::{ClientOptions, MatrixSummary, Prober};

const DEFAULT_SERVER: &str = "http://localhost:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    let mut server = DEFAULT_SERVER.to_string();
    let mut options = ClientOptions::default();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "-s" | "--server" => {
                server = iter.next().context("--server requires a URL")?.clone();
            }
            "-p" | "--proxy" => {
                options.proxy = Some(iter.next().context("--proxy requires a URL")?.clone());
            }
            "-t" | "--timeout" => {
                let value = iter.next().context("--timeout requires a number of seconds")?;
                options.timeout = parse_timeout(value)?;
            }
            other => {
                print_usage();
                bail!("unknown option: {}", other);
            }
        }
    }

    let mut prober = Prober::connect(&server, options)
        .await
        .context("Error while initializing client")?;

    let outcomes = prober.run().await;
    println!("{}", MatrixSummary::from_outcomes(&outcomes));

    Ok(())
}

fn parse_timeout(value: &str) -> anyhow::Result<Duration> {
    let secs: u64 = value
        .parse()
        .context("--timeout must be a whole number of seconds")?;
    if secs == 0 {
        bail!("--timeout must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}

fn print_usage() {
    println!(
        r#"Mauerspecht Client - HTTP channel integrity prober

USAGE:
    mauerspecht-client [OPTIONS]

OPTIONS:
    -s, --server <URL>      Server URL (default: {})
    -p, --proxy <URL>       HTTP proxy (default: system proxy settings)
    -t, --timeout <SECS>    Per-request timeout in seconds (default: 30)
    -h, --help              Print help information

EXAMPLES:
    Probe directly:
        mauerspecht-client --server http://probe.example.com:8080

    Probe through a corporate proxy:
        mauerspecht-client -s http://probe.example.com -p http://proxy.corp:3128
"#,
        DEFAULT_SERVER
    );
}
