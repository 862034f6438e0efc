use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use quakesaver_rs_client::Result;
use quakesaver_rs_client::probe::{DEFAULT_CONTROL_PORT, LivenessProber, expand_hosts};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "qs", version, about = "QuakeSaver sensor toolbox")]
struct Cli {
    /// Verbose protocol logging.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect QuakeSaver sensors on the local network.
    Detect {
        /// Single host or /24 range in CIDR notation.
        #[arg(default_value = "192.168.1.0/24")]
        hosts: String,

        /// Output file for the alive-sensor list.
        #[arg(long, default_value = "sensors-alive.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Command::Detect { hosts, output } => detect(&hosts, &output).await,
    }
}

async fn detect(hosts: &str, output: &PathBuf) -> Result<()> {
    let candidates = expand_hosts(hosts)?;
    info!(range = hosts, count = candidates.len(), "scanning hosts");

    let prober = LivenessProber::new();
    let prober_ref = &prober;
    let probes = candidates.iter().map(|host| async move {
        let report = prober_ref
            .probe(&format!("{host}:{DEFAULT_CONTROL_PORT}"))
            .await;
        (host.as_str(), report)
    });
    let reports = join_all(probes).await;

    let mut csv = String::from("uid,ip_address\n");
    let mut found = 0usize;
    for (host, report) in reports {
        if !report.alive {
            continue;
        }
        let Some(identity) = report.identity else {
            warn!(host, "sensor alive but state snapshot unavailable");
            continue;
        };
        info!(
            uid = %identity.uid,
            host,
            version = %identity.software_version,
            "sensor alive"
        );
        csv.push_str(&format!("{},{host}\n", identity.uid));
        found += 1;
    }

    tokio::fs::write(output, csv).await?;
    info!(path = %output.display(), found, "saved alive sensor list");
    Ok(())
}
