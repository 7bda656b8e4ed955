//! CLI for tracert-as.

mod runner;

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracert_core::{TraceParams, TracerouteError, DEFAULT_MAX_HOPS};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: tracert-as <address>";

/// tracert-as - ICMP traceroute that annotates public hops with registry data.
#[derive(Parser, Debug)]
#[command(name = "tracert-as")]
#[command(version)]
#[command(about = "ICMP traceroute that annotates public hops with registry data")]
pub struct Args {
    /// Target hostname or IPv4 address.
    pub target: Option<String>,

    /// Maximum number of hops to probe.
    #[arg(short = 'm', long = "max-hops", default_value_t = DEFAULT_MAX_HOPS)]
    pub max_hops: u8,

    /// Timeout per probe in milliseconds.
    #[arg(short = 'w', long, default_value = "2000")]
    pub timeout: u64,

    /// Timeout per registry lookup in milliseconds.
    #[arg(long = "lookup-timeout", default_value = "10000")]
    pub lookup_timeout: u64,

    /// Skip registry lookups for public hops.
    #[arg(long = "no-lookup")]
    pub no_lookup: bool,

    /// Print the finished trace as JSON.
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    fn to_params(&self) -> TraceParams {
        TraceParams {
            max_hops: self.max_hops,
            probe_timeout: Duration::from_millis(self.timeout),
            lookup_timeout: Duration::from_millis(self.lookup_timeout),
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let Some(target) = args.target.clone() else {
        println!("{USAGE}");
        return ExitCode::from(1);
    };

    let config = runner::RunConfig {
        destination: target,
        params: args.to_params(),
        lookup: !args.no_lookup,
        json: args.json,
    };

    match runner::run(config).await {
        Ok(trace) => {
            tracing::debug!(
                hops = trace.hops.len(),
                status = ?trace.status,
                "Trace finished"
            );
            ExitCode::SUCCESS
        }
        Err(TracerouteError::DnsResolutionFailed { hostname, source }) => {
            tracing::debug!(error = %source, "Resolution failed");
            println!("{hostname} is invalid");
            ExitCode::from(1)
        }
        Err(TracerouteError::PermissionDenied(e)) => {
            tracing::debug!(error = %e, "Raw socket refused");
            println!("Permission denied. Please run the program as administrator.");
            ExitCode::from(2)
        }
        Err(e) => {
            println!("Unexpected error: {e}");
            ExitCode::FAILURE
        }
    }
}
