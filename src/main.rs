//! gfi-miner binary entry point.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gfi_miner::cli::{self, Cli};

fn main() {
    let cli = Cli::parse_args();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = cli::run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
