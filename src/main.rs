//! skywatch - Current weather for one place
//!
//! Serves the cached weather while it is fresh, fetches from Open-Meteo when it
//! is not, and prints one line per result until interrupted.

use clap::Parser;

use skywatch::cli::{Cli, StartupConfig};
use skywatch::data::OpenMeteoClient;
use skywatch::refresh::{RefreshHandle, RefreshScheduler};
use skywatch::sink::{render_event, RefreshEvent};

/// Sets up logging to stderr, filtered by `RUST_LOG` (default `info`)
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StartupConfig::from_cli(&cli)?;

    init_tracing();

    let cache = config.cache()?;
    let gateway = OpenMeteoClient::new(config.location.clone())?;
    let place = config.location.name.clone();

    tracing::info!(
        place = %place,
        cache_dir = %cache.dir().display(),
        freshness_secs = config.refresh.freshness_window.as_secs(),
        "skywatch starting"
    );

    if config.once {
        let mut scheduler =
            RefreshScheduler::new(cache, gateway, Vec::<RefreshEvent>::new(), config.refresh);
        scheduler.run_once().await;

        for event in scheduler.sink() {
            if let RefreshEvent::FetchFailed { reason } = event {
                return Err(format!("fetch failed: {}", reason).into());
            }
            println!("{}", render_event(&place, event));
        }
        return Ok(());
    }

    let mut handle = RefreshHandle::spawn(cache, gateway, config.refresh);
    handle
        .forward_until(tokio::signal::ctrl_c(), |event| {
            println!("{}", render_event(&place, &event))
        })
        .await;

    handle.shutdown().await;
    Ok(())
}
