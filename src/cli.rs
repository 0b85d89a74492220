//! Command-line interface parsing for skywatch
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a validated [`StartupConfig`].

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::cache::FileCache;
use crate::data::Location;
use crate::refresh::RefreshConfig;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// Latitude outside [-90, 90]
    #[error("Invalid latitude: {0}. Must be between -90 and 90")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180]
    #[error("Invalid longitude: {0}. Must be between -180 and 180")]
    InvalidLongitude(f64),

    /// A duration argument was zero
    #[error("Invalid duration for --{0}: must be at least 1 minute")]
    InvalidDuration(&'static str),

    /// A duration argument does not fit in seconds
    #[error("Invalid duration for --{0}: too large")]
    DurationTooLarge(&'static str),

    /// Retry delay is not shorter than the freshness window
    #[error("--retry-mins ({retry}) must be shorter than --freshness-mins ({freshness})")]
    RetryNotShorter { retry: u64, freshness: u64 },

    /// No cache directory given and none could be determined
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDir,
}

/// skywatch - Current weather for one place, fetched no more often than needed
#[derive(Parser, Debug)]
#[command(name = "skywatch")]
#[command(about = "Current weather for one place, cached and refreshed on a timer")]
#[command(version)]
pub struct Cli {
    /// Latitude of the watched location
    #[arg(long, default_value_t = 52.2297, allow_negative_numbers = true)]
    pub latitude: f64,

    /// Longitude of the watched location
    #[arg(long, default_value_t = 21.0122, allow_negative_numbers = true)]
    pub longitude: f64,

    /// Name shown for the location
    #[arg(long, default_value = "Warsaw")]
    pub place: String,

    /// Minutes fetched data stays fresh
    #[arg(long, value_name = "MINUTES", default_value_t = 30)]
    pub freshness_mins: u64,

    /// Minutes to wait before retrying a failed fetch
    #[arg(long, value_name = "MINUTES", default_value_t = 5)]
    pub retry_mins: u64,

    /// Directory for the cache file (defaults to the platform cache directory)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Print the current weather once and exit
    #[arg(long)]
    pub once: bool,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Location to watch
    pub location: Location,
    /// Refresh timing
    pub refresh: RefreshConfig,
    /// Explicit cache directory, if given
    pub cache_dir: Option<PathBuf>,
    /// Whether to exit after the first result
    pub once: bool,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError)` if a coordinate or duration is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if !(-90.0..=90.0).contains(&cli.latitude) {
            return Err(CliError::InvalidLatitude(cli.latitude));
        }
        if !(-180.0..=180.0).contains(&cli.longitude) {
            return Err(CliError::InvalidLongitude(cli.longitude));
        }
        if cli.freshness_mins == 0 {
            return Err(CliError::InvalidDuration("freshness-mins"));
        }
        if cli.retry_mins == 0 {
            return Err(CliError::InvalidDuration("retry-mins"));
        }
        if cli.retry_mins >= cli.freshness_mins {
            return Err(CliError::RetryNotShorter {
                retry: cli.retry_mins,
                freshness: cli.freshness_mins,
            });
        }

        let freshness_secs = minutes_to_secs(cli.freshness_mins, "freshness-mins")?;
        let retry_secs = minutes_to_secs(cli.retry_mins, "retry-mins")?;

        Ok(StartupConfig {
            location: Location {
                name: cli.place.clone(),
                latitude: cli.latitude,
                longitude: cli.longitude,
            },
            refresh: RefreshConfig {
                freshness_window: Duration::from_secs(freshness_secs),
                retry_delay: Duration::from_secs(retry_secs),
                ..RefreshConfig::default()
            },
            cache_dir: cli.cache_dir.clone(),
            once: cli.once,
        })
    }

    /// Opens the cache store for this configuration
    pub fn cache(&self) -> Result<FileCache, CliError> {
        match &self.cache_dir {
            Some(dir) => Ok(FileCache::with_dir(dir.clone())),
            None => FileCache::new().ok_or(CliError::NoCacheDir),
        }
    }
}

fn minutes_to_secs(minutes: u64, arg: &'static str) -> Result<u64, CliError> {
    minutes
        .checked_mul(60)
        .ok_or(CliError::DurationTooLarge(arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args_uses_defaults() {
        let cli = Cli::parse_from(["skywatch"]);
        assert!((cli.latitude - 52.2297).abs() < 1e-9);
        assert!((cli.longitude - 21.0122).abs() < 1e-9);
        assert_eq!(cli.place, "Warsaw");
        assert_eq!(cli.freshness_mins, 30);
        assert_eq!(cli.retry_mins, 5);
        assert!(cli.cache_dir.is_none());
        assert!(!cli.once);
    }

    #[test]
    fn test_cli_parse_negative_coordinates() {
        let cli = Cli::parse_from(["skywatch", "--latitude", "-33.8688", "--longitude", "-151.2"]);
        assert!((cli.latitude + 33.8688).abs() < 1e-9);
        assert!((cli.longitude + 151.2).abs() < 1e-9);
    }

    #[test]
    fn test_startup_config_defaults_match_refresh_defaults() {
        let cli = Cli::parse_from(["skywatch"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.refresh, RefreshConfig::default());
        assert_eq!(config.location, Location::default());
    }

    #[test]
    fn test_startup_config_custom_durations() {
        let cli = Cli::parse_from(["skywatch", "--freshness-mins", "60", "--retry-mins", "2"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.refresh.freshness_window, Duration::from_secs(3600));
        assert_eq!(config.refresh.retry_delay, Duration::from_secs(120));
    }

    #[test]
    fn test_startup_config_rejects_out_of_range_latitude() {
        let cli = Cli::parse_from(["skywatch", "--latitude", "91"]);
        let err = StartupConfig::from_cli(&cli).unwrap_err();
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn test_startup_config_rejects_out_of_range_longitude() {
        let cli = Cli::parse_from(["skywatch", "--longitude", "-181"]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::InvalidLongitude(_))
        ));
    }

    #[test]
    fn test_startup_config_rejects_zero_durations() {
        let cli = Cli::parse_from(["skywatch", "--retry-mins", "0"]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::InvalidDuration("retry-mins"))
        ));
    }

    #[test]
    fn test_startup_config_rejects_durations_that_overflow() {
        let cli = Cli::parse_from([
            "skywatch",
            "--freshness-mins",
            "18446744073709551615",
            "--retry-mins",
            "5",
        ]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::DurationTooLarge("freshness-mins"))
        ));
    }

    #[test]
    fn test_startup_config_rejects_retry_not_shorter_than_window() {
        let cli = Cli::parse_from(["skywatch", "--freshness-mins", "10", "--retry-mins", "10"]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::RetryNotShorter { .. })
        ));
    }

    #[test]
    fn test_cache_uses_explicit_dir() {
        let cli = Cli::parse_from(["skywatch", "--cache-dir", "/tmp/skywatch-test"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        let cache = config.cache().unwrap();
        assert_eq!(cache.dir(), std::path::Path::new("/tmp/skywatch-test"));
    }
}
