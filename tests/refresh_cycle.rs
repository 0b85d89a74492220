//! Integration tests for the refresh cycle over a real cache directory
//!
//! A scripted gateway stands in for Open-Meteo; restarts are simulated by
//! building a new scheduler over the same directory.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use futures::future::{BoxFuture, FutureExt};
use tempfile::TempDir;

use skywatch::cache::{CacheStore, FileCache};
use skywatch::gateway::{FetchError, FetchGateway};
use skywatch::refresh::{RefreshConfig, RefreshScheduler, SchedulerState};
use skywatch::sink::RefreshEvent;

const PAYLOAD: &[u8] = br#"{"current":{"temperature_2m":7.5,"weather_code":61}}"#;

/// Gateway that always answers with the same outcome and counts calls
struct FixedGateway {
    payload: Option<Vec<u8>>,
    calls: Arc<AtomicUsize>,
}

impl FixedGateway {
    fn succeeding() -> Self {
        Self {
            payload: Some(PAYLOAD.to_vec()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing() -> Self {
        Self {
            payload: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FetchGateway for FixedGateway {
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<u8>, FetchError>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.payload
                .clone()
                .ok_or_else(|| FetchError::Malformed("connection reset".to_string()))
        }
        .boxed()
    }
}

fn write_record_aged(dir: &std::path::Path, age: chrono::Duration) {
    fs::create_dir_all(dir).expect("Should create dir");
    let record = serde_json::json!({
        "fetched_at": (Utc::now() - age).to_rfc3339_opts(SecondsFormat::Millis, true),
        "payload": PAYLOAD.to_vec(),
    });
    fs::write(dir.join("weather.json"), record.to_string()).expect("Should write record");
}

#[tokio::test(start_paused = true)]
async fn test_restart_serves_what_the_previous_run_fetched() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let cache_dir = temp_dir.path().to_path_buf();

    let first_gateway = FixedGateway::succeeding();
    let first_calls = first_gateway.calls.clone();
    let mut first = RefreshScheduler::new(
        FileCache::with_dir(cache_dir.clone()),
        first_gateway,
        Vec::<RefreshEvent>::new(),
        RefreshConfig::default(),
    );
    first.run_once().await;
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert!(matches!(first.sink()[0], RefreshEvent::ServedFromNetwork { .. }));
    drop(first);

    let second_gateway = FixedGateway::succeeding();
    let second_calls = second_gateway.calls.clone();
    let mut second = RefreshScheduler::new(
        FileCache::with_dir(cache_dir),
        second_gateway,
        Vec::<RefreshEvent>::new(),
        RefreshConfig::default(),
    );
    second.run_once().await;

    assert_eq!(second_calls.load(Ordering::SeqCst), 0, "Fresh cache must not be refetched");
    match &second.sink()[0] {
        RefreshEvent::ServedFromCache { payload, .. } => assert_eq!(payload.as_slice(), PAYLOAD),
        other => panic!("Expected ServedFromCache, got {:?}", other),
    }
    match second.state() {
        SchedulerState::Scheduled { remaining } => {
            assert!(remaining <= Duration::from_secs(30 * 60));
            assert!(remaining > Duration::from_secs(29 * 60));
        }
        other => panic!("Expected Scheduled, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cold_start_with_ten_minute_old_cache_waits_twenty_minutes() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write_record_aged(temp_dir.path(), chrono::Duration::minutes(10));

    let gateway = FixedGateway::succeeding();
    let calls = gateway.calls.clone();
    let mut scheduler = RefreshScheduler::new(
        FileCache::with_dir(temp_dir.path().to_path_buf()),
        gateway,
        Vec::<RefreshEvent>::new(),
        RefreshConfig::default(),
    );
    scheduler.run_once().await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    match scheduler.state() {
        SchedulerState::Scheduled { remaining } => {
            assert!(remaining <= Duration::from_secs(20 * 60));
            assert!(remaining >= Duration::from_secs(20 * 60 - 5));
        }
        other => panic!("Expected Scheduled, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cold_start_with_forty_minute_old_cache_fetches() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write_record_aged(temp_dir.path(), chrono::Duration::minutes(40));

    let gateway = FixedGateway::succeeding();
    let calls = gateway.calls.clone();
    let mut scheduler = RefreshScheduler::new(
        FileCache::with_dir(temp_dir.path().to_path_buf()),
        gateway,
        Vec::<RefreshEvent>::new(),
        RefreshConfig::default(),
    );
    scheduler.run_once().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.sink().len(), 1);
    assert!(matches!(scheduler.sink()[0], RefreshEvent::ServedFromNetwork { .. }));
    assert!(scheduler.cache().is_fresh(Duration::from_secs(60)));
}

#[tokio::test(start_paused = true)]
async fn test_failure_keeps_stale_cache_for_next_start() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write_record_aged(temp_dir.path(), chrono::Duration::hours(3));

    let mut scheduler = RefreshScheduler::new(
        FileCache::with_dir(temp_dir.path().to_path_buf()),
        FixedGateway::failing(),
        Vec::<RefreshEvent>::new(),
        RefreshConfig::default(),
    );
    scheduler.run_once().await;

    assert_eq!(
        scheduler.sink()[0],
        RefreshEvent::FetchFailed {
            reason: "Malformed payload: connection reset".to_string()
        }
    );
    assert_eq!(
        scheduler.state(),
        SchedulerState::Scheduled {
            remaining: Duration::from_secs(5 * 60)
        }
    );

    let cache = FileCache::with_dir(temp_dir.path().to_path_buf());
    assert_eq!(cache.read().as_deref(), Some(PAYLOAD));
    assert!(!cache.is_fresh(Duration::from_secs(30 * 60)));
}
