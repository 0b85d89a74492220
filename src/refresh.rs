//! Cache-aware refresh scheduling
//!
//! [`RefreshScheduler`] decides when the weather is fetched. On cold start it
//! serves a fresh cache entry and waits out the rest of its window, otherwise
//! it fetches. After a success it waits a full freshness window, after a
//! failure a short retry delay. One task owns the scheduler and processes one
//! transition at a time, so at most one fetch is ever in flight and at most
//! one timer is ever armed.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Sleep;

use crate::cache::CacheStore;
use crate::gateway::{FetchError, FetchGateway};
use crate::sink::{ChannelSink, RefreshEvent, Sink};

/// Configuration for refresh timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// How long fetched data stays usable without refetching
    pub freshness_window: Duration,
    /// Wait before retrying after a failed fetch
    pub retry_delay: Duration,
    /// Floor for any armed timer
    pub min_delay: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            freshness_window: Duration::from_secs(30 * 60),
            retry_delay: Duration::from_secs(5 * 60),
            min_delay: Duration::from_secs(5),
        }
    }
}

/// Where the scheduler is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed, cold start not yet decided
    Idle,
    /// A fetch is due or in flight; no timer is armed
    Fetching,
    /// Waiting on the single armed timer
    Scheduled { remaining: Duration },
}

/// Time left in the freshness window, never less than `min_delay`
///
/// `last_fetch` and `now` are both UTC wall-clock instants, so the result
/// stays correct across process restarts. A `last_fetch` ahead of `now`
/// counts as zero elapsed.
pub fn remaining_window(
    window: Duration,
    last_fetch: DateTime<Utc>,
    now: DateTime<Utc>,
    min_delay: Duration,
) -> Duration {
    let elapsed = now
        .signed_duration_since(last_fetch)
        .to_std()
        .unwrap_or(Duration::ZERO);
    window.saturating_sub(elapsed).max(min_delay)
}

/// Single-timer refresh state machine
pub struct RefreshScheduler<C, G, S> {
    cache: C,
    gateway: G,
    sink: S,
    config: RefreshConfig,
    state: SchedulerState,
    /// The one armed timer; replacing it drops, and so cancels, the old one
    timer: Option<Pin<Box<Sleep>>>,
}

impl<C, G, S> RefreshScheduler<C, G, S>
where
    C: CacheStore,
    G: FetchGateway,
    S: Sink,
{
    pub fn new(cache: C, gateway: G, sink: S, config: RefreshConfig) -> Self {
        Self {
            cache,
            gateway,
            sink,
            config,
            state: SchedulerState::Idle,
            timer: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Whether a timer is currently armed
    pub fn has_armed_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Makes the cold-start decision; no-op unless `Idle`
    ///
    /// Serves the cache and arms a timer for the rest of the window when the
    /// cached payload is fresh and well formed, otherwise moves to `Fetching`.
    pub fn cold_start(&mut self) {
        if self.state != SchedulerState::Idle {
            return;
        }

        let window = self.config.freshness_window;
        if self.cache.is_fresh(window) {
            if let (Some(payload), Some(fetched_at)) =
                (self.cache.read(), self.cache.last_fetch_time())
            {
                match self.gateway.validate(&payload) {
                    Ok(()) => {
                        let remaining =
                            remaining_window(window, fetched_at, Utc::now(), self.config.min_delay);
                        tracing::info!(
                            %fetched_at,
                            remaining_secs = remaining.as_secs(),
                            "serving weather from cache"
                        );
                        self.sink.emit(RefreshEvent::ServedFromCache {
                            payload,
                            fetched_at,
                        });
                        self.arm(remaining);
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "cached payload rejected, refetching");
                    }
                }
            }
        } else {
            tracing::debug!("no fresh cache on cold start");
        }

        self.state = SchedulerState::Fetching;
    }

    /// Applies the outcome of a fetch; no-op unless `Fetching`
    ///
    /// A payload that fails validation counts as a failed fetch. Failures
    /// leave the cache untouched.
    pub fn complete_fetch(&mut self, result: Result<Vec<u8>, FetchError>) {
        if self.state != SchedulerState::Fetching {
            return;
        }

        let outcome = result.and_then(|payload| {
            self.gateway.validate(&payload)?;
            Ok(payload)
        });

        match outcome {
            Ok(payload) => {
                let fetched_at = match self.cache.write(&payload) {
                    Ok(stored_at) => stored_at,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to cache weather payload");
                        Utc::now()
                    }
                };
                tracing::info!(%fetched_at, bytes = payload.len(), "weather fetched");
                self.sink.emit(RefreshEvent::ServedFromNetwork {
                    payload,
                    fetched_at,
                });
                self.arm(self.config.freshness_window);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retry_secs = self.config.retry_delay.as_secs(),
                    "weather fetch failed"
                );
                self.sink.emit(RefreshEvent::FetchFailed {
                    reason: e.to_string(),
                });
                self.arm(self.config.retry_delay);
            }
        }
    }

    /// Arms the timer, superseding any armed one
    fn arm(&mut self, delay: Duration) {
        let delay = delay.max(self.config.min_delay);
        self.timer = Some(Box::pin(tokio::time::sleep(delay)));
        self.state = SchedulerState::Scheduled { remaining: delay };
    }

    /// Timer fired: disarm and move to `Fetching`
    fn fire(&mut self) {
        self.timer = None;
        self.state = SchedulerState::Fetching;
    }

    /// Processes exactly one transition
    ///
    /// `Idle` makes the cold-start decision, `Fetching` runs one fetch to
    /// completion, `Scheduled` waits for the armed timer.
    pub async fn step(&mut self) {
        match self.state {
            SchedulerState::Idle => self.cold_start(),
            SchedulerState::Fetching => {
                tracing::debug!("fetching weather");
                let result = self.gateway.fetch().await;
                self.complete_fetch(result);
            }
            SchedulerState::Scheduled { .. } => {
                if let Some(timer) = self.timer.as_mut() {
                    timer.as_mut().await;
                }
                self.fire();
            }
        }
    }

    /// Runs until the first event has been emitted
    pub async fn run_once(&mut self) {
        self.step().await;
        if self.state == SchedulerState::Fetching {
            self.step().await;
        }
    }

    /// Runs transitions until `shutdown` receives a message or closes
    ///
    /// An in-flight fetch or armed timer is abandoned on shutdown.
    pub async fn run(mut self, mut shutdown: mpsc::Receiver<()>) {
        loop {
            tokio::select! {
                _ = self.step() => {}
                _ = shutdown.recv() => {
                    tracing::info!("refresh scheduler stopped");
                    break;
                }
            }
        }
    }
}

/// Handle for a scheduler running on its own tokio task
pub struct RefreshHandle {
    /// Channel for receiving refresh events
    pub receiver: mpsc::UnboundedReceiver<RefreshEvent>,
    /// Signals the scheduler task to stop
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Spawns a scheduler over `cache` and `gateway`
    ///
    /// # Returns
    /// A RefreshHandle that receives events via the `receiver` channel
    pub fn spawn<C, G>(cache: C, gateway: G, config: RefreshConfig) -> Self
    where
        C: CacheStore + Send + 'static,
        G: FetchGateway + 'static,
    {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        let scheduler = RefreshScheduler::new(cache, gateway, ChannelSink::new(event_tx), config);
        let task = tokio::spawn(scheduler.run(shutdown_rx));

        Self {
            receiver: event_rx,
            shutdown_tx,
            task,
        }
    }

    /// Waits for the next event
    pub async fn recv(&mut self) -> Option<RefreshEvent> {
        self.receiver.recv().await
    }

    /// Returns a pending event without waiting
    pub fn try_recv(&mut self) -> Option<RefreshEvent> {
        self.receiver.try_recv().ok()
    }

    /// Hands every event to `on_event` until `interrupt` completes or the
    /// scheduler goes away
    ///
    /// `interrupt` is created once and polled across iterations, so a signal
    /// that lands while `on_event` runs still ends the loop.
    pub async fn forward_until<F, P>(&mut self, interrupt: F, mut on_event: P)
    where
        F: Future,
        P: FnMut(RefreshEvent),
    {
        tokio::pin!(interrupt);
        loop {
            tokio::select! {
                event = self.receiver.recv() => match event {
                    Some(event) => on_event(event),
                    None => break,
                },
                _ = &mut interrupt => {
                    tracing::info!("interrupted");
                    break;
                }
            }
        }
    }

    /// Stops the scheduler task and waits for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}
