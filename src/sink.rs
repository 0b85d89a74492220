//! Result sink for the refresh scheduler
//!
//! The scheduler reports every outcome as one of three [`RefreshEvent`]s and
//! never reads anything back from the sink.

use chrono::{DateTime, Local, Utc};
use tokio::sync::mpsc;

use crate::data::CurrentConditions;

/// Outcome the scheduler reports after each decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    /// Fresh data was already in the cache
    ServedFromCache {
        payload: Vec<u8>,
        fetched_at: DateTime<Utc>,
    },
    /// Data was fetched and cached just now
    ServedFromNetwork {
        payload: Vec<u8>,
        fetched_at: DateTime<Utc>,
    },
    /// A fetch failed; a retry is already scheduled
    FetchFailed { reason: String },
}

/// Receiver of scheduler outcomes
pub trait Sink {
    /// Deliver one event; fire-and-forget
    fn emit(&mut self, event: RefreshEvent);
}

/// Sink forwarding events over a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<RefreshEvent>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<RefreshEvent>) -> Self {
        Self { sender }
    }
}

impl Sink for ChannelSink {
    fn emit(&mut self, event: RefreshEvent) {
        // A dropped receiver means nobody is listening any more.
        if self.sender.send(event).is_err() {
            tracing::debug!("refresh event dropped, receiver closed");
        }
    }
}

impl Sink for Vec<RefreshEvent> {
    fn emit(&mut self, event: RefreshEvent) {
        self.push(event);
    }
}

/// Renders an event as a single human-readable line
///
/// # Arguments
/// * `place` - Location name shown at the start of the line
/// * `event` - The event to describe
pub fn render_event(place: &str, event: &RefreshEvent) -> String {
    match event {
        RefreshEvent::ServedFromCache {
            payload,
            fetched_at,
        } => format!(
            "{}: {} (cached from {})",
            place,
            describe_payload(payload),
            fetched_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        RefreshEvent::ServedFromNetwork {
            payload,
            fetched_at,
        } => format!(
            "{}: {} (last updated at {})",
            place,
            describe_payload(payload),
            fetched_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        RefreshEvent::FetchFailed { reason } => format!("{}: fetch failed: {}", place, reason),
    }
}

/// Summarises the payload's current conditions, or "no data" if it cannot be decoded
fn describe_payload(payload: &[u8]) -> String {
    match CurrentConditions::from_payload(payload) {
        Ok(conditions) => {
            let mut line = format!(
                "{}°C, {}",
                conditions.temperature.round() as i64,
                conditions.condition.label()
            );
            if let Some(feels_like) = conditions.feels_like {
                line.push_str(&format!(", feels like {}°C", feels_like.round() as i64));
            }
            if let Some(wind) = conditions.wind {
                line.push_str(&format!(", wind {:.0} km/h", wind));
            }
            line
        }
        Err(_) => "no data".to_string(),
    }
}
