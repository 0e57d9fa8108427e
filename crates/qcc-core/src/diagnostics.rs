//! Timestamped diagnostic logging.
//!
//! [`TimestampedLogger`] observes a backend's [`DiagnosticChannel`] and forwards
//! every message to a [`TimestampedSink`] annotated with the time elapsed since
//! the logger attached and the time since the previous message:
//!
//! ```text
//! [00:00:01.2500000 +00:00:00.0031000] Iteration 3: loss 0.4182
//! ```
//!
//! The logger is a pure observer. It never changes what the backend does or what
//! flows between pipeline stages.

use crate::handle::BackendHandle;
use qcc_training::{DiagnosticChannel, DiagnosticListener, DiagnosticMessage, SubscriptionId};
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A backend message annotated with timing information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedMessage {
    pub elapsed: Duration,
    pub delta: Duration,
    pub text: String,
}

impl fmt::Display for TimestampedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} +{}] {}", format_duration(self.elapsed), format_duration(self.delta), self.text)
    }
}

/// Formats a duration as `[d.]hh:mm:ss[.fffffff]`.
///
/// The fraction has 100ns resolution and is omitted when zero; the day prefix
/// only appears for durations of a day or more.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let days = total_secs / 86_400;
    let hours = (total_secs / 3_600) % 24;
    let minutes = (total_secs / 60) % 60;
    let seconds = total_secs % 60;
    let ticks = duration.subsec_nanos() / 100;

    let mut out = String::with_capacity(20);
    if days > 0 {
        let _ = write!(out, "{days}.");
    }
    let _ = write!(out, "{hours:02}:{minutes:02}:{seconds:02}");
    if ticks > 0 {
        let _ = write!(out, ".{ticks:07}");
    }
    out
}

/// Receives timestamped messages from a [`TimestampedLogger`].
pub trait TimestampedSink: Send + Sync {
    fn deliver(&self, message: TimestampedMessage);
}

/// Writes one formatted line per message to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl TimestampedSink for StdoutSink {
    fn deliver(&self, message: TimestampedMessage) {
        println!("{message}");
    }
}

/// Emits each message as a structured `tracing` event.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TimestampedSink for TracingSink {
    fn deliver(&self, message: TimestampedMessage) {
        info!(
            target: "qcc::diagnostics",
            elapsed = %format_duration(message.elapsed),
            delta = %format_duration(message.delta),
            "{}",
            message.text
        );
    }
}

/// Keeps every delivered message in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<TimestampedMessage>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<TimestampedMessage> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.messages().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TimestampedSink for CollectingSink {
    fn deliver(&self, message: TimestampedMessage) {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).push(message);
    }
}

/// Elapsed/delta bookkeeping for a single run.
#[derive(Debug, Clone)]
pub struct Timestamper {
    run_start: Instant,
    last_message: Option<Instant>,
}

impl Timestamper {
    #[must_use]
    pub fn new(run_start: Instant) -> Self {
        Self { run_start, last_message: None }
    }

    pub fn run_start(&self) -> Instant {
        self.run_start
    }

    /// Returns `(elapsed, delta)` for a message emitted at `emitted_at` and records
    /// it as the latest message. The first delta equals the first elapsed.
    pub fn stamp(&mut self, emitted_at: Instant) -> (Duration, Duration) {
        let elapsed = emitted_at.saturating_duration_since(self.run_start);
        let delta = match self.last_message {
            Some(last) => emitted_at.saturating_duration_since(last),
            None => elapsed,
        };
        self.last_message = Some(emitted_at);
        (elapsed, delta)
    }
}

struct Forwarder {
    timestamper: Mutex<Timestamper>,
    sink: Arc<dyn TimestampedSink>,
    forwarded: AtomicU64,
}

impl DiagnosticListener for Forwarder {
    fn on_message(&self, message: &DiagnosticMessage) {
        let (elapsed, delta) = self
            .timestamper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stamp(message.emitted_at());
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        self.sink.deliver(TimestampedMessage { elapsed, delta, text: message.text().to_string() });
    }
}

/// Subscription that timestamps a backend's diagnostic messages.
///
/// Holds no reference to the backend itself, only its subscription id. Each
/// logger owns fresh timestamp state, so separate runs never share it.
pub struct TimestampedLogger {
    subscription: SubscriptionId,
    forwarder: Arc<Forwarder>,
}

impl fmt::Debug for TimestampedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampedLogger")
            .field("subscription", &self.subscription)
            .field("forwarded", &self.messages_forwarded())
            .finish_non_exhaustive()
    }
}

impl TimestampedLogger {
    /// Attaches to the diagnostic channel of `handle`, starting the run clock now.
    pub fn attach(handle: &BackendHandle, sink: Arc<dyn TimestampedSink>) -> Self {
        Self::attach_to(handle.diagnostics(), sink, Instant::now())
    }

    /// Attaches to `channel` with an explicit run start.
    pub fn attach_to(channel: &DiagnosticChannel, sink: Arc<dyn TimestampedSink>, run_start: Instant) -> Self {
        let forwarder = Arc::new(Forwarder {
            timestamper: Mutex::new(Timestamper::new(run_start)),
            sink,
            forwarded: AtomicU64::new(0),
        });
        let subscription = channel.subscribe(forwarder.clone());
        debug!(?subscription, "Timestamped logger attached");
        Self { subscription, forwarder }
    }

    pub fn run_start(&self) -> Instant {
        self.forwarder.timestamper.lock().unwrap_or_else(PoisonError::into_inner).run_start()
    }

    pub fn messages_forwarded(&self) -> u64 {
        self.forwarder.forwarded.load(Ordering::Relaxed)
    }

    /// Stops forwarding and returns how many messages were forwarded.
    pub fn detach(self, channel: &DiagnosticChannel) -> u64 {
        channel.unsubscribe(self.subscription);
        let forwarded = self.messages_forwarded();
        debug!(subscription = ?self.subscription, forwarded, "Timestamped logger detached");
        forwarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "00:00:00");
        assert_eq!(format_duration(Duration::from_millis(1_250)), "00:00:01.2500000");
        assert_eq!(format_duration(Duration::from_nanos(100)), "00:00:00.0000001");
        assert_eq!(format_duration(Duration::from_nanos(99)), "00:00:00");
        assert_eq!(format_duration(Duration::from_secs(3_723)), "01:02:03");
        assert_eq!(format_duration(Duration::from_secs(90_061) + Duration::from_millis(5)), "1.01:01:01.0050000");
    }

    #[test]
    fn test_message_display() {
        let message = TimestampedMessage {
            elapsed: Duration::from_millis(1_500),
            delta: Duration::from_millis(250),
            text: "Iteration 1".to_string(),
        };
        assert_eq!(message.to_string(), "[00:00:01.5000000 +00:00:00.2500000] Iteration 1");
    }

    #[test]
    fn test_stamp_known_instants() {
        let start = Instant::now();
        let offsets_ms: [&[u64]; 4] =
            [&[3, 3, 10, 250, 251], &[0, 0, 0], &[1], &[7, 90, 1_000, 1_001, 5_000, 5_000]];

        for offsets in offsets_ms {
            let mut timestamper = Timestamper::new(start);
            let mut previous_elapsed = Duration::ZERO;
            let mut previous_offset: Option<u64> = None;

            for (i, offset) in offsets.iter().enumerate() {
                let (elapsed, delta) = timestamper.stamp(start + Duration::from_millis(*offset));
                assert_eq!(elapsed, Duration::from_millis(*offset));
                assert!(elapsed >= previous_elapsed);
                if i == 0 {
                    assert_eq!(delta, elapsed);
                } else {
                    assert_eq!(delta, Duration::from_millis(offset - previous_offset.unwrap()));
                }
                previous_elapsed = elapsed;
                previous_offset = Some(*offset);
            }
        }
    }

    #[test]
    fn test_stamp_before_start_saturates() {
        let start = Instant::now() + Duration::from_secs(1);
        let mut timestamper = Timestamper::new(start);
        let (elapsed, delta) = timestamper.stamp(start - Duration::from_millis(10));
        assert_eq!(elapsed, Duration::ZERO);
        assert_eq!(delta, Duration::ZERO);
    }

    #[test]
    fn test_logger_forwards_channel_messages() {
        let channel = DiagnosticChannel::new();
        channel.disable_default_sink();
        let sink = Arc::new(CollectingSink::new());
        let run_start = Instant::now();
        let logger = TimestampedLogger::attach_to(&channel, sink.clone(), run_start);
        assert_eq!(logger.run_start(), run_start);

        channel.emit("alpha");
        channel.emit("beta");

        let messages = sink.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "alpha");
        assert_eq!(messages[0].delta, messages[0].elapsed);
        assert_eq!(messages[1].text, "beta");
        assert!(messages[1].elapsed >= messages[0].elapsed);
        assert_eq!(messages[1].elapsed - messages[0].elapsed, messages[1].delta);

        assert_eq!(logger.detach(&channel), 2);
        channel.emit("gamma");
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_no_messages_no_output() {
        let channel = DiagnosticChannel::new();
        channel.disable_default_sink();
        let sink = Arc::new(CollectingSink::new());
        let logger = TimestampedLogger::attach_to(&channel, sink.clone(), Instant::now());

        assert_eq!(logger.detach(&channel), 0);
        assert!(sink.is_empty());
    }
}
