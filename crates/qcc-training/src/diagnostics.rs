//! Diagnostic message stream exposed by every backend.
//!
//! Backends push raw text through a [`DiagnosticChannel`]. Observers subscribe a
//! [`DiagnosticListener`] and receive each message, in emission order, together
//! with the monotonic instant at which it was emitted.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::debug;

/// A single diagnostic line produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    text: String,
    emitted_at: Instant,
}

impl DiagnosticMessage {
    #[must_use]
    pub fn new(text: impl Into<String>, emitted_at: Instant) -> Self {
        Self { text: text.into(), emitted_at }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn emitted_at(&self) -> Instant {
        self.emitted_at
    }
}

pub trait DiagnosticListener: Send + Sync {
    /// Called once per emitted message. Must not emit on the same channel.
    fn on_message(&self, message: &DiagnosticMessage);
}

/// Identifies a listener registered on a [`DiagnosticChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct ChannelState {
    default_sink: bool,
    closed: bool,
    next_id: u64,
    listeners: Vec<(SubscriptionId, Arc<dyn DiagnosticListener>)>,
}

/// Fan-out point for a backend's diagnostic messages.
///
/// The default sink writes each raw message to stdout until it is disabled.
/// Timestamping and delivery happen under one lock, so listeners see messages in
/// the order they were emitted even when several threads emit concurrently, and
/// emission instants never go backwards in delivery order.
pub struct DiagnosticChannel {
    state: Mutex<ChannelState>,
}

impl fmt::Debug for DiagnosticChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("DiagnosticChannel")
            .field("default_sink", &state.default_sink)
            .field("closed", &state.closed)
            .field("listener_count", &state.listeners.len())
            .finish()
    }
}

impl Default for DiagnosticChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticChannel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChannelState {
                default_sink: true,
                closed: false,
                next_id: 0,
                listeners: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops the raw stdout output. Cannot be re-enabled.
    pub fn disable_default_sink(&self) {
        self.state().default_sink = false;
    }

    pub fn default_sink_enabled(&self) -> bool {
        self.state().default_sink
    }

    pub fn subscribe(&self, listener: Arc<dyn DiagnosticListener>) -> SubscriptionId {
        let mut state = self.state();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.listeners.push((id, listener));
        debug!(subscription = id.0, listeners = state.listeners.len(), "Diagnostic listener subscribed");
        id
    }

    /// Removes a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state();
        let before = state.listeners.len();
        state.listeners.retain(|(existing, _)| *existing != id);
        let removed = state.listeners.len() != before;
        if removed {
            debug!(subscription = id.0, "Diagnostic listener unsubscribed");
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    /// Emits one message to the default sink and every listener.
    ///
    /// Messages emitted after [`close`](Self::close) are discarded.
    pub fn emit(&self, text: impl Into<String>) {
        let state = self.state();
        if state.closed {
            return;
        }

        let message = DiagnosticMessage::new(text, Instant::now());
        if state.default_sink {
            println!("{}", message.text());
        }
        for (_, listener) in &state.listeners {
            listener.on_message(&message);
        }
    }

    /// Drops all listeners and rejects further messages.
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.listeners.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}
