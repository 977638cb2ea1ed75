//! Upstream link state
//!
//! The link lifecycle is a single `phase` value with an explicit legality
//! table. The link task is the only writer during normal operation;
//! `disconnect()` may race it, so the phase lives in an atomic and moves
//! through compare-and-swap.

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use tracing::debug;

/// Lifecycle phase of the upstream broker link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkPhase {
    /// No link. Initial state, explicit teardown, or terminal give-up.
    Disconnected = 0,
    /// Dialing the broker, before the connection is acknowledged
    Connecting = 1,
    /// Connection up, waiting for the subscription acknowledgment
    Subscribing = 2,
    /// Subscribed and consuming samples
    Active = 3,
    /// Link lost, waiting out the reconnect delay
    Reconnecting = 4,
}

impl LinkPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkPhase::Disconnected => "disconnected",
            LinkPhase::Connecting => "connecting",
            LinkPhase::Subscribing => "subscribing",
            LinkPhase::Active => "active",
            LinkPhase::Reconnecting => "reconnecting",
        }
    }

    /// Whether `next` is a legal successor of `self`
    pub fn may_transition(self, next: LinkPhase) -> bool {
        use LinkPhase::*;
        match (self, next) {
            // teardown is legal from anywhere
            (_, Disconnected) => true,
            (Disconnected, Connecting) => true,
            (Connecting, Subscribing) => true,
            (Subscribing, Active) => true,
            (Subscribing, Reconnecting) => true,
            (Active, Reconnecting) => true,
            (Reconnecting, Subscribing) => true,
            _ => false,
        }
    }

    fn from_u8(raw: u8) -> LinkPhase {
        match raw {
            1 => LinkPhase::Connecting,
            2 => LinkPhase::Subscribing,
            3 => LinkPhase::Active,
            4 => LinkPhase::Reconnecting,
            _ => LinkPhase::Disconnected,
        }
    }
}

impl fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared state of one upstream link
///
/// Created once per `BrokerConnector` and shared between the link task and
/// status readers.
#[derive(Debug)]
pub struct LinkState {
    phase: AtomicU8,
    attempts: AtomicU32,
    topic: String,
}

impl LinkState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            phase: AtomicU8::new(LinkPhase::Disconnected as u8),
            attempts: AtomicU32::new(0),
            topic: topic.into(),
        }
    }

    /// Current phase
    pub fn phase(&self) -> LinkPhase {
        LinkPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Move to `next` if the transition is legal
    ///
    /// A self-transition is a no-op that reports success. An illegal
    /// transition leaves the phase untouched and reports failure.
    pub fn transition(&self, next: LinkPhase) -> bool {
        loop {
            let current = self.phase();
            if current == next {
                return true;
            }
            if !current.may_transition(next) {
                debug!(from = %current, to = %next, "ignoring illegal link transition");
                return false;
            }
            if self
                .phase
                .compare_exchange(
                    current as u8,
                    next as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                debug!(from = %current, to = %next, "link phase change");
                return true;
            }
        }
    }

    /// Consecutive reconnect attempts since the last acknowledged subscribe
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Count one more reconnect attempt, returning the new total
    pub fn record_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn reset_attempts(&self) {
        self.attempts.store(0, Ordering::Relaxed);
    }

    /// Topic this link subscribes to
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Snapshot for diagnostics
    pub fn status(&self) -> LinkStatus {
        LinkStatus {
            phase: self.phase(),
            reconnect_attempts: self.attempts(),
            topic: self.topic.clone(),
        }
    }
}

/// Point-in-time view of the upstream link
#[derive(Debug, Clone)]
pub struct LinkStatus {
    pub phase: LinkPhase,
    pub reconnect_attempts: u32,
    pub topic: String,
}
