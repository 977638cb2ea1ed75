//! Viewer link state
//!
//! Same shape as the upstream link machine but smaller: the viewer edge has
//! three phases and no terminal give-up. The link task is the only writer
//! during normal operation; `close()` may race it, so the phase lives in an
//! atomic and moves through compare-and-swap.

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use parking_lot::Mutex;
use tracing::debug;

/// Lifecycle phase of the viewer's gateway link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientPhase {
    /// No link, either before the first dial or between sessions
    Closed = 0,
    /// Dialing the gateway
    Connecting = 1,
    /// Handshake finished, frames flowing
    Open = 2,
}

impl ClientPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientPhase::Closed => "closed",
            ClientPhase::Connecting => "connecting",
            ClientPhase::Open => "open",
        }
    }

    /// Whether `next` is a legal successor of `self`
    ///
    /// A failed dial goes straight back to `Closed`, so `Connecting` may
    /// move to either neighbor.
    pub fn may_transition(self, next: ClientPhase) -> bool {
        use ClientPhase::*;
        match (self, next) {
            (_, Closed) => true,
            (Closed, Connecting) => true,
            (Connecting, Open) => true,
            _ => false,
        }
    }

    fn from_u8(raw: u8) -> ClientPhase {
        match raw {
            1 => ClientPhase::Connecting,
            2 => ClientPhase::Open,
            _ => ClientPhase::Closed,
        }
    }
}

impl fmt::Display for ClientPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared state of one viewer link
///
/// Created once per `ViewerClient` and shared between the link task and
/// status readers.
#[derive(Debug, Default)]
pub(crate) struct ClientState {
    phase: AtomicU8,
    attempts: AtomicU32,
    last_error: Mutex<Option<String>>,
}

impl ClientState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current phase
    pub(crate) fn phase(&self) -> ClientPhase {
        ClientPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Move to `next` if the transition is legal
    ///
    /// A self-transition is a no-op that reports success. An illegal
    /// transition leaves the phase untouched and reports failure.
    pub(crate) fn transition(&self, next: ClientPhase) -> bool {
        loop {
            let current = self.phase();
            if current == next {
                return true;
            }
            if !current.may_transition(next) {
                debug!(from = %current, to = %next, "ignoring illegal viewer transition");
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
                debug!(from = %current, to = %next, "viewer phase change");
                return true;
            }
        }
    }

    /// Reconnect attempts scheduled since the last open session
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Count one more reconnect attempt, returning the new total
    pub(crate) fn record_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn reset_attempts(&self) {
        self.attempts.store(0, Ordering::Relaxed);
    }

    /// Remember the most recent link or parse error
    ///
    /// Sticky: stays visible after the link recovers, until the next error
    /// overwrites it.
    pub(crate) fn record_error(&self, error: &dyn fmt::Display) {
        *self.last_error.lock() = Some(error.to_string());
    }

    pub(crate) fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Snapshot for diagnostics
    pub(crate) fn status(&self) -> ClientStatus {
        ClientStatus {
            phase: self.phase(),
            reconnect_attempts: self.attempts(),
            last_error: self.last_error(),
        }
    }
}

/// Point-in-time view of the viewer link
#[derive(Debug, Clone)]
pub struct ClientStatus {
    pub phase: ClientPhase,
    pub reconnect_attempts: u32,
    pub last_error: Option<String>,
}
