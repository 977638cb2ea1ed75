//! Gateway wire frames
//!
//! JSON frames exchanged with viewers over the WebSocket transport, tagged
//! on `type`.
//!
//! # Protocol
//!
//! Server to viewer:
//!
//! ```text
//! {"type":"connection","message":"...","clients":2,"timestamp":"..."}
//! {"type":"rop_data","data":{"depth":100.5,"time":"...","rop":15.2},"timestamp":"..."}
//! {"type":"pong","timestamp":"..."}
//! ```
//!
//! Viewer to server: `{"type":"ping"}`. Anything else is accepted and
//! ignored so newer dashboards can talk to older gateways.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::sample::TelemetrySample;

/// Welcome text sent on every new viewer connection
const WELCOME_MESSAGE: &str = "connected to wellstream gateway";

/// Frames the gateway sends to viewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Welcome, sent exactly once when a connection is accepted
    Connection {
        message: String,
        /// Viewer connections currently registered, this one included
        clients: usize,
        timestamp: String,
    },
    /// One validated telemetry sample
    RopData {
        data: TelemetrySample,
        timestamp: String,
    },
    /// Reply to a viewer `ping`
    Pong { timestamp: String },
}

impl ServerFrame {
    /// Welcome frame for a connection joining a gateway with `clients`
    /// registered viewers
    pub fn welcome(clients: usize) -> Self {
        Self::Connection {
            message: WELCOME_MESSAGE.to_string(),
            clients,
            timestamp: now_rfc3339(),
        }
    }

    /// Sample frame stamped with the current time
    pub fn rop_data(sample: &TelemetrySample) -> Self {
        Self::RopData {
            data: sample.clone(),
            timestamp: now_rfc3339(),
        }
    }

    /// Pong frame stamped with the current time
    pub fn pong() -> Self {
        Self::Pong {
            timestamp: now_rfc3339(),
        }
    }

    /// Serialize to the wire representation
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a frame received from a gateway
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Frames viewers send to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Liveness probe; the gateway answers with a pong
    Ping,
}

impl ClientFrame {
    /// Serialize to the wire representation
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse an inbound viewer payload
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Current time as RFC 3339 with millisecond precision
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
