//! Error taxonomy for the EAP peer library
//!
//! All failures are recovered at the authenticator boundary and turned into
//! exactly one `on_error` callback. Method-level outcomes such as a failed
//! MAC check or an AKA synchronization failure are protocol-legal response
//! branches, not errors, and never appear here.

use crate::message::DecodeError;
use thiserror::Error;

/// Top-level error type surfaced through `EapCallback::on_error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EapPeerError {
    /// Malformed inbound packet (bad length, bad attribute framing).
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Message decoded fine but is semantically wrong for the current state.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The identity/credential provider failed outright (distinct from the
    /// protocol-legal SYNC_FAILURE and REJECTED outcomes).
    #[error("identity provider error: {0}")]
    Provider(String),

    /// The round-trip timer elapsed before the state machine produced a
    /// result. Terminal for the exchange.
    #[error("authentication round-trip timed out")]
    Timeout,

    /// Unexpected internal failure (e.g. a panic in a processing step),
    /// caught at the dispatcher boundary.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EapPeerError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        EapPeerError::Protocol(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        EapPeerError::Provider(msg.into())
    }
}
