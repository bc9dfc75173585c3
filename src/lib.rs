//! EAP Peer Authentication Library
//!
//! Peer-side implementation of EAP-SIM (RFC 4186), EAP-AKA (RFC 4187),
//! EAP-AKA' (RFC 5448) and EAP-MSCHAPv2 (RFC 2759 framing), from the wire
//! codec up to an async authenticator that serializes inbound packets and
//! reports the verdict and keying material through callbacks.

pub mod attribute; // EAP-SIM/AKA attribute codec
pub mod authenticator; // Async session front end
pub mod config; // Session and method configuration
pub mod crypto; // Key derivation, AT_MAC, MSCHAPv2 hashes
pub mod error; // Error taxonomy
pub mod message; // EAP packet codec
pub mod method; // Method state machines
pub mod provider; // Credential back-end traits
pub mod session; // EAP layer routing


// Re-export the surface most integrations need
pub use authenticator::{EapAuthenticator, EapCallback};
pub use config::{EapMethodConfig, SessionConfig, DEFAULT_MESSAGE_TIMEOUT};
pub use crypto::keys::DerivedKeys;
pub use error::EapPeerError;
pub use message::{EapCode, EapMessage};
pub use provider::{AkaResult, GsmTriplet, IdentityProvider, OsSecureRandom, SecureRandom};
pub use session::{EapSession, SessionOutcome};
