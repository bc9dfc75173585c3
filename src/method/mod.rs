//! EAP method state machines.
//!
//! Each method is a synchronous state machine fed one decoded message at a
//! time by the session layer. Credential material and randomness come in
//! through [`MethodContext`] so exchanges are replayable under test.

use crate::crypto::keys::DerivedKeys;
use crate::error::EapPeerError;
use crate::message::EapMessage;
use crate::provider::{IdentityProvider, SecureRandom};

pub mod aka;
pub mod aka_prime;
pub mod mschapv2;
pub mod sim;

/// Capabilities a method may draw on while processing a message.
pub struct MethodContext<'a> {
    pub provider: &'a mut dyn IdentityProvider,
    pub rng: &'a mut dyn SecureRandom,
}

/// Result of feeding one message to a method.
#[derive(Debug)]
pub enum MethodOutcome {
    /// Send this packet and await the next request.
    Response(EapMessage),
    /// Authentication completed; keying material is ready for export.
    Success(DerivedKeys),
    /// Authentication concluded unsuccessfully. Terminal.
    Failure,
}

/// One EAP authentication method.
///
/// `process` is handed Requests carrying the method's own type code plus
/// bare Success/Failure packets. A `Success` or `Failure` outcome is
/// terminal; the session drops the machine afterwards.
pub trait EapMethodStateMachine: Send {
    fn process(
        &mut self,
        ctx: &mut MethodContext<'_>,
        message: &EapMessage,
    ) -> Result<MethodOutcome, EapPeerError>;
}
