//! Credential back-ends for the authentication methods.
//!
//! SIM and AKA challenges are answered by an [`IdentityProvider`], which
//! is typically backed by a UICC or a test stub holding milenage secrets.
//! Nonce generation goes through [`SecureRandom`] so exchanges can be
//! replayed deterministically under test.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::EapPeerError;

/// Outcome of running the AKA algorithm on a (RAND, AUTN) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AkaResult {
    /// AUTN accepted. RES is 4 to 16 bytes, CK and IK are 16 each.
    Vector {
        res: Vec<u8>,
        ck: [u8; 16],
        ik: [u8; 16],
    },
    /// Sequence number out of range; AUTS carries the resynchronization
    /// token for the home network.
    SynchronizationFailure { auts: [u8; 14] },
    /// AUTN failed verification. The network could not be authenticated.
    Rejected,
}

/// GSM triplet half returned for a single RAND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GsmTriplet {
    pub sres: [u8; 4],
    pub kc: [u8; 8],
}

/// Source of subscriber credentials.
pub trait IdentityProvider: Send {
    /// IMSI of the active subscription, without any method prefix digit.
    fn subscriber_identity(&mut self) -> Result<String, EapPeerError>;

    /// Run UMTS AKA for one challenge.
    fn aka_authenticate(
        &mut self,
        rand: &[u8; 16],
        autn: &[u8; 16],
    ) -> Result<AkaResult, EapPeerError>;

    /// Run the GSM algorithm for one RAND.
    fn gsm_authenticate(&mut self, rand: &[u8; 16]) -> Result<GsmTriplet, EapPeerError>;
}

/// Source of unpredictable bytes for nonces and peer challenges.
pub trait SecureRandom: Send {
    fn fill(&mut self, dest: &mut [u8]);
}

/// Default [`SecureRandom`] backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSecureRandom;

impl SecureRandom for OsSecureRandom {
    fn fill(&mut self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}
