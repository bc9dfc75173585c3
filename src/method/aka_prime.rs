//! EAP-AKA' peer state machine (RFC 5448)
//!
//! Runs the shared AKA flow with HMAC-SHA256 integrity and the CK'/IK'
//! key hierarchy bound to the serving network name. The challenge must
//! carry AT_KDF and AT_KDF_INPUT; anything but a single selected KDF of
//! value 1 is answered with Client-Error, and a network name that differs
//! from the configured one is answered with Authentication-Reject unless
//! the session explicitly tolerates the mismatch.

use log::warn;

use crate::attribute::{AttributeSet, CLIENT_ERROR_UNABLE_TO_PROCESS};
use crate::crypto::keys::{derive_aka_prime_keys, derive_ck_ik_prime, DerivedKeys};
use crate::crypto::mac::MacAlgorithm;
use crate::error::EapPeerError;
use crate::message::{EapMessage, EAP_TYPE_AKA_PRIME};
use crate::method::aka::{AkaCore, KeyScheme};
use crate::method::{EapMethodStateMachine, MethodContext, MethodOutcome};

/// AT_KDF value for the CK'/IK' derivation, the only KDF defined by
/// RFC 5448.
pub const KDF_CK_IK_PRIME: u16 = 1;

pub(crate) struct PrimeParams {
    pub network_name: String,
    pub allow_mismatched_network_names: bool,
}

/// Reasons the AKA' challenge cannot proceed to a signed response.
pub(crate) enum ChallengeReject {
    ClientError(u16),
    AuthenticationReject,
}

/// Validate AT_KDF/AT_KDF_INPUT and derive the AKA' key hierarchy from
/// the transport keys of an accepted challenge.
pub(crate) fn derive_challenge_keys(
    params: &PrimeParams,
    identity: &str,
    attributes: &AttributeSet,
    autn: &[u8; 16],
    ck: &[u8; 16],
    ik: &[u8; 16],
) -> Result<DerivedKeys, ChallengeReject> {
    let kdfs = attributes
        .kdf_values()
        .map_err(|_| ChallengeReject::ClientError(CLIENT_ERROR_UNABLE_TO_PROCESS))?;
    let selected_supported = kdfs.first() == Some(&KDF_CK_IK_PRIME);
    let duplicated = kdfs.iter().filter(|&&k| k == KDF_CK_IK_PRIME).count() != 1;
    if !selected_supported || duplicated {
        warn!("unusable AT_KDF list {kdfs:?}");
        return Err(ChallengeReject::ClientError(CLIENT_ERROR_UNABLE_TO_PROCESS));
    }

    let kdf_input = attributes
        .kdf_input()
        .map_err(|_| ChallengeReject::ClientError(CLIENT_ERROR_UNABLE_TO_PROCESS))?;
    if kdf_input.is_empty() {
        return Err(ChallengeReject::ClientError(CLIENT_ERROR_UNABLE_TO_PROCESS));
    }
    if kdf_input != params.network_name.as_bytes() {
        warn!(
            "server network name {:?} does not match configured {:?}",
            String::from_utf8_lossy(&kdf_input),
            params.network_name
        );
        if !params.allow_mismatched_network_names {
            return Err(ChallengeReject::AuthenticationReject);
        }
    }

    // SQN xor AK is carried in the first six octets of AUTN. Keys bind to
    // the name the server sent, not the configured one.
    let mut sqn_xor_ak = [0u8; 6];
    sqn_xor_ak.copy_from_slice(&autn[..6]);
    let (ck_prime, ik_prime) = derive_ck_ik_prime(ck, ik, &kdf_input, &sqn_xor_ak);
    Ok(derive_aka_prime_keys(
        identity.as_bytes(),
        &ck_prime,
        &ik_prime,
    ))
}

/// EAP-AKA' (type 50).
pub struct EapAkaPrimeMethod {
    core: AkaCore,
}

impl EapAkaPrimeMethod {
    pub fn new(
        identity: String,
        network_name: String,
        allow_mismatched_network_names: bool,
    ) -> Self {
        EapAkaPrimeMethod {
            core: AkaCore::new(
                identity,
                EAP_TYPE_AKA_PRIME,
                MacAlgorithm::HmacSha256,
                KeyScheme::AkaPrime(PrimeParams {
                    network_name,
                    allow_mismatched_network_names,
                }),
            ),
        }
    }
}

impl EapMethodStateMachine for EapAkaPrimeMethod {
    fn process(
        &mut self,
        ctx: &mut MethodContext<'_>,
        message: &EapMessage,
    ) -> Result<MethodOutcome, EapPeerError> {
        self.core.process(ctx, message)
    }
}
