//! AT_MAC computation and verification
//!
//! The MAC covers the fully-assembled EAP packet with the AT_MAC value
//! field zeroed, truncated to 16 bytes. EAP-SIM and EAP-AKA use HMAC-SHA1
//! (RFC 4186/4187 Section 10.14/10.15), EAP-AKA' uses HMAC-SHA256
//! (RFC 5448 Section 3.3). EAP-SIM additionally appends NONCE_MT (request)
//! or the concatenated SRES values (response) to the MACed buffer.
//!
//! Verification fails closed: a mismatch is reported to the caller, which
//! answers with a Client-Error packet rather than ignoring the failure.

use crate::attribute::MAC_LEN;
use crate::crypto::keys::{hmac_sha1, hmac_sha256};

/// MAC algorithm selected by the method family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacAlgorithm {
    /// EAP-SIM / EAP-AKA.
    HmacSha1,
    /// EAP-AKA'.
    HmacSha256,
}

/// Compute the 16-byte AT_MAC digest over `packet` (already encoded with a
/// zeroed AT_MAC value) followed by `extra` (empty for the AKA family).
pub fn compute_mac(
    algorithm: MacAlgorithm,
    k_aut: &[u8],
    packet: &[u8],
    extra: &[u8],
) -> [u8; MAC_LEN] {
    let mut buf = Vec::with_capacity(packet.len() + extra.len());
    buf.extend_from_slice(packet);
    buf.extend_from_slice(extra);

    let mut mac = [0u8; MAC_LEN];
    match algorithm {
        MacAlgorithm::HmacSha1 => mac.copy_from_slice(&hmac_sha1(k_aut, &buf)[..MAC_LEN]),
        MacAlgorithm::HmacSha256 => mac.copy_from_slice(&hmac_sha256(k_aut, &buf)[..MAC_LEN]),
    }
    mac
}

/// Constant-shape comparison of a received digest against the recomputed
/// one. Returns true only on an exact match.
pub fn verify_mac(
    algorithm: MacAlgorithm,
    k_aut: &[u8],
    packet: &[u8],
    extra: &[u8],
    received: &[u8; MAC_LEN],
) -> bool {
    let computed = compute_mac(algorithm, k_aut, packet, extra);
    // Byte-wise accumulate rather than early-exit compare
    computed
        .iter()
        .zip(received.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
