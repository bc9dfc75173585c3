//! Session key derivation for the SIM/AKA method family
//!
//! Every derivation here is a pure function of (identity, vectors,
//! nonce/network-name) producing an immutable [`DerivedKeys`] value in one
//! step. Keys live only for the remainder of the exchange and are never
//! persisted.
//!
//! - EAP-SIM: MK = SHA1(identity | n*Kc | NONCE_MT | version list |
//!   selected version), expanded with the FIPS 186-2 PRF (RFC 4186 §7).
//! - EAP-AKA: MK = SHA1(identity | IK | CK), same expansion (RFC 4187 §7).
//! - EAP-AKA': CK'/IK' from CK/IK and the serving network name
//!   (3GPP TS 33.402 A.2), then PRF' over "EAP-AKA'" | identity
//!   (RFC 5448 §3.3).

use crate::crypto::fips_prf::fips186_2_prf;
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use sha2::Sha256;

/// FC value for the CK'/IK' derivation (TS 33.402 Annex A.2).
const FC_CK_IK_PRIME: u8 = 0x20;

/// Keying material exported by a method after a successful challenge.
///
/// `k_re` is only populated for EAP-AKA'; `emsk` is empty for EAP-MSCHAPv2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKeys {
    pub k_encr: Vec<u8>,
    pub k_aut: Vec<u8>,
    pub k_re: Vec<u8>,
    pub msk: Vec<u8>,
    pub emsk: Vec<u8>,
}

pub fn hmac_sha256(key: &[u8], input: &[u8]) -> [u8; 32] {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any size"));
    mac.update(input);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

pub fn hmac_sha1(key: &[u8], input: &[u8]) -> [u8; 20] {
    let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any size"));
    mac.update(input);
    let mut out = [0u8; 20];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Slice the FIPS PRF stream into K_encr(16) | K_aut(16) | MSK(64) |
/// EMSK(64), the fixed order shared by EAP-SIM and EAP-AKA.
fn slice_sim_aka(stream: Vec<u8>) -> DerivedKeys {
    DerivedKeys {
        k_encr: stream[0..16].to_vec(),
        k_aut: stream[16..32].to_vec(),
        k_re: Vec::new(),
        msk: stream[32..96].to_vec(),
        emsk: stream[96..160].to_vec(),
    }
}

/// EAP-SIM key derivation from up to 3 GSM triplets (RFC 4186 Section 7).
pub fn derive_sim_keys(
    identity: &[u8],
    kc_values: &[[u8; 8]],
    nonce_mt: &[u8; 16],
    version_list: &[u8],
    selected_version: u16,
) -> DerivedKeys {
    let mut hasher = Sha1::new();
    hasher.update(identity);
    for kc in kc_values {
        hasher.update(kc);
    }
    hasher.update(nonce_mt);
    hasher.update(version_list);
    hasher.update(selected_version.to_be_bytes());
    let mk: [u8; 20] = hasher.finalize().into();

    slice_sim_aka(fips186_2_prf(&mk, 160))
}

/// EAP-AKA key derivation (RFC 4187 Section 7).
pub fn derive_aka_keys(identity: &[u8], ck: &[u8; 16], ik: &[u8; 16]) -> DerivedKeys {
    let mut hasher = Sha1::new();
    hasher.update(identity);
    hasher.update(ik);
    hasher.update(ck);
    let mk: [u8; 20] = hasher.finalize().into();

    slice_sim_aka(fips186_2_prf(&mk, 160))
}

/// Derive CK'/IK' from CK/IK, the serving network name, and SQN xor AK
/// (the first six octets of AUTN), per TS 33.402 Annex A.2.
pub fn derive_ck_ik_prime(
    ck: &[u8; 16],
    ik: &[u8; 16],
    network_name: &[u8],
    sqn_xor_ak: &[u8; 6],
) -> ([u8; 16], [u8; 16]) {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(ck);
    key[16..].copy_from_slice(ik);

    let mut s = Vec::with_capacity(1 + network_name.len() + 2 + 6 + 2);
    s.push(FC_CK_IK_PRIME);
    s.extend_from_slice(network_name);
    s.extend_from_slice(&(network_name.len() as u16).to_be_bytes());
    s.extend_from_slice(sqn_xor_ak);
    s.extend_from_slice(&6u16.to_be_bytes());

    let out = hmac_sha256(&key, &s);
    let mut ck_prime = [0u8; 16];
    let mut ik_prime = [0u8; 16];
    ck_prime.copy_from_slice(&out[..16]);
    ik_prime.copy_from_slice(&out[16..]);
    (ck_prime, ik_prime)
}

/// PRF' from RFC 5448 Section 3.4.1: an HMAC-SHA256 counter chain
/// T_n = HMAC(K, T_(n-1) | S | n).
pub fn prf_prime(key: &[u8], s: &[u8], output_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(output_len.div_ceil(32) * 32);
    let mut prev: Option<[u8; 32]> = None;
    let mut counter = 1u8;
    while out.len() < output_len {
        let mut input = Vec::with_capacity(32 + s.len() + 1);
        if let Some(t) = prev {
            input.extend_from_slice(&t);
        }
        input.extend_from_slice(s);
        input.push(counter);
        let t = hmac_sha256(key, &input);
        out.extend_from_slice(&t);
        prev = Some(t);
        counter += 1;
    }
    out.truncate(output_len);
    out
}

/// EAP-AKA' key derivation (RFC 5448 Section 3.3): PRF'(IK'|CK',
/// "EAP-AKA'"|identity) sliced into K_encr(16) | K_aut(32) | K_re(32) |
/// MSK(64) | EMSK(64).
pub fn derive_aka_prime_keys(
    identity: &[u8],
    ck_prime: &[u8; 16],
    ik_prime: &[u8; 16],
) -> DerivedKeys {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(ik_prime);
    key[16..].copy_from_slice(ck_prime);

    let mut s = Vec::with_capacity(8 + identity.len());
    s.extend_from_slice(b"EAP-AKA'");
    s.extend_from_slice(identity);

    let stream = prf_prime(&key, &s, 208);
    DerivedKeys {
        k_encr: stream[0..16].to_vec(),
        k_aut: stream[16..48].to_vec(),
        k_re: stream[48..80].to_vec(),
        msk: stream[80..144].to_vec(),
        emsk: stream[144..208].to_vec(),
    }
}
