//! MS-CHAPv2 cryptographic chain (RFC 2759 Section 8, RFC 3079 Section 3)
//!
//! NT-Response generation, authenticator-response checking, and master
//! session key derivation for EAP-MSCHAPv2. All functions are pure;
//! the RFC 2759 Section 9.2 test vectors are pinned below.

use des::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use des::Des;
use md4::Md4;
use sha1::{Digest, Sha1};

// RFC 2759 Section 8.7.
const MAGIC1: &[u8] = b"Magic server to client signing constant";
const MAGIC2: &[u8] = b"Pad to make it do more than one iteration";

// RFC 3079 Section 3.4.
const MASTER_KEY_MAGIC: &[u8] = b"This is the MPPE Master Key";
const SEND_KEY_MAGIC: &[u8] =
    b"On the client side, this is the send key; on the server side, it is the receive key.";
const RECEIVE_KEY_MAGIC: &[u8] =
    b"On the client side, this is the receive key; on the server side, it is the send key.";

const SHS_PAD1: [u8; 40] = [0x00; 40];
const SHS_PAD2: [u8; 40] = [0xF2; 40];

/// NtPasswordHash: MD4 over the UTF-16LE encoded password.
pub fn nt_password_hash(password: &str) -> [u8; 16] {
    let mut bytes = Vec::with_capacity(password.len() * 2);
    for unit in password.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let mut hash = [0u8; 16];
    hash.copy_from_slice(&Md4::digest(&bytes));
    hash
}

/// HashNtPasswordHash: MD4 over the 16-byte NT hash.
pub fn hash_nt_password_hash(password_hash: &[u8; 16]) -> [u8; 16] {
    let mut hash = [0u8; 16];
    hash.copy_from_slice(&Md4::digest(password_hash));
    hash
}

/// ChallengeHash: first 8 bytes of SHA1(peer | authenticator | username).
pub fn challenge_hash(
    peer_challenge: &[u8; 16],
    authenticator_challenge: &[u8; 16],
    username: &str,
) -> [u8; 8] {
    let mut hasher = Sha1::new();
    hasher.update(peer_challenge);
    hasher.update(authenticator_challenge);
    hasher.update(username.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Spread 56 key bits over 8 octets, leaving the DES parity bit position
/// in each octet (ignored by the cipher).
fn expand_des_key(key7: &[u8; 7]) -> [u8; 8] {
    [
        key7[0],
        (key7[0] << 7) | (key7[1] >> 1),
        (key7[1] << 6) | (key7[2] >> 2),
        (key7[2] << 5) | (key7[3] >> 3),
        (key7[3] << 4) | (key7[4] >> 4),
        (key7[4] << 3) | (key7[5] >> 5),
        (key7[5] << 2) | (key7[6] >> 6),
        key7[6] << 1,
    ]
}

fn des_encrypt(key7: &[u8; 7], block: &[u8; 8]) -> [u8; 8] {
    let key = expand_des_key(key7);
    let cipher = Des::new(GenericArray::from_slice(&key));
    let mut out = *GenericArray::from_slice(block);
    cipher.encrypt_block(&mut out);
    out.into()
}

/// ChallengeResponse: DES-encrypt the challenge under the zero-padded
/// NT hash split into three 7-byte keys.
pub fn challenge_response(challenge: &[u8; 8], password_hash: &[u8; 16]) -> [u8; 24] {
    let mut z_password_hash = [0u8; 21];
    z_password_hash[..16].copy_from_slice(password_hash);

    let mut response = [0u8; 24];
    for i in 0..3 {
        let mut key7 = [0u8; 7];
        key7.copy_from_slice(&z_password_hash[i * 7..i * 7 + 7]);
        response[i * 8..i * 8 + 8].copy_from_slice(&des_encrypt(&key7, challenge));
    }
    response
}

/// GenerateNTResponse (RFC 2759 Section 8.1).
pub fn generate_nt_response(
    authenticator_challenge: &[u8; 16],
    peer_challenge: &[u8; 16],
    username: &str,
    password: &str,
) -> [u8; 24] {
    let challenge = challenge_hash(peer_challenge, authenticator_challenge, username);
    let password_hash = nt_password_hash(password);
    challenge_response(&challenge, &password_hash)
}

fn to_upper_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// GenerateAuthenticatorResponse (RFC 2759 Section 8.7), returned in the
/// wire form `S=<40 uppercase hex digits>`.
pub fn generate_authenticator_response(
    password: &str,
    nt_response: &[u8; 24],
    peer_challenge: &[u8; 16],
    authenticator_challenge: &[u8; 16],
    username: &str,
) -> String {
    let password_hash_hash = hash_nt_password_hash(&nt_password_hash(password));

    let mut hasher = Sha1::new();
    hasher.update(password_hash_hash);
    hasher.update(nt_response);
    hasher.update(MAGIC1);
    let digest = hasher.finalize();

    let challenge = challenge_hash(peer_challenge, authenticator_challenge, username);

    let mut hasher = Sha1::new();
    hasher.update(digest);
    hasher.update(challenge);
    hasher.update(MAGIC2);
    let auth_response = hasher.finalize();

    format!("S={}", to_upper_hex(&auth_response))
}

/// Validate the `S=` string received in a Success Request against the
/// locally computed one.
pub fn check_authenticator_response(
    password: &str,
    nt_response: &[u8; 24],
    peer_challenge: &[u8; 16],
    authenticator_challenge: &[u8; 16],
    username: &str,
    received: &str,
) -> bool {
    let expected = generate_authenticator_response(
        password,
        nt_response,
        peer_challenge,
        authenticator_challenge,
        username,
    );
    expected == received
}

/// GetMasterKey (RFC 3079 Section 3.4).
pub fn get_master_key(password_hash_hash: &[u8; 16], nt_response: &[u8; 24]) -> [u8; 16] {
    let mut hasher = Sha1::new();
    hasher.update(password_hash_hash);
    hasher.update(nt_response);
    hasher.update(MASTER_KEY_MAGIC);
    let digest = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}

/// GetAsymmetricStartKey (RFC 3079 Section 3.4), fixed at the 16-byte
/// session key length used by EAP-MSCHAPv2.
pub fn get_asymmetric_start_key(master_key: &[u8; 16], is_send: bool, is_server: bool) -> [u8; 16] {
    let magic = if is_send == is_server {
        RECEIVE_KEY_MAGIC
    } else {
        SEND_KEY_MAGIC
    };

    let mut hasher = Sha1::new();
    hasher.update(master_key);
    hasher.update(SHS_PAD1);
    hasher.update(magic);
    hasher.update(SHS_PAD2);
    let digest = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}

/// Peer-side MSK: MasterReceiveKey | MasterSendKey. MS-CHAPv2 exports no
/// EMSK; the caller surfaces an empty one.
pub fn generate_msk(password: &str, nt_response: &[u8; 24]) -> Vec<u8> {
    let password_hash_hash = hash_nt_password_hash(&nt_password_hash(password));
    let master_key = get_master_key(&password_hash_hash, nt_response);
    let receive_key = get_asymmetric_start_key(&master_key, false, false);
    let send_key = get_asymmetric_start_key(&master_key, true, false);

    let mut msk = Vec::with_capacity(32);
    msk.extend_from_slice(&receive_key);
    msk.extend_from_slice(&send_key);
    msk
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 2759 Section 9.2 test data.
    const USERNAME: &str = "User";
    const PASSWORD: &str = "clientPass";
    const AUTH_CHALLENGE: [u8; 16] = [
        0x5B, 0x5D, 0x7C, 0x7D, 0x7B, 0x3F, 0x2F, 0x3E, 0x3C, 0x2C, 0x60, 0x21, 0x32, 0x26, 0x26,
        0x28,
    ];
    const PEER_CHALLENGE: [u8; 16] = [
        0x21, 0x40, 0x23, 0x24, 0x25, 0x5E, 0x26, 0x2A, 0x28, 0x29, 0x5F, 0x2B, 0x3A, 0x33, 0x7C,
        0x7E,
    ];
    const CHALLENGE: [u8; 8] = [0xD0, 0x2E, 0x43, 0x86, 0xBC, 0xE9, 0x12, 0x26];
    const PASSWORD_HASH: [u8; 16] = [
        0x44, 0xEB, 0xBA, 0x8D, 0x53, 0x12, 0xB8, 0xD6, 0x11, 0x47, 0x44, 0x11, 0xF5, 0x69, 0x89,
        0xAE,
    ];
    const PASSWORD_HASH_HASH: [u8; 16] = [
        0x41, 0xC0, 0x0C, 0x58, 0x4B, 0xD2, 0xD9, 0x1C, 0x40, 0x17, 0xA2, 0xA1, 0x2F, 0xA5, 0x9F,
        0x3F,
    ];
    const NT_RESPONSE: [u8; 24] = [
        0x82, 0x30, 0x9E, 0xCD, 0x8D, 0x70, 0x8B, 0x5E, 0xA0, 0x8F, 0xAA, 0x39, 0x81, 0xCD, 0x83,
        0x54, 0x42, 0x33, 0x11, 0x4A, 0x3D, 0x85, 0xD6, 0xDF,
    ];

    #[test]
    fn test_challenge_hash_vector() {
        assert_eq!(
            challenge_hash(&PEER_CHALLENGE, &AUTH_CHALLENGE, USERNAME),
            CHALLENGE
        );
    }

    #[test]
    fn test_nt_password_hash_vector() {
        assert_eq!(nt_password_hash(PASSWORD), PASSWORD_HASH);
    }

    #[test]
    fn test_hash_nt_password_hash_vector() {
        assert_eq!(hash_nt_password_hash(&PASSWORD_HASH), PASSWORD_HASH_HASH);
    }

    #[test]
    fn test_nt_response_vector() {
        assert_eq!(
            generate_nt_response(&AUTH_CHALLENGE, &PEER_CHALLENGE, USERNAME, PASSWORD),
            NT_RESPONSE
        );
    }

    #[test]
    fn test_authenticator_response_vector() {
        let response = generate_authenticator_response(
            PASSWORD,
            &NT_RESPONSE,
            &PEER_CHALLENGE,
            &AUTH_CHALLENGE,
            USERNAME,
        );
        assert_eq!(response, "S=407A5589115FD0D6209F510FE9C04566932CDA56");
        assert!(check_authenticator_response(
            PASSWORD,
            &NT_RESPONSE,
            &PEER_CHALLENGE,
            &AUTH_CHALLENGE,
            USERNAME,
            &response
        ));
        assert!(!check_authenticator_response(
            PASSWORD,
            &NT_RESPONSE,
            &PEER_CHALLENGE,
            &AUTH_CHALLENGE,
            USERNAME,
            "S=0000000000000000000000000000000000000000"
        ));
    }

    // RFC 3079 Section 3.5.3 test data (same credentials as above).
    const MASTER_KEY: [u8; 16] = [
        0xFC, 0xE2, 0x2A, 0xD8, 0x1B, 0xE1, 0x39, 0x73, 0x78, 0xE4, 0x96, 0xAA, 0x2F, 0x64, 0xA7,
        0x5A,
    ];
    const MASTER_SEND_KEY: [u8; 16] = [
        0x8B, 0x7C, 0xDC, 0x14, 0x9B, 0x99, 0x3A, 0x1B, 0xA1, 0x18, 0xCB, 0x15, 0x3F, 0x56, 0xDC,
        0xCB,
    ];

    #[test]
    fn test_master_key_vector() {
        assert_eq!(get_master_key(&PASSWORD_HASH_HASH, &NT_RESPONSE), MASTER_KEY);
    }

    #[test]
    fn test_asymmetric_start_key_vector() {
        // The server-side send key equals the client-side receive key
        assert_eq!(
            get_asymmetric_start_key(&MASTER_KEY, true, true),
            MASTER_SEND_KEY
        );
        assert_eq!(
            get_asymmetric_start_key(&MASTER_KEY, false, false),
            MASTER_SEND_KEY
        );
    }

    #[test]
    fn test_msk_shape() {
        let msk = generate_msk(PASSWORD, &NT_RESPONSE);
        assert_eq!(msk.len(), 32);
        assert_eq!(&msk[..16], &MASTER_SEND_KEY);
        // Send and receive halves must differ
        assert_ne!(&msk[..16], &msk[16..]);
    }
}
