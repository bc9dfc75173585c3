//! EAP-SIM/AKA attribute codec (RFC 4186/4187 Section 10/11)
//!
//! The Type-Data of a SIM/AKA-family packet is `Subtype(1) | Reserved(2) |
//! Attributes`. Each attribute is framed as `Type(1) | Length(1) | Value`
//! where Length counts 4-byte words including the two framing octets, so
//! the total attribute byte count is always a multiple of 4.
//!
//! Attributes are kept in receive order: AT_MAC is computed over the
//! fully-assembled packet, so re-encoding must be byte-exact.

use crate::message::{DecodeError, EapCode, EapMessage};
use bytes::{Buf, BufMut};

// Attribute type codes (RFC 4186/4187 Section 10/11, RFC 5448).
pub const AT_RAND: u8 = 1;
pub const AT_AUTN: u8 = 2;
pub const AT_RES: u8 = 3;
pub const AT_AUTS: u8 = 4;
pub const AT_PADDING: u8 = 6;
pub const AT_NONCE_MT: u8 = 7;
pub const AT_PERMANENT_ID_REQ: u8 = 10;
pub const AT_MAC: u8 = 11;
pub const AT_NOTIFICATION: u8 = 12;
pub const AT_ANY_ID_REQ: u8 = 13;
pub const AT_IDENTITY: u8 = 14;
pub const AT_VERSION_LIST: u8 = 15;
pub const AT_SELECTED_VERSION: u8 = 16;
pub const AT_FULLAUTH_ID_REQ: u8 = 17;
pub const AT_COUNTER: u8 = 19;
pub const AT_COUNTER_TOO_SMALL: u8 = 20;
pub const AT_NONCE_S: u8 = 21;
pub const AT_CLIENT_ERROR_CODE: u8 = 22;
pub const AT_KDF_INPUT: u8 = 23;
pub const AT_KDF: u8 = 24;
pub const AT_IV: u8 = 129;
pub const AT_ENCR_DATA: u8 = 130;
pub const AT_NEXT_PSEUDONYM: u8 = 132;
pub const AT_NEXT_REAUTH_ID: u8 = 133;
pub const AT_CHECKCODE: u8 = 134;
pub const AT_RESULT_IND: u8 = 135;
pub const AT_BIDDING: u8 = 136;

// Client error codes (RFC 4187 Section 10.8).
pub const CLIENT_ERROR_UNABLE_TO_PROCESS: u16 = 0;
pub const CLIENT_ERROR_UNSUPPORTED_VERSION: u16 = 1;
pub const CLIENT_ERROR_INSUFFICIENT_CHALLENGES: u16 = 2;
pub const CLIENT_ERROR_RANDS_NOT_FRESH: u16 = 3;

/// AT_MAC digest length in bytes (HMAC-SHA1-128 / HMAC-SHA256-128).
pub const MAC_LEN: usize = 16;

/// EAP-SIM/AKA subtype values. SIM uses 10/11 for its Start/Challenge
/// round, the AKA family uses 1/2/4/5; the remaining subtypes are shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EapSimAkaSubtype {
    AkaChallenge = 1,
    AuthenticationReject = 2,
    SynchronizationFailure = 4,
    AkaIdentity = 5,
    SimStart = 10,
    SimChallenge = 11,
    Notification = 12,
    Reauthentication = 13,
    ClientError = 14,
}

impl TryFrom<u8> for EapSimAkaSubtype {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, DecodeError> {
        match value {
            1 => Ok(EapSimAkaSubtype::AkaChallenge),
            2 => Ok(EapSimAkaSubtype::AuthenticationReject),
            4 => Ok(EapSimAkaSubtype::SynchronizationFailure),
            5 => Ok(EapSimAkaSubtype::AkaIdentity),
            10 => Ok(EapSimAkaSubtype::SimStart),
            11 => Ok(EapSimAkaSubtype::SimChallenge),
            12 => Ok(EapSimAkaSubtype::Notification),
            13 => Ok(EapSimAkaSubtype::Reauthentication),
            14 => Ok(EapSimAkaSubtype::ClientError),
            _ => Err(DecodeError::InvalidSubtype(value)),
        }
    }
}

fn is_known_attribute(attr_type: u8) -> bool {
    matches!(
        attr_type,
        AT_RAND
            | AT_AUTN
            | AT_RES
            | AT_AUTS
            | AT_PADDING
            | AT_NONCE_MT
            | AT_PERMANENT_ID_REQ
            | AT_MAC
            | AT_NOTIFICATION
            | AT_ANY_ID_REQ
            | AT_IDENTITY
            | AT_VERSION_LIST
            | AT_SELECTED_VERSION
            | AT_FULLAUTH_ID_REQ
            | AT_COUNTER
            | AT_COUNTER_TOO_SMALL
            | AT_NONCE_S
            | AT_CLIENT_ERROR_CODE
            | AT_KDF_INPUT
            | AT_KDF
    )
}

/// One decoded attribute: raw type code and the value bytes after the two
/// framing octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapAttribute {
    pub attr_type: u8,
    pub value: Vec<u8>,
}

/// Ordered attribute container.
///
/// Duplicate types are allowed (AT_KDF may legitimately appear more than
/// once), and insertion order is preserved for byte-exact re-encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    entries: Vec<EapAttribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, attr_type: u8) -> bool {
        self.entries.iter().any(|a| a.attr_type == attr_type)
    }

    /// First value for the given type.
    pub fn get(&self, attr_type: u8) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|a| a.attr_type == attr_type)
            .map(|a| a.value.as_slice())
    }

    /// All values for the given type, in receive order.
    pub fn get_all(&self, attr_type: u8) -> Vec<&[u8]> {
        self.entries
            .iter()
            .filter(|a| a.attr_type == attr_type)
            .map(|a| a.value.as_slice())
            .collect()
    }

    /// Append a raw attribute. The value must already be padded so that
    /// `2 + value.len()` is a multiple of 4.
    pub fn push_raw(&mut self, attr_type: u8, value: Vec<u8>) {
        debug_assert_eq!((2 + value.len()) % 4, 0);
        self.entries.push(EapAttribute { attr_type, value });
    }

    /// Value-less request attribute (AT_ANY_ID_REQ and friends): just the
    /// two reserved padding octets.
    pub fn push_flag(&mut self, attr_type: u8) {
        self.push_raw(attr_type, vec![0, 0]);
    }

    /// AT_IDENTITY / AT_KDF_INPUT layout: 2-byte actual length, data,
    /// zero padding to the word boundary.
    pub fn push_length_prefixed(&mut self, attr_type: u8, data: &[u8]) {
        let pad = (4 - data.len() % 4) % 4;
        let mut value = Vec::with_capacity(2 + data.len() + pad);
        value.put_u16(data.len() as u16);
        value.put_slice(data);
        value.resize(2 + data.len() + pad, 0);
        self.push_raw(attr_type, value);
    }

    /// AT_RES layout: 2-byte length in bits, then the response bytes.
    pub fn push_res(&mut self, res: &[u8]) {
        let pad = (4 - res.len() % 4) % 4;
        let mut value = Vec::with_capacity(2 + res.len() + pad);
        value.put_u16((res.len() * 8) as u16);
        value.put_slice(res);
        value.resize(2 + res.len() + pad, 0);
        self.push_raw(AT_RES, value);
    }

    /// Bare u16 attribute (AT_SELECTED_VERSION, AT_CLIENT_ERROR_CODE,
    /// AT_NOTIFICATION, AT_KDF).
    pub fn push_u16(&mut self, attr_type: u8, v: u16) {
        self.push_raw(attr_type, v.to_be_bytes().to_vec());
    }

    /// AT_NONCE_MT layout: 2 reserved octets then the 16-byte nonce.
    pub fn push_nonce_mt(&mut self, nonce: &[u8; 16]) {
        let mut value = vec![0, 0];
        value.extend_from_slice(nonce);
        self.push_raw(AT_NONCE_MT, value);
    }

    /// AT_AUTS carries the raw 14-byte resynchronization token.
    pub fn push_auts(&mut self, auts: &[u8; 14]) {
        self.push_raw(AT_AUTS, auts.to_vec());
    }

    /// Zero-valued AT_MAC placeholder, filled in after the packet is
    /// assembled and MACed.
    pub fn push_mac_placeholder(&mut self) {
        let mut value = vec![0, 0];
        value.extend_from_slice(&[0u8; MAC_LEN]);
        self.push_raw(AT_MAC, value);
    }

    /// Replace the AT_MAC value in place, preserving attribute order.
    pub fn set_mac(&mut self, mac: &[u8; MAC_LEN]) {
        if let Some(entry) = self.entries.iter_mut().find(|a| a.attr_type == AT_MAC) {
            entry.value.truncate(2);
            entry.value.extend_from_slice(mac);
        }
    }

    /// Copy of this set with the AT_MAC value zeroed, for MAC computation
    /// and verification.
    pub fn with_zeroed_mac(&self) -> AttributeSet {
        let mut copy = self.clone();
        copy.set_mac(&[0u8; MAC_LEN]);
        copy
    }

    // ---- typed accessors -------------------------------------------------

    /// RAND values: 2 reserved octets then one or more 16-byte challenges.
    pub fn rand_values(&self) -> Result<Vec<[u8; 16]>, DecodeError> {
        let value = self
            .get(AT_RAND)
            .ok_or(DecodeError::MalformedAttribute(AT_RAND))?;
        if value.len() < 2 || (value.len() - 2) % 16 != 0 {
            return Err(DecodeError::MalformedAttribute(AT_RAND));
        }
        Ok(value[2..]
            .chunks_exact(16)
            .map(|c| {
                let mut rand = [0u8; 16];
                rand.copy_from_slice(c);
                rand
            })
            .collect())
    }

    /// AUTN: 2 reserved octets then the 16-byte authentication token.
    pub fn autn(&self) -> Result<[u8; 16], DecodeError> {
        let value = self
            .get(AT_AUTN)
            .ok_or(DecodeError::MalformedAttribute(AT_AUTN))?;
        if value.len() != 18 {
            return Err(DecodeError::MalformedAttribute(AT_AUTN));
        }
        let mut autn = [0u8; 16];
        autn.copy_from_slice(&value[2..]);
        Ok(autn)
    }

    /// Received AT_MAC digest.
    pub fn mac(&self) -> Result<[u8; MAC_LEN], DecodeError> {
        let value = self
            .get(AT_MAC)
            .ok_or(DecodeError::MalformedAttribute(AT_MAC))?;
        if value.len() != 2 + MAC_LEN {
            return Err(DecodeError::MalformedAttribute(AT_MAC));
        }
        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(&value[2..]);
        Ok(mac)
    }

    /// All AT_KDF values in receive order (RFC 5448 Section 3.2).
    pub fn kdf_values(&self) -> Result<Vec<u16>, DecodeError> {
        self.get_all(AT_KDF)
            .into_iter()
            .map(|v| {
                if v.len() != 2 {
                    return Err(DecodeError::MalformedAttribute(AT_KDF));
                }
                Ok(u16::from_be_bytes([v[0], v[1]]))
            })
            .collect()
    }

    /// AT_KDF_INPUT: the server's network name.
    pub fn kdf_input(&self) -> Result<Vec<u8>, DecodeError> {
        let value = self
            .get(AT_KDF_INPUT)
            .ok_or(DecodeError::MalformedAttribute(AT_KDF_INPUT))?;
        Self::length_prefixed(value, AT_KDF_INPUT)
    }

    /// AT_IDENTITY contents.
    pub fn identity(&self) -> Result<Vec<u8>, DecodeError> {
        let value = self
            .get(AT_IDENTITY)
            .ok_or(DecodeError::MalformedAttribute(AT_IDENTITY))?;
        Self::length_prefixed(value, AT_IDENTITY)
    }

    fn length_prefixed(value: &[u8], attr_type: u8) -> Result<Vec<u8>, DecodeError> {
        if value.len() < 2 {
            return Err(DecodeError::MalformedAttribute(attr_type));
        }
        let actual = u16::from_be_bytes([value[0], value[1]]) as usize;
        if 2 + actual > value.len() {
            return Err(DecodeError::MalformedAttribute(attr_type));
        }
        Ok(value[2..2 + actual].to_vec())
    }

    /// AT_VERSION_LIST: 2-byte actual byte length, then u16 versions.
    pub fn version_list(&self) -> Result<Vec<u16>, DecodeError> {
        let value = self
            .get(AT_VERSION_LIST)
            .ok_or(DecodeError::MalformedAttribute(AT_VERSION_LIST))?;
        let raw = Self::length_prefixed(value, AT_VERSION_LIST)?;
        if raw.len() % 2 != 0 {
            return Err(DecodeError::MalformedAttribute(AT_VERSION_LIST));
        }
        Ok(raw
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect())
    }

    /// Raw byte content of the version list (needed for SIM key derivation).
    pub fn version_list_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        let value = self
            .get(AT_VERSION_LIST)
            .ok_or(DecodeError::MalformedAttribute(AT_VERSION_LIST))?;
        Self::length_prefixed(value, AT_VERSION_LIST)
    }

    pub fn notification_code(&self) -> Option<u16> {
        self.get(AT_NOTIFICATION).and_then(|v| {
            if v.len() == 2 {
                Some(u16::from_be_bytes([v[0], v[1]]))
            } else {
                None
            }
        })
    }

    /// Whether the request carries any of the identity-request attributes.
    pub fn requests_identity(&self) -> bool {
        self.contains(AT_ANY_ID_REQ)
            || self.contains(AT_PERMANENT_ID_REQ)
            || self.contains(AT_FULLAUTH_ID_REQ)
    }
}

/// Decoded Type-Data of a SIM/AKA-family packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimAkaTypeData {
    pub subtype: EapSimAkaSubtype,
    pub attributes: AttributeSet,
}

impl SimAkaTypeData {
    pub fn new(subtype: EapSimAkaSubtype) -> Self {
        SimAkaTypeData {
            subtype,
            attributes: AttributeSet::new(),
        }
    }

    /// Decode Type-Data bytes. Fails if an attribute overruns the buffer,
    /// if consumed bytes do not exactly cover the payload, or if a
    /// non-skippable attribute (type code < 128) is unrecognized.
    pub fn decode(data: &[u8]) -> Result<SimAkaTypeData, DecodeError> {
        let mut buf = data;
        if buf.remaining() < 3 {
            return Err(DecodeError::BufferTooShort {
                expected: 3,
                actual: buf.remaining(),
            });
        }

        let subtype = EapSimAkaSubtype::try_from(buf.get_u8())?;
        let _reserved = buf.get_u16();

        let mut attributes = AttributeSet::new();
        while buf.has_remaining() {
            if buf.remaining() < 2 {
                return Err(DecodeError::AttributeOverrun {
                    needed: 2,
                    available: buf.remaining(),
                });
            }
            let attr_type = buf.get_u8();
            let length_words = buf.get_u8();

            if !is_known_attribute(attr_type) && attr_type < 128 {
                return Err(DecodeError::UnrecognizedAttribute(attr_type));
            }
            if length_words == 0 {
                return Err(DecodeError::InvalidAttributeLength {
                    attr_type,
                    length: length_words,
                });
            }

            let value_len = length_words as usize * 4 - 2;
            if buf.remaining() < value_len {
                return Err(DecodeError::AttributeOverrun {
                    needed: value_len,
                    available: buf.remaining(),
                });
            }
            let mut value = vec![0u8; value_len];
            buf.copy_to_slice(&mut value);
            attributes.push_raw(attr_type, value);
        }

        Ok(SimAkaTypeData {
            subtype,
            attributes,
        })
    }

    /// Encode to Type-Data bytes: subtype, reserved, attributes in order.
    pub fn encode(&self) -> Vec<u8> {
        let attr_len: usize = self.attributes.entries.iter().map(|a| 2 + a.value.len()).sum();
        let mut buf = Vec::with_capacity(3 + attr_len);
        buf.put_u8(self.subtype as u8);
        buf.put_u16(0);
        for attr in &self.attributes.entries {
            buf.put_u8(attr.attr_type);
            buf.put_u8(((2 + attr.value.len()) / 4) as u8);
            buf.put_slice(&attr.value);
        }
        buf
    }

    /// Assemble a full EAP packet around this Type-Data.
    pub fn into_message(self, code: EapCode, identifier: u8, eap_type: u8) -> EapMessage {
        EapMessage {
            code,
            identifier,
            type_data: Some(crate::message::EapTypeData {
                eap_type,
                data: self.encode(),
            }),
        }
    }
}
