//! EAP packet codec (RFC 3748 Section 4)
//!
//! An EAP packet is `Code(1) | Identifier(1) | Length(2) | Type(1) |
//! Type-Data` where Type and Type-Data are only present for Request and
//! Response packets. The declared Length must equal the actual packet
//! length; decoding fails otherwise, and `decode(encode(m)) == m` holds for
//! every valid message.

use bytes::{Buf, BufMut};
use thiserror::Error;

/// Minimum EAP packet size (Code, Identifier, Length).
pub const EAP_HEADER_LEN: usize = 4;

// EAP method type codes (RFC 3748 Section 5 plus method RFCs).
pub const EAP_TYPE_IDENTITY: u8 = 1;
pub const EAP_TYPE_NOTIFICATION: u8 = 2;
pub const EAP_TYPE_NAK: u8 = 3;
pub const EAP_TYPE_SIM: u8 = 18;
pub const EAP_TYPE_AKA: u8 = 23;
pub const EAP_TYPE_MSCHAP_V2: u8 = 26;
pub const EAP_TYPE_AKA_PRIME: u8 = 50;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short: expected at least {expected} bytes, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },
    #[error("invalid EAP code: {0}")]
    InvalidCode(u8),
    #[error("declared length {declared} does not match buffer length {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("request/response packet is missing the type octet")]
    MissingType,
    #[error("success/failure packet carries unexpected type data")]
    UnexpectedTypeData,
    #[error("unrecognized non-skippable attribute: {0}")]
    UnrecognizedAttribute(u8),
    #[error("attribute {attr_type} declares invalid length {length}")]
    InvalidAttributeLength { attr_type: u8, length: u8 },
    #[error("attribute data overruns type data: need {needed}, have {available}")]
    AttributeOverrun { needed: usize, available: usize },
    #[error("invalid EAP-SIM/AKA subtype: {0}")]
    InvalidSubtype(u8),
    #[error("malformed attribute value for type {0}")]
    MalformedAttribute(u8),
}

/// EAP Code values (RFC 3748 Section 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EapCode {
    Request = 1,
    Response = 2,
    Success = 3,
    Failure = 4,
}

impl TryFrom<u8> for EapCode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, DecodeError> {
        match value {
            1 => Ok(EapCode::Request),
            2 => Ok(EapCode::Response),
            3 => Ok(EapCode::Success),
            4 => Ok(EapCode::Failure),
            _ => Err(DecodeError::InvalidCode(value)),
        }
    }
}

/// Method payload of a Request/Response packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapTypeData {
    /// EAP method type code.
    pub eap_type: u8,
    /// Raw method-specific payload.
    pub data: Vec<u8>,
}

/// A decoded EAP packet.
///
/// `type_data` is `None` for Success/Failure packets, which consist of the
/// bare 4-byte header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapMessage {
    pub code: EapCode,
    pub identifier: u8,
    pub type_data: Option<EapTypeData>,
}

impl EapMessage {
    pub fn request(identifier: u8, eap_type: u8, data: Vec<u8>) -> Self {
        EapMessage {
            code: EapCode::Request,
            identifier,
            type_data: Some(EapTypeData { eap_type, data }),
        }
    }

    pub fn response(identifier: u8, eap_type: u8, data: Vec<u8>) -> Self {
        EapMessage {
            code: EapCode::Response,
            identifier,
            type_data: Some(EapTypeData { eap_type, data }),
        }
    }

    pub fn success(identifier: u8) -> Self {
        EapMessage {
            code: EapCode::Success,
            identifier,
            type_data: None,
        }
    }

    pub fn failure(identifier: u8) -> Self {
        EapMessage {
            code: EapCode::Failure,
            identifier,
            type_data: None,
        }
    }

    /// Legacy Nak response listing the type codes the peer is willing to use
    /// (RFC 3748 Section 5.3.1).
    pub fn nak(identifier: u8, supported_types: &[u8]) -> Self {
        EapMessage::response(identifier, EAP_TYPE_NAK, supported_types.to_vec())
    }

    /// Method type code of a Request/Response packet, if any.
    pub fn eap_type(&self) -> Option<u8> {
        self.type_data.as_ref().map(|t| t.eap_type)
    }

    /// Total encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        match &self.type_data {
            Some(t) => EAP_HEADER_LEN + 1 + t.data.len(),
            None => EAP_HEADER_LEN,
        }
    }

    /// Encode into wire format. The exact inverse of [`decode`].
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.put_u8(self.code as u8);
        buf.put_u8(self.identifier);
        buf.put_u16(self.encoded_len() as u16);
        if let Some(t) = &self.type_data {
            buf.put_u8(t.eap_type);
            buf.put_slice(&t.data);
        }
        buf
    }
}

/// Decode an EAP packet from raw bytes.
pub fn decode(bytes: &[u8]) -> Result<EapMessage, DecodeError> {
    let mut buf = bytes;
    if buf.remaining() < EAP_HEADER_LEN {
        return Err(DecodeError::BufferTooShort {
            expected: EAP_HEADER_LEN,
            actual: buf.remaining(),
        });
    }

    let code = EapCode::try_from(buf.get_u8())?;
    let identifier = buf.get_u8();
    let declared = buf.get_u16() as usize;

    if declared != bytes.len() {
        return Err(DecodeError::LengthMismatch {
            declared,
            actual: bytes.len(),
        });
    }

    match code {
        EapCode::Success | EapCode::Failure => {
            if buf.has_remaining() {
                return Err(DecodeError::UnexpectedTypeData);
            }
            Ok(EapMessage {
                code,
                identifier,
                type_data: None,
            })
        }
        EapCode::Request | EapCode::Response => {
            if !buf.has_remaining() {
                return Err(DecodeError::MissingType);
            }
            let eap_type = buf.get_u8();
            let mut data = vec![0u8; buf.remaining()];
            buf.copy_to_slice(&mut data);
            Ok(EapMessage {
                code,
                identifier,
                type_data: Some(EapTypeData { eap_type, data }),
            })
        }
    }
}
