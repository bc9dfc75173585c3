//! EAP-MSCHAPv2 peer state machine (RFC 2759 framing inside EAP type 26)
//!
//! Three rounds: the Challenge request is answered with the NT-Response,
//! the Success request proves the server knew the password (the `S=`
//! authenticator response is checked before acknowledging), and the outer
//! EAP-Success releases the MSK. A Failure request is acknowledged and the
//! exchange then only accepts EAP-Failure.

use log::{debug, warn};

use crate::crypto::keys::DerivedKeys;
use crate::crypto::mschapv2::{
    check_authenticator_response, generate_msk, generate_nt_response,
};
use crate::error::EapPeerError;
use crate::message::{EapCode, EapMessage, EAP_TYPE_MSCHAP_V2};
use crate::method::{EapMethodStateMachine, MethodContext, MethodOutcome};

const OP_CHALLENGE: u8 = 1;
const OP_RESPONSE: u8 = 2;
const OP_SUCCESS: u8 = 3;
const OP_FAILURE: u8 = 4;

/// Op code, MS-CHAPv2-ID and MS-Length.
const MSCHAP_HEADER_LEN: usize = 4;
const CHALLENGE_LEN: usize = 16;
const NT_RESPONSE_LEN: usize = 24;
/// Peer challenge, 8 reserved octets, NT-Response, flags.
const RESPONSE_VALUE_SIZE: usize = 49;

enum MsChapV2State {
    Start,
    AwaitingSuccessRequest {
        auth_challenge: [u8; 16],
        peer_challenge: [u8; 16],
        nt_response: [u8; 24],
    },
    AwaitingResult(DerivedKeys),
    AwaitingFailure,
    Done,
}

/// EAP-MSCHAPv2 (type 26).
pub struct EapMsChapV2Method {
    username: String,
    password: String,
    state: MsChapV2State,
}

impl EapMsChapV2Method {
    pub fn new(username: String, password: String) -> Self {
        EapMsChapV2Method {
            username,
            password,
            state: MsChapV2State::Start,
        }
    }

    fn handle_challenge(
        &mut self,
        ctx: &mut MethodContext<'_>,
        identifier: u8,
        ms_id: u8,
        value: &[u8],
    ) -> Result<MethodOutcome, EapPeerError> {
        if !matches!(self.state, MsChapV2State::Start) {
            return Err(EapPeerError::protocol("repeated MSCHAPv2 challenge"));
        }
        if value.is_empty() || value[0] as usize != CHALLENGE_LEN {
            return Err(EapPeerError::protocol("bad MSCHAPv2 challenge value size"));
        }
        if value.len() < 1 + CHALLENGE_LEN {
            return Err(EapPeerError::protocol("truncated MSCHAPv2 challenge"));
        }
        let mut auth_challenge = [0u8; 16];
        auth_challenge.copy_from_slice(&value[1..1 + CHALLENGE_LEN]);

        let mut peer_challenge = [0u8; 16];
        ctx.rng.fill(&mut peer_challenge);
        let nt_response = generate_nt_response(
            &auth_challenge,
            &peer_challenge,
            &self.username,
            &self.password,
        );

        let ms_len = (MSCHAP_HEADER_LEN + 1 + RESPONSE_VALUE_SIZE + self.username.len()) as u16;
        let mut data = Vec::with_capacity(ms_len as usize);
        data.push(OP_RESPONSE);
        data.push(ms_id);
        data.extend_from_slice(&ms_len.to_be_bytes());
        data.push(RESPONSE_VALUE_SIZE as u8);
        data.extend_from_slice(&peer_challenge);
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(&nt_response);
        data.push(0); // flags, reserved
        data.extend_from_slice(self.username.as_bytes());

        self.state = MsChapV2State::AwaitingSuccessRequest {
            auth_challenge,
            peer_challenge,
            nt_response,
        };
        Ok(MethodOutcome::Response(EapMessage::response(
            identifier,
            EAP_TYPE_MSCHAP_V2,
            data,
        )))
    }

    fn handle_success_request(
        &mut self,
        identifier: u8,
        message_text: &[u8],
    ) -> Result<MethodOutcome, EapPeerError> {
        let (auth_challenge, peer_challenge, nt_response) = match &self.state {
            MsChapV2State::AwaitingSuccessRequest {
                auth_challenge,
                peer_challenge,
                nt_response,
            } => (*auth_challenge, *peer_challenge, *nt_response),
            _ => {
                return Err(EapPeerError::protocol(
                    "MSCHAPv2 success request before the challenge round",
                ))
            }
        };

        let text = String::from_utf8_lossy(message_text);
        let auth_string = text
            .split_whitespace()
            .find(|field| field.starts_with("S="))
            .unwrap_or_default();
        if !check_authenticator_response(
            &self.password,
            &nt_response,
            &peer_challenge,
            &auth_challenge,
            &self.username,
            auth_string,
        ) {
            // The server failed to prove knowledge of the password. A
            // Failure Response still goes out; only EAP-Failure is
            // accepted after it.
            warn!("MSCHAPv2 authenticator response check failed");
            self.state = MsChapV2State::AwaitingFailure;
            return Ok(MethodOutcome::Response(EapMessage::response(
                identifier,
                EAP_TYPE_MSCHAP_V2,
                vec![OP_FAILURE],
            )));
        }

        let keys = DerivedKeys {
            k_encr: Vec::new(),
            k_aut: Vec::new(),
            k_re: Vec::new(),
            msk: generate_msk(&self.password, &nt_response),
            emsk: Vec::new(),
        };
        self.state = MsChapV2State::AwaitingResult(keys);
        Ok(MethodOutcome::Response(EapMessage::response(
            identifier,
            EAP_TYPE_MSCHAP_V2,
            vec![OP_SUCCESS],
        )))
    }

    fn handle_failure_request(
        &mut self,
        identifier: u8,
        message_text: &[u8],
    ) -> Result<MethodOutcome, EapPeerError> {
        if !matches!(self.state, MsChapV2State::AwaitingSuccessRequest { .. }) {
            return Err(EapPeerError::protocol(
                "MSCHAPv2 failure request outside the challenge round",
            ));
        }
        let text = String::from_utf8_lossy(message_text);
        debug!("MSCHAPv2 failure request: {text}");
        self.state = MsChapV2State::AwaitingFailure;
        Ok(MethodOutcome::Response(EapMessage::response(
            identifier,
            EAP_TYPE_MSCHAP_V2,
            vec![OP_FAILURE],
        )))
    }

    fn process_request(
        &mut self,
        ctx: &mut MethodContext<'_>,
        message: &EapMessage,
    ) -> Result<MethodOutcome, EapPeerError> {
        let type_data = message
            .type_data
            .as_ref()
            .ok_or_else(|| EapPeerError::protocol("request without type data"))?;
        let data = &type_data.data;
        if data.len() < MSCHAP_HEADER_LEN {
            return Err(EapPeerError::protocol("truncated MSCHAPv2 request"));
        }
        let op = data[0];
        let ms_id = data[1];
        let ms_len = u16::from_be_bytes([data[2], data[3]]) as usize;
        if ms_len != data.len() {
            return Err(EapPeerError::protocol(format!(
                "MS-Length {ms_len} does not match payload length {}",
                data.len()
            )));
        }
        let rest = &data[MSCHAP_HEADER_LEN..];

        match op {
            OP_CHALLENGE => self.handle_challenge(ctx, message.identifier, ms_id, rest),
            OP_SUCCESS => self.handle_success_request(message.identifier, rest),
            OP_FAILURE => self.handle_failure_request(message.identifier, rest),
            other => Err(EapPeerError::protocol(format!(
                "unexpected MSCHAPv2 op code {other}"
            ))),
        }
    }
}

impl EapMethodStateMachine for EapMsChapV2Method {
    fn process(
        &mut self,
        ctx: &mut MethodContext<'_>,
        message: &EapMessage,
    ) -> Result<MethodOutcome, EapPeerError> {
        match message.code {
            EapCode::Success => match std::mem::replace(&mut self.state, MsChapV2State::Done) {
                MsChapV2State::AwaitingResult(keys) => Ok(MethodOutcome::Success(keys)),
                _ => Err(EapPeerError::protocol(
                    "EAP-Success received before the success round",
                )),
            },
            EapCode::Failure => {
                self.state = MsChapV2State::Done;
                Ok(MethodOutcome::Failure)
            }
            EapCode::Response => Err(EapPeerError::protocol("peer received an EAP Response")),
            EapCode::Request => self.process_request(ctx, message),
        }
    }
}
