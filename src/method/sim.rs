//! EAP-SIM peer state machine (RFC 4186)
//!
//! Two rounds: Start negotiates the protocol version and contributes the
//! peer nonce, Challenge runs the GSM algorithm over 2 or 3 fresh RANDs.
//! AT_MAC on the challenge request covers the packet plus NONCE_MT; the
//! challenge response MAC covers the packet plus the concatenated SRES
//! values instead of carrying AT_RES.

use log::{debug, warn};

use crate::attribute::{
    EapSimAkaSubtype, SimAkaTypeData, AT_CLIENT_ERROR_CODE, AT_IDENTITY, AT_SELECTED_VERSION,
    CLIENT_ERROR_INSUFFICIENT_CHALLENGES, CLIENT_ERROR_RANDS_NOT_FRESH,
    CLIENT_ERROR_UNABLE_TO_PROCESS, CLIENT_ERROR_UNSUPPORTED_VERSION,
};
use crate::crypto::keys::{derive_sim_keys, DerivedKeys};
use crate::crypto::mac::{compute_mac, verify_mac, MacAlgorithm};
use crate::error::EapPeerError;
use crate::message::{EapCode, EapMessage, EAP_TYPE_SIM};
use crate::method::{EapMethodStateMachine, MethodContext, MethodOutcome};

/// The only protocol version defined by RFC 4186.
pub const SIM_VERSION_1: u16 = 1;

enum SimState {
    Start,
    /// Start response sent; holds the material the challenge derivation
    /// needs.
    Started {
        nonce_mt: [u8; 16],
        version_list: Vec<u8>,
    },
    AwaitingResult(DerivedKeys),
    AwaitingFailure,
    Done,
}

/// EAP-SIM (type 18).
pub struct EapSimMethod {
    identity: String,
    state: SimState,
}

impl EapSimMethod {
    pub fn new(identity: String) -> Self {
        EapSimMethod {
            identity,
            state: SimState::Start,
        }
    }

    fn client_error(&mut self, identifier: u8, code: u16) -> MethodOutcome {
        self.state = SimState::AwaitingFailure;
        let mut td = SimAkaTypeData::new(EapSimAkaSubtype::ClientError);
        td.attributes.push_u16(AT_CLIENT_ERROR_CODE, code);
        MethodOutcome::Response(td.into_message(EapCode::Response, identifier, EAP_TYPE_SIM))
    }

    fn handle_start(
        &mut self,
        ctx: &mut MethodContext<'_>,
        identifier: u8,
        body: &SimAkaTypeData,
    ) -> Result<MethodOutcome, EapPeerError> {
        if !matches!(self.state, SimState::Start | SimState::Started { .. }) {
            return Ok(self.client_error(identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
        }

        let versions = match body.attributes.version_list() {
            Ok(versions) => versions,
            Err(e) => {
                warn!("unprocessable SIM/Start: {e}");
                return Ok(self.client_error(identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
            }
        };
        if !versions.contains(&SIM_VERSION_1) {
            warn!("no common EAP-SIM version in {versions:?}");
            return Ok(self.client_error(identifier, CLIENT_ERROR_UNSUPPORTED_VERSION));
        }
        // Raw list bytes feed the key derivation later
        let version_list = body.attributes.version_list_bytes()?;

        let mut nonce_mt = [0u8; 16];
        ctx.rng.fill(&mut nonce_mt);

        let mut td = SimAkaTypeData::new(EapSimAkaSubtype::SimStart);
        td.attributes.push_nonce_mt(&nonce_mt);
        td.attributes.push_u16(AT_SELECTED_VERSION, SIM_VERSION_1);
        if body.attributes.requests_identity() {
            td.attributes
                .push_length_prefixed(AT_IDENTITY, self.identity.as_bytes());
        }

        self.state = SimState::Started {
            nonce_mt,
            version_list,
        };
        Ok(MethodOutcome::Response(td.into_message(
            EapCode::Response,
            identifier,
            EAP_TYPE_SIM,
        )))
    }

    fn handle_challenge(
        &mut self,
        ctx: &mut MethodContext<'_>,
        identifier: u8,
        body: SimAkaTypeData,
    ) -> Result<MethodOutcome, EapPeerError> {
        let (nonce_mt, version_list) = match &self.state {
            SimState::Started {
                nonce_mt,
                version_list,
            } => (*nonce_mt, version_list.clone()),
            _ => {
                warn!("SIM challenge without a completed start round");
                return Ok(self.client_error(identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
            }
        };

        let (rands, received_mac) = match (body.attributes.rand_values(), body.attributes.mac()) {
            (Ok(rands), Ok(mac)) => (rands, mac),
            _ => {
                warn!("SIM challenge missing RAND or MAC");
                return Ok(self.client_error(identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
            }
        };
        if rands.len() < 2 {
            return Ok(self.client_error(identifier, CLIENT_ERROR_INSUFFICIENT_CHALLENGES));
        }
        if rands.len() > 3 {
            return Ok(self.client_error(identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
        }
        let distinct = rands
            .iter()
            .enumerate()
            .all(|(i, r)| rands[..i].iter().all(|prev| prev != r));
        if !distinct {
            warn!("repeated RAND in SIM challenge");
            return Ok(self.client_error(identifier, CLIENT_ERROR_RANDS_NOT_FRESH));
        }

        let mut kc_values = Vec::with_capacity(rands.len());
        let mut sres_all = Vec::with_capacity(rands.len() * 4);
        for rand in &rands {
            let triplet = ctx.provider.gsm_authenticate(rand)?;
            kc_values.push(triplet.kc);
            sres_all.extend_from_slice(&triplet.sres);
        }

        let keys = derive_sim_keys(
            self.identity.as_bytes(),
            &kc_values,
            &nonce_mt,
            &version_list,
            SIM_VERSION_1,
        );

        let zeroed = SimAkaTypeData {
            subtype: body.subtype,
            attributes: body.attributes.with_zeroed_mac(),
        }
        .into_message(EapCode::Request, identifier, EAP_TYPE_SIM)
        .encode();
        if !verify_mac(
            MacAlgorithm::HmacSha1,
            &keys.k_aut,
            &zeroed,
            &nonce_mt,
            &received_mac,
        ) {
            warn!("AT_MAC verification failed on SIM challenge");
            return Ok(self.client_error(identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
        }

        let mut td = SimAkaTypeData::new(EapSimAkaSubtype::SimChallenge);
        td.attributes.push_mac_placeholder();
        let unsigned = td
            .clone()
            .into_message(EapCode::Response, identifier, EAP_TYPE_SIM)
            .encode();
        let mac = compute_mac(MacAlgorithm::HmacSha1, &keys.k_aut, &unsigned, &sres_all);
        td.attributes.set_mac(&mac);

        self.state = SimState::AwaitingResult(keys);
        Ok(MethodOutcome::Response(td.into_message(
            EapCode::Response,
            identifier,
            EAP_TYPE_SIM,
        )))
    }

    fn handle_notification(
        &mut self,
        identifier: u8,
        body: &SimAkaTypeData,
    ) -> Result<MethodOutcome, EapPeerError> {
        if let Some(code) = body.attributes.notification_code() {
            debug!("SIM notification code {code}");
        }
        let td = SimAkaTypeData::new(EapSimAkaSubtype::Notification);
        Ok(MethodOutcome::Response(td.into_message(
            EapCode::Response,
            identifier,
            EAP_TYPE_SIM,
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

        let body = match SimAkaTypeData::decode(&type_data.data) {
            Ok(body) => body,
            Err(e) => {
                warn!("unprocessable SIM request: {e}");
                return Ok(self.client_error(message.identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
            }
        };

        match body.subtype {
            EapSimAkaSubtype::SimStart => self.handle_start(ctx, message.identifier, &body),
            EapSimAkaSubtype::SimChallenge => self.handle_challenge(ctx, message.identifier, body),
            EapSimAkaSubtype::Notification => self.handle_notification(message.identifier, &body),
            other => {
                warn!("unexpected SIM subtype {other:?}");
                Ok(self.client_error(message.identifier, CLIENT_ERROR_UNABLE_TO_PROCESS))
            }
        }
    }
}

impl EapMethodStateMachine for EapSimMethod {
    fn process(
        &mut self,
        ctx: &mut MethodContext<'_>,
        message: &EapMessage,
    ) -> Result<MethodOutcome, EapPeerError> {
        match message.code {
            EapCode::Success => match std::mem::replace(&mut self.state, SimState::Done) {
                SimState::AwaitingResult(keys) => Ok(MethodOutcome::Success(keys)),
                _ => Err(EapPeerError::protocol(
                    "EAP-Success received before the challenge completed",
                )),
            },
            EapCode::Failure => {
                self.state = SimState::Done;
                Ok(MethodOutcome::Failure)
            }
            EapCode::Response => Err(EapPeerError::protocol("peer received an EAP Response")),
            EapCode::Request => self.process_request(ctx, message),
        }
    }
}
