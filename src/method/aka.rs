//! EAP-AKA peer state machine (RFC 4187)
//!
//! The same machine drives EAP-AKA' through [`KeyScheme`]: the two methods
//! share their subtype flow and differ only in type code, MAC algorithm,
//! and key derivation.
//!
//! Challenge handling order: the credential provider authenticates the
//! network first (AUTN check), keys are derived from its vector, and only
//! then can AT_MAC on the request be verified. A bad MAC or an
//! unprocessable request answers with Client-Error; a failed AUTN check
//! answers with Authentication-Reject. Both then accept nothing but an
//! EAP-Failure.

use log::{debug, warn};

use crate::attribute::{
    EapSimAkaSubtype, SimAkaTypeData, AT_CLIENT_ERROR_CODE, CLIENT_ERROR_UNABLE_TO_PROCESS,
};
use crate::crypto::keys::{derive_aka_keys, DerivedKeys};
use crate::crypto::mac::{compute_mac, verify_mac, MacAlgorithm};
use crate::error::EapPeerError;
use crate::message::{EapCode, EapMessage, EAP_TYPE_AKA};
use crate::method::aka_prime::{self, ChallengeReject, PrimeParams};
use crate::method::{EapMethodStateMachine, MethodContext, MethodOutcome};
use crate::provider::AkaResult;

/// Key derivation flavor within the AKA family.
pub(crate) enum KeyScheme {
    Aka,
    AkaPrime(PrimeParams),
}

pub(crate) enum AkaState {
    /// No challenge answered yet; identity requests and challenges are
    /// accepted here.
    Start,
    /// Challenge response sent; waiting for the server's verdict.
    AwaitingResult(DerivedKeys),
    /// A reject or client error went out; only EAP-Failure may follow.
    AwaitingFailure,
    Done,
}

pub(crate) struct AkaCore {
    identity: String,
    eap_type: u8,
    mac_algorithm: MacAlgorithm,
    scheme: KeyScheme,
    state: AkaState,
}

impl AkaCore {
    pub(crate) fn new(
        identity: String,
        eap_type: u8,
        mac_algorithm: MacAlgorithm,
        scheme: KeyScheme,
    ) -> Self {
        AkaCore {
            identity,
            eap_type,
            mac_algorithm,
            scheme,
            state: AkaState::Start,
        }
    }

    pub(crate) fn process(
        &mut self,
        ctx: &mut MethodContext<'_>,
        message: &EapMessage,
    ) -> Result<MethodOutcome, EapPeerError> {
        match message.code {
            EapCode::Success => match std::mem::replace(&mut self.state, AkaState::Done) {
                AkaState::AwaitingResult(keys) => Ok(MethodOutcome::Success(keys)),
                _ => Err(EapPeerError::protocol(
                    "EAP-Success received before the challenge completed",
                )),
            },
            EapCode::Failure => {
                self.state = AkaState::Done;
                Ok(MethodOutcome::Failure)
            }
            EapCode::Response => Err(EapPeerError::protocol("peer received an EAP Response")),
            EapCode::Request => self.process_request(ctx, message),
        }
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
                warn!("unprocessable AKA request: {e}");
                return Ok(self.client_error(message.identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
            }
        };

        match body.subtype {
            EapSimAkaSubtype::AkaIdentity => self.handle_identity(message.identifier, &body),
            EapSimAkaSubtype::AkaChallenge => self.handle_challenge(ctx, message.identifier, body),
            EapSimAkaSubtype::Notification => {
                self.handle_notification(message.identifier, &body)
            }
            other => {
                warn!("unexpected AKA subtype {other:?}");
                Ok(self.client_error(message.identifier, CLIENT_ERROR_UNABLE_TO_PROCESS))
            }
        }
    }

    fn handle_identity(
        &mut self,
        identifier: u8,
        body: &SimAkaTypeData,
    ) -> Result<MethodOutcome, EapPeerError> {
        if !matches!(self.state, AkaState::Start) || !body.attributes.requests_identity() {
            return Ok(self.client_error(identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
        }

        let mut td = SimAkaTypeData::new(EapSimAkaSubtype::AkaIdentity);
        td.attributes
            .push_length_prefixed(crate::attribute::AT_IDENTITY, self.identity.as_bytes());
        Ok(MethodOutcome::Response(td.into_message(
            EapCode::Response,
            identifier,
            self.eap_type,
        )))
    }

    fn handle_challenge(
        &mut self,
        ctx: &mut MethodContext<'_>,
        identifier: u8,
        body: SimAkaTypeData,
    ) -> Result<MethodOutcome, EapPeerError> {
        if !matches!(self.state, AkaState::Start) {
            return Ok(self.client_error(identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
        }

        let (rand, autn, received_mac) = match (
            body.attributes.rand_values(),
            body.attributes.autn(),
            body.attributes.mac(),
        ) {
            (Ok(rands), Ok(autn), Ok(mac)) if !rands.is_empty() => (rands[0], autn, mac),
            _ => {
                warn!("AKA challenge missing RAND, AUTN or MAC");
                return Ok(self.client_error(identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
            }
        };

        let (res, ck, ik) = match ctx.provider.aka_authenticate(&rand, &autn)? {
            AkaResult::Vector { res, ck, ik } => (res, ck, ik),
            AkaResult::SynchronizationFailure { auts } => {
                debug!("AKA sequence number out of range, resynchronizing");
                let mut td = SimAkaTypeData::new(EapSimAkaSubtype::SynchronizationFailure);
                td.attributes.push_auts(&auts);
                // Challenge state is kept: the server retries with a fresh
                // vector after resynchronization.
                return Ok(MethodOutcome::Response(td.into_message(
                    EapCode::Response,
                    identifier,
                    self.eap_type,
                )));
            }
            AkaResult::Rejected => {
                warn!("network authentication failed, rejecting");
                self.state = AkaState::AwaitingFailure;
                let td = SimAkaTypeData::new(EapSimAkaSubtype::AuthenticationReject);
                return Ok(MethodOutcome::Response(td.into_message(
                    EapCode::Response,
                    identifier,
                    self.eap_type,
                )));
            }
        };

        if res.len() < 4 || res.len() > 16 {
            return Err(EapPeerError::provider(format!(
                "RES must be 4 to 16 bytes, got {}",
                res.len()
            )));
        }

        let keys = match &self.scheme {
            KeyScheme::Aka => derive_aka_keys(self.identity.as_bytes(), &ck, &ik),
            KeyScheme::AkaPrime(params) => {
                match aka_prime::derive_challenge_keys(
                    params,
                    &self.identity,
                    &body.attributes,
                    &autn,
                    &ck,
                    &ik,
                ) {
                    Ok(keys) => keys,
                    Err(ChallengeReject::ClientError(code)) => {
                        return Ok(self.client_error(identifier, code));
                    }
                    Err(ChallengeReject::AuthenticationReject) => {
                        self.state = AkaState::AwaitingFailure;
                        let td = SimAkaTypeData::new(EapSimAkaSubtype::AuthenticationReject);
                        return Ok(MethodOutcome::Response(td.into_message(
                            EapCode::Response,
                            identifier,
                            self.eap_type,
                        )));
                    }
                }
            }
        };

        let zeroed = SimAkaTypeData {
            subtype: body.subtype,
            attributes: body.attributes.with_zeroed_mac(),
        }
        .into_message(EapCode::Request, identifier, self.eap_type)
        .encode();
        if !verify_mac(self.mac_algorithm, &keys.k_aut, &zeroed, &[], &received_mac) {
            warn!("AT_MAC verification failed on AKA challenge");
            return Ok(self.client_error(identifier, CLIENT_ERROR_UNABLE_TO_PROCESS));
        }

        let mut td = SimAkaTypeData::new(EapSimAkaSubtype::AkaChallenge);
        td.attributes.push_res(&res);
        td.attributes.push_mac_placeholder();
        let unsigned = td
            .clone()
            .into_message(EapCode::Response, identifier, self.eap_type)
            .encode();
        let mac = compute_mac(self.mac_algorithm, &keys.k_aut, &unsigned, &[]);
        td.attributes.set_mac(&mac);

        self.state = AkaState::AwaitingResult(keys);
        Ok(MethodOutcome::Response(td.into_message(
            EapCode::Response,
            identifier,
            self.eap_type,
        )))
    }

    fn handle_notification(
        &mut self,
        identifier: u8,
        body: &SimAkaTypeData,
    ) -> Result<MethodOutcome, EapPeerError> {
        if let Some(code) = body.attributes.notification_code() {
            debug!("AKA notification code {code}");
        }
        // Acknowledged without a state change; the verdict still arrives as
        // EAP-Success or EAP-Failure.
        let td = SimAkaTypeData::new(EapSimAkaSubtype::Notification);
        Ok(MethodOutcome::Response(td.into_message(
            EapCode::Response,
            identifier,
            self.eap_type,
        )))
    }

    fn client_error(&mut self, identifier: u8, code: u16) -> MethodOutcome {
        self.state = AkaState::AwaitingFailure;
        let mut td = SimAkaTypeData::new(EapSimAkaSubtype::ClientError);
        td.attributes.push_u16(AT_CLIENT_ERROR_CODE, code);
        MethodOutcome::Response(td.into_message(EapCode::Response, identifier, self.eap_type))
    }
}

/// EAP-AKA (type 23).
pub struct EapAkaMethod {
    core: AkaCore,
}

impl EapAkaMethod {
    pub fn new(identity: String) -> Self {
        EapAkaMethod {
            core: AkaCore::new(identity, EAP_TYPE_AKA, MacAlgorithm::HmacSha1, KeyScheme::Aka),
        }
    }
}

impl EapMethodStateMachine for EapAkaMethod {
    fn process(
        &mut self,
        ctx: &mut MethodContext<'_>,
        message: &EapMessage,
    ) -> Result<MethodOutcome, EapPeerError> {
        self.core.process(ctx, message)
    }
}
