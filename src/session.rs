//! EAP layer session state machine.
//!
//! Routes decoded packets between the EAP layer (Identity, Notification,
//! Nak) and the single active method. Method selection is server driven:
//! the first Request carrying a configured method type instantiates that
//! method, any other proposal is answered with a Nak listing the
//! configured types. A session is single shot; once a verdict or an error
//! is reached every further message is refused.

use log::{debug, info, warn};

use crate::config::{EapMethodConfig, SessionConfig};
use crate::crypto::keys::DerivedKeys;
use crate::error::EapPeerError;
use crate::message::{
    decode, EapCode, EapMessage, EAP_TYPE_IDENTITY, EAP_TYPE_NOTIFICATION,
};
use crate::method::aka::EapAkaMethod;
use crate::method::aka_prime::EapAkaPrimeMethod;
use crate::method::mschapv2::EapMsChapV2Method;
use crate::method::sim::EapSimMethod;
use crate::method::{EapMethodStateMachine, MethodContext, MethodOutcome};
use crate::provider::{IdentityProvider, SecureRandom};

/// Session-level result of processing one inbound packet.
#[derive(Debug)]
pub enum SessionOutcome {
    /// Encoded response to hand back to the server.
    Response(Vec<u8>),
    /// Authentication succeeded; terminal.
    Success(DerivedKeys),
    /// Authentication failed; terminal.
    Failure,
}

/// Identity transmitted for a method. SIM family identities are the
/// provider's IMSI behind the 3GPP single-digit method prefix.
fn identity_for(
    config: &EapMethodConfig,
    provider: &mut dyn IdentityProvider,
) -> Result<String, EapPeerError> {
    match config {
        EapMethodConfig::Aka { .. } => Ok(format!("0{}", provider.subscriber_identity()?)),
        EapMethodConfig::AkaPrime { .. } => Ok(format!("6{}", provider.subscriber_identity()?)),
        EapMethodConfig::Sim { .. } => Ok(format!("1{}", provider.subscriber_identity()?)),
        EapMethodConfig::MsChapV2 { username, .. } => Ok(username.clone()),
    }
}

fn build_method(config: &EapMethodConfig, identity: String) -> Box<dyn EapMethodStateMachine> {
    match config {
        EapMethodConfig::Aka { .. } => Box::new(EapAkaMethod::new(identity)),
        EapMethodConfig::AkaPrime {
            network_name,
            allow_mismatched_network_names,
            ..
        } => Box::new(EapAkaPrimeMethod::new(
            identity,
            network_name.clone(),
            *allow_mismatched_network_names,
        )),
        EapMethodConfig::Sim { .. } => Box::new(EapSimMethod::new(identity)),
        EapMethodConfig::MsChapV2 { password, .. } => {
            Box::new(EapMsChapV2Method::new(identity, password.clone()))
        }
    }
}

/// One EAP peer authentication session.
pub struct EapSession {
    config: SessionConfig,
    provider: Box<dyn IdentityProvider>,
    rng: Box<dyn SecureRandom>,
    method: Option<Box<dyn EapMethodStateMachine>>,
    method_type: Option<u8>,
    terminal: bool,
}

impl EapSession {
    pub fn new(
        config: SessionConfig,
        provider: Box<dyn IdentityProvider>,
        rng: Box<dyn SecureRandom>,
    ) -> Self {
        EapSession {
            config,
            provider,
            rng,
            method: None,
            method_type: None,
            terminal: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Feed one raw inbound packet through the session. Terminal outcomes
    /// and errors both finish the session.
    pub fn process_message(&mut self, bytes: &[u8]) -> Result<SessionOutcome, EapPeerError> {
        if self.terminal {
            return Err(EapPeerError::protocol("session already concluded"));
        }
        let result = self.dispatch(bytes);
        match &result {
            Ok(SessionOutcome::Success(_)) | Ok(SessionOutcome::Failure) | Err(_) => {
                self.terminal = true;
                self.method = None;
            }
            Ok(SessionOutcome::Response(_)) => {}
        }
        result
    }

    fn dispatch(&mut self, bytes: &[u8]) -> Result<SessionOutcome, EapPeerError> {
        let message = decode(bytes)?;
        debug!(
            "inbound {:?} id={} type={:?}",
            message.code,
            message.identifier,
            message.eap_type()
        );

        match message.code {
            EapCode::Success | EapCode::Failure => {
                if self.method.is_some() {
                    return self.delegate(&message);
                }
                if message.code == EapCode::Failure {
                    // The server may give up before a method ever started
                    return Ok(SessionOutcome::Failure);
                }
                Err(EapPeerError::protocol(
                    "EAP-Success before any method completed",
                ))
            }
            EapCode::Response => Err(EapPeerError::protocol("peer received an EAP Response")),
            EapCode::Request => self.dispatch_request(&message),
        }
    }

    fn dispatch_request(&mut self, message: &EapMessage) -> Result<SessionOutcome, EapPeerError> {
        let eap_type = match message.eap_type() {
            Some(t) => t,
            None => return Err(EapPeerError::protocol("request without type data")),
        };

        match eap_type {
            EAP_TYPE_IDENTITY => {
                let method_config = self
                    .config
                    .methods
                    .first()
                    .cloned()
                    .ok_or_else(|| EapPeerError::protocol("no methods configured"))?;
                let identity = identity_for(&method_config, self.provider.as_mut())?;
                let response = EapMessage::response(
                    message.identifier,
                    EAP_TYPE_IDENTITY,
                    identity.into_bytes(),
                );
                Ok(SessionOutcome::Response(response.encode()))
            }
            EAP_TYPE_NOTIFICATION => {
                if let Some(td) = &message.type_data {
                    info!("server notification: {}", String::from_utf8_lossy(&td.data));
                }
                let response =
                    EapMessage::response(message.identifier, EAP_TYPE_NOTIFICATION, Vec::new());
                Ok(SessionOutcome::Response(response.encode()))
            }
            t if self.method_type == Some(t) => self.delegate(message),
            t if self.method.is_some() => Err(EapPeerError::protocol(format!(
                "method type switched mid-session to {t}"
            ))),
            t => match self.config.method_for_type(t).cloned() {
                Some(method_config) => {
                    debug!("starting method type {t}");
                    let identity = identity_for(&method_config, self.provider.as_mut())?;
                    self.method = Some(build_method(&method_config, identity));
                    self.method_type = Some(t);
                    self.delegate(message)
                }
                None => {
                    let supported: Vec<u8> =
                        self.config.methods.iter().map(|m| m.method_type()).collect();
                    warn!("server proposed unsupported type {t}, answering Nak");
                    let nak = EapMessage::nak(message.identifier, &supported);
                    Ok(SessionOutcome::Response(nak.encode()))
                }
            },
        }
    }

    fn delegate(&mut self, message: &EapMessage) -> Result<SessionOutcome, EapPeerError> {
        let method = match self.method.as_mut() {
            Some(method) => method,
            None => return Err(EapPeerError::protocol("no active method")),
        };
        let mut ctx = MethodContext {
            provider: self.provider.as_mut(),
            rng: self.rng.as_mut(),
        };
        match method.process(&mut ctx, message)? {
            MethodOutcome::Response(response) => {
                Ok(SessionOutcome::Response(response.encode()))
            }
            MethodOutcome::Success(keys) => {
                info!("authentication succeeded");
                Ok(SessionOutcome::Success(keys))
            }
            MethodOutcome::Failure => {
                info!("authentication failed");
                Ok(SessionOutcome::Failure)
            }
        }
    }
}
