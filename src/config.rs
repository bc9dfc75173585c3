//! Session configuration.

use std::time::Duration;

use crate::message::{EAP_TYPE_AKA, EAP_TYPE_AKA_PRIME, EAP_TYPE_MSCHAP_V2, EAP_TYPE_SIM};

/// Default bound on the time the peer may spend on a single inbound
/// message, provider calls included.
pub const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_secs(7);

/// Per-method configuration. The variant selects the EAP method the
/// session is willing to run. SIM family identities are not configured
/// here; the IMSI comes from the [`IdentityProvider`] for the
/// subscription named by `sub_id`.
///
/// [`IdentityProvider`]: crate::provider::IdentityProvider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EapMethodConfig {
    /// EAP-AKA against the subscription `sub_id`.
    Aka { sub_id: String },
    /// EAP-AKA' with the access network's expected name.
    AkaPrime {
        sub_id: String,
        network_name: String,
        /// Accept a server KDF_INPUT that differs from `network_name`.
        /// Keys are still derived from the server's value.
        allow_mismatched_network_names: bool,
    },
    /// EAP-SIM against the subscription `sub_id`.
    Sim { sub_id: String },
    /// EAP-MSCHAPv2 with username and password.
    MsChapV2 { username: String, password: String },
}

impl EapMethodConfig {
    /// EAP method type octet this configuration enables.
    pub fn method_type(&self) -> u8 {
        match self {
            EapMethodConfig::Aka { .. } => EAP_TYPE_AKA,
            EapMethodConfig::AkaPrime { .. } => EAP_TYPE_AKA_PRIME,
            EapMethodConfig::Sim { .. } => EAP_TYPE_SIM,
            EapMethodConfig::MsChapV2 { .. } => EAP_TYPE_MSCHAP_V2,
        }
    }
}

/// Configuration for one authentication session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Methods the peer accepts, in order of preference. The first entry
    /// drives the Nak response when the server proposes something else.
    pub methods: Vec<EapMethodConfig>,
    /// Bound on per-message processing in the authenticator.
    pub timeout: Duration,
}

impl SessionConfig {
    pub fn new(methods: Vec<EapMethodConfig>) -> Self {
        SessionConfig {
            methods,
            timeout: DEFAULT_MESSAGE_TIMEOUT,
        }
    }

    /// Configuration entry for a server-selected method type, if enabled.
    pub fn method_for_type(&self, eap_type: u8) -> Option<&EapMethodConfig> {
        self.methods.iter().find(|m| m.method_type() == eap_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_types() {
        let aka = EapMethodConfig::Aka {
            sub_id: "123456789012345".into(),
        };
        let aka_prime = EapMethodConfig::AkaPrime {
            sub_id: "123456789012345".into(),
            network_name: "WLAN".into(),
            allow_mismatched_network_names: true,
        };
        assert_eq!(aka.method_type(), EAP_TYPE_AKA);
        assert_eq!(aka_prime.method_type(), EAP_TYPE_AKA_PRIME);
    }

    #[test]
    fn test_method_lookup() {
        let config = SessionConfig::new(vec![
            EapMethodConfig::Aka {
                sub_id: "001010000000001".into(),
            },
            EapMethodConfig::MsChapV2 {
                username: "user".into(),
                password: "pass".into(),
            },
        ]);
        assert_eq!(
            config.method_for_type(EAP_TYPE_AKA).map(|m| m.method_type()),
            Some(EAP_TYPE_AKA)
        );
        assert!(config.method_for_type(EAP_TYPE_SIM).is_none());
    }
}
