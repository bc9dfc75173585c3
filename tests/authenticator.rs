//! Async authenticator behavior: callback dispatch, per-message timeout,
//! and terminal-session handling.

mod common;

use std::time::Duration;

use common::{ChannelCallback, Event, FixedRandom, MockUicc};
use eap_peer::attribute::{EapSimAkaSubtype, SimAkaTypeData, AT_AUTN, AT_RAND};
use eap_peer::message::{EAP_TYPE_AKA, EAP_TYPE_IDENTITY};
use eap_peer::{
    AkaResult, EapAuthenticator, EapCode, EapMessage, EapMethodConfig, EapPeerError, EapSession,
    GsmTriplet, IdentityProvider, SessionConfig,
};

const SUB_ID: &str = "001010000000001";

fn aka_config(timeout: Duration) -> SessionConfig {
    let mut config = SessionConfig::new(vec![EapMethodConfig::Aka {
        sub_id: SUB_ID.into(),
    }]);
    config.timeout = timeout;
    config
}

fn unsigned_challenge(identifier: u8) -> Vec<u8> {
    let mut td = SimAkaTypeData::new(EapSimAkaSubtype::AkaChallenge);
    let mut rand_value = vec![0, 0];
    rand_value.extend_from_slice(&[0xA1; 16]);
    td.attributes.push_raw(AT_RAND, rand_value);
    let mut autn_value = vec![0, 0];
    autn_value.extend_from_slice(&[0xB2; 16]);
    td.attributes.push_raw(AT_AUTN, autn_value);
    td.attributes.push_mac_placeholder();
    td.into_message(EapCode::Request, identifier, EAP_TYPE_AKA)
        .encode()
}

/// Provider that stalls long enough to blow any short timeout.
struct SlowProvider;

impl IdentityProvider for SlowProvider {
    fn subscriber_identity(&mut self) -> Result<String, EapPeerError> {
        Ok(SUB_ID.into())
    }

    fn aka_authenticate(
        &mut self,
        _rand: &[u8; 16],
        _autn: &[u8; 16],
    ) -> Result<AkaResult, EapPeerError> {
        std::thread::sleep(Duration::from_millis(500));
        Ok(AkaResult::Rejected)
    }

    fn gsm_authenticate(&mut self, _rand: &[u8; 16]) -> Result<GsmTriplet, EapPeerError> {
        Err(EapPeerError::provider("not used"))
    }
}

struct PanickingProvider;

impl IdentityProvider for PanickingProvider {
    fn subscriber_identity(&mut self) -> Result<String, EapPeerError> {
        Ok(SUB_ID.into())
    }

    fn aka_authenticate(
        &mut self,
        _rand: &[u8; 16],
        _autn: &[u8; 16],
    ) -> Result<AkaResult, EapPeerError> {
        panic!("credential backend crashed");
    }

    fn gsm_authenticate(&mut self, _rand: &[u8; 16]) -> Result<GsmTriplet, EapPeerError> {
        Err(EapPeerError::provider("not used"))
    }
}

#[tokio::test]
async fn test_responses_come_back_through_the_callback() {
    let session = EapSession::new(
        aka_config(Duration::from_secs(5)),
        Box::new(MockUicc::accepting(vec![0xC3; 8], [0xD4; 16], [0xE5; 16])),
        Box::new(FixedRandom(0x77)),
    );
    let (callback, mut events) = ChannelCallback::new();
    let authenticator = EapAuthenticator::spawn(session, callback);

    authenticator.process_message(EapMessage::request(1, EAP_TYPE_IDENTITY, Vec::new()).encode());
    match events.recv().await.unwrap() {
        Event::Response(bytes) => {
            let msg = eap_peer::message::decode(&bytes).unwrap();
            assert_eq!(msg.type_data.unwrap().data, b"0001010000000001");
        }
        other => panic!("expected a response, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failure_is_terminal() {
    let session = EapSession::new(
        aka_config(Duration::from_secs(5)),
        Box::new(MockUicc::accepting(vec![0xC3; 8], [0xD4; 16], [0xE5; 16])),
        Box::new(FixedRandom(0x77)),
    );
    let (callback, mut events) = ChannelCallback::new();
    let authenticator = EapAuthenticator::spawn(session, callback);

    authenticator.process_message(EapMessage::failure(1).encode());
    assert!(matches!(events.recv().await.unwrap(), Event::Fail));

    // Anything after the verdict is refused
    authenticator.process_message(EapMessage::request(2, EAP_TYPE_IDENTITY, Vec::new()).encode());
    assert!(matches!(
        events.recv().await.unwrap(),
        Event::Error(EapPeerError::Protocol(_))
    ));
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let session = EapSession::new(
        aka_config(Duration::from_millis(50)),
        Box::new(SlowProvider),
        Box::new(FixedRandom(0x77)),
    );
    let (callback, mut events) = ChannelCallback::new();
    let authenticator = EapAuthenticator::spawn(session, callback);

    authenticator.process_message(unsigned_challenge(1));
    assert!(matches!(
        events.recv().await.unwrap(),
        Event::Error(EapPeerError::Timeout)
    ));

    // The timed-out session is gone; later packets report a protocol error
    authenticator.process_message(EapMessage::failure(2).encode());
    assert!(matches!(
        events.recv().await.unwrap(),
        Event::Error(EapPeerError::Protocol(_))
    ));
}

#[tokio::test]
async fn test_provider_panic_surfaces_as_internal_error() {
    let session = EapSession::new(
        aka_config(Duration::from_secs(5)),
        Box::new(PanickingProvider),
        Box::new(FixedRandom(0x77)),
    );
    let (callback, mut events) = ChannelCallback::new();
    let authenticator = EapAuthenticator::spawn(session, callback);

    authenticator.process_message(unsigned_challenge(1));
    assert!(matches!(
        events.recv().await.unwrap(),
        Event::Error(EapPeerError::Internal(_))
    ));
}

#[tokio::test]
async fn test_messages_are_processed_in_order() {
    let session = EapSession::new(
        aka_config(Duration::from_secs(5)),
        Box::new(MockUicc::accepting(vec![0xC3; 8], [0xD4; 16], [0xE5; 16])),
        Box::new(FixedRandom(0x77)),
    );
    let (callback, mut events) = ChannelCallback::new();
    let authenticator = EapAuthenticator::spawn(session, callback);

    // Queue two identity requests back to back; responses must carry the
    // identifiers in submission order
    authenticator.process_message(EapMessage::request(5, EAP_TYPE_IDENTITY, Vec::new()).encode());
    authenticator.process_message(EapMessage::request(6, EAP_TYPE_IDENTITY, Vec::new()).encode());

    for expected_id in [5u8, 6u8] {
        match events.recv().await.unwrap() {
            Event::Response(bytes) => {
                assert_eq!(eap_peer::message::decode(&bytes).unwrap().identifier, expected_id);
            }
            other => panic!("expected a response, got {other:?}"),
        }
    }
}
