//! End-to-end EAP-AKA exchanges against a scripted server.
//!
//! The server side is played by hand-built packets; its MAC keys come from
//! the same derivation the peer runs, so every signed round is checked on
//! both directions.

mod common;

use common::{FixedRandom, MockUicc};
use eap_peer::attribute::{
    EapSimAkaSubtype, SimAkaTypeData, AT_ANY_ID_REQ, AT_AUTN, AT_AUTS, AT_RAND,
};
use eap_peer::crypto::keys::derive_aka_keys;
use eap_peer::crypto::mac::{compute_mac, verify_mac, MacAlgorithm};
use eap_peer::message::{decode, EAP_TYPE_AKA, EAP_TYPE_IDENTITY};
use eap_peer::{
    AkaResult, EapCode, EapMessage, EapMethodConfig, EapSession, SessionConfig, SessionOutcome,
};

const SUB_ID: &str = "001010000000001";
const IDENTITY: &str = "0001010000000001";
const RAND: [u8; 16] = [0xA1; 16];
const AUTN: [u8; 16] = [0xB2; 16];
const RES: [u8; 8] = [0xC3; 8];
const CK: [u8; 16] = [0xD4; 16];
const IK: [u8; 16] = [0xE5; 16];

fn session_with(script: Vec<AkaResult>) -> EapSession {
    let config = SessionConfig::new(vec![EapMethodConfig::Aka {
        sub_id: SUB_ID.into(),
    }]);
    EapSession::new(
        config,
        Box::new(MockUicc::scripted(script)),
        Box::new(FixedRandom(0x77)),
    )
}

fn good_vector() -> AkaResult {
    AkaResult::Vector {
        res: RES.to_vec(),
        ck: CK,
        ik: IK,
    }
}

fn accepting_session() -> EapSession {
    session_with(vec![good_vector()])
}

fn challenge_request(identifier: u8, k_aut: &[u8]) -> Vec<u8> {
    let mut td = SimAkaTypeData::new(EapSimAkaSubtype::AkaChallenge);
    let mut rand_value = vec![0, 0];
    rand_value.extend_from_slice(&RAND);
    td.attributes.push_raw(AT_RAND, rand_value);
    let mut autn_value = vec![0, 0];
    autn_value.extend_from_slice(&AUTN);
    td.attributes.push_raw(AT_AUTN, autn_value);
    td.attributes.push_mac_placeholder();

    let unsigned = td
        .clone()
        .into_message(EapCode::Request, identifier, EAP_TYPE_AKA)
        .encode();
    let mac = compute_mac(MacAlgorithm::HmacSha1, k_aut, &unsigned, &[]);
    td.attributes.set_mac(&mac);
    td.into_message(EapCode::Request, identifier, EAP_TYPE_AKA)
        .encode()
}

fn response(outcome: SessionOutcome) -> Vec<u8> {
    match outcome {
        SessionOutcome::Response(bytes) => bytes,
        other => panic!("expected a response, got {other:?}"),
    }
}

fn body_of(bytes: &[u8]) -> SimAkaTypeData {
    let msg = decode(bytes).unwrap();
    SimAkaTypeData::decode(&msg.type_data.unwrap().data).unwrap()
}

#[test]
fn test_full_authentication_with_identity_round() {
    let mut session = accepting_session();
    let keys = derive_aka_keys(IDENTITY.as_bytes(), &CK, &IK);

    // EAP Identity round
    let request = EapMessage::request(1, EAP_TYPE_IDENTITY, Vec::new()).encode();
    let bytes = response(session.process_message(&request).unwrap());
    assert_eq!(decode(&bytes).unwrap().type_data.unwrap().data, IDENTITY.as_bytes());

    // AKA-Identity round
    let mut td = SimAkaTypeData::new(EapSimAkaSubtype::AkaIdentity);
    td.attributes.push_flag(AT_ANY_ID_REQ);
    let request = td.into_message(EapCode::Request, 2, EAP_TYPE_AKA).encode();
    let body = body_of(&response(session.process_message(&request).unwrap()));
    assert_eq!(body.attributes.identity().unwrap(), IDENTITY.as_bytes());

    // Challenge round; the server verifies the peer's MAC over its response
    let bytes = response(
        session
            .process_message(&challenge_request(3, &keys.k_aut))
            .unwrap(),
    );
    let body = body_of(&bytes);
    assert_eq!(body.subtype, EapSimAkaSubtype::AkaChallenge);
    let peer_mac = body.attributes.mac().unwrap();
    let zeroed = SimAkaTypeData {
        subtype: body.subtype,
        attributes: body.attributes.with_zeroed_mac(),
    }
    .into_message(EapCode::Response, 3, EAP_TYPE_AKA)
    .encode();
    assert!(verify_mac(
        MacAlgorithm::HmacSha1,
        &keys.k_aut,
        &zeroed,
        &[],
        &peer_mac
    ));

    // Verdict
    match session
        .process_message(&EapMessage::success(4).encode())
        .unwrap()
    {
        SessionOutcome::Success(derived) => {
            assert_eq!(derived.msk.len(), 64);
            assert_eq!(derived.emsk.len(), 64);
            assert_eq!(derived, keys);
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert!(session.is_terminal());
}

#[test]
fn test_resynchronization_then_success() {
    let mut session = session_with(vec![
        AkaResult::SynchronizationFailure { auts: [0x4A; 14] },
        good_vector(),
    ]);
    let keys = derive_aka_keys(IDENTITY.as_bytes(), &CK, &IK);

    let body = body_of(&response(
        session
            .process_message(&challenge_request(1, &keys.k_aut))
            .unwrap(),
    ));
    assert_eq!(body.subtype, EapSimAkaSubtype::SynchronizationFailure);
    assert_eq!(body.attributes.get(AT_AUTS).unwrap(), &[0x4A; 14]);

    // The retried challenge with a resynchronized vector goes through on
    // the same session
    let body = body_of(&response(
        session
            .process_message(&challenge_request(2, &keys.k_aut))
            .unwrap(),
    ));
    assert_eq!(body.subtype, EapSimAkaSubtype::AkaChallenge);

    match session
        .process_message(&EapMessage::success(3).encode())
        .unwrap()
    {
        SessionOutcome::Success(derived) => assert_eq!(derived, keys),
        other => panic!("expected success, got {other:?}"),
    }
}

#[test]
fn test_network_rejection_ends_in_failure() {
    let mut session = session_with(vec![AkaResult::Rejected]);

    let body = body_of(&response(
        session
            .process_message(&challenge_request(1, &[0u8; 16]))
            .unwrap(),
    ));
    assert_eq!(body.subtype, EapSimAkaSubtype::AuthenticationReject);

    match session
        .process_message(&EapMessage::failure(2).encode())
        .unwrap()
    {
        SessionOutcome::Failure => {}
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(session.is_terminal());
}

#[test]
fn test_tampered_challenge_yields_client_error() {
    let mut session = accepting_session();
    let keys = derive_aka_keys(IDENTITY.as_bytes(), &CK, &IK);

    let mut request = challenge_request(1, &keys.k_aut);
    let len = request.len();
    request[len - 1] ^= 0xFF; // corrupt the MAC
    let body = body_of(&response(session.process_message(&request).unwrap()));
    assert_eq!(body.subtype, EapSimAkaSubtype::ClientError);

    // Nothing but EAP-Failure is accepted afterwards
    assert!(session
        .process_message(&EapMessage::success(2).encode())
        .is_err());
}
