//! Shared test doubles for the exchange tests.
//!
//! Provides a scripted credential provider, a deterministic randomness
//! source, and a channel-backed callback so full exchanges can be driven
//! and observed without a real server or UICC.

#![allow(dead_code)]

use tokio::sync::mpsc;

use eap_peer::{
    AkaResult, DerivedKeys, EapCallback, EapPeerError, GsmTriplet, IdentityProvider, SecureRandom,
};

/// Stand-in for a UICC: answers AKA challenges from a script (the last
/// entry repeats) and derives GSM triplets deterministically from the
/// RAND.
pub struct MockUicc {
    script: Vec<AkaResult>,
}

impl MockUicc {
    pub fn scripted(script: Vec<AkaResult>) -> Self {
        assert!(!script.is_empty());
        MockUicc { script }
    }

    pub fn accepting(res: Vec<u8>, ck: [u8; 16], ik: [u8; 16]) -> Self {
        Self::scripted(vec![AkaResult::Vector { res, ck, ik }])
    }

    /// The triplet every test derives for a given RAND.
    pub fn triplet_for(rand: &[u8; 16]) -> GsmTriplet {
        let mut sres = [0u8; 4];
        sres.copy_from_slice(&rand[..4]);
        let mut kc = [0u8; 8];
        kc.copy_from_slice(&rand[8..16]);
        GsmTriplet { sres, kc }
    }
}

impl IdentityProvider for MockUicc {
    fn subscriber_identity(&mut self) -> Result<String, EapPeerError> {
        Ok("001010000000001".into())
    }

    fn aka_authenticate(
        &mut self,
        _rand: &[u8; 16],
        _autn: &[u8; 16],
    ) -> Result<AkaResult, EapPeerError> {
        if self.script.len() > 1 {
            Ok(self.script.remove(0))
        } else {
            Ok(self.script[0].clone())
        }
    }

    fn gsm_authenticate(&mut self, rand: &[u8; 16]) -> Result<GsmTriplet, EapPeerError> {
        Ok(Self::triplet_for(rand))
    }
}

/// Fills every buffer with a fixed byte so nonces are predictable.
pub struct FixedRandom(pub u8);

impl SecureRandom for FixedRandom {
    fn fill(&mut self, dest: &mut [u8]) {
        dest.fill(self.0);
    }
}

/// Everything an authenticator can report, as plain data.
#[derive(Debug)]
pub enum Event {
    Response(Vec<u8>),
    Success(DerivedKeys),
    Fail,
    Error(EapPeerError),
}

/// Callback that forwards every event into a channel for assertions.
pub struct ChannelCallback {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelCallback {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelCallback { tx }, rx)
    }
}

impl EapCallback for ChannelCallback {
    fn on_response(&mut self, packet: Vec<u8>) {
        let _ = self.tx.send(Event::Response(packet));
    }

    fn on_success(&mut self, keys: DerivedKeys) {
        let _ = self.tx.send(Event::Success(keys));
    }

    fn on_fail(&mut self) {
        let _ = self.tx.send(Event::Fail);
    }

    fn on_error(&mut self, error: EapPeerError) {
        let _ = self.tx.send(Event::Error(error));
    }
}
