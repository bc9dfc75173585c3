//! Async front end around [`EapSession`].
//!
//! Inbound packets are queued on an mpsc channel and processed strictly
//! one at a time by a dedicated task, so callers never block and ordering
//! is preserved. Session processing runs on the blocking pool because the
//! credential provider may stall on I/O; each message is bounded by the
//! configured timeout. A timeout, an error, or a verdict all conclude the
//! session, after which further packets are answered with a protocol
//! error callback.

use log::warn;
use tokio::sync::mpsc;
use tokio::task;
use tokio::time;

use crate::crypto::keys::DerivedKeys;
use crate::error::EapPeerError;
use crate::session::{EapSession, SessionOutcome};

/// Observer for session events. Exactly one callback fires per inbound
/// packet.
pub trait EapCallback: Send + 'static {
    /// An encoded EAP response to transmit to the server.
    fn on_response(&mut self, packet: Vec<u8>);
    /// Authentication succeeded with the given keying material.
    fn on_success(&mut self, keys: DerivedKeys);
    /// Authentication concluded unsuccessfully.
    fn on_fail(&mut self);
    /// Processing failed; the session is over.
    fn on_error(&mut self, error: EapPeerError);
}

/// Handle to a running authentication session.
///
/// Dropping the handle closes the queue and winds down the session task.
pub struct EapAuthenticator {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl EapAuthenticator {
    /// Spawn the processing task for `session` on the current runtime.
    pub fn spawn<C: EapCallback>(session: EapSession, mut callback: C) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let timeout = session.config().timeout;

        tokio::spawn(async move {
            // The session moves into each blocking step and comes back with
            // the result. A timed-out step keeps the session, so the slot
            // staying empty doubles as the terminal marker.
            let mut slot = Some(session);
            while let Some(packet) = rx.recv().await {
                let mut session = match slot.take() {
                    Some(session) => session,
                    None => {
                        callback.on_error(EapPeerError::protocol("session already concluded"));
                        continue;
                    }
                };

                let step = task::spawn_blocking(move || {
                    let result = session.process_message(&packet);
                    (session, result)
                });
                match time::timeout(timeout, step).await {
                    Err(_) => callback.on_error(EapPeerError::Timeout),
                    Ok(Err(join_error)) => {
                        callback.on_error(EapPeerError::Internal(join_error.to_string()));
                    }
                    Ok(Ok((session, result))) => match result {
                        Ok(SessionOutcome::Response(bytes)) => {
                            slot = Some(session);
                            callback.on_response(bytes);
                        }
                        Ok(SessionOutcome::Success(keys)) => callback.on_success(keys),
                        Ok(SessionOutcome::Failure) => callback.on_fail(),
                        Err(e) => callback.on_error(e),
                    },
                }
            }
        });

        EapAuthenticator { tx }
    }

    /// Queue one inbound packet. Packets are processed in submission
    /// order; the result arrives through the callback.
    pub fn process_message(&self, packet: Vec<u8>) {
        if self.tx.send(packet).is_err() {
            warn!("authenticator task is gone, dropping packet");
        }
    }
}
