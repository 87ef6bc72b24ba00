//! Unit tests for the secrets broker.
//! The agent is a recording mock; responses are injected directly.

#![allow(clippy::panic, clippy::unwrap_used)]

use std::sync::{Mutex, PoisonError};

use crate::{
    event::EventSink,
    secrets::{RequestId, SecretAgent, SecretsBroker, SecretsFlags},
    types::ConnectionProfile,
};

#[derive(Default)]
struct MockAgent {
    requests: Mutex<Vec<(String, SecretsFlags, RequestId)>>,
    cancelled: Mutex<Vec<RequestId>>,
}

impl MockAgent {
    fn requests(&self) -> Vec<(String, SecretsFlags, RequestId)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn cancelled(&self) -> Vec<RequestId> {
        self.cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SecretAgent for MockAgent {
    fn get_secrets(
        &self,
        _profile: &ConnectionProfile,
        setting: &str,
        flags: SecretsFlags,
        request: RequestId,
        _sink: &EventSink,
    ) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((setting.to_owned(), flags, request));
    }

    fn cancel_secrets(&self, request: RequestId) {
        self.cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

fn profile() -> ConnectionProfile {
    ConnectionProfile::wired("corp")
}

#[test]
fn request_reaches_agent_with_matching_id() {
    let agent = MockAgent::default();
    let (sink, _rx) = EventSink::channel();
    let mut broker = SecretsBroker::default();

    let id = broker.request(
        &agent,
        &profile(),
        "802-1x",
        SecretsFlags::ALLOW_INTERACTION,
        &sink,
    );

    let requests = agent.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "802-1x");
    assert_eq!(requests[0].1, SecretsFlags::ALLOW_INTERACTION);
    assert_eq!(requests[0].2, id);
    assert!(broker.outstanding());
}

#[test]
fn second_request_cancels_the_first() {
    let agent = MockAgent::default();
    let (sink, _rx) = EventSink::channel();
    let mut broker = SecretsBroker::default();

    let first = broker.request(
        &agent,
        &profile(),
        "802-1x",
        SecretsFlags::ALLOW_INTERACTION,
        &sink,
    );
    let second = broker.request(
        &agent,
        &profile(),
        "802-1x",
        SecretsFlags::ALLOW_INTERACTION | SecretsFlags::REQUEST_NEW,
        &sink,
    );

    assert_ne!(first, second);
    assert_eq!(agent.cancelled(), vec![first]);
    assert!(broker.outstanding());

    // The late answer to the cancelled request is swallowed; the live one
    // still matches.
    assert_eq!(broker.on_response(first), None);
    assert!(broker.outstanding());
    let flags = broker.on_response(second);
    assert_eq!(
        flags,
        Some(SecretsFlags::ALLOW_INTERACTION | SecretsFlags::REQUEST_NEW)
    );
    assert!(!broker.outstanding());
}

#[test]
fn cancel_without_outstanding_is_noop() {
    let agent = MockAgent::default();
    let mut broker = SecretsBroker::default();

    broker.cancel(&agent);
    assert!(agent.cancelled().is_empty());
    assert!(!broker.outstanding());
}

#[test]
fn response_consumes_the_pending_slot() {
    let agent = MockAgent::default();
    let (sink, _rx) = EventSink::channel();
    let mut broker = SecretsBroker::default();

    let id = broker.request(
        &agent,
        &profile(),
        "802-1x",
        SecretsFlags::ALLOW_INTERACTION,
        &sink,
    );
    assert!(broker.on_response(id).is_some());
    assert!(!broker.outstanding());

    // A fresh request is legal again.
    let next = broker.request(
        &agent,
        &profile(),
        "802-1x",
        SecretsFlags::ALLOW_INTERACTION,
        &sink,
    );
    assert_ne!(id, next);
    assert!(agent.cancelled().is_empty());
}

#[test]
fn cancelled_response_after_explicit_cancel_is_swallowed() {
    let agent = MockAgent::default();
    let (sink, _rx) = EventSink::channel();
    let mut broker = SecretsBroker::default();

    let id = broker.request(
        &agent,
        &profile(),
        "802-1x",
        SecretsFlags::ALLOW_INTERACTION,
        &sink,
    );
    broker.cancel(&agent);
    assert_eq!(agent.cancelled(), vec![id]);
    assert!(!broker.outstanding());

    assert_eq!(broker.on_response(id), None);
}
