//! Authoritative server state and the request handlers that read it.

use serde_json::Value;
use versync_core::{
    Handler, HandlerRegistry, Message, MessageType, MetricCatalogue, ProtocolError,
    Reconciliation, Unhandled, Version,
};

use crate::config::ReleaseConfig;

/// Current version and metric catalogue.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerState {
    version: Version,
    metrics: MetricCatalogue,
}

impl ServerState {
    pub fn new(version: Version, metrics: MetricCatalogue) -> Self {
        Self { version, metrics }
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn metrics(&self) -> &MetricCatalogue {
        &self.metrics
    }

    /// Adopt a release: new version, plus the metrics it introduces.
    pub fn release(&mut self, release: &ReleaseConfig) {
        self.version = release.version.clone();
        self.metrics.extend(release.metrics.iter().cloned());
    }
}

/// The server's dispatch table.
pub fn handlers() -> HandlerRegistry<ServerState> {
    let table: [(MessageType, Handler<ServerState>); 4] = [
        (MessageType::Version, Box::new(on_version)),
        (MessageType::GetUpdates, Box::new(on_get_updates)),
        (MessageType::PushSettings, Box::new(on_push_settings)),
        (MessageType::NotSupported, Box::new(on_not_supported)),
    ];
    HandlerRegistry::from_table(Unhandled::NotSupported, table)
}

/// Version-only check; the client need not declare metrics here.
fn on_version(state: &mut ServerState, message: Message) -> Option<Message> {
    let client_version = match message.version() {
        Ok(version) => version,
        Err(e) => return Some(reject(message, e)),
    };

    let outcome = Reconciliation::version(&client_version, &state.version);
    if outcome.is_stale() {
        Some(Message::version_updates_available(&state.version))
    } else {
        Some(Message::accepted())
    }
}

fn on_get_updates(state: &mut ServerState, _message: Message) -> Option<Message> {
    Some(Message::updates(&state.version, &state.metrics))
}

/// Full check: both `metrics` and `version` are required.
fn on_push_settings(state: &mut ServerState, message: Message) -> Option<Message> {
    let declared = message
        .metrics()
        .and_then(|metrics| Ok((metrics, message.version()?)));
    let (client_metrics, client_version) = match declared {
        Ok(declared) => declared,
        Err(e) => return Some(reject(message, e)),
    };

    let outcome = Reconciliation::full(
        &client_version,
        &client_metrics,
        &state.version,
        &state.metrics,
    );
    if outcome.is_accepted() {
        Some(Message::accepted())
    } else {
        tracing::debug!(
            missing = ?outcome.missing,
            stale = outcome.is_stale(),
            "client settings deprecated"
        );
        Some(Message::deprecated(&state.version, outcome.diagnostic()))
    }
}

/// A peer bouncing `NotSupported` back gets `BadRequest`, never another
/// `NotSupported`.
fn on_not_supported(_state: &mut ServerState, message: Message) -> Option<Message> {
    Some(Message::bad_request(message.payload))
}

fn reject(message: Message, error: ProtocolError) -> Message {
    tracing::debug!(ty = %message.ty, "bad request: {}", error);
    let payload = match message.payload {
        Value::Null => Value::Object(Default::default()),
        payload => payload,
    };
    Message::bad_request(payload)
}
