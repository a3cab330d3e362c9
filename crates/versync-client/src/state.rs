//! Client-side state and the handlers for server messages.
//!
//! The client never answers the server: every handler only updates state and
//! records a [`Notice`] for the session to show the user.

use std::fmt;

use versync_core::{
    Handler, HandlerRegistry, Message, MessageType, MetricCatalogue, Unhandled, Version,
};

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The server runs a newer version.
    UpdateAvailable(Version),
    /// The catalogue was replaced from an `Updates` message.
    MetricsUpdated { version: Version, count: usize },
    /// The server rejected our settings.
    Deprecated(String),
    /// The server accepted our version or settings.
    Accepted,
    /// The server could not process a request.
    Rejected { ty: MessageType, detail: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::UpdateAvailable(version) => {
                write!(f, "**Attention** A new version is available: {version}")
            }
            Notice::MetricsUpdated { version, count } => {
                write!(f, "Metrics updated: {count} metrics, now at version {version}")
            }
            Notice::Deprecated(error) => write!(f, "ERROR: {error}"),
            Notice::Accepted => write!(f, "Accepted by the server"),
            Notice::Rejected { ty, detail } => write!(f, "Server answered {ty}: {detail}"),
        }
    }
}

/// Local version and metric catalogue, plus pending notices.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientState {
    version: Version,
    metrics: MetricCatalogue,
    available: Option<Version>,
    notices: Vec<Notice>,
}

impl ClientState {
    pub fn new(version: Version, metrics: MetricCatalogue) -> Self {
        Self {
            version,
            metrics,
            available: None,
            notices: Vec::new(),
        }
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn metrics(&self) -> &MetricCatalogue {
        &self.metrics
    }

    /// Newest version the server has advertised, if any.
    pub fn available(&self) -> Option<&Version> {
        self.available.as_ref()
    }

    /// Take the notices recorded since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

/// The client's dispatch table. Unmapped types are ignored.
pub fn handlers() -> HandlerRegistry<ClientState> {
    let table: [(MessageType, Handler<ClientState>); 6] = [
        (MessageType::VersionUpdatesAvailable, Box::new(on_update_available)),
        (MessageType::Updates, Box::new(on_updates)),
        (MessageType::Deprecated, Box::new(on_deprecated)),
        (MessageType::Accepted, Box::new(on_accepted)),
        (MessageType::BadRequest, Box::new(on_rejected)),
        (MessageType::NotSupported, Box::new(on_rejected)),
    ];
    HandlerRegistry::from_table(Unhandled::Ignore, table)
}

fn on_update_available(state: &mut ClientState, message: Message) -> Option<Message> {
    match message.version() {
        Ok(version) => {
            state.available = Some(version.clone());
            state.notices.push(Notice::UpdateAvailable(version));
        }
        Err(e) => tracing::debug!("ignoring update notice: {}", e),
    }
    None
}

/// Adopt the server's catalogue and version wholesale.
fn on_updates(state: &mut ClientState, message: Message) -> Option<Message> {
    let update = message
        .metrics()
        .and_then(|metrics| Ok((metrics, message.version()?)));
    match update {
        Ok((metrics, version)) => {
            state.metrics.replace_with(metrics);
            state.version = version.clone();
            state.notices.push(Notice::MetricsUpdated {
                version,
                count: state.metrics.len(),
            });
        }
        Err(e) => tracing::debug!("ignoring updates: {}", e),
    }
    None
}

fn on_deprecated(state: &mut ClientState, message: Message) -> Option<Message> {
    let error = message.error_text().unwrap_or_default().trim_end().to_string();
    state.notices.push(Notice::Deprecated(error));
    None
}

fn on_accepted(state: &mut ClientState, _message: Message) -> Option<Message> {
    state.notices.push(Notice::Accepted);
    None
}

fn on_rejected(state: &mut ClientState, message: Message) -> Option<Message> {
    state.notices.push(Notice::Rejected {
        ty: message.ty,
        detail: message.payload.to_string(),
    });
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use versync_core::{Metric, MetricKind};

    fn state() -> ClientState {
        ClientState::new(Version::new(0, 1, 0), MetricCatalogue::defaults())
    }

    #[test]
    fn update_notice_records_available_version() {
        let mut state = state();
        let notice = Message::version_updates_available(&Version::new(0, 1, 5));
        assert_eq!(handlers().dispatch(&mut state, notice), None);

        assert_eq!(state.available(), Some(&Version::new(0, 1, 5)));
        assert_eq!(state.version(), &Version::new(0, 1, 0));
        let notices = state.take_notices();
        assert_eq!(notices, [Notice::UpdateAvailable(Version::new(0, 1, 5))]);
        assert_eq!(
            notices[0].to_string(),
            "**Attention** A new version is available: 0.1.5"
        );
        assert!(state.take_notices().is_empty());
    }

    #[test]
    fn updates_replace_catalogue_and_version() {
        let mut state = state();
        let server_metrics: MetricCatalogue = [
            Metric::new("availability", "The uptime", MetricKind::Double),
            Metric::new("os_name", "Operational system name", MetricKind::String),
        ]
        .into_iter()
        .collect();
        let updates = Message::updates(&Version::new(0, 2, 0), &server_metrics);

        assert_eq!(handlers().dispatch(&mut state, updates), None);
        assert_eq!(state.metrics(), &server_metrics);
        assert_eq!(state.version(), &Version::new(0, 2, 0));
        assert_eq!(
            state.take_notices(),
            [Notice::MetricsUpdated {
                version: Version::new(0, 2, 0),
                count: 2
            }]
        );
    }

    #[test]
    fn malformed_updates_leave_state_alone() {
        let mut state = state();
        let before = state.clone();
        let updates = Message::new(MessageType::Updates, json!({"metrics": "all"}));
        assert_eq!(handlers().dispatch(&mut state, updates), None);
        assert_eq!(state, before);
    }

    #[test]
    fn deprecated_and_accepted_are_reported() {
        let mut state = state();
        let registry = handlers();
        registry.dispatch(
            &mut state,
            Message::deprecated(&Version::new(0, 1, 5), "Missing metrics: os_name "),
        );
        registry.dispatch(&mut state, Message::accepted());
        registry.dispatch(&mut state, Message::bad_request(json!({})));

        let notices = state.take_notices();
        assert_eq!(notices[0], Notice::Deprecated("Missing metrics: os_name".into()));
        assert_eq!(notices[1], Notice::Accepted);
        assert_eq!(
            notices[2],
            Notice::Rejected {
                ty: MessageType::BadRequest,
                detail: r#"{"request":{}}"#.into()
            }
        );
    }

    #[test]
    fn requests_from_server_are_ignored() {
        let mut state = state();
        let before = state.clone();
        for ty in [
            MessageType::Uninitialized,
            MessageType::Version,
            MessageType::GetUpdates,
            MessageType::PushSettings,
        ] {
            assert_eq!(handlers().dispatch(&mut state, Message::bare(ty)), None);
        }
        assert_eq!(state, before);
    }
}
