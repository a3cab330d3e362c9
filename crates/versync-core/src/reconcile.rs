//! Reconciliation of a client's declared state against the server's.
//!
//! The server catalogue is authoritative: a client is compared against it,
//! never the other way round. Extra client metrics are not an error.

use crate::{MetricCatalogue, Version};

/// Metrics the server has that `client` lacks, by name, in name order.
pub fn missing_metrics<'a>(client: &MetricCatalogue, server: &'a MetricCatalogue) -> Vec<&'a str> {
    server.names().filter(|name| !client.contains(name)).collect()
}

/// Outcome of comparing a client's version and metric set with the server's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Set when the client version is older than the server's.
    pub stale: Option<VersionDrift>,
    /// Server metrics absent from the client, in name order.
    pub missing: Vec<String>,
}

/// A client running behind the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDrift {
    pub client: Version,
    pub server: Version,
}

impl Reconciliation {
    /// Version check only.
    pub fn version(client: &Version, server: &Version) -> Self {
        Self {
            stale: drift(client, server),
            missing: Vec::new(),
        }
    }

    /// Version check plus metric-set check.
    pub fn full(
        client_version: &Version,
        client_metrics: &MetricCatalogue,
        server_version: &Version,
        server_metrics: &MetricCatalogue,
    ) -> Self {
        Self {
            stale: drift(client_version, server_version),
            missing: missing_metrics(client_metrics, server_metrics)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale.is_some()
    }

    /// True when the client is neither stale nor missing metrics.
    pub fn is_accepted(&self) -> bool {
        self.stale.is_none() && self.missing.is_empty()
    }

    /// Human-readable explanation; empty when accepted.
    pub fn diagnostic(&self) -> String {
        let mut text = String::new();
        if !self.missing.is_empty() {
            text.push_str("Missing metrics: ");
            for name in &self.missing {
                text.push_str(name);
                text.push(' ');
            }
        }
        if let Some(drift) = &self.stale {
            text.push_str(&format!(
                "| Deprecated version. Your version ({}), the server ({})",
                drift.client, drift.server
            ));
        }
        text
    }
}

fn drift(client: &Version, server: &Version) -> Option<VersionDrift> {
    client.is_older_than(server).then(|| VersionDrift {
        client: client.clone(),
        server: server.clone(),
    })
}
