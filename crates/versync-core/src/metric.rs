//! Metric descriptors and the catalogue that groups them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the uptime metric every peer ships with.
pub const AVAILABILITY: &str = "availability";
/// Name of the performance metric every peer ships with.
pub const PERFORMANCE: &str = "performance";

/// Value type carried by a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Integer,
    Double,
    String,
}

/// A named, typed observable quantity.
///
/// Identity is the name; two metrics with the same name describe the same
/// quantity regardless of description or kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
}

impl Metric {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
        }
    }
}

/// Set of metrics keyed by name.
///
/// Serializes as a JSON array of [`Metric`] objects, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Metric>", into = "Vec<Metric>")]
pub struct MetricCatalogue {
    metrics: BTreeMap<String, Metric>,
}

impl MetricCatalogue {
    /// Create an empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalogue both peers start from: `availability` and `performance`.
    pub fn defaults() -> Self {
        [
            Metric::new(AVAILABILITY, "The uptime", MetricKind::Double),
            Metric::new(PERFORMANCE, "The performance", MetricKind::Double),
        ]
        .into_iter()
        .collect()
    }

    /// Insert a metric, returning the one it replaced (same name), if any.
    pub fn insert(&mut self, metric: Metric) -> Option<Metric> {
        self.metrics.insert(metric.name.clone(), metric)
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Metrics in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.values()
    }

    /// Metric names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    /// Replace the whole catalogue with `other`.
    pub fn replace_with(&mut self, other: MetricCatalogue) {
        self.metrics = other.metrics;
    }
}

impl FromIterator<Metric> for MetricCatalogue {
    fn from_iter<T: IntoIterator<Item = Metric>>(iter: T) -> Self {
        let mut catalogue = Self::new();
        for metric in iter {
            catalogue.insert(metric);
        }
        catalogue
    }
}

impl Extend<Metric> for MetricCatalogue {
    fn extend<T: IntoIterator<Item = Metric>>(&mut self, iter: T) {
        for metric in iter {
            self.insert(metric);
        }
    }
}

impl From<Vec<Metric>> for MetricCatalogue {
    fn from(metrics: Vec<Metric>) -> Self {
        metrics.into_iter().collect()
    }
}

impl From<MetricCatalogue> for Vec<Metric> {
    fn from(catalogue: MetricCatalogue) -> Self {
        catalogue.metrics.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_json_shape() {
        let metric = Metric::new("os_name", "Operational system name", MetricKind::String);
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "os_name",
                "description": "Operational system name",
                "type": "String",
            })
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let raw = r#"{"name":"x","description":"","type":"Float"}"#;
        assert!(serde_json::from_str::<Metric>(raw).is_err());
    }

    #[test]
    fn insert_keys_by_name() {
        let mut catalogue = MetricCatalogue::defaults();
        assert_eq!(catalogue.len(), 2);

        let replaced = catalogue.insert(Metric::new(AVAILABILITY, "Uptime ratio", MetricKind::Double));
        assert_eq!(replaced.map(|m| m.description), Some("The uptime".to_string()));
        assert_eq!(catalogue.len(), 2);
        assert_eq!(catalogue.get(AVAILABILITY).unwrap().description, "Uptime ratio");
    }

    #[test]
    fn serializes_as_sorted_array() {
        let catalogue: MetricCatalogue = vec![
            Metric::new("zeta", "", MetricKind::Integer),
            Metric::new("alpha", "", MetricKind::Integer),
        ]
        .into();

        let json = serde_json::to_value(&catalogue).unwrap();
        let names: Vec<_> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["alpha", "zeta"]);

        let back: MetricCatalogue = serde_json::from_value(json).unwrap();
        assert_eq!(back, catalogue);
    }

    #[test]
    fn replace_with_discards_previous_entries() {
        let mut catalogue = MetricCatalogue::defaults();
        catalogue.replace_with([Metric::new("os_name", "", MetricKind::String)].into_iter().collect());
        assert_eq!(catalogue.names().collect::<Vec<_>>(), ["os_name"]);
    }
}
