use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cloud providers the catalog and baseline tables know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
}

impl CloudProvider {
    pub const fn label(self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Gcp => "gcp",
            CloudProvider::Azure => "azure",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "aws" | "amazon" => Some(Self::Aws),
            "gcp" | "google" => Some(Self::Gcp),
            "azure" | "microsoft" => Some(Self::Azure),
            _ => None,
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Physical placement of a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// A cloud region under evaluation. Built by the caller and never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub provider: CloudProvider,
    pub region_code: String,
    pub display_name: String,
    pub location: Location,
}

impl Region {
    /// Stable lookup key, e.g. `aws:eu-north-1`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.provider, self.region_code)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.key())
    }
}

/// The three scored dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Latency,
    Carbon,
    Cost,
}

impl Factor {
    pub const fn label(self) -> &'static str {
        match self {
            Factor::Latency => "latency",
            Factor::Carbon => "carbon",
            Factor::Cost => "cost",
        }
    }

    pub const fn ordered() -> [Factor; 3] {
        [Factor::Carbon, Factor::Latency, Factor::Cost]
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyMetrics {
    pub average_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub measurement_timestamp: DateTime<Utc>,
    /// Where the measurement was taken from, or a `synthetic:`/`mock:` tag for derived values.
    pub source_location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonMetrics {
    /// Grams of CO2-equivalent per kWh.
    pub carbon_intensity: f64,
    pub renewable_percentage: f64,
    pub data_source: String,
    pub last_updated: Option<DateTime<Utc>>,
    /// External grid zone the values were resolved for.
    pub zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostMetrics {
    pub compute_cost_per_hour: f64,
    pub storage_cost_per_gb: f64,
    pub network_cost_per_gb: f64,
    pub region: String,
}

fn has_tag_segment(value: &str, tags: &[&str]) -> bool {
    value
        .split(|c: char| matches!(c, ':' | '-' | '_' | '/' | '.') || c.is_whitespace())
        .any(|segment| tags.iter().any(|tag| segment.eq_ignore_ascii_case(tag)))
}

/// Source tags that mark derived or fabricated measurements. Matches whole segments only,
/// so `mock:zone-table` counts and `contest-1` does not.
pub(crate) fn is_mock_tag(value: &str) -> bool {
    has_tag_segment(value, &["mock", "test", "fake", "dummy"])
}

pub(crate) fn is_synthetic_tag(value: &str) -> bool {
    is_mock_tag(value) || has_tag_segment(value, &["synthetic"])
}
