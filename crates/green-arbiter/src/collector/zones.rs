use std::collections::HashMap;

use crate::domain::Region;

const STANDARD_ZONES: &[(&str, &str)] = &[
    ("aws:us-east-1", "US-MIDA-PJM"),
    ("aws:us-east-2", "US-MIDA-PJM"),
    ("aws:us-west-2", "US-NW-BPAT"),
    ("aws:ca-central-1", "CA-QC"),
    ("aws:eu-west-1", "IE"),
    ("aws:eu-west-3", "FR"),
    ("aws:eu-central-1", "DE"),
    ("aws:eu-north-1", "SE-SE3"),
    ("aws:ap-south-1", "IN-WE"),
    ("aws:ap-northeast-1", "JP-TK"),
    ("aws:ap-southeast-2", "AU-NSW"),
    ("aws:sa-east-1", "BR-CS"),
    ("gcp:us-central1", "US-MIDW-MISO"),
    ("gcp:europe-west1", "BE"),
    ("gcp:europe-north1", "FI"),
    ("gcp:asia-east1", "TW"),
    ("azure:eastus", "US-MIDA-PJM"),
    ("azure:westeurope", "NL"),
    ("azure:northeurope", "IE"),
    ("azure:swedencentral", "SE-SE3"),
    ("azure:australiaeast", "AU-NSW"),
];

/// Maps regions to electricity grid zones. Regions without an entry resolve to their
/// country code.
#[derive(Debug, Clone, Default)]
pub struct ZoneDirectory {
    zones: HashMap<String, String>,
}

impl ZoneDirectory {
    pub fn standard() -> Self {
        STANDARD_ZONES
            .iter()
            .fold(Self::default(), |directory, (key, zone)| {
                directory.with_zone(*key, *zone)
            })
    }

    pub fn with_zone(mut self, region_key: impl Into<String>, zone: impl Into<String>) -> Self {
        self.zones.insert(region_key.into(), zone.into());
        self
    }

    pub fn resolve(&self, region: &Region) -> String {
        self.zones
            .get(&region.key())
            .cloned()
            .unwrap_or_else(|| region.location.country.trim().to_ascii_uppercase())
    }
}
