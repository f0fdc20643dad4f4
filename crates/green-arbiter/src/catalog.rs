//! Built-in region catalog and CSV import for custom region lists.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::domain::CloudProvider::{Aws, Azure, Gcp};
use crate::domain::{CloudProvider, Location, Region};

struct CatalogEntry {
    provider: CloudProvider,
    code: &'static str,
    name: &'static str,
    country: &'static str,
    city: &'static str,
    latitude: f64,
    longitude: f64,
}

const fn entry(
    provider: CloudProvider,
    code: &'static str,
    name: &'static str,
    country: &'static str,
    city: &'static str,
    latitude: f64,
    longitude: f64,
) -> CatalogEntry {
    CatalogEntry {
        provider,
        code,
        name,
        country,
        city,
        latitude,
        longitude,
    }
}

const CATALOG: &[CatalogEntry] = &[
    entry(Aws, "us-east-1", "US East (N. Virginia)", "US", "Ashburn", 39.04, -77.49),
    entry(Aws, "us-east-2", "US East (Ohio)", "US", "Columbus", 39.96, -83.0),
    entry(Aws, "us-west-2", "US West (Oregon)", "US", "Boardman", 45.84, -119.7),
    entry(Aws, "ca-central-1", "Canada (Central)", "CA", "Montreal", 45.5, -73.57),
    entry(Aws, "eu-west-1", "Europe (Ireland)", "IE", "Dublin", 53.35, -6.26),
    entry(Aws, "eu-west-3", "Europe (Paris)", "FR", "Paris", 48.86, 2.35),
    entry(Aws, "eu-central-1", "Europe (Frankfurt)", "DE", "Frankfurt", 50.11, 8.68),
    entry(Aws, "eu-north-1", "Europe (Stockholm)", "SE", "Stockholm", 59.33, 18.07),
    entry(Aws, "ap-south-1", "Asia Pacific (Mumbai)", "IN", "Mumbai", 19.08, 72.88),
    entry(Aws, "ap-northeast-1", "Asia Pacific (Tokyo)", "JP", "Tokyo", 35.68, 139.69),
    entry(Aws, "ap-southeast-2", "Asia Pacific (Sydney)", "AU", "Sydney", -33.87, 151.21),
    entry(Aws, "sa-east-1", "South America (Sao Paulo)", "BR", "Sao Paulo", -23.55, -46.63),
    entry(Gcp, "us-central1", "Iowa", "US", "Council Bluffs", 41.26, -95.86),
    entry(Gcp, "europe-west1", "Belgium", "BE", "St. Ghislain", 50.45, 3.82),
    entry(Gcp, "europe-north1", "Finland", "FI", "Hamina", 60.57, 27.19),
    entry(Gcp, "asia-east1", "Taiwan", "TW", "Changhua", 24.07, 120.54),
    entry(Azure, "eastus", "East US", "US", "Boydton", 36.67, -78.39),
    entry(Azure, "westeurope", "West Europe", "NL", "Amsterdam", 52.37, 4.9),
    entry(Azure, "northeurope", "North Europe", "IE", "Dublin", 53.35, -6.26),
    entry(Azure, "swedencentral", "Sweden Central", "SE", "Gavle", 60.67, 17.14),
    entry(Azure, "australiaeast", "Australia East", "AU", "Sydney", -33.87, 151.21),
];

impl CatalogEntry {
    fn to_region(&self) -> Region {
        Region {
            provider: self.provider,
            region_code: self.code.to_string(),
            display_name: self.name.to_string(),
            location: Location {
                country: self.country.to_string(),
                city: Some(self.city.to_string()),
                latitude: self.latitude,
                longitude: self.longitude,
            },
        }
    }
}

/// Every region shipped with the crate, in catalog order.
pub fn default_regions() -> Vec<Region> {
    CATALOG.iter().map(CatalogEntry::to_region).collect()
}

/// Looks up a catalog region by its `provider:code` key.
pub fn find(key: &str) -> Option<Region> {
    let (provider, code) = key.trim().split_once(':')?;
    let provider = CloudProvider::parse(provider)?;
    CATALOG
        .iter()
        .find(|entry| entry.provider == provider && entry.code.eq_ignore_ascii_case(code.trim()))
        .map(CatalogEntry::to_region)
}

/// Resolves a list of keys, failing on the first unknown one.
pub fn resolve_keys<I, S>(keys: I) -> Result<Vec<Region>, CatalogError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keys.into_iter()
        .map(|key| {
            let key = key.as_ref();
            find(key).ok_or_else(|| CatalogError::UnknownRegion(key.to_string()))
        })
        .collect()
}

pub fn regions_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Region>, CatalogError> {
    let file = std::fs::File::open(path)?;
    regions_from_reader(file)
}

/// Reads regions from CSV with the header
/// `provider,region_code,display_name,country,city,latitude,longitude`.
pub fn regions_from_reader<R: Read>(reader: R) -> Result<Vec<Region>, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut regions = Vec::new();

    for (index, record) in csv_reader.deserialize::<RegionRow>().enumerate() {
        let row = record?;
        let provider =
            CloudProvider::parse(&row.provider).ok_or_else(|| CatalogError::UnknownProvider {
                line: index + 2,
                value: row.provider.clone(),
            })?;

        regions.push(Region {
            provider,
            region_code: row.region_code,
            display_name: row.display_name,
            location: Location {
                country: row.country.to_ascii_uppercase(),
                city: row.city,
                latitude: row.latitude,
                longitude: row.longitude,
            },
        });
    }

    Ok(regions)
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    provider: String,
    region_code: String,
    display_name: String,
    country: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    city: Option<String>,
    latitude: f64,
    longitude: f64,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read region list: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid region CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: unknown cloud provider '{value}'")]
    UnknownProvider { line: usize, value: String },
    #[error("region '{0}' is not in the built-in catalog")]
    UnknownRegion(String),
}
