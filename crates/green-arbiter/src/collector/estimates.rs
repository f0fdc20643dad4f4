//! Derived latency and cost values for collectors without live measurement or pricing feeds.

use chrono::{DateTime, Utc};

use crate::config::ObserverConfig;
use crate::domain::{CloudProvider, CostMetrics, LatencyMetrics, Region};

pub const GEODESIC_SOURCE_TAG: &str = "synthetic:geodesic-estimate";

const EARTH_RADIUS_KM: f64 = 6371.0;
/// Round-trip milliseconds gained per kilometre of great-circle distance.
const KM_PER_MS: f64 = 100.0;
const FIXED_OVERHEAD_MS: f64 = 5.0;
const P95_FACTOR: f64 = 1.3;

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

pub fn geodesic_latency(
    observer: &ObserverConfig,
    region: &Region,
    now: DateTime<Utc>,
) -> LatencyMetrics {
    let distance = haversine_km(
        observer.latitude,
        observer.longitude,
        region.location.latitude,
        region.location.longitude,
    );
    let average = distance / KM_PER_MS + FIXED_OVERHEAD_MS;

    LatencyMetrics {
        average_latency_ms: average,
        p95_latency_ms: average * P95_FACTOR,
        measurement_timestamp: now,
        source_location: GEODESIC_SOURCE_TAG.to_string(),
    }
}

struct ListPrice {
    compute_per_hour: f64,
    storage_per_gb: f64,
    network_per_gb: f64,
}

const fn list_price(provider: CloudProvider) -> ListPrice {
    match provider {
        CloudProvider::Aws => ListPrice {
            compute_per_hour: 0.096,
            storage_per_gb: 0.023,
            network_per_gb: 0.09,
        },
        CloudProvider::Gcp => ListPrice {
            compute_per_hour: 0.095,
            storage_per_gb: 0.020,
            network_per_gb: 0.085,
        },
        CloudProvider::Azure => ListPrice {
            compute_per_hour: 0.096,
            storage_per_gb: 0.021,
            network_per_gb: 0.087,
        },
    }
}

/// Price multiplier over the provider's cheapest US list price, by country.
fn regional_premium(country: &str) -> f64 {
    match country {
        "US" => 1.0,
        "CA" => 1.07,
        "IE" | "SE" | "FI" | "NL" | "BE" => 1.08,
        "FR" | "DE" => 1.12,
        "IN" => 1.04,
        "TW" => 1.15,
        "JP" => 1.26,
        "AU" => 1.27,
        "BR" => 1.55,
        _ => 1.2,
    }
}

pub fn list_price_cost(region: &Region) -> CostMetrics {
    let price = list_price(region.provider);
    let premium = regional_premium(&region.location.country.to_ascii_uppercase());

    CostMetrics {
        compute_cost_per_hour: price.compute_per_hour * premium,
        storage_cost_per_gb: price.storage_per_gb * premium,
        network_cost_per_gb: price.network_per_gb * premium,
        region: region.key(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn haversine_matches_known_distance() {
        // London to Paris is roughly 344 km.
        let km = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((km - 344.0).abs() < 5.0, "got {km}");
        assert!(haversine_km(10.0, 10.0, 10.0, 10.0).abs() < 1e-9);
    }

    #[test]
    fn latency_grows_with_distance_and_is_tagged_synthetic() {
        let observer = ObserverConfig::default();
        let now = Utc::now();
        let local = geodesic_latency(
            &observer,
            &catalog::find("aws:us-east-1").expect("catalog"),
            now,
        );
        let remote = geodesic_latency(
            &observer,
            &catalog::find("aws:ap-southeast-2").expect("catalog"),
            now,
        );

        assert!((local.average_latency_ms - FIXED_OVERHEAD_MS).abs() < 1.0);
        assert!(remote.average_latency_ms > 150.0);
        assert!((remote.p95_latency_ms - remote.average_latency_ms * 1.3).abs() < 1e-9);
        assert_eq!(local.source_location, GEODESIC_SOURCE_TAG);
        assert_eq!(local.measurement_timestamp, now);
    }

    #[test]
    fn cost_applies_regional_premium() {
        let virginia = list_price_cost(&catalog::find("aws:us-east-1").expect("catalog"));
        let sao_paulo = list_price_cost(&catalog::find("aws:sa-east-1").expect("catalog"));
        assert_eq!(virginia.region, "aws:us-east-1");
        assert!((virginia.compute_cost_per_hour - 0.096).abs() < 1e-9);
        assert!(sao_paulo.compute_cost_per_hour > virginia.compute_cost_per_hour * 1.5);
    }
}
