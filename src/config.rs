//! Environment configuration and the static reference tables

use crate::FareError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://test.api.amadeus.com/v2";
pub const DEFAULT_AUTH_URL: &str = "https://test.api.amadeus.com/v1/security/oauth2/token";
pub const DEFAULT_HISTORY_PATH: &str = "amadeus_api_history.jsonl";
pub const DEFAULT_CURRENCY: &str = "TWD";
pub const DEFAULT_BASE_PRICE: f64 = 5000.0;

/// Runtime configuration for the tracker and its provider client
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    pub auth_url: String,
    pub currency: String,
    pub max_results: u32,
    pub concurrency: usize,
    pub http_timeout: Duration,
    pub history_path: Option<PathBuf>,
    pub tables_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            max_results: 20,
            concurrency: 4,
            http_timeout: Duration::from_secs(30),
            history_path: Some(PathBuf::from(DEFAULT_HISTORY_PATH)),
            tables_path: None,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let concurrency = get("FARE_CONCURRENCY")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.concurrency)
            .clamp(1, 8);

        // An explicitly empty FARE_HISTORY_PATH disables the audit sink
        let history_path = match lookup("FARE_HISTORY_PATH") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(PathBuf::from(v.trim())),
            None => defaults.history_path,
        };

        let config = Self {
            api_key: get("AMADEUS_API_KEY").unwrap_or_default(),
            api_secret: get("AMADEUS_API_SECRET").unwrap_or_default(),
            base_url: get("AMADEUS_BASE_URL").unwrap_or(defaults.base_url),
            auth_url: get("AMADEUS_AUTH_URL").unwrap_or(defaults.auth_url),
            currency: get("FARE_CURRENCY").unwrap_or(defaults.currency),
            max_results: get("FARE_MAX_RESULTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_results),
            concurrency,
            http_timeout: get("FARE_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            history_path,
            tables_path: get("FARE_TABLES_PATH").map(PathBuf::from),
        };

        debug!(
            base_url = %config.base_url,
            currency = %config.currency,
            concurrency = config.concurrency,
            has_credentials = config.has_credentials(),
            "Tracker configuration loaded"
        );
        config
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// Check that the provider credentials are present
    pub fn validate(&self) -> Result<(), FareError> {
        if self.api_key.is_empty() {
            return Err(FareError::Config("AMADEUS_API_KEY is not set".to_string()));
        }
        if self.api_secret.is_empty() {
            return Err(FareError::Config("AMADEUS_API_SECRET is not set".to_string()));
        }
        Ok(())
    }

    /// Reference tables from `tables_path`, or the built-in defaults
    pub fn load_tables(&self) -> Result<ReferenceTables, FareError> {
        match &self.tables_path {
            Some(path) => ReferenceTables::from_json_file(path),
            None => Ok(ReferenceTables::default()),
        }
    }
}

/// Carrier display names and route base prices
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReferenceTables {
    pub carriers: HashMap<String, String>,
    pub route_prices: HashMap<String, f64>,
    pub default_base_price: f64,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        let carriers = [
            ("CI", "China Airlines"),
            ("BR", "EVA Air"),
            ("CX", "Cathay Pacific"),
            ("JL", "Japan Airlines"),
            ("NH", "All Nippon Airways"),
            ("KE", "Korean Air"),
            ("SQ", "Singapore Airlines"),
            ("TG", "Thai Airways"),
            ("UA", "United Airlines"),
            ("AA", "American Airlines"),
            ("SL", "Thai Lion Air"),
            ("TW", "T'way Air"),
            ("TR", "Tigerair Taiwan"),
            ("7C", "Jeju Air"),
            ("MF", "Xiamen Airlines"),
            ("OZ", "Asiana Airlines"),
            ("JX", "STARLUX Airlines"),
            ("VN", "Vietnam Airlines"),
            ("PR", "Philippine Airlines"),
        ];

        let route_prices = [
            ("TPE-TYO", 8000.0),
            ("TPE-OSA", 7500.0),
            ("TPE-SEL", 6000.0),
            ("TPE-HKG", 4000.0),
            ("TPE-BKK", 7000.0),
            ("TPE-SIN", 8000.0),
            ("TPE-KHH", 2000.0),
        ];

        Self {
            carriers: carriers
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
            route_prices: route_prices
                .iter()
                .map(|(route, price)| (route.to_string(), *price))
                .collect(),
            default_base_price: DEFAULT_BASE_PRICE,
        }
    }
}

impl ReferenceTables {
    /// Load tables from a JSON file. Missing keys keep their defaults,
    /// entries present in the file extend or override the built-in ones.
    pub fn from_json_file(path: &Path) -> Result<Self, FareError> {
        let content = std::fs::read_to_string(path)?;
        let overrides: ReferenceTablesFile = serde_json::from_str(&content)?;

        let mut tables = Self::default();
        tables.carriers.extend(overrides.carriers);
        tables.route_prices.extend(overrides.route_prices);
        if let Some(price) = overrides.default_base_price {
            if price <= 0.0 {
                return Err(FareError::Config(format!(
                    "default_base_price must be positive, got {}",
                    price
                )));
            }
            tables.default_base_price = price;
        }

        info!(
            path = %path.display(),
            carriers = tables.carriers.len(),
            routes = tables.route_prices.len(),
            "Reference tables loaded"
        );
        Ok(tables)
    }

    /// Display name for a carrier code; unknown codes pass through unchanged
    pub fn carrier_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.carriers.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Base price for `ORIGIN-DEST`, or the default for unknown routes
    pub fn base_price(&self, origin: &str, destination: &str) -> f64 {
        let route = format!("{}-{}", origin, destination);
        self.route_prices
            .get(&route)
            .copied()
            .unwrap_or(self.default_base_price)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReferenceTablesFile {
    carriers: HashMap<String, String>,
    route_prices: HashMap<String, f64>,
    default_base_price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = TrackerConfig::from_lookup(|_| None);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(config.currency, "TWD");
        assert_eq!(config.max_results, 20);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.history_path, Some(PathBuf::from(DEFAULT_HISTORY_PATH)));
        assert!(!config.has_credentials());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_overrides() {
        let config = TrackerConfig::from_lookup(lookup_from(&[
            ("AMADEUS_API_KEY", " key "),
            ("AMADEUS_API_SECRET", "secret"),
            ("FARE_CURRENCY", "USD"),
            ("FARE_CONCURRENCY", "64"),
            ("FARE_MAX_RESULTS", "5"),
            ("FARE_HISTORY_PATH", ""),
        ]));
        assert_eq!(config.api_key, "key");
        assert!(config.validate().is_ok());
        assert_eq!(config.currency, "USD");
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.max_results, 5);
        assert_eq!(config.history_path, None);
    }

    #[test]
    fn test_carrier_name_lookup() {
        let tables = ReferenceTables::default();
        assert_eq!(tables.carriers.len(), 19);
        assert_eq!(tables.carrier_name("CI"), "China Airlines");
        assert_eq!(tables.carrier_name("ZZ"), "ZZ");
    }

    #[test]
    fn test_base_price_lookup() {
        let tables = ReferenceTables::default();
        assert_eq!(tables.base_price("TPE", "HKG"), 4000.0);
        assert_eq!(tables.base_price("HKG", "TPE"), 5000.0);
    }

    #[test]
    fn test_tables_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"carriers": {{"ZZ": "Zed Air"}}, "route_prices": {{"TPE-LAX": 21000}}}}"#
        )
        .unwrap();

        let tables = ReferenceTables::from_json_file(file.path()).unwrap();
        assert_eq!(tables.carrier_name("ZZ"), "Zed Air");
        assert_eq!(tables.carrier_name("BR"), "EVA Air");
        assert_eq!(tables.base_price("TPE", "LAX"), 21000.0);
        assert_eq!(tables.default_base_price, DEFAULT_BASE_PRICE);
    }

    #[test]
    fn test_tables_reject_non_positive_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_base_price": 0}}"#).unwrap();
        assert!(matches!(
            ReferenceTables::from_json_file(file.path()),
            Err(FareError::Config(_))
        ));
    }
}
