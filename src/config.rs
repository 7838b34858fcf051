// Runtime configuration for the two remote services, the local cache and the report thresholds

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const TOKEN_ENV_VAR: &str = "GREENMO_TOKEN";
pub const CACHE_DIR_ENV_VAR: &str = "GREENMO_CACHE_DIR";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("missing env var: `{0}`")]
    MissingEnvVar(&'static str),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub rest_base_url: String,
    pub graphql_base_url: String,
    pub rest_token: Option<String>,
    pub timeout_ms: u64,
    pub cache_dir: PathBuf,
    pub paging: PagingConfig,
    pub thresholds: Thresholds,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "https://greenmobility.frontend.fleetbird.eu/api/prod/v1.06".to_string(),
            graphql_base_url: "https://street.greenmobility.com/api".to_string(),
            rest_token: None,
            timeout_ms: 30_000,
            cache_dir: PathBuf::from("."),
            paging: PagingConfig::default(),
            thresholds: Thresholds::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Empty values are treated the same as unset ones
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self {
            rest_token: non_empty(TOKEN_ENV_VAR),
            ..Self::default()
        };
        if let Some(dir) = non_empty(CACHE_DIR_ENV_VAR) {
            config.cache_dir = PathBuf::from(dir);
        }
        config
    }

    // The token is only required once a live fetch is actually needed
    pub fn rest_token(&self) -> Result<&str, ConfigError> {
        self.rest_token
            .as_deref()
            .ok_or(ConfigError::MissingEnvVar(TOKEN_ENV_VAR))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// Cursor conventions of the three paged streams
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagingConfig {
    // Page 0 makes the REST API return everything in one go, so paging starts at 1
    pub reservations_first_page: u64,
    pub reservations_page_step: u64,
    pub bills_limit: u64,
    pub bills_offset_step: u64,
    pub vouchers_limit: u64,
    // Observed behavior of the voucher endpoint: the offset advances by one
    // while twenty records are requested per page
    pub vouchers_offset_step: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            reservations_first_page: 1,
            reservations_page_step: 1,
            bills_limit: 10,
            bills_offset_step: 10,
            vouchers_limit: 20,
            vouchers_offset_step: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    // Trips strictly longer than this are counted as long trips
    pub long_trip_minutes: i64,
    // Vouchers worth strictly more than this were bought, the rest were free
    pub purchased_voucher_value: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            long_trip_minutes: 120,
            purchased_voucher_value: 40.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let config = ClientConfig::from_lookup(lookup_from(&[]));
        assert_eq!(
            config.rest_token(),
            Err(ConfigError::MissingEnvVar("GREENMO_TOKEN"))
        );
        assert_eq!(
            config.rest_token().unwrap_err().to_string(),
            "missing env var: `GREENMO_TOKEN`"
        );
    }

    #[test]
    fn test_empty_token_counts_as_missing() {
        let config = ClientConfig::from_lookup(lookup_from(&[("GREENMO_TOKEN", "  ")]));
        assert!(config.rest_token().is_err());
    }

    #[test]
    fn test_values_are_read_from_environment() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("GREENMO_TOKEN", "secret"),
            ("GREENMO_CACHE_DIR", "/tmp/greenmo"),
        ]));
        assert_eq!(config.rest_token(), Ok("secret"));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/greenmo"));
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_default_paging_and_thresholds() {
        let config = ClientConfig::default();
        assert_eq!(config.paging.reservations_first_page, 1);
        assert_eq!(config.paging.bills_offset_step, config.paging.bills_limit);
        assert_eq!(config.paging.vouchers_limit, 20);
        assert_eq!(config.paging.vouchers_offset_step, 1);
        assert_eq!(config.thresholds.long_trip_minutes, 120);
        assert_eq!(config.thresholds.purchased_voucher_value, 40.0);
    }
}
