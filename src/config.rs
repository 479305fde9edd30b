//! Runtime configuration read from the environment (and an optional `.env`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

pub const DEFAULT_DB_PATH: &str = "caixa.db";
pub const DEFAULT_OFFLINE_DB_PATH: &str = "caixa_offline.db";
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_LOW_STOCK_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub offline_db_path: PathBuf,
    pub page_size: usize,
    pub search_debounce: Duration,
    pub low_stock_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            offline_db_path: PathBuf::from(DEFAULT_OFFLINE_DB_PATH),
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the `CAIXA_*` variables.
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = lookup("CAIXA_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CAIXA_OFFLINE_DB_PATH") {
            config.offline_db_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("CAIXA_PAGE_SIZE") {
            let size: usize = parse_var("CAIXA_PAGE_SIZE", &raw)?;
            if size == 0 {
                return Err(AppError::Config("CAIXA_PAGE_SIZE must be positive".into()));
            }
            config.page_size = size;
        }
        if let Some(raw) = lookup("CAIXA_SEARCH_DEBOUNCE_MS") {
            config.search_debounce =
                Duration::from_millis(parse_var("CAIXA_SEARCH_DEBOUNCE_MS", &raw)?);
        }
        if let Some(raw) = lookup("CAIXA_LOW_STOCK_THRESHOLD") {
            let threshold: f64 = parse_var("CAIXA_LOW_STOCK_THRESHOLD", &raw)?;
            if threshold < 0.0 {
                return Err(AppError::Config(
                    "CAIXA_LOW_STOCK_THRESHOLD must not be negative".into(),
                ));
            }
            config.low_stock_threshold = threshold;
        }
        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} has an invalid value: {:?}", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.search_debounce, Duration::from_millis(300));
        assert!((config.low_stock_threshold - DEFAULT_LOW_STOCK_THRESHOLD).abs() < 1e-9);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("CAIXA_DB_PATH", "/tmp/loja.db"),
            ("CAIXA_PAGE_SIZE", "20"),
            ("CAIXA_SEARCH_DEBOUNCE_MS", "150"),
            ("CAIXA_LOW_STOCK_THRESHOLD", "2.5"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/loja.db"));
        assert_eq!(config.page_size, 20);
        assert_eq!(config.search_debounce, Duration::from_millis(150));
        assert!((config.low_stock_threshold - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_size = Config::from_lookup(lookup_from(&[("CAIXA_PAGE_SIZE", "lots")]));
        assert!(matches!(bad_size, Err(AppError::Config(_))));

        let zero = Config::from_lookup(lookup_from(&[("CAIXA_PAGE_SIZE", "0")]));
        assert!(matches!(zero, Err(AppError::Config(_))));

        let negative = Config::from_lookup(lookup_from(&[("CAIXA_LOW_STOCK_THRESHOLD", "-1")]));
        assert!(matches!(negative, Err(AppError::Config(_))));
    }
}
