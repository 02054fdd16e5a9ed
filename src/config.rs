use crate::insight::CostModel;
use std::{env, path::PathBuf, time::Duration};
use tracing::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MEMBER_LIMIT: usize = 6;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Base URL of the plan backend; `None` runs on the static dataset.
    pub upstream_url: Option<String>,
    pub upstream_timeout: Duration,
    pub member_limit: usize,
    pub fallback_path: Option<PathBuf>,
    pub cost_model: CostModel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upstream_url: None,
            upstream_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            member_limit: DEFAULT_MEMBER_LIMIT,
            fallback_path: None,
            cost_model: CostModel::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let cost_model = match lookup("COST_RATES") {
            Some(overrides) => defaults
                .cost_model
                .clone()
                .with_overrides(&overrides)
                .unwrap_or_else(|err| {
                    warn!("ignoring COST_RATES: {err}");
                    defaults.cost_model.clone()
                }),
            None => defaults.cost_model.clone(),
        };

        Self {
            port: parse_or(&lookup, "PORT", defaults.port),
            upstream_url: lookup("UPSTREAM_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            upstream_timeout: Duration::from_secs(parse_or(
                &lookup,
                "UPSTREAM_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )),
            member_limit: parse_or(&lookup, "MEMBER_LIMIT", defaults.member_limit),
            fallback_path: lookup("APP_FALLBACK_PATH")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            cost_model,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("invalid {key} value '{value}', using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config.port, 8080);
        assert!(config.upstream_url.is_none());
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        assert_eq!(config.member_limit, 6);
        assert_eq!(config.cost_model, CostModel::default());
    }

    #[test]
    fn reads_overrides_and_trims_upstream() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("UPSTREAM_URL", "http://127.0.0.1:5000/"),
            ("UPSTREAM_TIMEOUT_SECS", "3"),
            ("MEMBER_LIMIT", "2"),
            ("COST_RATES", "Core=0.3"),
        ]));
        assert_eq!(config.port, 9000);
        assert_eq!(config.upstream_url.as_deref(), Some("http://127.0.0.1:5000"));
        assert_eq!(config.upstream_timeout, Duration::from_secs(3));
        assert_eq!(config.member_limit, 2);
        assert_eq!(config.cost_model.rate("Core"), 0.3);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("UPSTREAM_URL", "  "),
            ("COST_RATES", "Core=abc"),
        ]));
        assert_eq!(config.port, 8080);
        assert!(config.upstream_url.is_none());
        assert_eq!(config.cost_model, CostModel::default());
    }
}
