use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::report::{available_workers, FailurePolicy, ReportOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub history_path: Option<PathBuf>,
    pub base_currency: String,
    pub n_workers: usize,
    pub report_years: Option<Vec<i32>>,
    pub failure_policy: FailurePolicy,
    pub taxpayer_info_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let history_path = non_empty(&env_map, "HISTORY_PATH").map(PathBuf::from);
        let taxpayer_info_path = non_empty(&env_map, "TAXPAYER_INFO_PATH").map(PathBuf::from);

        let base_currency = non_empty(&env_map, "BASE_CURRENCY")
            .unwrap_or("EUR")
            .to_string();

        let n_workers = match non_empty(&env_map, "N_WORKERS") {
            Some(s) => parse_workers(s)?,
            None => available_workers(),
        };

        let report_years = match non_empty(&env_map, "REPORT_YEARS") {
            Some(s) => Some(parse_years(s).map_err(|reason| {
                ConfigError::InvalidValue("REPORT_YEARS".to_string(), reason)
            })?),
            None => None,
        };

        let failure_policy = match non_empty(&env_map, "FAILURE_POLICY") {
            Some(s) => s
                .parse::<FailurePolicy>()
                .map_err(|reason| ConfigError::InvalidValue("FAILURE_POLICY".to_string(), reason))?,
            None => FailurePolicy::default(),
        };

        Ok(Config {
            port,
            history_path,
            base_currency,
            n_workers,
            report_years,
            failure_policy,
            taxpayer_info_path,
        })
    }

    /// History location, required by every command that reads history.
    pub fn history_path(&self) -> Result<&Path, ConfigError> {
        self.history_path
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnv("HISTORY_PATH".to_string()))
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            years: self.report_years.clone(),
            n_workers: self.n_workers,
            policy: self.failure_policy,
            base_currency: self.base_currency.clone(),
        }
    }
}

fn non_empty<'a>(env_map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env_map
        .get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Worker count, at least one and at most the available parallelism.
fn parse_workers(s: &str) -> Result<usize, ConfigError> {
    match s.parse::<usize>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue(
            "N_WORKERS".to_string(),
            "must be a positive integer".to_string(),
        )),
        Ok(n) => Ok(n.min(available_workers())),
    }
}

/// Comma separated list of years, e.g. `2020,2021`.
pub fn parse_years(s: &str) -> Result<Vec<i32>, String> {
    let years = s
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .map_err(|_| format!("'{}' is not a year", part))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if years.is_empty() {
        return Err("no years given".to_string());
    }
    Ok(years)
}
