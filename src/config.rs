// Settings read from the environment (and `.env`, loaded by `main`).

use anyhow::Result;
use std::env;

use crate::api::DEFAULT_BASE_URL;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `TOGGL_API_TOKEN`; when absent the token file or a prompt is used.
    pub api_token: Option<String>,
    /// Suffix appended to every date query, e.g. `+02:00`.
    pub timezone: String,
    pub base_url: String,
    /// Hours to reach this month; without it no expected pace is drawn.
    pub monthly_target: Option<f64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup, so tests don't touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let monthly_target = match non_empty("TOGGL_MONTHLY_TARGET") {
            Some(raw) => Some(parse_target(&raw)?),
            None => None,
        };

        Ok(Config {
            api_token: non_empty("TOGGL_API_TOKEN"),
            timezone: non_empty("TOGGL_TIMEZONE").unwrap_or_else(|| "+00:00".into()),
            base_url: non_empty("TOGGL_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            monthly_target,
        })
    }
}

fn parse_target(raw: &str) -> Result<f64, ClientError> {
    match raw.trim().parse::<f64>() {
        Ok(hours) if hours.is_finite() && hours >= 0.0 => Ok(hours),
        _ => Err(ClientError::InvalidTarget(raw.to_string())),
    }
}
