// API client module: a small blocking HTTP client for the Toggl v8 REST
// API. Every call goes through `execute`, which authenticates with the
// API token and keeps consecutive requests at least `MIN_INTERVAL` apart.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "https://api.track.toggl.com/api/v8";

/// Password sent alongside the token for HTTP basic auth.
pub const TOKEN_PASSWORD: &str = "api_token";

/// Floor interval between two requests of the same client (1/60 s).
pub const MIN_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Date/time layout handed to the entries endpoint, before the timezone suffix.
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl FromStr for HttpMethod {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(ClientError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// Fixed-rate limiter: only guarantees a minimum spacing between calls.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        RateLimiter {
            min_interval,
            last_request: None,
        }
    }

    /// Block for whatever is left of the interval, then stamp the attempt.
    pub fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                trace!(?remaining, "throttling request");
                thread::sleep(remaining);
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// One time entry as returned by `GET /time_entries`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TimeEntry {
    #[serde(rename = "pid", default)]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub description: String,
    /// Seconds; negative while the entry is still running.
    pub duration: i64,
    #[serde(default)]
    pub billable: bool,
    pub start: String,
}

impl TimeEntry {
    /// Tracked hours, with running entries counted as zero.
    pub fn hours(&self) -> f64 {
        self.duration.max(0) as f64 / 60.0 / 60.0
    }

    /// Day of month taken from the date part of `start`.
    pub fn day_of_month(&self) -> Result<u32, ClientError> {
        self.start
            .split('T')
            .next()
            .and_then(|date| date.rsplit('-').next())
            .and_then(|day| day.parse().ok())
            .ok_or_else(|| ClientError::InvalidStartDate(self.start.clone()))
    }
}

/// Normalized row of an entry table.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRow {
    pub project: String,
    pub entry: String,
    pub hours: f64,
    pub billable: bool,
    pub date: u32,
}

impl EntryRow {
    pub fn from_entry(entry: &TimeEntry, project: String) -> Result<Self, ClientError> {
        Ok(EntryRow {
            project,
            entry: entry.description.clone(),
            hours: entry.hours(),
            billable: entry.billable,
            date: entry.day_of_month()?,
        })
    }
}

#[derive(Deserialize, Debug)]
struct ProjectResponse {
    data: Option<ProjectData>,
}

#[derive(Deserialize, Debug)]
struct ProjectData {
    name: Option<String>,
}

/// Toggl client holding a reqwest blocking client, the API token, the
/// timezone suffix for date queries and the project name cache.
pub struct TogglClient {
    client: Client,
    base_url: String,
    api_token: String,
    timezone: String,
    limiter: RateLimiter,
    project_names: HashMap<u64, String>,
}

impl TogglClient {
    pub fn new(api_token: &str, timezone: &str) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, api_token, timezone)
    }

    pub fn with_base_url(base_url: &str, api_token: &str, timezone: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(TogglClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            timezone: timezone.to_string(),
            limiter: RateLimiter::new(MIN_INTERVAL),
            project_names: HashMap::new(),
        })
    }

    /// Build a client from the loaded configuration and a resolved token.
    pub fn from_config(config: &Config, api_token: &str) -> Result<Self> {
        Self::with_base_url(&config.base_url, api_token, &config.timezone)
    }

    /// `<base>/<section>[?query][/<resource_id>]`, parameters encoded in
    /// the order given.
    pub fn build_url(
        &self,
        section: &str,
        params: &[(&str, &str)],
        resource_id: Option<&str>,
    ) -> String {
        let mut url = format!("{}/{}", self.base_url, section);
        if !params.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            url.push('?');
            url.push_str(&query);
        }
        if let Some(id) = resource_id {
            url.push('/');
            url.push_str(id);
        }
        url
    }

    /// Perform one authenticated call. Non-success statuses are errors.
    pub fn execute(&mut self, url: &str, method: HttpMethod) -> Result<Response> {
        self.limiter.wait();
        debug!(%method, url, "toggl request");

        let request = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };
        request
            .basic_auth(&self.api_token, Some(TOKEN_PASSWORD))
            .send()
            .with_context(|| format!("{method} {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{method} {url} returned non-success status"))
    }

    /// Entries between two ISO-8601 date/times; the configured timezone
    /// suffix is appended to both. `None` when the service answers `null`.
    pub fn fetch_time_entries(
        &mut self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Option<Vec<TimeEntry>>> {
        let start = format!("{}{}", start_date, self.timezone);
        let end = format!("{}{}", end_date, self.timezone);
        let url = self.build_url(
            "time_entries",
            &[("start_date", start.as_str()), ("end_date", end.as_str())],
            None,
        );
        self.execute(&url, HttpMethod::Get)?
            .json()
            .context("Parsing time entries json")
    }

    /// Name of a project. Not cached; see `fetch_entry_table`.
    pub fn resolve_project_name(&mut self, project_id: u64) -> Result<String> {
        self.lookup_project_name(project_id)?
            .ok_or_else(|| ClientError::MissingProjectName(project_id).into())
    }

    fn lookup_project_name(&mut self, project_id: u64) -> Result<Option<String>> {
        let url = self.build_url("projects", &[], Some(&project_id.to_string()));
        let body: ProjectResponse = self
            .execute(&url, HttpMethod::Get)?
            .json()
            .context("Parsing project json")?;
        Ok(body.data.and_then(|d| d.name))
    }

    fn cached_project_name(&mut self, project_id: Option<u64>) -> Result<String> {
        let Some(id) = project_id else {
            return Ok(String::new());
        };
        if let Some(name) = self.project_names.get(&id) {
            trace!(id, "project name cache hit");
            return Ok(name.clone());
        }
        let name = self.lookup_project_name(id)?.unwrap_or_default();
        self.project_names.insert(id, name.clone());
        Ok(name)
    }

    /// One `EntryRow` per fetched entry, in response order.
    pub fn fetch_entry_table(
        &mut self,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
    ) -> Result<Vec<EntryRow>> {
        let entries = self.fetch_range(start_date, end_date)?;
        let mut rows = Vec::with_capacity(entries.len());
        for entry in &entries {
            let project = self.cached_project_name(entry.project_id)?;
            rows.push(EntryRow::from_entry(entry, project)?);
        }
        debug!(rows = rows.len(), "entry table built");
        Ok(rows)
    }

    /// Sum of tracked hours in the range, running entries excluded.
    pub fn total_hours(&mut self, start_date: NaiveDateTime, end_date: NaiveDateTime) -> Result<f64> {
        let entries = self.fetch_range(start_date, end_date)?;
        Ok(entries.iter().map(TimeEntry::hours).sum())
    }

    fn fetch_range(&mut self, start_date: NaiveDateTime, end_date: NaiveDateTime) -> Result<Vec<TimeEntry>> {
        let start = start_date.format(ISO_FORMAT).to_string();
        let end = end_date.format(ISO_FORMAT).to_string();
        Ok(self.fetch_time_entries(&start, &end)?.unwrap_or_default())
    }
}
