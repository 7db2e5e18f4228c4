// Typed error conditions callers may want to match on.
// Transport failures stay as `anyhow` errors with context.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ClientError {
    /// Only GET and POST are supported by the client.
    #[error("Undefined HTTP method \"{0}\"")]
    UnsupportedMethod(String),

    #[error("Project {0} response has no data.name")]
    MissingProjectName(u64),

    #[error("Cannot read day of month from start \"{0}\"")]
    InvalidStartDate(String),

    #[error("Invalid monthly target: {0}")]
    InvalidTarget(String),
}
