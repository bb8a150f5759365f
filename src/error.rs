use serde::{Deserialize, Serialize};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The broad categories of failure that a command can report to the user.
///
/// Internally everything is an `anyhow::Error` with context attached as it bubbles up. At the
/// public edge of a command, the error is wrapped with one of these so that the CLI and the MCP
/// server report the same headline for the same kind of problem.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The home directory or `config.json` is missing or invalid.
    Config,
    /// The spreadsheet store could not be reached or we could not authorize against it. This is
    /// fatal to the session.
    Connection,
    /// The user asked for something that cannot be done, e.g. an unknown category.
    Request,
    /// The MCP service failed to start or stopped abnormally.
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);

impl ErrorType {
    fn headline(&self) -> &'static str {
        match self {
            ErrorType::Config => "The stewardship configuration could not be used",
            ErrorType::Connection => {
                "Unable to reach or authorize against the spreadsheet store; nothing was rendered"
            }
            ErrorType::Request => "The request could not be completed",
            ErrorType::Service => "The MCP service encountered an error",
        }
    }
}

/// Wraps an internal error with the headline of an `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| e.into().context(error_type.headline()))
    }
}
