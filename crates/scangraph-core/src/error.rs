use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Graph database error: {0}")]
    Remote(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid scan: {0}")]
    InvalidScan(String),
}

impl Error {
    /// True when the underlying connection can no longer be trusted and
    /// should be re-established before the next statement.
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Connection(_) | Error::Protocol(_) | Error::Timeout(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_faults() {
        let errors = [
            Error::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe")),
            Error::Connection("reset".to_string()),
            Error::Protocol("bad prefix".to_string()),
            Error::Timeout(Duration::from_secs(1)),
            Error::Remote("syntax".to_string()),
            Error::InvalidScan("empty id".to_string()),
        ];
        for err in &errors {
            let expected = match err {
                Error::Io(_) | Error::Connection(_) | Error::Protocol(_) | Error::Timeout(_) => true,
                Error::Config(_) | Error::Json(_) | Error::Remote(_) | Error::InvalidScan(_) => false,
            };
            assert_eq!(err.is_connection_fault(), expected, "{}", err);
        }
    }
}
