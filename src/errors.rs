use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("API returned status {status} for {endpoint}")]
    ApiStatus { endpoint: String, status: u16 },

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Malformed booking record: {0}")]
    MalformedRecord(String),
}

impl AppError {
    /// Configuration problems stop the process, even between scheduled ticks.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

/// Walks an `anyhow` chain looking for a fatal `AppError`.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<AppError>())
        .any(AppError::is_fatal)
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn config_errors_are_fatal_through_context() {
        let err: anyhow::Result<()> = Err(AppError::Config("missing api key".into()))
            .context("Failed to build client");
        assert!(is_fatal(&err.unwrap_err()));
    }

    #[test]
    fn api_and_io_errors_are_recoverable() {
        let api = anyhow::Error::from(AppError::ApiStatus {
            endpoint: "/bookings".into(),
            status: 503,
        });
        assert!(!is_fatal(&api));

        let io = anyhow::Error::from(AppError::Io(std::io::Error::other("disk full")));
        assert!(!is_fatal(&io));

        assert!(!is_fatal(&anyhow::anyhow!("plain failure")));
    }
}
