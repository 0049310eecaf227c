use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Everything that can go wrong talking to the backend or setting up the terminal
#[derive(Error, Debug)]
pub enum AppError {
    /// Backend answered with a non-success status
    #[error("HTTP error! status: {status}{}", parenthesized(.message))]
    Http { status: u16, message: Option<String> },

    /// Well-formed payload carrying an `error` field
    #[error("Backend reported an error: {message}")]
    Api { message: String },

    /// Connection refused, reset, DNS failure, ...
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Body was not the JSON shape we expect
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid command-line configuration
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn parenthesized(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default()
}

impl AppError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_mentions_status_and_body_message() {
        let err = AppError::Http {
            status: 503,
            message: Some("No data yet".into()),
        };
        assert_eq!(err.to_string(), "HTTP error! status: 503 (No data yet)");

        let bare = AppError::Http {
            status: 500,
            message: None,
        };
        assert_eq!(bare.to_string(), "HTTP error! status: 500");
    }

    #[test]
    fn api_error_carries_message() {
        assert_eq!(
            AppError::api("Not enough data to plot.").to_string(),
            "Backend reported an error: Not enough data to plot."
        );
    }
}
