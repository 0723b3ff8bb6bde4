use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single backend call.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("backend returned {status}{}", detail_suffix(.message))]
    Server {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Transport(String),
}

fn detail_suffix(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {}", message),
        None => String::new(),
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_connect() {
            GatewayError::Network(err.to_string())
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// What the user is told when a send fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    /// Message supplied by the backend's error body, shown verbatim
    Server(String),
    Timeout,
    Network,
    Unknown,
}

impl SendFailure {
    pub fn classify(err: &GatewayError) -> Self {
        match err {
            GatewayError::Server {
                message: Some(message),
                ..
            } if !message.is_empty() => SendFailure::Server(message.clone()),
            GatewayError::Timeout => SendFailure::Timeout,
            GatewayError::Network(_) => SendFailure::Network,
            _ => SendFailure::Unknown,
        }
    }
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendFailure::Server(message) => f.write_str(message),
            SendFailure::Timeout => {
                f.write_str("Request timeout. The server might be busy, please try again.")
            }
            SendFailure::Network => {
                f.write_str("Network error. Please check your connection and try again.")
            }
            SendFailure::Unknown => f.write_str("Sorry, something went wrong. Please try again."),
        }
    }
}

impl From<&GatewayError> for SendFailure {
    fn from(err: &GatewayError) -> Self {
        SendFailure::classify(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_shown_verbatim() {
        let err = GatewayError::Server {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: Some("Model is still loading".into()),
        };
        assert_eq!(SendFailure::classify(&err).to_string(), "Model is still loading");
    }

    #[test]
    fn test_server_without_message_is_unknown() {
        let err = GatewayError::Server {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: None,
        };
        assert_eq!(SendFailure::classify(&err), SendFailure::Unknown);

        let empty = GatewayError::Server {
            status: StatusCode::BAD_REQUEST,
            message: Some(String::new()),
        };
        assert_eq!(SendFailure::classify(&empty), SendFailure::Unknown);
    }

    #[test]
    fn test_transport_kinds() {
        assert!(SendFailure::classify(&GatewayError::Timeout)
            .to_string()
            .starts_with("Request timeout"));
        assert!(SendFailure::classify(&GatewayError::Network("refused".into()))
            .to_string()
            .starts_with("Network error"));
        assert_eq!(
            SendFailure::classify(&GatewayError::Decode("eof".into())).to_string(),
            "Sorry, something went wrong. Please try again."
        );
    }

    #[test]
    fn test_server_error_display() {
        let err = GatewayError::Server {
            status: StatusCode::BAD_GATEWAY,
            message: Some("upstream down".into()),
        };
        assert_eq!(err.to_string(), "backend returned 502 Bad Gateway: upstream down");
    }
}
