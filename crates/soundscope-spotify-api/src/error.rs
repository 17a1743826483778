use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Spotify returned HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("request to Spotify timed out")]
    Timeout,
    #[error("request to Spotify failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("failed to deserialize Spotify response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
    #[error("token response has out-of-range expires_in: {0}")]
    InvalidExpiry(u64),
    #[error("no refresh token available")]
    MissingRefreshToken,
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(e)
        }
    }
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        ApiError::Status {
            status,
            message: error_message(body),
        }
    }
}

/// Web API errors look like `{"error": {"status": 401, "message": "..."}}`,
/// the accounts service uses `{"error": "invalid_grant", "error_description": "..."}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Api { error: ApiErrorObject },
    Accounts {
        error: String,
        error_description: Option<String>,
    },
}

#[derive(Deserialize)]
struct ApiErrorObject {
    message: String,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Api { error }) => error.message,
        Ok(ErrorBody::Accounts {
            error,
            error_description,
        }) => error_description.unwrap_or(error),
        Err(_) if body.trim().is_empty() => "<empty body>".to_string(),
        Err(_) => body.trim().chars().take(200).collect(),
    }
}
