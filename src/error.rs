use std::path::PathBuf;

use soundscope_spotify_api::error::ApiError;
use thiserror::Error;

/// Bad or missing configuration; fatal at startup.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Missing env var: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value {value:?} for {name}: {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("Failed to read secrets file {}: {source}", .path.display())]
    SecretsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Secrets file {} is not a JSON object of strings: {source}", .path.display())]
    SecretsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] ApiError),
}

/// Anything that keeps a session from holding a usable token.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not connected to Spotify")]
    NotAuthenticated,
    #[error("Your Spotify session has expired, please reconnect")]
    Expired,
    #[error("Authorization response did not match this session, please try again")]
    StateMismatch,
    #[error("Spotify authorization was denied: {0}")]
    Denied(String),
    #[error("Spotify did not return an authorization code")]
    MissingCode,
    #[error("Authentication failed: {0}")]
    Exchange(#[source] ApiError),
    #[error("Could not refresh your Spotify session: {0}")]
    Refresh(#[source] ApiError),
    #[error("Could not load your Spotify profile: {0}")]
    Profile(#[source] ApiError),
}

impl AuthError {
    /// The API error behind this failure, if one came back from Spotify.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            AuthError::Exchange(e) | AuthError::Refresh(e) | AuthError::Profile(e) => Some(e),
            _ => None,
        }
    }
}
