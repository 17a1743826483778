use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use soundscope_report::report::ReportOptions;
use soundscope_spotify_api::credentials::ClientCredentials;
use soundscope_spotify_api::endpoints::DEFAULT_ACCOUNTS_BASE;
use soundscope_spotify_api::endpoints::DEFAULT_API_BASE;
use soundscope_spotify_api::endpoints::Endpoints;
use soundscope_spotify_api::fetch::DEFAULT_TIMEOUT;
use soundscope_spotify_api::get_top_tracks::MAX_LIMIT;
use soundscope_spotify_api::get_top_tracks::TimeRange;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::error::SetupError;

pub const VARIANT_VAR: &str = "SOUNDSCOPE_VARIANT";
pub const FULL_SCOPES: &str = "user-library-read user-top-read user-read-private user-read-email";
pub const TOP_READ_SCOPE: &str = "user-top-read";
pub const LOCAL_REDIRECT_URI: &str = "http://localhost:8502";
pub const DEFAULT_PORT: u16 = 8502;
pub const DEFAULT_CACHE_PATH: &str = ".spotify_cache";
pub const DEFAULT_SECRETS_FILE: &str = "/run/secrets/soundscope.json";

/// Deployment flavour; picks defaults for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Runs on the user's machine, credentials from `.env`, token cached on disk.
    Local,
    /// Publicly reachable, credentials from a mounted secrets file, no token cache.
    Hosted,
    /// Local with a larger batch, the explicit flag and debug logging.
    Debug,
}

impl Variant {
    pub fn log_level(&self) -> LevelFilter {
        match self {
            Variant::Debug => LevelFilter::DEBUG,
            _ => LevelFilter::INFO,
        }
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Variant::Local),
            "hosted" | "cloud" => Ok(Variant::Hosted),
            "debug" => Ok(Variant::Debug),
            other => Err(format!("unknown variant {other:?}, expected local, hosted or debug")),
        }
    }
}

/// What happens when the stored access token has expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenExpiry {
    /// Use the refresh token, if any, on the next render pass.
    Refresh,
    /// Send the user through the full login again.
    Relogin,
}

impl FromStr for TokenExpiry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "refresh" => Ok(TokenExpiry::Refresh),
            "relogin" => Ok(TokenExpiry::Relogin),
            other => Err(format!("unknown expiry policy {other:?}, expected refresh or relogin")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretsSource {
    Env,
    File(PathBuf),
}

/// Immutable settings, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub variant: Variant,
    pub secrets_source: SecretsSource,
    pub credentials: ClientCredentials,
    /// Sent to Spotify byte for byte; must match the URI registered for the app.
    pub redirect_uri: String,
    /// Parsed form of `redirect_uri`, for routing and cookie decisions only.
    pub redirect_url: Url,
    pub bind: SocketAddr,
    pub scopes: String,
    pub report: ReportOptions,
    pub token_cache: Option<PathBuf>,
    pub token_expiry: TokenExpiry,
    pub show_dialog: bool,
    pub request_timeout: Duration,
    pub open_browser: bool,
    pub endpoints: Endpoints,
}

impl Config {
    pub fn from_env() -> Result<Self, SetupError> {
        Self::load(|name| std::env::var(name).ok())
    }

    /// Build the configuration from `env`, reading the secrets file when the variant asks for one.
    pub fn load(env: impl Fn(&str) -> Option<String>) -> Result<Self, SetupError> {
        let variant = match env(VARIANT_VAR) {
            Some(value) => parse_var(VARIANT_VAR, &value)?,
            None => Variant::Local,
        };
        let hosted = variant == Variant::Hosted;

        let secrets_source = match env("SOUNDSCOPE_SECRETS_FILE") {
            Some(path) if !path.is_empty() => SecretsSource::File(PathBuf::from(path)),
            Some(_) => SecretsSource::Env,
            None if hosted => SecretsSource::File(PathBuf::from(DEFAULT_SECRETS_FILE)),
            None => SecretsSource::Env,
        };
        let secrets = match &secrets_source {
            SecretsSource::Env => HashMap::new(),
            SecretsSource::File(path) => read_secrets(path)?,
        };
        let secret = |names: &[&str]| {
            names
                .iter()
                .find_map(|&name| secrets.get(name).cloned().or_else(|| env(name)))
                .filter(|v| !v.is_empty())
        };

        let client_id = secret(&["SPOTIFY_CLIENT_ID", "CLIENT_ID"])
            .ok_or(SetupError::MissingVar("SPOTIFY_CLIENT_ID"))?;
        let client_secret = secret(&["SPOTIFY_CLIENT_SECRET", "CLIENT_SECRET"]);

        let redirect_uri = match secret(&["SPOTIFY_REDIRECT_URI", "REDIRECT_URI"]) {
            Some(value) => value.trim().to_string(),
            None if hosted => return Err(SetupError::MissingVar("SPOTIFY_REDIRECT_URI")),
            None => LOCAL_REDIRECT_URI.to_string(),
        };
        let redirect_url: Url = parse_var("SPOTIFY_REDIRECT_URI", &redirect_uri)?;
        if !matches!(redirect_url.scheme(), "http" | "https") {
            return Err(SetupError::InvalidVar {
                name: "SPOTIFY_REDIRECT_URI",
                value: redirect_uri,
                reason: "must be an http or https URL".to_string(),
            });
        }

        // Hosted deployments sit behind a TLS-terminating proxy, so the public port says nothing.
        let bind = optional(&env, "SOUNDSCOPE_BIND")?.unwrap_or_else(|| {
            if hosted {
                SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
            } else {
                let port = redirect_url.port_or_known_default().unwrap_or(DEFAULT_PORT);
                SocketAddr::from(([127, 0, 0, 1], port))
            }
        });

        let scopes = env("SPOTIFY_SCOPES")
            .unwrap_or_else(|| (if hosted { TOP_READ_SCOPE } else { FULL_SCOPES }).to_string());

        let limit = optional(&env, "SOUNDSCOPE_TRACK_LIMIT")?.unwrap_or(match variant {
            Variant::Debug => MAX_LIMIT,
            _ => 10,
        });
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(SetupError::InvalidVar {
                name: "SOUNDSCOPE_TRACK_LIMIT",
                value: limit.to_string(),
                reason: format!("must be between 1 and {MAX_LIMIT}"),
            });
        }
        let report = ReportOptions {
            limit,
            time_range: optional::<TimeRange>(&env, "SPOTIFY_TIME_RANGE")?.unwrap_or_default(),
            include_explicit: optional_bool(&env, "SOUNDSCOPE_INCLUDE_EXPLICIT")?
                .unwrap_or(variant == Variant::Debug),
        };

        let token_cache = match env("SOUNDSCOPE_TOKEN_CACHE") {
            Some(value) if is_off(&value) => None,
            Some(value) => Some(PathBuf::from(value)),
            None if hosted => None,
            None => Some(PathBuf::from(DEFAULT_CACHE_PATH)),
        };
        let token_expiry = optional(&env, "SOUNDSCOPE_TOKEN_EXPIRY")?.unwrap_or(if hosted {
            TokenExpiry::Relogin
        } else {
            TokenExpiry::Refresh
        });

        let request_timeout = optional::<u64>(&env, "SOUNDSCOPE_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        if request_timeout.is_zero() {
            return Err(SetupError::InvalidVar {
                name: "SOUNDSCOPE_REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        let endpoints = Endpoints::new(
            env("SPOTIFY_ACCOUNTS_BASE").unwrap_or_else(|| DEFAULT_ACCOUNTS_BASE.to_string()),
            env("SPOTIFY_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        );

        Ok(Self {
            variant,
            secrets_source,
            credentials: ClientCredentials {
                client_id,
                client_secret,
            },
            redirect_uri,
            redirect_url,
            bind,
            scopes,
            report,
            token_cache,
            token_expiry,
            show_dialog: optional_bool(&env, "SPOTIFY_SHOW_DIALOG")?.unwrap_or(true),
            request_timeout,
            open_browser: optional_bool(&env, "SOUNDSCOPE_OPEN_BROWSER")?.unwrap_or(!hosted),
            endpoints,
        })
    }

    /// Path Spotify redirects back to after the consent screen.
    pub fn redirect_path(&self) -> &str {
        self.redirect_url.path()
    }

    /// Where users should open the dashboard; the cookie must be set on the redirect origin.
    pub fn public_url(&self) -> String {
        format!("{}/", self.redirect_url.origin().ascii_serialization())
    }

    pub fn secure_cookies(&self) -> bool {
        self.redirect_url.scheme() == "https"
    }
}

fn read_secrets(path: &Path) -> Result<HashMap<String, String>, SetupError> {
    let bytes = std::fs::read(path).map_err(|source| SetupError::SecretsRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| SetupError::SecretsFormat {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_var<T>(name: &'static str, value: &str) -> Result<T, SetupError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| SetupError::InvalidVar {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn optional<T>(env: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<T>, SetupError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env(name).map(|value| parse_var(name, &value)).transpose()
}

fn optional_bool(
    env: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<bool>, SetupError> {
    let Some(value) = env(name) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(SetupError::InvalidVar {
            name,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

fn is_off(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "off" | "none" | "false" | "0"
    )
}
