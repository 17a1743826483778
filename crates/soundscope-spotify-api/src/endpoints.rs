pub const DEFAULT_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

/// Base URLs of the accounts service and the Web API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub accounts_base: String,
    pub api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            accounts_base: DEFAULT_ACCOUNTS_BASE.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Endpoints {
    pub fn new(accounts_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            accounts_base: accounts_base.into(),
            api_base: api_base.into(),
        }
    }

    /// https://developer.spotify.com/documentation/web-api/tutorials/code-flow
    pub fn authorize(&self) -> String {
        format!("{}/authorize", self.accounts_base.trim_end_matches('/'))
    }

    pub fn token(&self) -> String {
        format!("{}/api/token", self.accounts_base.trim_end_matches('/'))
    }

    pub fn api(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
