use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::bearer_token::BearerToken;
use crate::error::ApiError;

/// Tokens are treated as expired this long before the provider says so.
pub const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Access/refresh token pair and expiry issued by the accounts service.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn bearer(&self) -> BearerToken {
        BearerToken(self.access_token.clone())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::seconds(EXPIRY_LEEWAY_SECS) >= self.expires_at
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub(crate) fn from_response(
        response: TokenResponse,
        now: DateTime<Utc>,
        previous_refresh_token: Option<&str>,
    ) -> Result<Self, ApiError> {
        let expires_at = i64::try_from(response.expires_in)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or(ApiError::InvalidExpiry(response.expires_in))?;
        // A refresh response may omit the refresh token, in which case the old one stays valid.
        let refresh_token = response
            .refresh_token
            .or_else(|| previous_refresh_token.map(str::to_string));
        Ok(Self {
            access_token: response.access_token,
            refresh_token,
            scope: response.scope.unwrap_or_default(),
            expires_at,
        })
    }
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &format_args!("len={}", self.access_token.len()))
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub scope: Option<String>,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
}
