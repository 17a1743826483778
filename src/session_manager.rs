use chrono::Utc;
use serde::Deserialize;
use soundscope_spotify_api::auth::authorization_code::AuthorizationCodeFlow;
use soundscope_spotify_api::auth::token_cache::TokenCache;
use soundscope_spotify_api::client::SpotifyClient;
use soundscope_spotify_api::get_current_user::get_current_user;
use soundscope_spotify_api::token_record::TokenRecord;
use soundscope_spotify_api::user::CurrentUser;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::config::Config;
use crate::config::TokenExpiry;
use crate::error::AuthError;
use crate::session::PendingAuthorization;
use crate::session::Session;

/// Where to send the browser after a connect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// The user has to approve the app on Spotify's consent screen.
    Authorize(Url),
    /// A cached token was usable; the session is already authenticated.
    Dashboard,
}

/// Query parameters Spotify appends to the redirect URI.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    pub fn is_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }
}

/// Moves sessions between unauthenticated and authenticated.
pub struct SessionManager {
    flow: AuthorizationCodeFlow,
    token_cache: Option<TokenCache>,
    token_expiry: TokenExpiry,
}

impl SessionManager {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        let flow = AuthorizationCodeFlow::new(
            http,
            config.credentials.clone(),
            config.endpoints.clone(),
            config.redirect_uri.as_str(),
            config.scopes.as_str(),
        )
        .with_show_dialog(config.show_dialog);
        Self {
            flow,
            token_cache: config.token_cache.as_ref().map(TokenCache::new),
            token_expiry: config.token_expiry,
        }
    }

    pub fn is_authenticated(&self, session: &Session) -> bool {
        session.is_authenticated()
    }

    /// Start the login. Completes on the spot when the token cache holds a token Spotify still accepts.
    pub async fn begin_auth(&self, session: &mut Session) -> Result<RedirectTarget, AuthError> {
        if let Some(token) = self.usable_cached_token().await {
            match get_current_user(&self.flow.client(&token)).await {
                Ok(user) => {
                    info!("Connected as {} with cached token", user.name());
                    session.authenticate(token);
                    return Ok(RedirectTarget::Dashboard);
                }
                Err(e) => {
                    warn!("Cached token rejected: {}", e);
                    if e.is_unauthorized() {
                        self.forget_cached_token().await;
                    }
                }
            }
        }

        let request = self
            .flow
            .authorization_request()
            .map_err(AuthError::Exchange)?;
        session.begin_pending(PendingAuthorization {
            state: request.state,
            code_verifier: request.code_verifier,
        });
        debug!("Redirecting to {}", request.url);
        Ok(RedirectTarget::Authorize(request.url))
    }

    /// Finish the login when Spotify redirects back with a code.
    pub async fn complete_auth(
        &self,
        session: &mut Session,
        params: CallbackParams,
    ) -> Result<CurrentUser, AuthError> {
        // A callback that does not carry this session's nonce leaves the pending login untouched.
        let Some(pending) = session
            .pending()
            .filter(|pending| params.state.as_deref() == Some(pending.state.as_str()))
            .cloned()
        else {
            return Err(AuthError::StateMismatch);
        };
        session.take_pending();
        if let Some(error) = params.error {
            return Err(AuthError::Denied(error));
        }
        let code = params.code.ok_or(AuthError::MissingCode)?;

        let token = self
            .flow
            .exchange_code(&code, pending.code_verifier.as_deref())
            .await
            .map_err(AuthError::Exchange)?;
        let user = get_current_user(&self.flow.client(&token))
            .await
            .map_err(AuthError::Profile)?;

        info!("Authenticated as {}", user.name());
        self.persist(&token).await;
        session.authenticate(token);
        Ok(user)
    }

    /// Client for the session's token, refreshing it first if it expired and the policy allows.
    pub async fn get_client(&self, session: &mut Session) -> Result<SpotifyClient, AuthError> {
        let token = session.token().ok_or(AuthError::NotAuthenticated)?;
        if !token.is_expired(Utc::now()) {
            return Ok(self.flow.client(token));
        }

        let token = self.renew(token).await?;
        let client = self.flow.client(&token);
        self.persist(&token).await;
        session.update_token(token);
        Ok(client)
    }

    /// Forget the session and the cached token so the next connect is a full login.
    pub async fn disconnect(&self, session: &mut Session) {
        session.demote();
        self.forget_cached_token().await;
    }

    pub async fn forget_cached_token(&self) {
        if let Some(cache) = &self.token_cache {
            if let Err(e) = cache.clear().await {
                warn!("Failed to clear token cache: {:?}", e);
            }
        }
    }

    async fn renew(&self, token: &TokenRecord) -> Result<TokenRecord, AuthError> {
        match self.token_expiry {
            TokenExpiry::Refresh if token.can_refresh() => {
                self.flow.refresh(token).await.map_err(AuthError::Refresh)
            }
            _ => Err(AuthError::Expired),
        }
    }

    async fn usable_cached_token(&self) -> Option<TokenRecord> {
        let cache = self.token_cache.as_ref()?;
        let token = match cache.load().await {
            Ok(token) => token?,
            Err(e) => {
                warn!("Ignoring unreadable token cache: {:?}", e);
                return None;
            }
        };
        if !token.is_expired(Utc::now()) {
            return Some(token);
        }
        match self.renew(&token).await {
            Ok(token) => {
                self.persist(&token).await;
                Some(token)
            }
            Err(e) => {
                debug!("Cached token not usable: {}", e);
                None
            }
        }
    }

    async fn persist(&self, token: &TokenRecord) {
        if let Some(cache) = &self.token_cache {
            if let Err(e) = cache.save(token).await {
                warn!("Failed to save token cache: {:?}", e);
            }
        }
    }
}
