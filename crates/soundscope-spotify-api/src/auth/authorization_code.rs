use chrono::Utc;
use tracing::debug;
use tracing::info;
use url::Url;

use crate::auth::pkce::code_challenge;
use crate::auth::pkce::generate_code_verifier;
use crate::auth::pkce::random_token;
use crate::client::SpotifyClient;
use crate::credentials::ClientCredentials;
use crate::endpoints::Endpoints;
use crate::error::ApiError;
use crate::fetch::decode;
use crate::fetch::send_with_retry;
use crate::token_record::TokenRecord;
use crate::token_record::TokenResponse;

/// An authorize URL together with the values the callback must be checked against.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
    /// Present for public clients only.
    pub code_verifier: Option<String>,
}

/// https://developer.spotify.com/documentation/web-api/tutorials/code-flow
///
/// Confidential clients authenticate to the token endpoint with HTTP Basic.
/// Public clients (no secret) use PKCE:
/// https://developer.spotify.com/documentation/web-api/tutorials/code-pkce-flow
#[derive(Debug, Clone)]
pub struct AuthorizationCodeFlow {
    http: reqwest::Client,
    credentials: ClientCredentials,
    endpoints: Endpoints,
    redirect_uri: String,
    scopes: String,
    show_dialog: bool,
}

impl AuthorizationCodeFlow {
    pub fn new(
        http: reqwest::Client,
        credentials: ClientCredentials,
        endpoints: Endpoints,
        redirect_uri: impl Into<String>,
        scopes: impl Into<String>,
    ) -> Self {
        Self {
            http,
            credentials,
            endpoints,
            redirect_uri: redirect_uri.into(),
            scopes: scopes.into(),
            show_dialog: false,
        }
    }

    /// Ask Spotify to show the consent dialog even if the user already approved the app.
    pub fn with_show_dialog(mut self, show_dialog: bool) -> Self {
        self.show_dialog = show_dialog;
        self
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn authorization_request(&self) -> Result<AuthorizationRequest, ApiError> {
        let state = random_token(32);
        let code_verifier = (!self.credentials.is_confidential()).then(generate_code_verifier);

        let mut params = vec![
            ("client_id", self.credentials.client_id.clone()),
            ("response_type", "code".to_string()),
            ("redirect_uri", self.redirect_uri.clone()),
            ("state", state.clone()),
        ];
        if !self.scopes.is_empty() {
            params.push(("scope", self.scopes.clone()));
        }
        if let Some(verifier) = &code_verifier {
            params.push(("code_challenge_method", "S256".to_string()));
            params.push(("code_challenge", code_challenge(verifier)));
        }
        if self.show_dialog {
            params.push(("show_dialog", "true".to_string()));
        }

        let url = Url::parse_with_params(&self.endpoints.authorize(), &params)?;
        Ok(AuthorizationRequest {
            url,
            state,
            code_verifier,
        })
    }

    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<TokenRecord, ApiError> {
        info!("Exchanging authorization code for tokens");
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier));
        }
        let record = self.request_token(form, None).await?;
        debug!("Scope: {}", record.scope);
        Ok(record)
    }

    pub async fn refresh(&self, token: &TokenRecord) -> Result<TokenRecord, ApiError> {
        let Some(refresh_token) = token.refresh_token.as_deref() else {
            return Err(ApiError::MissingRefreshToken);
        };
        info!("Refreshing access token");
        let form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.request_token(form, Some(refresh_token)).await
    }

    /// Handle for Web API calls with the given token.
    pub fn client(&self, token: &TokenRecord) -> SpotifyClient {
        SpotifyClient::new(self.http.clone(), self.endpoints.clone(), token.bearer())
    }

    async fn request_token<'a>(
        &'a self,
        mut form: Vec<(&'a str, &'a str)>,
        previous_refresh_token: Option<&str>,
    ) -> Result<TokenRecord, ApiError> {
        if !self.credentials.is_confidential() {
            form.push(("client_id", self.credentials.client_id.as_str()));
        }
        let url = self.endpoints.token();
        let body = send_with_retry(|| {
            let request = self.http.post(&url).form(&form);
            match &self.credentials.client_secret {
                Some(secret) => request.basic_auth(&self.credentials.client_id, Some(secret)),
                None => request,
            }
        })
        .await?;

        let response: TokenResponse = decode(body)?;
        debug!("Access Token: len={}", response.access_token.len());
        debug!("Expires in: {}s", response.expires_in);
        TokenRecord::from_response(response, Utc::now(), previous_refresh_token)
    }
}
