use crate::bearer_token::BearerToken;
use crate::endpoints::Endpoints;
use crate::error::ApiError;
use crate::fetch::fetch;

/// Handle for authenticated Web API calls on behalf of one user.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    bearer: BearerToken,
}

impl SpotifyClient {
    pub fn new(http: reqwest::Client, endpoints: Endpoints, bearer: BearerToken) -> Self {
        Self {
            http,
            endpoints,
            bearer,
        }
    }

    pub fn bearer(&self) -> &BearerToken {
        &self.bearer
    }

    pub(crate) async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = self.endpoints.api(path);
        fetch(&self.http, &url, query, &self.bearer).await
    }
}
