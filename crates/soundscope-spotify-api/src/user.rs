use serde::Deserialize;
use serde::Serialize;

use crate::track::ExternalUrls;

/// https://developer.spotify.com/documentation/web-api/reference/get-current-users-profile
///
/// `email`, `country` and `product` are only present with the
/// `user-read-email` / `user-read-private` scopes.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub product: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl CurrentUser {
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.id)
    }
}
