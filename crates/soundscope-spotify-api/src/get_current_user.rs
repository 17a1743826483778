use crate::client::SpotifyClient;
use crate::error::ApiError;
use crate::user::CurrentUser;

/// https://developer.spotify.com/documentation/web-api/reference/get-current-users-profile
pub async fn get_current_user(client: &SpotifyClient) -> Result<CurrentUser, ApiError> {
    client.get("me", &[]).await
}
