use serde::Deserialize;
use serde::Serialize;

/// https://developer.spotify.com/documentation/web-api/reference/get-track
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub album: Option<Album>,
    pub artists: Vec<Artist>,
    pub duration_ms: i64,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub id: Option<String>,
    pub is_playable: Option<bool>,
    pub name: String,
    pub popularity: i64,
    pub preview_url: Option<String>,
    #[serde(default)]
    pub track_number: i64,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub is_local: bool,
}

impl Track {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub album_type: String,
    pub id: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    pub name: String,
    #[serde(default)]
    pub release_date: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub height: Option<i64>,
    pub width: Option<i64>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub uri: String,
}
