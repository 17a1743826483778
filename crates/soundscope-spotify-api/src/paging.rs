use serde::Deserialize;
use serde::Serialize;

/// https://developer.spotify.com/documentation/web-api/concepts/api-calls#pagination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
}
