use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::client::SpotifyClient;
use crate::error::ApiError;
use crate::paging::Page;
use crate::track::Track;

/// The API accepts 1..=50 items per page.
pub const MAX_LIMIT: u32 = 50;

/// Listening window the ranking is computed over.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    /// About four weeks.
    ShortTerm,
    /// About six months.
    #[default]
    MediumTerm,
    /// About a year.
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "short_term" => Ok(TimeRange::ShortTerm),
            "medium_term" => Ok(TimeRange::MediumTerm),
            "long_term" => Ok(TimeRange::LongTerm),
            other => Err(format!(
                "unknown time range {other:?}, expected short_term, medium_term or long_term"
            )),
        }
    }
}

/// https://developer.spotify.com/documentation/web-api/reference/get-users-top-artists-and-tracks
///
/// Returns a single page of at most `limit` tracks, most listened first.
pub async fn get_top_tracks(
    client: &SpotifyClient,
    limit: u32,
    time_range: TimeRange,
) -> Result<Page<Track>, ApiError> {
    let limit = limit.clamp(1, MAX_LIMIT);
    client
        .get(
            "me/top/tracks",
            &[
                ("limit", limit.to_string()),
                ("time_range", time_range.to_string()),
            ],
        )
        .await
}
