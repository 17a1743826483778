use serde::Serialize;
use soundscope_spotify_api::track::Track;

pub const UNKNOWN_ARTIST: &str = "Unknown artist";

/// One row of the report, projected from a Web API track object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRecord {
    pub name: String,
    pub artist: String,
    /// `raw / 100`, in `[0, 1]` for API values.
    pub popularity: f64,
    pub duration_minutes: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit: Option<bool>,
}

impl TrackRecord {
    pub fn from_track(track: &Track, include_explicit: bool) -> Self {
        Self {
            name: track.name.clone(),
            artist: track.primary_artist().unwrap_or(UNKNOWN_ARTIST).to_string(),
            popularity: normalize_popularity(track.popularity),
            duration_minutes: duration_minutes(track.duration_ms),
            explicit: include_explicit.then_some(track.explicit),
        }
    }
}

/// Maps the API's 0-100 score onto `[0, 1]`.
///
/// One-way: applying it to an already normalized value divides again.
pub fn normalize_popularity(raw: i64) -> f64 {
    raw as f64 / 100.0
}

/// Milliseconds to minutes, rounded to two decimals.
pub fn duration_minutes(duration_ms: i64) -> f64 {
    (duration_ms as f64 / 60_000.0 * 100.0).round() / 100.0
}
