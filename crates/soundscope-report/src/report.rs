use soundscope_spotify_api::client::SpotifyClient;
use soundscope_spotify_api::error::ApiError;
use soundscope_spotify_api::get_top_tracks::TimeRange;
use soundscope_spotify_api::get_top_tracks::get_top_tracks;
use soundscope_spotify_api::track::Track;
use thiserror::Error;
use tracing::debug;
use tracing::info;

use crate::track_record::TrackRecord;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("No tracks found")]
    Empty,
    #[error("Failed to fetch top tracks: {0}")]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub limit: u32,
    pub time_range: TimeRange,
    pub include_explicit: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            time_range: TimeRange::default(),
            include_explicit: false,
        }
    }
}

/// Top tracks in the order the API ranked them, most listened first.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackReport {
    records: Vec<TrackRecord>,
    include_explicit: bool,
}

impl TrackReport {
    /// Fails with [`ReportError::Empty`] when there is nothing to show.
    pub fn from_tracks(tracks: &[Track], include_explicit: bool) -> Result<Self, ReportError> {
        if tracks.is_empty() {
            return Err(ReportError::Empty);
        }
        let records = tracks
            .iter()
            .map(|t| TrackRecord::from_track(t, include_explicit))
            .collect();
        Ok(Self {
            records,
            include_explicit,
        })
    }

    pub fn records(&self) -> &[TrackRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn includes_explicit(&self) -> bool {
        self.include_explicit
    }

    /// `"1. Name by Artist"`, one per track.
    pub fn list_lines(&self) -> Vec<String> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {} by {}", i + 1, r.name, r.artist))
            .collect()
    }

    /// Bar chart categories: track name to normalized popularity.
    pub fn popularity_series(&self) -> Vec<(&str, f64)> {
        self.records
            .iter()
            .map(|r| (r.name.as_str(), r.popularity))
            .collect()
    }

    /// Mean normalized popularity, rounded to two decimals.
    pub fn average_popularity(&self) -> f64 {
        let sum: f64 = self.records.iter().map(|r| r.popularity).sum();
        (sum / self.records.len() as f64 * 100.0).round() / 100.0
    }
}

/// Fetch one page of `options.limit` top tracks and project them.
pub async fn build_report(
    client: &SpotifyClient,
    options: ReportOptions,
) -> Result<TrackReport, ReportError> {
    debug!(
        "Requesting {} top tracks over {}",
        options.limit, options.time_range
    );
    let page = get_top_tracks(client, options.limit, options.time_range).await?;
    let report = TrackReport::from_tracks(&page.items, options.include_explicit)?;
    info!("Built report with {} tracks", report.len());
    Ok(report)
}
