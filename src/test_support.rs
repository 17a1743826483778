//! In-process stand-in for the Spotify accounts service and Web API.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::Form;
use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use soundscope_report::report::ReportOptions;
use soundscope_spotify_api::credentials::ClientCredentials;
use soundscope_spotify_api::endpoints::Endpoints;

use crate::config::Config;
use crate::config::FULL_SCOPES;
use crate::config::SecretsSource;
use crate::config::TokenExpiry;
use crate::config::Variant;

pub const GOOD_CODE: &str = "good-code";
pub const ACCESS_TOKEN: &str = "access-1";
pub const REFRESH_TOKEN: &str = "refresh-1";
pub const REFRESHED_ACCESS_TOKEN: &str = "access-refreshed";

#[derive(Default)]
pub struct MockState {
    valid_tokens: Mutex<HashSet<String>>,
    tracks: Mutex<Vec<Value>>,
    fail_top_tracks: AtomicBool,
    token_requests: AtomicUsize,
    top_track_requests: AtomicUsize,
    top_track_queries: Mutex<Vec<HashMap<String, String>>>,
}

pub struct MockSpotify {
    pub endpoints: Endpoints,
    state: Arc<MockState>,
}

impl MockSpotify {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api/token", post(token))
            .route("/v1/me", get(me))
            .route("/v1/me/top/tracks", get(top_tracks))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let base = format!("http://{addr}");
        Self {
            endpoints: Endpoints::new(&base, format!("{base}/v1")),
            state,
        }
    }

    pub fn allow_token(&self, token: &str) {
        self.state.allow_token(token);
    }

    pub fn set_tracks(&self, tracks: Vec<Value>) {
        *self.state.tracks.lock().unwrap() = tracks;
    }

    pub fn fail_top_tracks(&self, fail: bool) {
        self.state.fail_top_tracks.store(fail, Ordering::SeqCst);
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    pub fn top_track_requests(&self) -> usize {
        self.state.top_track_requests.load(Ordering::SeqCst)
    }

    /// Query parameter `key` of the most recent top-tracks request.
    pub fn last_top_tracks_param(&self, key: &str) -> Option<String> {
        self.state
            .top_track_queries
            .lock()
            .unwrap()
            .last()
            .and_then(|query| query.get(key).cloned())
    }
}

impl MockState {
    fn allow_token(&self, token: &str) {
        self.valid_tokens.lock().unwrap().insert(token.to_string());
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| self.valid_tokens.lock().unwrap().contains(token))
    }
}

pub fn track_json(name: &str, artist: &str, popularity: i64, duration_ms: i64) -> Value {
    json!({
        "album": {"album_type": "album", "id": "album", "images": [], "name": "Album", "release_date": "2024-01-01"},
        "artists": [{"id": "artist", "name": artist, "uri": "spotify:artist:artist"}],
        "duration_ms": duration_ms,
        "explicit": false,
        "external_urls": {"spotify": "https://open.spotify.com/track/x"},
        "id": name,
        "name": name,
        "popularity": popularity,
        "preview_url": null,
        "track_number": 1,
        "type": "track",
        "uri": format!("spotify:track:{name}"),
        "is_local": false
    })
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"status": 401, "message": "Invalid access token"}})),
    )
        .into_response()
}

async fn token(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    let grant = form.get("grant_type").map(String::as_str);
    let code = form.get("code").map(String::as_str);
    match (grant, code) {
        (Some("authorization_code"), Some(GOOD_CODE)) => {
            state.allow_token(ACCESS_TOKEN);
            Json(json!({
                "access_token": ACCESS_TOKEN,
                "token_type": "Bearer",
                "scope": FULL_SCOPES,
                "expires_in": 3600,
                "refresh_token": REFRESH_TOKEN,
            }))
            .into_response()
        }
        (Some("refresh_token"), _) => {
            state.allow_token(REFRESHED_ACCESS_TOKEN);
            Json(json!({
                "access_token": REFRESHED_ACCESS_TOKEN,
                "token_type": "Bearer",
                "scope": FULL_SCOPES,
                "expires_in": 3600,
            }))
            .into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Invalid authorization code"})),
        )
            .into_response(),
    }
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "id": "user-1",
        "display_name": "Test User",
        "email": "test@example.com",
        "country": "SE",
        "product": "premium",
    }))
    .into_response()
}

async fn top_tracks(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.top_track_requests.fetch_add(1, Ordering::SeqCst);
    state.top_track_queries.lock().unwrap().push(query.clone());
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if state.fail_top_tracks.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"status": 500, "message": "Server error"}})),
        )
            .into_response();
    }
    let limit = query
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(20);
    let tracks = state.tracks.lock().unwrap();
    let items: Vec<Value> = tracks.iter().take(limit).cloned().collect();
    Json(json!({
        "items": items,
        "limit": limit,
        "offset": 0,
        "total": tracks.len(),
        "next": null,
        "previous": null,
    }))
    .into_response()
}

pub fn test_config(mock: &MockSpotify, token_cache: Option<PathBuf>, token_expiry: TokenExpiry) -> Config {
    Config {
        variant: Variant::Local,
        secrets_source: SecretsSource::Env,
        credentials: ClientCredentials {
            client_id: "client".to_string(),
            client_secret: Some("secret".to_string()),
        },
        redirect_uri: "http://localhost:8502".to_string(),
        redirect_url: "http://localhost:8502".parse().unwrap(),
        bind: "127.0.0.1:0".parse().unwrap(),
        scopes: FULL_SCOPES.to_string(),
        report: ReportOptions::default(),
        token_cache,
        token_expiry,
        show_dialog: true,
        request_timeout: Duration::from_secs(5),
        open_browser: false,
        endpoints: mock.endpoints.clone(),
    }
}
