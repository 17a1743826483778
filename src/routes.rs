use std::sync::Arc;

use axum::Router;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CACHE_CONTROL;
use axum::http::header::LOCATION;
use axum::http::header::SET_COOKIE;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use soundscope_report::report::ReportError;
use soundscope_report::report::build_report;
use soundscope_spotify_api::error::ApiError;
use soundscope_spotify_api::fetch::http_client;
use soundscope_spotify_api::get_current_user::get_current_user;
use tracing::info;
use tracing::warn;

use crate::config::Config;
use crate::error::AuthError;
use crate::error::SetupError;
use crate::page;
use crate::session::Notice;
use crate::session::Session;
use crate::session_manager::CallbackParams;
use crate::session_manager::RedirectTarget;
use crate::session_manager::SessionManager;
use crate::session_store::SessionHandle;
use crate::session_store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub manager: Arc<SessionManager>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, SetupError> {
        let http = http_client(config.request_timeout).map_err(SetupError::HttpClient)?;
        let manager = SessionManager::new(&config, http);
        Ok(Self {
            config: Arc::new(config),
            manager: Arc::new(manager),
            sessions: SessionStore::default(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/healthz", get(healthz));
    let callback_path = state.config.redirect_path();
    if callback_path != "/" {
        router = router.route(callback_path, get(callback));
    }
    router.with_state(state)
}

/// Why a render pass of the authenticated branch ended early.
enum PassError {
    Auth(AuthError),
    Report(ReportError),
}

impl PassError {
    fn api_error(&self) -> Option<&ApiError> {
        match self {
            PassError::Auth(e) => e.api_error(),
            PassError::Report(ReportError::Api(e)) => Some(e),
            PassError::Report(ReportError::Empty) => None,
        }
    }

    fn message(&self) -> String {
        match self {
            PassError::Auth(e) => e.to_string(),
            PassError::Report(e) => format!("An error occurred: {e}"),
        }
    }
}

async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    if params.is_callback() {
        return callback(State(state), headers, Query(params)).await;
    }
    let handle = state.sessions.resolve(&headers).await;
    let html = {
        let mut session = handle.session.lock().await;
        render_pass(&state, &mut session).await
    };
    with_cookie(&state, &handle, Html(html).into_response())
}

/// One top-to-bottom evaluation of the page for a session.
async fn render_pass(state: &AppState, session: &mut Session) -> String {
    let notice = session.take_notice();
    if !state.manager.is_authenticated(session) {
        return page::connect_page(notice.as_ref());
    }

    match dashboard(state, session, notice).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Render pass failed: {}", e.message());
            session.demote();
            if e.api_error().is_some_and(ApiError::is_unauthorized) {
                state.manager.forget_cached_token().await;
            }
            page::connect_page(Some(&Notice::error(e.message())))
        }
    }
}

async fn dashboard(
    state: &AppState,
    session: &mut Session,
    notice: Option<Notice>,
) -> Result<String, PassError> {
    let client = state
        .manager
        .get_client(session)
        .await
        .map_err(PassError::Auth)?;
    let user = get_current_user(&client)
        .await
        .map_err(|e| PassError::Auth(AuthError::Profile(e)))?;

    match build_report(&client, state.config.report).await {
        Ok(report) => Ok(page::dashboard_page(&user, Ok(&report), notice.as_ref())),
        Err(ReportError::Empty) => {
            info!("No top tracks for {}", user.name());
            let message = ReportError::Empty.to_string();
            Ok(page::dashboard_page(
                &user,
                Err(message.as_str()),
                notice.as_ref(),
            ))
        }
        Err(e) => Err(PassError::Report(e)),
    }
}

async fn connect(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers).await;
    let response = {
        let mut session = handle.session.lock().await;
        match state.manager.begin_auth(&mut session).await {
            Ok(RedirectTarget::Authorize(url)) => see_other(url.as_str()),
            Ok(RedirectTarget::Dashboard) => loading(),
            Err(e) => {
                warn!("Failed to start authorization: {}", e);
                session.set_notice(Notice::error(e.to_string()));
                see_other("/")
            }
        }
    };
    with_cookie(&state, &handle, response)
}

async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let handle = state.sessions.resolve(&headers).await;
    let response = {
        let mut session = handle.session.lock().await;
        match state.manager.complete_auth(&mut session, params).await {
            Ok(_) => loading(),
            Err(e) => {
                warn!("Authorization failed: {}", e);
                session.set_notice(Notice::error(e.to_string()));
                see_other("/")
            }
        }
    };
    with_cookie(&state, &handle, response)
}

async fn disconnect(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers).await;
    {
        let mut session = handle.session.lock().await;
        state.manager.disconnect(&mut session).await;
        session.set_notice(Notice::info("Disconnected from Spotify"));
    }
    with_cookie(&state, &handle, see_other("/"))
}

async fn healthz() -> &'static str {
    "ok"
}

/// Spinner page that moves on to the dashboard once the browser has it.
fn loading() -> Response {
    Html(page::loading_page("/")).into_response()
}

fn see_other(location: &str) -> Response {
    (StatusCode::SEE_OTHER, [(LOCATION, location.to_string())]).into_response()
}

fn with_cookie(state: &AppState, handle: &SessionHandle, mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    if let Some(cookie) = handle.cookie(state.config.secure_cookies()) {
        headers.append(SET_COOKIE, cookie);
    }
    response
}
