use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::header::COOKIE;
use soundscope_spotify_api::auth::pkce::random_token;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::session::Session;

pub const SESSION_COOKIE: &str = "soundscope_session";

/// Sessions untouched for this long are dropped.
pub const SESSION_IDLE_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

struct Entry {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// Server-side sessions keyed by a random cookie value.
///
/// Each session has its own lock, so one render pass at a time mutates it
/// while other browsers proceed independently.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
}

pub struct SessionHandle {
    pub id: String,
    pub session: Arc<Mutex<Session>>,
    /// The browser did not present a known id and needs a cookie.
    pub is_new: bool,
}

impl SessionHandle {
    pub fn cookie(&self, secure: bool) -> Option<HeaderValue> {
        if !self.is_new {
            return None;
        }
        let mut cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
        if secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).ok()
    }
}

impl SessionStore {
    /// Look up the session named by the request's cookie, or start a new one.
    pub async fn resolve(&self, headers: &HeaderMap) -> SessionHandle {
        let now = Instant::now();
        if let Some(id) = session_id(headers) {
            let mut sessions = self.sessions.write().await;
            if let Some(entry) = sessions.get_mut(&id) {
                entry.last_seen = now;
                return SessionHandle {
                    id,
                    session: entry.session.clone(),
                    is_new: false,
                };
            }
        }

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < SESSION_IDLE_LIMIT);
        if sessions.len() < before {
            debug!("Dropped {} idle sessions", before - sessions.len());
        }

        let id = random_token(32);
        let session = Arc::new(Mutex::new(Session::default()));
        sessions.insert(
            id.clone(),
            Entry {
                session: session.clone(),
                last_seen: now,
            },
        );
        debug!("Started session, {} active", sessions.len());
        SessionHandle {
            id,
            session,
            is_new: true,
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie.parse().unwrap());
        headers
    }

    #[test]
    fn finds_session_cookie_among_others() {
        let h = headers("theme=dark; soundscope_session=abc123; other=1");
        assert_eq!(session_id(&h).as_deref(), Some("abc123"));
        assert_eq!(session_id(&headers("theme=dark")), None);
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn new_browser_gets_cookie() {
        let store = SessionStore::default();
        let handle = store.resolve(&HeaderMap::new()).await;
        assert!(handle.is_new);
        let cookie = handle.cookie(false).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with(&format!("{SESSION_COOKIE}={}", handle.id)));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
        assert!(handle.cookie(true).unwrap().to_str().unwrap().ends_with("; Secure"));
    }

    #[tokio::test]
    async fn known_cookie_returns_same_session() {
        let store = SessionStore::default();
        let first = store.resolve(&HeaderMap::new()).await;
        first.session.lock().await.set_notice(crate::session::Notice::info("hi"));

        let again = store
            .resolve(&headers(&format!("{SESSION_COOKIE}={}", first.id)))
            .await;
        assert!(!again.is_new);
        assert!(again.cookie(false).is_none());
        assert!(Arc::ptr_eq(&first.session, &again.session));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_cookie_starts_fresh_session() {
        let store = SessionStore::default();
        let handle = store.resolve(&headers("soundscope_session=made-up")).await;
        assert!(handle.is_new);
        assert_ne!(handle.id, "made-up");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::default();
        let a = store.resolve(&HeaderMap::new()).await;
        let b = store.resolve(&HeaderMap::new()).await;
        assert_ne!(a.id, b.id);
        a.session.lock().await.set_notice(crate::session::Notice::info("only a"));
        assert!(b.session.lock().await.take_notice().is_none());
        assert_eq!(store.len().await, 2);
    }
}
