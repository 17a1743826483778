use std::time::Duration;

use tracing::debug;
use tracing::warn;

use crate::bearer_token::BearerToken;
use crate::error::ApiError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Server errors are retried this many times before giving up.
pub const MAX_RETRIES: u32 = 1;
pub const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Build the HTTP client shared by every request of the process.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("soundscope/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Send a request, retrying on 5xx, and return the body of a successful response.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed on send.
pub(crate) async fn send_with_retry<F>(build: F) -> Result<String, ApiError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let res = build().send().await?;
        let status = res.status();
        if status.is_server_error() && attempt < MAX_RETRIES {
            attempt += 1;
            warn!(
                "Spotify answered {} for {}, retrying ({}/{})",
                status,
                res.url(),
                attempt,
                MAX_RETRIES
            );
            tokio::time::sleep(RETRY_DELAY).await;
            continue;
        }

        let body = res.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        return Ok(body);
    }
}

pub(crate) fn decode<T>(body: String) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned,
{
    match serde_json::from_str(&body) {
        Ok(x) => Ok(x),
        Err(source) => Err(ApiError::Decode { source, body }),
    }
}

pub async fn fetch<T>(
    http: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
    bearer: &BearerToken,
) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned,
{
    debug!("GET {}", url);
    let body = send_with_retry(|| http.get(url).query(query).bearer_auth(&bearer.0)).await?;
    decode(body)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Pong {
        ok: bool,
    }

    /// Serves `/ping`, answering with `failures` status codes before succeeding.
    async fn flaky_server(failures: Vec<StatusCode>) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/ping",
            get(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = failures.get(n).copied();
                async move {
                    match status {
                        Some(status) => (status, r#"{"error":{"status":500,"message":"boom"}}"#),
                        None => (StatusCode::OK, r#"{"ok":true}"#),
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/ping"), hits)
    }

    fn bearer() -> BearerToken {
        BearerToken("token".to_string())
    }

    #[tokio::test]
    async fn retries_once_on_server_error() {
        let (url, hits) = flaky_server(vec![StatusCode::BAD_GATEWAY]).await;
        let http = http_client(DEFAULT_TIMEOUT).unwrap();
        let pong: Pong = fetch(&http, &url, &[], &bearer()).await.unwrap();
        assert!(pong.ok);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_second_server_error() {
        let (url, hits) = flaky_server(vec![
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ])
        .await;
        let http = http_client(DEFAULT_TIMEOUT).unwrap();
        let err = fetch::<Pong>(&http, &url, &[], &bearer()).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let (url, hits) = flaky_server(vec![StatusCode::UNAUTHORIZED]).await;
        let http = http_client(DEFAULT_TIMEOUT).unwrap();
        let err = fetch::<Pong>(&http, &url, &[], &bearer()).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn times_out_slow_responses() {
        let app = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let http = http_client(Duration::from_millis(100)).unwrap();
        let err = fetch::<Pong>(&http, &format!("http://{addr}/slow"), &[], &bearer())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
    }

    #[test]
    fn decode_keeps_body_on_failure() {
        let err = decode::<Pong>("not json".to_string()).unwrap_err();
        match err {
            ApiError::Decode { body, .. } => assert_eq!(body, "not json"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
