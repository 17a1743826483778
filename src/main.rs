mod config;
mod error;
mod page;
mod routes;
mod session;
mod session_manager;
mod session_store;
#[cfg(test)]
mod test_support;

use eyre::WrapErr;
use soundscope_init::init;
use soundscope_init::load_dotenv;
use tokio::net::TcpListener;
use tracing::debug;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing::warn;

use crate::config::Config;
use crate::routes::AppState;
use crate::routes::router;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let dotenv = load_dotenv()?;
    let config = Config::from_env();
    // Logging first, so a config error is reported through it.
    init(
        config
            .as_ref()
            .map_or(LevelFilter::INFO, |config| config.variant.log_level()),
    )?;
    if let Some(path) = dotenv {
        debug!("Loaded env from {}", path.display());
    }
    let config = config?;

    info!(
        "Starting {:?} variant: {} tracks, token cache {}, expiry policy {:?}",
        config.variant,
        config.report.limit,
        config
            .token_cache
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "disabled".to_string()),
        config.token_expiry,
    );
    debug!("Credentials from {:?}", config.secrets_source);

    let bind = config.bind;
    let public_url = config.public_url();
    let open_browser = config.open_browser;
    let app = router(AppState::new(config)?);

    let listener = TcpListener::bind(bind)
        .await
        .wrap_err(format!("Failed to bind {bind}"))?;
    info!("Listening on {}, open {}", listener.local_addr()?, public_url);

    if open_browser {
        info!("Opening browser");
        if let Err(e) = open::that(&public_url) {
            warn!("Failed to open browser: {}", e);
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
