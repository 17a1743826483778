use std::path::PathBuf;

use tracing::level_filters::LevelFilter;

/// Load `.env` into the process environment.
///
/// Must run before anything reads configuration. Returns the file that was
/// loaded, if any.
pub fn load_dotenv() -> eyre::Result<Option<PathBuf>> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Install error reporting and logging.
///
/// `default_level` applies when `RUST_LOG` is not set.
pub fn init(default_level: LevelFilter) -> eyre::Result<()> {
    color_eyre::install()?;

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_file(true)
        .with_line_number(true)
        .without_time()
        .init();

    Ok(())
}
