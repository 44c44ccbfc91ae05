use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use color_eyre::eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter, e.g. `lithium_core=debug`
pub const LOG_ENV: &str = "LITHIUMX_LOG";

/// Default log location under the platform cache directory
pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("lithiumx").join("lithiumx.log"))
        .unwrap_or_else(|| PathBuf::from("lithiumx.log"))
}

/// Send tracing output to `path`; the terminal belongs to the UI
pub fn init(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create log directory {:?}", parent))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .wrap_err_with(|| format!("Failed to open log file {:?}", path))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .try_init()
        .wrap_err("Failed to install log subscriber")?;
    Ok(())
}
