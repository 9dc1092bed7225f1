//! Shared observability helpers for the CLI and integration tests.
//!
//! [`init_logging`] installs one `tracing` subscriber writing to a daily
//! rolling file, optionally mirrored to stderr. Call it once near process
//! start; later calls are no-ops that return the resolved log file path.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Environment variable consulted when no explicit log directory is set.
pub const LOG_DIR_ENV: &str = "VERACITY_LOG_DIR";

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration passed to [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Logical name of the component (used for defaults and file names).
    pub app_name: &'static str,
    /// Log directory. `None` means `$VERACITY_LOG_DIR`, else the platform
    /// data directory (`~/.local/share/<app_name>` on Linux).
    pub log_dir: Option<PathBuf>,
    /// Whether to duplicate events to `stderr` in addition to the file sink.
    pub emit_stderr: bool,
    /// Preferred log encoding.
    pub format: LogFormat,
    /// Default filter applied when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "veracity",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Initialise the global `tracing` subscriber.
///
/// Returns the log file path for the current day.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let prefix = format!("{}.log", config.app_name);
    let today_path = dir.join(format!("{prefix}.{}", Local::now().format("%Y-%m-%d")));

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &prefix));
    let _ = LOG_GUARD.set(guard);

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    let file = fmt::layer().with_writer(writer).with_ansi(false);
    layers.push(match config.format {
        LogFormat::Text => file.boxed(),
        LogFormat::Json => file.json().boxed(),
    });
    if config.emit_stderr {
        let stderr = fmt::layer().with_writer(std::io::stderr);
        layers.push(match config.format {
            LogFormat::Text => stderr.boxed(),
            LogFormat::Json => stderr.json().boxed(),
        });
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_PATH.set(today_path.clone());
    Ok(today_path)
}

/// Explicit directory, then `$VERACITY_LOG_DIR`, then the platform data dir.
fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(LOG_DIR_ENV).map(PathBuf::from))
        .map(|dir| expand_home(&dir))
        .unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(app_name)
        })
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let dir = resolve_log_dir("veracity", Some(Path::new("/var/log/veracity")));
        assert_eq!(dir, PathBuf::from("/var/log/veracity"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let Some(home) = dirs::home_dir() else { return };
        assert_eq!(expand_home(Path::new("~/logs")), home.join("logs"));
        assert_eq!(expand_home(Path::new("/abs/~/x")), PathBuf::from("/abs/~/x"));
    }

    #[test]
    fn fallback_is_named_after_the_app() {
        if std::env::var_os(LOG_DIR_ENV).is_some() {
            return;
        }
        assert!(resolve_log_dir("veracity-probe", None).ends_with("veracity-probe"));
    }

    #[test]
    fn log_format_reads_lowercase_names() {
        use serde::de::IntoDeserializer;
        let de: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
            "json".into_deserializer();
        assert_eq!(LogFormat::deserialize(de).unwrap(), LogFormat::Json);
    }
}
