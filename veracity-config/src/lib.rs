//! Loader for Veracity configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added, later sources win:
//! built-in defaults, then YAML files or snippets, then `VERACITY__`-prefixed
//! environment variables (`VERACITY__PROVIDER__MODEL=...`). After merging,
//! every string value has `${VAR}` placeholders expanded from the process
//! environment.
//!
//! The provider credential is special: if the configuration does not carry a
//! usable `provider.api_key`, [`ProviderConfig::credential`] falls back to the
//! `API_KEY` environment variable and reports a configuration error when
//! neither is present.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use veracity_common::VeracityError;
use veracity_common::observability::{LogConfig, LogFormat};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Environment variable holding the provider credential.
pub const API_KEY_ENV: &str = "API_KEY";
/// File name looked up by [`VeracityConfigLoader::with_default_locations`].
pub const CONFIG_FILE_NAME: &str = "veracity.yaml";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Default, Deserialize)]
pub struct VeracityConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VeracityConfig {
    /// Reject configurations that could never run an analysis.
    pub fn validate(&self) -> veracity_common::Result<()> {
        self.provider.validate()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
}

/// Settings for the inference provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-call timeout. Unset means the call may wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Extra attempts on transient failures. Zero keeps a single attempt.
    #[serde(default)]
    pub retries: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            model: default_model(),
            endpoint: default_endpoint(),
            api_key: None,
            timeout_secs: None,
            retries: 0,
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key: configured value first, then `$API_KEY`.
    ///
    /// A configured value still holding an unexpanded `${...}` placeholder
    /// counts as absent.
    pub fn credential(&self) -> veracity_common::Result<String> {
        let configured = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.contains("${"));
        if let Some(key) = configured {
            return Ok(key.to_string());
        }

        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(VeracityError::Configuration(format!(
                "no API key configured: set {API_KEY_ENV} or provider.api_key"
            ))),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> veracity_common::Result<()> {
        if self.model.trim().is_empty() {
            return Err(VeracityError::Configuration(
                "provider.model must not be empty".into(),
            ));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(VeracityError::Configuration(format!(
                "provider.endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(VeracityError::Configuration(
                "provider.timeout_secs must be positive when set".into(),
            ));
        }
        self.credential().map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub emit_stderr: bool,
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            emit_stderr: false,
            filter: default_filter(),
            dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn to_log_config(&self, app_name: &'static str) -> LogConfig {
        LogConfig {
            app_name,
            log_dir: self.dir.clone(),
            emit_stderr: self.emit_stderr,
            format: self.format,
            default_filter: self.filter.clone(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.into()
}
fn default_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.into()
}
fn default_filter() -> String {
    "info".into()
}

/// Expand `${VAR}` placeholders, following nested references a few levels deep.
/// Unknown variables leave the text untouched.
fn expand_env(s: &mut String) {
    if !s.contains('$') {
        return;
    }
    let mut cur = std::mem::take(s);
    for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
        let expanded = match shellexpand::env(&cur) {
            Ok(cow) => cow.into_owned(),
            Err(_) => break,
        };
        if expanded == cur {
            break;
        }
        cur = expanded;
    }
    *s = cur;
}

impl VeracityConfig {
    fn expand_placeholders(&mut self) {
        let provider = &mut self.provider;
        for field in [&mut provider.model, &mut provider.endpoint, &mut self.logging.filter] {
            expand_env(field);
        }
        for field in [&mut self.version, &mut provider.api_key].into_iter().flatten() {
            expand_env(field);
        }
        if let Some(dir) = self.logging.dir.take() {
            let mut text = dir.to_string_lossy().into_owned();
            expand_env(&mut text);
            self.logging.dir = Some(PathBuf::from(text));
        }
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct VeracityConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: String,
}

impl Default for VeracityConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl VeracityConfigLoader {
    /// Start empty; environment overrides are applied last in [`load`](Self::load).
    ///
    /// ```
    /// use veracity_config::{VeracityConfigLoader, DEFAULT_GEMINI_MODEL};
    ///
    /// let config = VeracityConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.provider.model, DEFAULT_GEMINI_MODEL);
    /// assert_eq!(config.provider.retries, 0);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env_prefix: "VERACITY".into(),
        }
    }

    /// Use a different prefix for environment overrides (tests, embedding).
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Look for `veracity.yaml` in the user config dir, then the working dir.
    pub fn with_default_locations(self) -> Self {
        let mut loader = self;
        if let Some(dir) = dirs::config_dir() {
            loader = loader.with_optional_file(dir.join("veracity").join(CONFIG_FILE_NAME));
        }
        loader.with_optional_file(CONFIG_FILE_NAME)
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use veracity_config::VeracityConfigLoader;
    ///
    /// let cfg = VeracityConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// provider:
    ///   kind: gemini
    ///   model: "gemini-2.5-flash"
    ///   timeout_secs: 30
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.provider.model, "gemini-2.5-flash");
    /// assert_eq!(cfg.provider.timeout().map(|d| d.as_secs()), Some(30));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// ```
    /// use veracity_config::VeracityConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOCTEST_GEMINI_KEY", "injected-from-env"); }
    ///
    /// let config = VeracityConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// provider:
    ///   api_key: "${DOCTEST_GEMINI_KEY}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.provider.credential().unwrap(), "injected-from-env");
    ///
    /// unsafe { std::env::remove_var("DOCTEST_GEMINI_KEY"); }
    /// ```
    pub fn load(self) -> Result<VeracityConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(Environment::with_prefix(&self.env_prefix).separator("__"))
            .build()?;

        // Env values arrive as strings; the config crate coerces them per field.
        let mut typed: VeracityConfig = cfg.try_deserialize()?;
        typed.expand_placeholders();
        tracing::debug!(
            provider = ?typed.provider.kind,
            model = %typed.provider.model,
            endpoint = %typed.provider.endpoint,
            "config.loaded"
        );
        Ok(typed)
    }
}
