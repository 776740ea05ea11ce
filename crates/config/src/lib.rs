use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "rollcall.toml",
    "config/rollcall.toml",
    "crates/config/rollcall.toml",
    "../rollcall.toml",
    "../config/rollcall.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub roster: RosterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Contact list settings.
///
/// ```
/// use rollcall_config::RosterConfig;
///
/// let roster = RosterConfig::default();
/// assert_eq!(roster.default_group_type, "normal");
/// assert_eq!(roster.event_buffer, 64);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Grouping used when neither the session nor the user picked one
    #[serde(default = "RosterConfig::default_group_type")]
    pub default_group_type: String,
    /// Capacity of the async event channel feeding the change bus
    #[serde(default = "RosterConfig::default_event_buffer")]
    pub event_buffer: usize,
}

impl RosterConfig {
    fn default_group_type() -> String {
        "normal".to_string()
    }

    const fn default_event_buffer() -> usize {
        64
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            default_group_type: Self::default_group_type(),
            event_buffer: Self::default_event_buffer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    #[serde(default = "LoggingConfig::default_filter")]
    pub filter: String,
    #[serde(default)]
    pub ansi: bool,
}

impl LoggingConfig {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
            ansi: false,
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use rollcall_config::load;
///
/// std::env::remove_var("ROLLCALL_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.roster.default_group_type.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();
    let event_buffer = i64::try_from(defaults.roster.event_buffer).unwrap_or(i64::MAX);

    let mut builder = config::Config::builder()
        .set_default(
            "roster.default_group_type",
            defaults.roster.default_group_type.clone(),
        )?
        .set_default("roster.event_buffer", event_buffer)?
        .set_default("logging.filter", defaults.logging.filter.clone())?
        .set_default("logging.ansi", defaults.logging.ansi)?;

    let environment_overrides = config::Environment::with_prefix("ROLLCALL").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("ROLLCALL_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via ROLLCALL_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.roster.event_buffer == 0 {
        config.roster.event_buffer = 1;
    }

    debug!(?config, "loaded client configuration");
    Ok(config)
}
