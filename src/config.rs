use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::version::strategy::StrategyKind;

// =============================================================================
// Module-system constants
// =============================================================================

/// Separator between module name segments (`Foo::Bar`)
pub const NAME_SEPARATOR: &str = "::";

/// Extension of module source files, without the leading dot
pub const SOURCE_EXTENSION: &str = "pm";

/// Conventional name of the package variable holding a module's version
pub const VERSION_VARIABLE: &str = "VERSION";

/// Default host interpreter used to load modules and read the search path
pub const DEFAULT_INTERPRETER: &str = "perl";

// =============================================================================
// Process exit statuses
// =============================================================================

/// Exit status for invalid option combinations or configuration files
pub const EXIT_CONFIG_ERROR: u8 = 2;

/// Exit status when the operator interrupts a module load
pub const EXIT_INTERRUPTED: i32 = 130;

/// Tool configuration, read from `config.json` in the config directory
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub host: HostConfig,
    /// Directories searched before the host's own search path
    pub extra_paths: Vec<PathBuf>,
    /// Strategy used when `--method` is not given
    pub method: Option<String>,
}

/// Host interpreter configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    pub interpreter: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
        }
    }
}

/// Errors that abort a run before any module is processed
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--name and --no-name cannot be used together")]
    ConflictingNameFlags,

    #[error("unknown method '{0}' (expected text, load or subprocess)")]
    UnknownStrategy(String),

    #[error("module names cannot be combined with --all")]
    NamesWithAll,

    #[error("no modules requested (give module names or --all)")]
    NoTargets,

    #[error(transparent)]
    InvalidModuleName(#[from] crate::module::ModuleNameError),

    #[error("failed to read config file {path:?}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}: {source}")]
    ParseConfig {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to determine module search path: {0}")]
    SearchPath(#[from] crate::host::HostError),
}

impl Config {
    /// Load the configuration file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::ReadConfig {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the run's strategy: the CLI value wins over the config file
    pub fn strategy(&self, cli_method: Option<&str>) -> Result<StrategyKind, ConfigError> {
        match cli_method.or(self.method.as_deref()) {
            Some(method) => method.parse(),
            None => Ok(StrategyKind::default()),
        }
    }
}

/// Returns the path to the config directory for modvers.
/// Uses $XDG_CONFIG_HOME/modvers if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/modvers,
/// or ./modvers if neither is available.
pub fn config_dir() -> PathBuf {
    app_dir_with_env(
        std::env::var("XDG_CONFIG_HOME").ok(),
        dirs::home_dir(),
        ".config",
    )
}

/// Returns the path to the config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Returns the path to the data directory for modvers.
/// Uses $XDG_DATA_HOME/modvers if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/modvers.
pub fn data_dir() -> PathBuf {
    app_dir_with_env(
        std::env::var("XDG_DATA_HOME").ok(),
        dirs::home_dir(),
        ".local/share",
    )
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("modvers.log")
}

fn app_dir_with_env(xdg_home: Option<String>, home_dir: Option<PathBuf>, home_rel: &str) -> PathBuf {
    let base = xdg_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(home_rel)))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("modvers")
}
