use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::registry::FeatureFlag;

pub const DEFAULT_SHORTCUT: &str = "super+space";
pub const DEFAULT_MAX_HISTORY: usize = 50;
const CONFIG_FILE_NAME: &str = "config.toml";
const HISTORY_FILE_NAME: &str = "command_history.txt";
const APP_DIR_NAME: &str = "rudolph";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Encode(toml::ser::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Encode(error) => write!(f, "failed to encode config: {error}"),
            Self::Invalid(error) => write!(f, "invalid config: {error}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Encode(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSection {
    pub shortcut: String,
    pub max_history: usize,
    pub confirm_on_double_space: bool,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            shortcut: DEFAULT_SHORTCUT.to_string(),
            max_history: DEFAULT_MAX_HISTORY,
            confirm_on_double_space: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsSection {
    pub expression: bool,
    pub conversion: bool,
    pub temp: bool,
    pub youtube: bool,
    pub duckduckgo: bool,
    pub wikipedia: bool,
    pub perplexity: bool,
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self {
            expression: true,
            conversion: true,
            temp: true,
            youtube: true,
            duckduckgo: true,
            wikipedia: true,
            perplexity: true,
        }
    }
}

impl CommandsSection {
    pub fn set(&mut self, flag: FeatureFlag, enabled: bool) {
        let slot = match flag {
            FeatureFlag::Expression => &mut self.expression,
            FeatureFlag::Conversion => &mut self.conversion,
            FeatureFlag::Temp => &mut self.temp,
            FeatureFlag::Youtube => &mut self.youtube,
            FeatureFlag::Duckduckgo => &mut self.duckduckgo,
            FeatureFlag::Wikipedia => &mut self.wikipedia,
            FeatureFlag::Perplexity => &mut self.perplexity,
        };
        *slot = enabled;
    }

    pub fn get(&self, flag: FeatureFlag) -> bool {
        match flag {
            FeatureFlag::Expression => self.expression,
            FeatureFlag::Conversion => self.conversion,
            FeatureFlag::Temp => self.temp,
            FeatureFlag::Youtube => self.youtube,
            FeatureFlag::Duckduckgo => self.duckduckgo,
            FeatureFlag::Wikipedia => self.wikipedia,
            FeatureFlag::Perplexity => self.perplexity,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    #[serde(rename = "General")]
    general: GeneralSection,
    #[serde(rename = "Commands")]
    commands: CommandsSection,
}

/// Immutable snapshot of the launcher settings.
///
/// Read once at startup and again after the settings editor saves. The
/// dispatcher receives it by reference and never reads ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub general: GeneralSection,
    pub commands: CommandsSection,
    pub config_path: PathBuf,
    pub history_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self::in_dir(&stable_app_data_dir())
    }
}

impl Config {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            general: GeneralSection::default(),
            commands: CommandsSection::default(),
            config_path: dir.join(CONFIG_FILE_NAME),
            history_path: dir.join(HISTORY_FILE_NAME),
        }
    }

    pub fn hotkey(&self) -> &str {
        &self.general.shortcut
    }

    pub fn max_history(&self) -> usize {
        self.general.max_history
    }

    pub fn is_enabled(&self, flag: FeatureFlag) -> bool {
        self.commands.get(flag)
    }

    pub fn set_enabled(&mut self, flag: FeatureFlag, enabled: bool) {
        self.commands.set(flag, enabled);
    }

    pub fn enabled_flags(&self) -> Vec<FeatureFlag> {
        FeatureFlag::ALL
            .into_iter()
            .filter(|flag| self.is_enabled(*flag))
            .collect()
    }
}

pub fn validate(cfg: &Config) -> Result<(), String> {
    if cfg.general.max_history == 0 {
        return Err("max_history must be at least 1".into());
    }

    if cfg.general.shortcut.trim().is_empty() {
        return Err("shortcut is required".into());
    }

    if cfg.config_path.as_os_str().is_empty() {
        return Err("config_path is required".into());
    }

    if cfg.history_path.as_os_str().is_empty() {
        return Err("history_path is required".into());
    }

    Ok(())
}

/// `RUDOLPH_CONFIG_DIR`, else the per-user application data directory.
pub fn stable_app_data_dir() -> PathBuf {
    if let Some(dir) = non_empty_env("RUDOLPH_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(app_data) = non_empty_env("APPDATA") {
            return PathBuf::from(app_data).join(APP_DIR_NAME);
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = non_empty_env("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join(APP_DIR_NAME);
        }
        if let Some(home) = non_empty_env("HOME") {
            return PathBuf::from(home).join(".config").join(APP_DIR_NAME);
        }
    }

    std::env::temp_dir().join(APP_DIR_NAME)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Loads the snapshot stored in `dir` (or the default directory).
///
/// Never fails: a missing file, a malformed file or invalid values all fall
/// back to defaults, with a warning for the latter two.
pub fn load(dir: Option<&Path>) -> Config {
    let dir = dir.map(Path::to_path_buf).unwrap_or_else(stable_app_data_dir);
    let mut cfg = Config::in_dir(&dir);

    let raw = match std::fs::read_to_string(&cfg.config_path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config at {}; using defaults", cfg.config_path.display());
            return cfg;
        }
        Err(error) => {
            tracing::warn!(
                "failed to read config {}: {error}; using defaults",
                cfg.config_path.display()
            );
            return cfg;
        }
    };

    match parse(&raw) {
        Ok(file) => {
            cfg.general = file.general;
            cfg.commands = file.commands;
        }
        Err(error) => {
            tracing::warn!(
                "malformed config {}: {error}; using defaults",
                cfg.config_path.display()
            );
            return cfg;
        }
    }

    if let Err(error) = validate(&cfg) {
        tracing::warn!("{error}; falling back to default general settings");
        cfg.general = GeneralSection::default();
    }
    cfg
}

fn parse(raw: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str::<ConfigFile>(raw).map_err(|error| ConfigError::Invalid(error.to_string()))
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    validate(cfg).map_err(ConfigError::Invalid)?;
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let encoded = toml::to_string_pretty(&ConfigFile {
        general: cfg.general.clone(),
        commands: cfg.commands.clone(),
    })?;
    std::fs::write(&cfg.config_path, encoded)?;
    Ok(())
}
