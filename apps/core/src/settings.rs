use std::fmt::{Display, Formatter};

use crate::config::{self, CommandsSection, Config, ConfigError, GeneralSection};
use crate::hotkey::parse_hotkey;
use crate::registry::FeatureFlag;

pub const MAX_HISTORY_CEILING: usize = 10_000;

#[derive(Debug)]
pub enum SettingsError {
    Hotkey(String),
    MaxHistory(String),
    Config(ConfigError),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hotkey(error) => write!(f, "invalid shortcut: {error}"),
            Self::MaxHistory(error) => write!(f, "invalid history size: {error}"),
            Self::Config(error) => write!(f, "failed to save settings: {error}"),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<ConfigError> for SettingsError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Editable copy of the settings shown by the settings window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDraft {
    pub hotkey: String,
    pub max_history: usize,
    pub confirm_on_double_space: bool,
    pub commands: CommandsSection,
}

impl SettingsDraft {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            hotkey: cfg.general.shortcut.clone(),
            max_history: cfg.general.max_history,
            confirm_on_double_space: cfg.general.confirm_on_double_space,
            commands: cfg.commands.clone(),
        }
    }

    /// Checkbox rows in display order: flag, label, checked.
    pub fn toggles(&self) -> Vec<(FeatureFlag, &'static str, bool)> {
        FeatureFlag::ALL
            .into_iter()
            .map(|flag| (flag, flag.label(), self.commands.get(flag)))
            .collect()
    }

    pub fn set_command(&mut self, flag: FeatureFlag, enabled: bool) {
        self.commands.set(flag, enabled);
    }

    /// Validates the draft and produces the snapshot it describes.
    pub fn apply(&self, base: &Config) -> Result<Config, SettingsError> {
        let hotkey = validate_hotkey(&self.hotkey)?;
        validate_max_history(self.max_history)?;
        Ok(Config {
            general: GeneralSection {
                shortcut: hotkey,
                max_history: self.max_history,
                confirm_on_double_space: self.confirm_on_double_space,
            },
            commands: self.commands.clone(),
            config_path: base.config_path.clone(),
            history_path: base.history_path.clone(),
        })
    }

    /// Save callback: persists the draft and returns the snapshot to reload.
    pub fn save(&self, base: &Config) -> Result<Config, SettingsError> {
        let next = self.apply(base)?;
        config::save(&next)?;
        tracing::info!(
            "settings saved to {} shortcut={}",
            next.config_path.display(),
            next.general.shortcut
        );
        Ok(next)
    }
}

pub fn validate_hotkey(input: &str) -> Result<String, SettingsError> {
    parse_hotkey(input)
        .map(|hotkey| hotkey.canonical())
        .map_err(SettingsError::Hotkey)
}

pub fn validate_max_history(value: usize) -> Result<(), SettingsError> {
    if (1..=MAX_HISTORY_CEILING).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::MaxHistory(format!(
            "must be between 1 and {MAX_HISTORY_CEILING}"
        )))
    }
}
