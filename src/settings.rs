//! Persisted, user-editable settings overrides.
//!
//! Distinct from [`crate::config::Config`]: `Config` is process
//! configuration resolved once at startup from the environment; `Settings`
//! is a small JSON file a user edits via `organism config set` between
//! runs. Only knobs worth tuning without a restart live here.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    pub tick_interval_secs: u64,
    pub max_active_agents: usize,
    pub max_llm_evals_per_tick: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            max_active_agents: 8,
            max_llm_evals_per_tick: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergySettings {
    pub tidal_period_secs: f64,
    pub base_photosynthesis_rate: f64,
    pub mycorrhizal_ratio: f64,
    pub base_entropy_rate: f64,
}

impl Default for EnergySettings {
    fn default() -> Self {
        Self {
            tidal_period_secs: 14_400.0,
            base_photosynthesis_rate: 1.0,
            mycorrhizal_ratio: 0.15,
            base_entropy_rate: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextModelSettings {
    pub base_url: String,
    pub model: String,
}

impl Default for TextModelSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3".to_string(),
        }
    }
}

/// Root settings object. Persisted as pretty-printed JSON.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub scheduler: SchedulerSettings,
    pub energy: EnergySettings,
    pub text_model: TextModelSettings,
}

impl Settings {
    /// Load settings from disk, falling back to defaults if the file is
    /// absent or unreadable.
    pub fn load() -> Self {
        let path = Self::default_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Persist settings to disk, creating parent directories as needed.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default settings file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("organism")
            .join("settings.json")
    }

    /// Flatten all settings into dotted-path key/value pairs for display.
    pub fn list(&self) -> Vec<(String, String)> {
        let mut out = BTreeMap::new();
        out.insert(
            "scheduler.tick_interval_secs".to_string(),
            self.scheduler.tick_interval_secs.to_string(),
        );
        out.insert(
            "scheduler.max_active_agents".to_string(),
            self.scheduler.max_active_agents.to_string(),
        );
        out.insert(
            "scheduler.max_llm_evals_per_tick".to_string(),
            self.scheduler.max_llm_evals_per_tick.to_string(),
        );
        out.insert(
            "energy.tidal_period_secs".to_string(),
            self.energy.tidal_period_secs.to_string(),
        );
        out.insert(
            "energy.base_photosynthesis_rate".to_string(),
            self.energy.base_photosynthesis_rate.to_string(),
        );
        out.insert(
            "energy.mycorrhizal_ratio".to_string(),
            self.energy.mycorrhizal_ratio.to_string(),
        );
        out.insert(
            "energy.base_entropy_rate".to_string(),
            self.energy.base_entropy_rate.to_string(),
        );
        out.insert("text_model.base_url".to_string(), self.text_model.base_url.clone());
        out.insert("text_model.model".to_string(), self.text_model.model.clone());
        out.into_iter().collect()
    }

    /// Get a single setting by dotted path.
    pub fn get(&self, path: &str) -> Option<String> {
        self.list().into_iter().find(|(k, _)| k == path).map(|(_, v)| v)
    }

    /// Set a single setting by dotted path, parsing `value` into the
    /// correct type for that field.
    pub fn set(&mut self, path: &str, value: &str) -> Result<(), ValidationError> {
        macro_rules! parse {
            ($field:expr, $ty:ty) => {
                value
                    .parse::<$ty>()
                    .map_err(|e| ValidationError::InvalidSettingValue {
                        path: path.to_string(),
                        reason: e.to_string(),
                    })
                    .map(|v| $field = v)
            };
        }

        match path {
            "scheduler.tick_interval_secs" => parse!(self.scheduler.tick_interval_secs, u64),
            "scheduler.max_active_agents" => parse!(self.scheduler.max_active_agents, usize),
            "scheduler.max_llm_evals_per_tick" => parse!(self.scheduler.max_llm_evals_per_tick, u32),
            "energy.tidal_period_secs" => parse!(self.energy.tidal_period_secs, f64),
            "energy.base_photosynthesis_rate" => parse!(self.energy.base_photosynthesis_rate, f64),
            "energy.mycorrhizal_ratio" => parse!(self.energy.mycorrhizal_ratio, f64),
            "energy.base_entropy_rate" => parse!(self.energy.base_entropy_rate, f64),
            "text_model.base_url" => {
                self.text_model.base_url = value.to_string();
                Ok(())
            }
            "text_model.model" => {
                self.text_model.model = value.to_string();
                Ok(())
            }
            other => Err(ValidationError::InvalidSettingPath(other.to_string())),
        }
    }

    /// Reset a single setting to its default value.
    pub fn reset(&mut self, path: &str) -> Result<(), ValidationError> {
        let default = Settings::default();
        let value = default
            .get(path)
            .ok_or_else(|| ValidationError::InvalidSettingPath(path.to_string()))?;
        self.set(path, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_is_not_empty() {
        assert!(!Settings::default().list().is_empty());
    }

    #[test]
    fn get_set_reset_round_trips() {
        let mut settings = Settings::default();
        settings.set("scheduler.tick_interval_secs", "90").unwrap();
        assert_eq!(settings.scheduler.tick_interval_secs, 90);
        settings.reset("scheduler.tick_interval_secs").unwrap();
        assert_eq!(settings.scheduler.tick_interval_secs, 60);
    }

    #[test]
    fn unknown_path_errors() {
        let mut settings = Settings::default();
        assert!(settings.set("not.a.real.path", "1").is_err());
    }
}
