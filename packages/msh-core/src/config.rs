//! `msh.toml`, shared by the controller and the counter. Every field has a default and a
//! missing file means all defaults.

use std::{fs, path::Path, path::PathBuf};

use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};

use crate::comm::CommFiles;

pub const DEFAULT_CONFIG_FILE: &str = "msh.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Task resources, see [`crate::resource::Resource::load`]
    pub resource_dir: PathBuf,
    pub emulator: EmulatorConfig,
    pub input: InputConfig,
    pub comm: CommFiles,
    pub counter: CounterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resource_dir: PathBuf::from("resources"),
            emulator: EmulatorConfig::default(),
            input: InputConfig::default(),
            comm: CommFiles::default(),
            counter: CounterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub melon_path: PathBuf,
    pub roms_dir: PathBuf,
    /// Emulator windows are found by this title fragment
    pub window_title: String,
    pub count: u32,
    pub rows: u32,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            melon_path: PathBuf::from(r"C:\melonDS\melonDS.exe"),
            roms_dir: PathBuf::from(r"C:\melonDS\roms"),
            window_title: "melonDS".to_string(),
            count: 24,
            rows: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub vjoy_device: u32,
    /// The emulator's soft reset hotkey, mapped to L+R+Start+Select
    pub soft_reset_keys: Vec<char>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            vjoy_device: 1,
            soft_reset_keys: vec!['f', 'g', 'b', 'v'],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub data_file: PathBuf,
    pub cache_dir: PathBuf,
    pub api_base: String,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("shiny_counter_data.json"),
            cache_dir: PathBuf::from("cache/sprites"),
            api_base: "https://pokeapi.co/api/v2".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("{} not found, using default config", path.display());
            return Ok(Self::default());
        }
        let config = fs::read_to_string(path)?;
        toml::from_str(&config).with_context(|| format!("parse {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("msh.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.emulator.count, 24);
        assert_eq!(config.emulator.rows, 3);
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
resource_dir = "my_tasks"

[emulator]
count = 8

[input]
soft_reset_keys = ["q", "w"]

[comm]
encounter_trigger = "shared/trigger.txt"
"#,
        )
        .unwrap();
        assert_eq!(config.emulator.count, 8);
        assert_eq!(config.emulator.rows, 3);
        assert_eq!(config.emulator.window_title, "melonDS");
        assert_eq!(config.input.soft_reset_keys, vec!['q', 'w']);
        assert_eq!(config.input.vjoy_device, 1);
        assert_eq!(
            config.comm.encounter_trigger,
            PathBuf::from("shared/trigger.txt")
        );
        assert_eq!(
            config.comm.emulator_count,
            PathBuf::from("melon_emulator_count.txt")
        );
        assert_eq!(config.resource_dir, PathBuf::from("my_tasks"));
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("msh.toml");
        let mut config = Config::default();
        config.counter.api_base = "http://localhost:8080".to_string();
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_repo_config() {
        let config = Config::load("../../msh.toml").unwrap();
        assert_eq!(config.emulator.count, 24);
        assert_eq!(config.input, InputConfig::default());
        assert_eq!(config.comm, CommFiles::default());
        assert_eq!(config.counter, CounterConfig::default());
    }
}
