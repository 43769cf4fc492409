use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const APP_NAME: &str = "cread";
const CONFIG_FILENAME: &str = "config.toml";
const HINT_FLAG_FILENAME: &str = "swipe-hint-shown";

fn default_start() -> String {
    "1.1".to_string()
}

fn default_hint_duration_ms() -> u64 {
    3000
}

fn default_swipe_threshold() -> u16 {
    6
}

fn default_theme() -> String {
    "base16-ocean.dark".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// External catalog; the bundled one is used when unset.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    #[serde(default = "default_start")]
    pub start: String,
    #[serde(default = "default_hint_duration_ms")]
    pub hint_duration_ms: u64,
    /// Columns a mouse drag must travel before it counts as a swipe.
    #[serde(default = "default_swipe_threshold")]
    pub swipe_threshold: u16,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub hint_flag: Option<PathBuf>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: None,
            start: default_start(),
            hint_duration_ms: default_hint_duration_ms(),
            swipe_threshold: default_swipe_threshold(),
            theme: default_theme(),
            hint_flag: None,
            log_file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILENAME))
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read config {}", path.display()))
            }
        };
        toml::from_str(&contents)
            .with_context(|| format!("Unable to load config from {}", path.display()))
    }

    pub fn hint_duration(&self) -> Duration {
        Duration::from_millis(self.hint_duration_ms)
    }

    pub fn hint_flag_path(&self) -> PathBuf {
        self.hint_flag.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_NAME)
                .join(HINT_FLAG_FILENAME)
        })
    }
}
