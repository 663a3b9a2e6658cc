use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use log::LevelFilter;
use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};
use winit::event::VirtualKeyCode;

use crate::session::input::{BindingError, KeyBinding, KeyBindings, DEFAULT_BINDINGS, DEFAULT_TEST_MODE_KEY};
use crate::session::SessionOptions;

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Initial window size as a multiple of the native resolution.
    pub scale: u32,
    pub diagnostics_interval_ms: u64,
    /// Stop acquisition after this many malformed frames in a row. Unlimited when absent.
    pub max_consecutive_decode_failures: Option<u32>,
    pub key_bindings: Vec<KeyBinding>,
    pub test_mode_key: VirtualKeyCode,
    pub log_level: LevelFilter,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scale: 3,
            diagnostics_interval_ms: 1000,
            max_consecutive_decode_failures: None,
            key_bindings: DEFAULT_BINDINGS.to_vec(),
            test_mode_key: DEFAULT_TEST_MODE_KEY,
            log_level: LevelFilter::Info,
        }
    }
}

impl AppConfig {
    pub fn key_bindings(&self) -> Result<KeyBindings, BindingError> {
        KeyBindings::new(&self.key_bindings, self.test_mode_key)
    }

    pub fn session_options(&self, start_paused: bool) -> SessionOptions {
        SessionOptions {
            diagnostics_interval: Duration::from_millis(self.diagnostics_interval_ms.max(1)),
            max_consecutive_decode_failures: self.max_consecutive_decode_failures,
            start_paused,
        }
    }
}

/// Load the config at `path`, writing the defaults there first if no file exists yet.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        let file = File::open(path).with_context(|| format!("Failed to open config `{}`", path.display()))?;

        serde_json::from_reader(BufReader::new(file)).with_context(|| format!("Invalid config `{}`", path.display()))
    } else {
        let defaults = AppConfig::default();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory `{}`", parent.display()))?;
        }

        let file = File::create(path).with_context(|| format!("Failed to create config `{}`", path.display()))?;
        serde_json::to_writer_pretty(file, &defaults)?;

        Ok(defaults)
    }
}

pub fn get_full_config_path() -> anyhow::Result<PathBuf> {
    Ok(get_app_dirs()?.config_dir.join(CONFIG_FILE))
}

pub fn get_app_dirs() -> anyhow::Result<AppDirs> {
    AppDirs::new(Some("RNES"), false).context("Couldn't find a home directory for config!")
}
