//! Launcher-wide and per-instance launch options
//!
//! Every instance carries a full copy of the shared option groups. Each group
//! is only used when the instance's matching `use_launcher_*` switch is off;
//! otherwise the launcher-wide value applies.

use crate::game::metadata::cache::write_atomic;
use crate::game::metadata::DEFAULT_META_URL;
use crate::utils::hardware::default_max_memory_mb;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Java runtime and heap settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaOptions {
    pub java_path: String,
    pub jvm_arguments: String,
    pub min_memory: u32,
    pub max_memory: u32,
}

impl Default for JavaOptions {
    fn default() -> Self {
        Self {
            java_path: String::new(),
            jvm_arguments: String::new(),
            min_memory: 1024,
            max_memory: default_max_memory_mb(),
        }
    }
}

/// Game window size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionOptions {
    /// Use the primary display's size instead of the fixed one
    pub maximum_resolution: bool,
    pub resolution_width: u32,
    pub resolution_height: u32,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            maximum_resolution: false,
            resolution_width: 854,
            resolution_height: 480,
        }
    }
}

/// Launch-time behavior toggles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkaroundOptions {
    pub custom_glfw_path: String,
    pub wrapper_command: String,
    pub pre_launch_command: String,
    pub post_exit_command: String,
    pub enable_feral_gamemode: bool,
    pub enable_mango_hud: bool,
    pub use_discrete_gpu: bool,
    pub use_zink: bool,
    pub enable_environment_variables: bool,
    pub environment_variables: IndexMap<String, String>,
}

/// Option groups shared by the launcher and every instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedOptions {
    #[serde(flatten)]
    pub java: JavaOptions,
    #[serde(flatten)]
    pub resolution: ResolutionOptions,
    #[serde(flatten)]
    pub workarounds: WorkaroundOptions,
}

/// Global options, persisted as `<base>/options.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherOptions {
    pub meta_url: String,
    #[serde(flatten)]
    pub shared: SharedOptions,
}

impl Default for LauncherOptions {
    fn default() -> Self {
        Self {
            meta_url: DEFAULT_META_URL.to_string(),
            shared: SharedOptions::default(),
        }
    }
}

impl LauncherOptions {
    /// Load options, falling back to defaults when the file does not exist yet
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No options file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read options from {:?}", path))?;
        serde_json::from_str(&contents).context(format!("Failed to parse options from {:?}", path))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize options")?;
        write_atomic(path, &json).await
    }
}

/// Per-instance overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceOptions {
    pub use_launcher_java_option: bool,
    pub use_launcher_resolution_option: bool,
    pub use_launcher_workarounds: bool,
    #[serde(flatten)]
    pub shared: SharedOptions,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            use_launcher_java_option: true,
            use_launcher_resolution_option: true,
            use_launcher_workarounds: true,
            shared: SharedOptions::default(),
        }
    }
}

/// The option values a launch actually uses
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveOptions {
    pub java: JavaOptions,
    pub resolution: ResolutionOptions,
    pub workarounds: WorkaroundOptions,
}

impl EffectiveOptions {
    pub fn resolve(launcher: &LauncherOptions, instance: &InstanceOptions) -> Self {
        let pick = |use_launcher: bool| {
            if use_launcher {
                &launcher.shared
            } else {
                &instance.shared
            }
        };

        Self {
            java: pick(instance.use_launcher_java_option).java.clone(),
            resolution: pick(instance.use_launcher_resolution_option).resolution.clone(),
            workarounds: pick(instance.use_launcher_workarounds).workarounds.clone(),
        }
    }
}
