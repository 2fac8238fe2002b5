//! Persisted game instances
//!
//! An instance pins a game version, a windowing library version and an
//! optional loader stack. Each one owns `<base>/instances/<id>/`, whose
//! `.minecraft` subdirectory is the game directory.

pub mod manager;
pub mod options;

pub use manager::{InstanceManager, NewFabricInstance, NewInstance, DEFAULT_GROUP};
pub use options::{
    EffectiveOptions, InstanceOptions, JavaOptions, LauncherOptions, ResolutionOptions,
    SharedOptions, WorkaroundOptions,
};

use crate::game::metadata::Component;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Windowing library pinned by an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LwjglTarget {
    pub component: Component,
    pub version: String,
}

/// Loader stack pinned by an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricTarget {
    pub loader_version: String,
    /// Mapping flavour, e.g. `fabric` or `legacy-fabric`
    pub intermediary_type: String,
    pub intermediary_version: String,
}

/// Play-time statistics, updated on every launch and exit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayStats {
    pub total_play_seconds: u64,
    pub launch_count: u32,
    pub last_launched: Option<DateTime<Utc>>,
    pub last_exit_code: Option<i32>,
    pub last_exit_by_user: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Directory name and registry key
    pub id: String,
    pub display_name: String,
    /// Filled from the group key when loaded
    #[serde(skip)]
    pub group: String,
    pub minecraft_version: String,
    pub lwjgl: LwjglTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fabric: Option<FabricTarget>,
    #[serde(default)]
    pub options: InstanceOptions,
    #[serde(default)]
    pub stats: PlayStats,
    pub created_at: DateTime<Utc>,
}

impl Instance {
    pub fn instance_dir(&self, instances_dir: &Path) -> PathBuf {
        instances_dir.join(&self.id)
    }

    pub fn game_dir(&self, instances_dir: &Path) -> PathBuf {
        self.instance_dir(instances_dir).join(".minecraft")
    }

    /// Wiped and refilled before every launch
    pub fn natives_dir(&self, instances_dir: &Path) -> PathBuf {
        self.instance_dir(instances_dir).join("natives")
    }

    pub fn mods_dir(&self, instances_dir: &Path) -> PathBuf {
        self.game_dir(instances_dir).join("mods")
    }
}

/// A jar in the instance's mods folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModEntry {
    pub name: String,
    pub enabled: bool,
}

impl ModEntry {
    /// Line used in the launch preamble
    pub fn preamble_line(&self) -> String {
        if self.enabled {
            format!("   [✅] {}", self.name)
        } else {
            format!("   [❌] {} (disabled)", self.name)
        }
    }
}

/// Mods in `mods_dir`, sorted by name. `*.jar.disabled` files are listed as disabled.
pub async fn list_mods(mods_dir: &Path) -> Vec<ModEntry> {
    let mut mods = Vec::new();
    let mut entries = match tokio::fs::read_dir(mods_dir).await {
        Ok(entries) => entries,
        Err(_) => return mods,
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let file_name = entry.file_name().to_string_lossy().to_string();
        if let Some(name) = file_name.strip_suffix(".disabled") {
            if name.ends_with(".jar") {
                mods.push(ModEntry {
                    name: name.to_string(),
                    enabled: false,
                });
            }
        } else if file_name.ends_with(".jar") {
            mods.push(ModEntry {
                name: file_name,
                enabled: true,
            });
        }
    }

    mods.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    mods
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn mods_are_listed_with_state() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("sodium.jar"), b"").unwrap();
        std::fs::write(tmp.path().join("Lithium.jar.disabled"), b"").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"").unwrap();

        let mods = list_mods(tmp.path()).await;
        assert_eq!(
            mods.iter().map(ModEntry::preamble_line).collect::<Vec<_>>(),
            vec!["   [❌] Lithium.jar (disabled)", "   [✅] sodium.jar"]
        );
    }

    #[tokio::test]
    async fn missing_mods_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(list_mods(&tmp.path().join("mods")).await.is_empty());
    }
}
