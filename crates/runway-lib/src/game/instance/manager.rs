/// Instance registry persisted as `instances.json` (group -> ordered instances)
use super::{FabricTarget, Instance, InstanceOptions, LwjglTarget};
use crate::error::InstanceError;
use crate::game::launcher::registry::ProcessRegistry;
use crate::game::launcher::InstanceProcess;
use crate::game::metadata::cache::write_atomic;
use crate::game::metadata::{Component, MetadataStore};
use anyhow::Context;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

pub const DEFAULT_GROUP: &str = "Default";

static INVALID_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}_.]").expect("static regex is valid"));

/// Loader stack requested for a new instance
#[derive(Debug, Clone, Default)]
pub struct NewFabricInstance {
    /// `None` picks the recommended loader build
    pub loader_version: Option<String>,
    /// `None` picks the first mapping type the game version supports
    pub intermediary_type: Option<String>,
}

/// Parameters for [`InstanceManager::create`]
#[derive(Debug, Clone)]
pub struct NewInstance {
    pub name: String,
    pub group: Option<String>,
    pub minecraft_version: String,
    pub fabric: Option<NewFabricInstance>,
}

type Groups = IndexMap<String, Vec<Instance>>;

pub struct InstanceManager {
    instances_file: PathBuf,
    instances_dir: PathBuf,
    groups: RwLock<Groups>,
}

impl InstanceManager {
    /// Load the registry; a missing file is an empty registry
    pub async fn load(instances_file: PathBuf, instances_dir: PathBuf) -> anyhow::Result<Self> {
        let mut groups: Groups = if instances_file.exists() {
            let contents = tokio::fs::read_to_string(&instances_file)
                .await
                .context(format!("Failed to read {:?}", instances_file))?;
            serde_json::from_str(&contents)
                .context(format!("Failed to parse {:?}", instances_file))?
        } else {
            IndexMap::new()
        };

        for (group, instances) in groups.iter_mut() {
            for instance in instances.iter_mut() {
                instance.group = group.clone();
            }
        }

        log::info!(
            "Loaded {} instances in {} groups",
            groups.values().map(Vec::len).sum::<usize>(),
            groups.len()
        );

        Ok(Self {
            instances_file,
            instances_dir,
            groups: RwLock::new(groups),
        })
    }

    pub fn instances_dir(&self) -> &Path {
        &self.instances_dir
    }

    pub async fn save(&self) -> anyhow::Result<()> {
        let json = {
            let groups = self.groups.read().await;
            serde_json::to_string_pretty(&*groups).context("Failed to serialize instances")?
        };
        write_atomic(&self.instances_file, &json).await
    }

    /// Snapshot of every group in order
    pub async fn groups(&self) -> IndexMap<String, Vec<Instance>> {
        self.groups.read().await.clone()
    }

    pub async fn all(&self) -> Vec<Instance> {
        self.groups.read().await.values().flatten().cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Option<Instance> {
        self.groups
            .read()
            .await
            .values()
            .flatten()
            .find(|i| i.id == id)
            .cloned()
    }

    /// Filesystem-safe id from a display name: spaces become underscores and
    /// anything but letters, digits, `_` and `.` is dropped
    pub fn sanitize_name(text: &str) -> String {
        INVALID_NAME_CHARS
            .replace_all(&text.trim().replace(' ', "_"), "")
            .to_string()
    }

    /// Id unused by the registry and on disk, numbered from 2 on collision
    fn unique_id(&self, base: &str, taken: &HashSet<String>) -> String {
        let free = |candidate: &str| {
            !taken.contains(candidate) && !self.instances_dir.join(candidate).exists()
        };
        if free(base) {
            return base.to_string();
        }
        let mut idx = 2;
        loop {
            let candidate = format!("{}-{}", base, idx);
            if free(&candidate) {
                return candidate;
            }
            idx += 1;
        }
    }

    /// Create an instance, pinning component versions from the catalog
    pub async fn create(
        &self,
        request: NewInstance,
        store: &MetadataStore,
    ) -> Result<Instance, InstanceError> {
        let base = Self::sanitize_name(&request.name);
        if base.is_empty() || !base.chars().any(char::is_alphanumeric) {
            return Err(InstanceError::InvalidName);
        }

        store.ensure_loaded().await?;
        let minecraft = store
            .find_version(Component::Minecraft, &request.minecraft_version)
            .await?;
        let requirement = minecraft.lwjgl_requirement().ok_or_else(|| {
            InstanceError::MissingWindowingRequirement {
                minecraft: minecraft.version.clone(),
            }
        })?;
        let (lwjgl_component, lwjgl_version) = store.resolve_requirement(requirement).await?;

        let fabric = match request.fabric {
            Some(fabric) => {
                let loader_version = match fabric.loader_version {
                    Some(v) => v,
                    None => store
                        .recommended(Component::FabricLoader)
                        .await?
                        .map(|v| v.version)
                        .ok_or_else(|| {
                            InstanceError::Other(anyhow::anyhow!("No fabric loader versions available"))
                        })?,
                };
                let intermediary_type = fabric
                    .intermediary_type
                    .or_else(|| minecraft.compatible_intermediaries.first().cloned())
                    .unwrap_or_else(|| "fabric".to_string());
                Some(FabricTarget {
                    loader_version,
                    intermediary_type,
                    // Mappings are published per game version
                    intermediary_version: minecraft.version.clone(),
                })
            }
            None => None,
        };

        let id = {
            let groups = self.groups.read().await;
            let taken: HashSet<String> = groups.values().flatten().map(|i| i.id.clone()).collect();
            self.unique_id(&base, &taken)
        };

        let instance = Instance {
            id,
            display_name: request.name.trim().to_string(),
            group: request.group.unwrap_or_else(|| DEFAULT_GROUP.to_string()),
            minecraft_version: minecraft.version.clone(),
            lwjgl: LwjglTarget {
                component: lwjgl_component,
                version: lwjgl_version.version,
            },
            fabric,
            options: InstanceOptions::default(),
            stats: Default::default(),
            created_at: Utc::now(),
        };

        self.add(instance.clone()).await?;
        log::info!(
            "Created instance {} ({} {})",
            instance.id,
            instance.minecraft_version,
            if instance.fabric.is_some() { "fabric" } else { "vanilla" }
        );
        Ok(instance)
    }

    /// Insert an instance into its group, create its game directory and persist
    pub async fn add(&self, mut instance: Instance) -> Result<(), InstanceError> {
        if instance.group.trim().is_empty() {
            instance.group = DEFAULT_GROUP.to_string();
        }

        let game_dir = instance.game_dir(&self.instances_dir);
        tokio::fs::create_dir_all(&game_dir)
            .await
            .context(format!("Failed to create {:?}", game_dir))?;

        {
            let mut groups = self.groups.write().await;
            if groups.values().flatten().any(|i| i.id == instance.id) {
                return Err(InstanceError::Other(anyhow::anyhow!(
                    "Instance {} already exists",
                    instance.id
                )));
            }
            groups
                .entry(instance.group.clone())
                .or_default()
                .push(instance);
        }
        self.save().await?;
        Ok(())
    }

    /// Remove an instance and its directory. Rejected while it is running.
    ///
    /// The id's registry slot is held for the whole removal, so it cannot be
    /// launched meanwhile. The registry entry only goes once the directory
    /// is gone.
    pub async fn delete(&self, id: &str, registry: &ProcessRegistry) -> Result<(), InstanceError> {
        registry
            .try_register(Arc::new(InstanceProcess::new(id)))
            .await
            .map_err(|_| InstanceError::Running(id.to_string()))?;

        let result = self.remove(id).await;
        registry.unregister(id).await;
        result
    }

    async fn remove(&self, id: &str) -> Result<(), InstanceError> {
        if self.get(id).await.is_none() {
            return Err(InstanceError::NotFound(id.to_string()));
        }

        let dir = self.instances_dir.join(id);
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir)
                .await
                .context(format!("Failed to delete {:?}", dir))?;
        }

        {
            let mut groups = self.groups.write().await;
            for instances in groups.values_mut() {
                instances.retain(|i| i.id != id);
            }
            groups.retain(|_, instances| !instances.is_empty());
        }

        self.save().await?;
        log::info!("Deleted instance {}", id);
        Ok(())
    }

    /// Change the display name; the id and directory stay the same
    pub async fn rename(&self, id: &str, display_name: &str) -> Result<(), InstanceError> {
        if Self::sanitize_name(display_name).is_empty() {
            return Err(InstanceError::InvalidName);
        }
        self.update(id, |instance| {
            instance.display_name = display_name.trim().to_string()
        })
        .await
    }

    /// Move an instance to the end of another group; empty groups are dropped
    pub async fn move_to_group(&self, id: &str, group: &str) -> Result<(), InstanceError> {
        {
            let mut groups = self.groups.write().await;
            let mut moved = None;
            for instances in groups.values_mut() {
                if let Some(pos) = instances.iter().position(|i| i.id == id) {
                    moved = Some(instances.remove(pos));
                    break;
                }
            }
            let mut instance = moved.ok_or_else(|| InstanceError::NotFound(id.to_string()))?;
            instance.group = group.to_string();
            groups.entry(group.to_string()).or_default().push(instance);
            groups.retain(|_, instances| !instances.is_empty());
        }
        self.save().await?;
        Ok(())
    }

    pub async fn update_options(&self, id: &str, options: InstanceOptions) -> Result<(), InstanceError> {
        self.update(id, move |instance| instance.options = options).await
    }

    pub async fn record_launch(&self, id: &str, at: DateTime<Utc>) -> Result<(), InstanceError> {
        self.update(id, |instance| {
            instance.stats.launch_count += 1;
            instance.stats.last_launched = Some(at);
        })
        .await
    }

    /// Add the session's play time and remember how it ended
    pub async fn record_exit(
        &self,
        id: &str,
        started_at: DateTime<Utc>,
        exit_code: i32,
        by_user: bool,
    ) -> Result<(), InstanceError> {
        let seconds = (Utc::now() - started_at).num_seconds().max(0) as u64;
        log::info!("Updating playtime for instance {}: {} seconds", id, seconds);

        self.update(id, |instance| {
            instance.stats.total_play_seconds += seconds;
            instance.stats.last_exit_code = Some(exit_code);
            instance.stats.last_exit_by_user = by_user;
        })
        .await
    }

    async fn update<F>(&self, id: &str, f: F) -> Result<(), InstanceError>
    where
        F: FnOnce(&mut Instance),
    {
        {
            let mut groups = self.groups.write().await;
            let instance = groups
                .values_mut()
                .flatten()
                .find(|i| i.id == id)
                .ok_or_else(|| InstanceError::NotFound(id.to_string()))?;
            f(instance);
        }
        self.save().await?;
        Ok(())
    }
}
