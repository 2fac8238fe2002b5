//! Shared launcher state
//!
//! [`LauncherContext`] owns everything that outlives a single launch: options,
//! the metadata store, the instance registry, the live-process registry and
//! the host-provided collaborators. Components receive it explicitly.

use crate::auth::AuthProvider;
use crate::error::{InstanceError, LaunchError};
use crate::game::instance::{InstanceManager, LauncherOptions};
use crate::game::launcher::process::{launch_instance, InstanceProcess};
use crate::game::launcher::registry::ProcessRegistry;
use crate::game::metadata::{MetaFetcher, MetadataStore};
use crate::utils::platform::Platform;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Receives launcher events, e.g. to forward them to a UI
pub trait EventSink: Send + Sync {
    fn broadcast(&self, event: &str, payload: serde_json::Value);
}

/// Event sink that only logs
#[derive(Debug, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn broadcast(&self, event: &str, payload: serde_json::Value) {
        log::debug!("Event {}: {}", event, payload);
    }
}

/// Primary display size, for "maximum resolution" launches
pub trait DisplayProbe: Send + Sync {
    fn primary_resolution(&self) -> Option<(u32, u32)>;
}

/// Display probe for headless hosts; launches fall back to the configured size
#[derive(Debug, Default)]
pub struct NoDisplay;

impl DisplayProbe for NoDisplay {
    fn primary_resolution(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Name and version printed at the top of every game log
#[derive(Debug, Clone)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "Runway".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// On-disk layout under the launcher's base directory
#[derive(Debug, Clone)]
pub struct LauncherPaths {
    base: PathBuf,
}

impl LauncherPaths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.base.join("instances")
    }

    pub fn instances_file(&self) -> PathBuf {
        self.base.join("instances.json")
    }

    pub fn options_file(&self) -> PathBuf {
        self.base.join("options.json")
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.base.join("meta")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.base.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.base.join("assets")
    }
}

pub struct LauncherContext {
    paths: LauncherPaths,
    options: RwLock<LauncherOptions>,
    metadata: Arc<MetadataStore>,
    registry: ProcessRegistry,
    instances: InstanceManager,
    auth: Arc<dyn AuthProvider>,
    events: Arc<dyn EventSink>,
    display: Arc<dyn DisplayProbe>,
    platform: Platform,
    app: AppInfo,
}

impl LauncherContext {
    /// Load options and the instance registry from `paths`. The metadata
    /// catalog is loaded lazily on first use.
    pub async fn initialize(paths: LauncherPaths, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let options = LauncherOptions::load(&paths.options_file()).await?;
        let fetcher = MetaFetcher::new(&options.meta_url)?;
        let metadata = Arc::new(MetadataStore::new(paths.meta_dir(), fetcher));
        let instances =
            InstanceManager::load(paths.instances_file(), paths.instances_dir()).await?;

        log::info!("Launcher context initialized at {:?}", paths.base());

        Ok(Self {
            paths,
            options: RwLock::new(options),
            metadata,
            registry: ProcessRegistry::new(),
            instances,
            auth,
            events: Arc::new(LogEventSink),
            display: Arc::new(NoDisplay),
            platform: Platform::current(),
            app: AppInfo::default(),
        })
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_display(mut self, display: Arc<dyn DisplayProbe>) -> Self {
        self.display = display;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_app_info(mut self, app: AppInfo) -> Self {
        self.app = app;
        self
    }

    /// Replace the metadata store, e.g. one pointed at another catalog
    pub fn with_metadata(mut self, metadata: Arc<MetadataStore>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn paths(&self) -> &LauncherPaths {
        &self.paths
    }

    /// Snapshot of the global options
    pub async fn options(&self) -> LauncherOptions {
        self.options.read().await.clone()
    }

    /// Replace and persist the global options
    pub async fn set_options(&self, options: LauncherOptions) -> Result<()> {
        options.save(&self.paths.options_file()).await?;
        *self.options.write().await = options;
        Ok(())
    }

    pub fn metadata(&self) -> &Arc<MetadataStore> {
        &self.metadata
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn instances(&self) -> &InstanceManager {
        &self.instances
    }

    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    pub fn events(&self) -> &dyn EventSink {
        self.events.as_ref()
    }

    pub fn display(&self) -> &dyn DisplayProbe {
        self.display.as_ref()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn app_info(&self) -> &AppInfo {
        &self.app
    }

    /// Launch an instance; see [`launch_instance`]
    pub async fn launch(self: &Arc<Self>, instance_id: &str) -> Result<Arc<InstanceProcess>, LaunchError> {
        launch_instance(self.clone(), instance_id).await
    }

    /// Ask a running instance to stop. Returns false when it is not running.
    pub async fn stop(&self, instance_id: &str) -> bool {
        match self.registry.get(instance_id).await {
            Some(process) => {
                process.exit();
                true
            }
            None => false,
        }
    }

    /// Delete an instance unless it is running
    pub async fn delete_instance(&self, instance_id: &str) -> Result<(), InstanceError> {
        self.instances.delete(instance_id, &self.registry).await
    }
}
