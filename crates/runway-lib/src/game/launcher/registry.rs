/// Registry of live game processes, one per instance
use crate::error::LaunchError;
use crate::game::launcher::process::InstanceProcess;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Live-process registry owned by the launcher context (in-memory only)
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    /// Map of instance_id -> live process
    processes: Arc<RwLock<HashMap<String, Arc<InstanceProcess>>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the instance's slot. Fails if a process is already registered,
    /// so two launches of one instance can never both proceed.
    pub async fn try_register(&self, process: Arc<InstanceProcess>) -> Result<(), LaunchError> {
        let mut processes = self.processes.write().await;
        let id = process.instance_id().to_string();
        if processes.contains_key(&id) {
            return Err(LaunchError::AlreadyRunning(id));
        }

        log::info!("Registering instance: {}", id);
        processes.insert(id, process);
        Ok(())
    }

    /// Release the instance's slot
    pub async fn unregister(&self, instance_id: &str) -> Option<Arc<InstanceProcess>> {
        log::info!("Unregistering instance: {}", instance_id);
        self.processes.write().await.remove(instance_id)
    }

    /// Get a specific instance's process
    pub async fn get(&self, instance_id: &str) -> Option<Arc<InstanceProcess>> {
        self.processes.read().await.get(instance_id).cloned()
    }

    /// Check if an instance is running
    pub async fn is_running(&self, instance_id: &str) -> bool {
        self.processes.read().await.contains_key(instance_id)
    }

    /// Ids of every registered instance
    pub async fn running_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.processes.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
