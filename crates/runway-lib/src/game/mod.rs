pub mod instance;
pub mod java;
pub mod launcher;
pub mod metadata;

// Re-export commonly used types
pub use instance::{Instance, InstanceManager};
pub use java::{probe_java, JavaInstallation};
pub use launcher::{InstanceProcess, LaunchPlan, ProcessState};
pub use metadata::{Component, LoadOutcome, MetadataStore};
