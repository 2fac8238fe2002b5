//! Game launcher: library resolution, natives and process lifecycle

pub mod arguments;
pub mod classpath;
pub mod logs;
pub mod natives;
pub mod process;
pub mod registry;
pub mod resolver;
pub mod types;
pub mod version_parser;

// Re-export commonly used types
pub use arguments::{build_game_arguments, substitute_variables, validate_template};
pub use classpath::{build_classpath, maven_to_path};
pub use logs::{LogCallback, LogStreamer, LogSubscription, LogViewer, MAX_LOG_ARCHIVED_COUNT};
pub use natives::extract_natives;
pub use process::{compose_command, compose_launch, launch_instance, InstanceProcess};
pub use registry::ProcessRegistry;
pub use resolver::{
    Contribution, ContributionSource, LibraryResolver, NativeArtifact, ResolvedLibrarySet,
};
pub use types::{CommandLine, LaunchPlan, ProcessState};
pub use version_parser::{evaluate_rules, Library, Rule};
