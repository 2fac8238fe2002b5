//! Instance launch core for a Minecraft speedrun launcher.
//!
//! Resolves an instance's component stack from a version catalog, merges the
//! declared libraries into one classpath, prepares native libraries, checks
//! the Java runtime and runs the game process while streaming its output.
//!
//! Logging goes through the `log` facade; the host installs the logger.

pub mod auth;
pub mod context;
pub mod error;
pub mod game;
pub mod utils;

pub use context::{AppInfo, DisplayProbe, EventSink, LauncherContext, LauncherPaths};
pub use error::{InstanceError, LaunchError, MetadataError, ResolveError};
