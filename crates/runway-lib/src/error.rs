/// Error types surfaced at module boundaries
use crate::auth::AuthError;
use crate::game::metadata::Component;

/// Catalog and version-file failures
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("No version catalog is available; a first refresh from the network is required")]
    NoCatalog,

    #[error("{component} version {version} is not in the catalog")]
    VersionNotFound { component: Component, version: String },

    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Version file for {component} {version} is not a {expected} file")]
    UnexpectedFileType {
        component: Component,
        version: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Library and native resolution failures
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Library: {library_path} does not exist!")]
    LibraryNotFound { library_path: String },

    #[error("Native library for {library} does not exist at {path}")]
    NativeNotFound { library: String, path: String },

    #[error("Invalid Maven coordinates: {coords}")]
    InvalidMavenCoords { coords: String },

    #[error("Failed to extract natives from {path}")]
    Extraction {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Everything that can stop an instance from launching
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Java has not been properly selected. Try changing your Java path")]
    JavaNotConfigured,

    #[error("Failed to inspect Java at {path}: {reason}")]
    JavaProbe { path: String, reason: String },

    #[error("Required minimum Java version is {required}, while you are using {actual}")]
    IncompatibleJava { required: u32, actual: u32 },

    #[error("No account found, make sure you have added your account.")]
    NoAccount,

    #[error("Authentication Failed. Try removing and adding your Minecraft account again. ({0})")]
    Authentication(#[from] AuthError),

    #[error("Instance {0} is already running")]
    AlreadyRunning(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("{0} version meta is not found")]
    VersionFileMissing(String),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Failed to spawn game process")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LaunchError {
    /// True for authentication failures, which the caller reports differently
    pub fn is_auth_error(&self) -> bool {
        matches!(self, LaunchError::Authentication(_))
    }
}

/// Instance registry failures
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("Instance not found: {0}")]
    NotFound(String),

    #[error("Instance {0} is running and cannot be modified")]
    Running(String),

    #[error("Instance name must contain at least one letter or digit")]
    InvalidName,

    #[error("{minecraft} does not declare a windowing library requirement")]
    MissingWindowingRequirement { minecraft: String },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
