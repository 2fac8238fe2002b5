pub mod cache;
pub mod fetcher;
pub mod types;
pub mod version_file;

pub use cache::MetadataStore;
pub use fetcher::{MetaFetcher, DEFAULT_META_URL};
pub use types::*;
pub use version_file::{
    FabricLoaderFile, IntermediaryFile, LauncherTrait, LwjglFile, MinecraftFile,
    TypedVersionFile, VersionFile,
};
