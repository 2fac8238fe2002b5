/// Per-version payloads, one strongly-typed file per component family
use super::types::{Component, VersionType};
use crate::error::MetadataError;
use crate::game::launcher::version_parser::Library;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Launch-affecting flags a game version declares in `+traits`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherTrait {
    /// LWJGL on macOS must run on the first thread (`-XstartOnFirstThread`)
    FirstThreadOnMacOS,
    /// Pre-1.6 launch without window size arguments
    LegacyLaunch,
}

impl LauncherTrait {
    pub fn as_str(&self) -> &'static str {
        match self {
            LauncherTrait::FirstThreadOnMacOS => "FirstThreadOnMacOS",
            LauncherTrait::LegacyLaunch => "legacyLaunch",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Game core version file (`net.minecraft`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftFile {
    pub version: String,

    #[serde(rename = "type", default)]
    pub version_type: VersionType,

    pub main_class: String,

    /// Space separated game argument template with `${placeholder}` tokens
    #[serde(default)]
    pub minecraft_arguments: String,

    #[serde(default)]
    pub libraries: Vec<Library>,

    /// The game jar itself, appended last to the classpath
    pub main_jar: Library,

    pub asset_index: AssetIndexRef,

    #[serde(default)]
    pub compatible_java_majors: Vec<u32>,

    #[serde(rename = "+traits", default)]
    pub traits: Vec<String>,
}

impl MinecraftFile {
    pub fn has_trait(&self, t: LauncherTrait) -> bool {
        self.traits.iter().any(|s| s == t.as_str())
    }

    /// Lowest java major this version runs on, if declared
    pub fn min_java_major(&self) -> Option<u32> {
        self.compatible_java_majors.iter().copied().min()
    }
}

/// Windowing library version file (`org.lwjgl` / `org.lwjgl3`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LwjglFile {
    pub version: String,

    #[serde(default)]
    pub libraries: Vec<Library>,
}

/// Mod loader version file; its main class replaces the game's
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricLoaderFile {
    pub version: String,

    pub main_class: String,

    #[serde(default)]
    pub libraries: Vec<Library>,
}

/// Mapping library tagged with the intermediary type it provides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntermediaryLibrary {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub library: Library,
}

/// Name-mapping layer version file (`net.fabricmc.intermediary`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntermediaryFile {
    pub version: String,

    #[serde(default)]
    pub libraries: Vec<IntermediaryLibrary>,
}

impl IntermediaryFile {
    /// The mapping jar for one intermediary type
    pub fn library_for(&self, kind: &str) -> Option<&Library> {
        self.libraries
            .iter()
            .find(|l| l.kind == kind)
            .map(|l| &l.library)
    }
}

/// A parsed version file, dispatched by the component it belongs to
#[derive(Debug, Clone)]
pub enum VersionFile {
    Minecraft(MinecraftFile),
    Lwjgl(LwjglFile),
    FabricLoader(FabricLoaderFile),
    Intermediary(IntermediaryFile),
}

impl VersionFile {
    /// Parse the raw JSON of `component`'s version file
    pub fn parse(component: Component, json: &str) -> Result<Self> {
        let file = match component {
            Component::Minecraft => VersionFile::Minecraft(
                serde_json::from_str(json).context("Failed to parse game version file")?,
            ),
            Component::Lwjgl2 | Component::Lwjgl3 => VersionFile::Lwjgl(
                serde_json::from_str(json).context("Failed to parse LWJGL version file")?,
            ),
            Component::FabricLoader => VersionFile::FabricLoader(
                serde_json::from_str(json).context("Failed to parse loader version file")?,
            ),
            Component::FabricIntermediary => VersionFile::Intermediary(
                serde_json::from_str(json).context("Failed to parse intermediary version file")?,
            ),
        };
        Ok(file)
    }

    pub fn version(&self) -> &str {
        match self {
            VersionFile::Minecraft(f) => &f.version,
            VersionFile::Lwjgl(f) => &f.version,
            VersionFile::FabricLoader(f) => &f.version,
            VersionFile::Intermediary(f) => &f.version,
        }
    }
}

/// Typed access to one variant of [`VersionFile`]
pub trait TypedVersionFile: Clone + Send + Sync + 'static {
    const KIND: &'static str;

    fn from_file(file: &VersionFile) -> Option<&Self>;
}

macro_rules! typed_version_file {
    ($ty:ty, $variant:ident, $kind:literal) => {
        impl TypedVersionFile for $ty {
            const KIND: &'static str = $kind;

            fn from_file(file: &VersionFile) -> Option<&Self> {
                match file {
                    VersionFile::$variant(f) => Some(f),
                    _ => None,
                }
            }
        }
    };
}

typed_version_file!(MinecraftFile, Minecraft, "game");
typed_version_file!(LwjglFile, Lwjgl, "LWJGL");
typed_version_file!(FabricLoaderFile, FabricLoader, "loader");
typed_version_file!(IntermediaryFile, Intermediary, "intermediary");

/// Extract a typed file or report which component/version had the wrong shape
pub fn expect_typed<T: TypedVersionFile>(
    file: &VersionFile,
    component: Component,
) -> Result<T, MetadataError> {
    T::from_file(file)
        .cloned()
        .ok_or_else(|| MetadataError::UnexpectedFileType {
            component,
            version: file.version().to_string(),
            expected: T::KIND,
        })
}
