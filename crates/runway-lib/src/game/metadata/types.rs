use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One piece of the launchable stack, identified by its catalog uid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Component {
    #[serde(rename = "net.minecraft")]
    Minecraft,
    #[serde(rename = "org.lwjgl")]
    Lwjgl2,
    #[serde(rename = "org.lwjgl3")]
    Lwjgl3,
    #[serde(rename = "net.fabricmc.fabric-loader")]
    FabricLoader,
    #[serde(rename = "net.fabricmc.intermediary")]
    FabricIntermediary,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Minecraft,
        Component::Lwjgl2,
        Component::Lwjgl3,
        Component::FabricLoader,
        Component::FabricIntermediary,
    ];

    pub fn uid(&self) -> &'static str {
        match self {
            Component::Minecraft => "net.minecraft",
            Component::Lwjgl2 => "org.lwjgl",
            Component::Lwjgl3 => "org.lwjgl3",
            Component::FabricLoader => "net.fabricmc.fabric-loader",
            Component::FabricIntermediary => "net.fabricmc.intermediary",
        }
    }

    pub fn from_uid(uid: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uid() == uid)
    }

    /// Windowing library components
    pub fn is_lwjgl(&self) -> bool {
        matches!(self, Component::Lwjgl2 | Component::Lwjgl3)
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uid())
    }
}

impl std::str::FromStr for Component {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uid(s).ok_or_else(|| anyhow::anyhow!("Unknown component uid: {}", s))
    }
}

/// Catalog root: `meta/index.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaIndex {
    #[serde(default)]
    pub format_version: u32,

    /// Unix milliseconds of the last successful network refresh
    #[serde(default)]
    pub latest_update: i64,

    #[serde(default)]
    pub packages: Vec<MetaPackage>,
}

impl MetaIndex {
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.latest_update)
    }
}

/// Catalog entry for one component; unknown uids are kept but never resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaPackage {
    pub uid: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl MetaPackage {
    pub fn component(&self) -> Option<Component> {
        Component::from_uid(&self.uid)
    }
}

/// Version list of a component: `meta/<uid>/index.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersions {
    #[serde(default)]
    pub format_version: u32,

    pub uid: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub versions: Vec<MetaVersion>,
}

/// Release channel of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    #[default]
    Release,
    Snapshot,
    Beta,
    Alpha,
    Experiment,
    OldBeta,
    OldAlpha,
}

impl VersionType {
    /// Value substituted for `${version_type}`
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionType::Release => "release",
            VersionType::Snapshot => "snapshot",
            VersionType::Beta | VersionType::OldBeta => "old_beta",
            VersionType::Alpha | VersionType::OldAlpha => "old_alpha",
            VersionType::Experiment => "experiment",
        }
    }
}

/// A single version entry with its dependency edges
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaVersion {
    pub version: String,

    #[serde(rename = "type", default)]
    pub version_type: VersionType,

    pub release_time: DateTime<Utc>,

    #[serde(default)]
    pub recommended: bool,

    #[serde(default)]
    pub requires: Vec<Requirement>,

    /// Expected sha256 of this version's file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    /// Mapping types available for this game version (e.g. `fabric`, `legacy-fabric`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compatible_intermediaries: Vec<String>,
}

impl MetaVersion {
    /// First requirement that points at a windowing library
    pub fn lwjgl_requirement(&self) -> Option<&Requirement> {
        self.requires
            .iter()
            .find(|r| r.component().is_some_and(|c| c.is_lwjgl()))
    }
}

/// Edge from a version to another component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub uid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggests: Option<String>,
}

impl Requirement {
    pub fn component(&self) -> Option<Component> {
        Component::from_uid(&self.uid)
    }

    /// The pinned version, preferring `equals` over `suggests`
    pub fn pinned_version(&self) -> Option<&str> {
        self.equals.as_deref().or(self.suggests.as_deref())
    }
}

/// How a `load` call was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Fresh on-disk catalog, no network I/O
    Cached,
    /// Catalog refreshed from the network and persisted
    Refreshed,
    /// Refresh failed; the previous catalog is still in use
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_uid_roundtrip() {
        for c in Component::ALL {
            assert_eq!(Component::from_uid(c.uid()), Some(c));
        }
        assert_eq!(Component::from_uid("com.mumfrey.liteloader"), None);
        let json = serde_json::to_string(&Component::Lwjgl3).unwrap();
        assert_eq!(json, "\"org.lwjgl3\"");
    }

    #[test]
    fn parses_version_entry() {
        let json = r#"{
            "version": "1.16.1",
            "type": "release",
            "releaseTime": "2020-06-24T10:31:40+00:00",
            "recommended": true,
            "requires": [{"uid": "org.lwjgl3", "suggests": "3.2.2"}],
            "sha256": "abc"
        }"#;
        let v: MetaVersion = serde_json::from_str(json).unwrap();
        assert!(v.recommended);
        let req = v.lwjgl_requirement().unwrap();
        assert_eq!(req.component(), Some(Component::Lwjgl3));
        assert_eq!(req.pinned_version(), Some("3.2.2"));
    }

    #[test]
    fn old_channels_parse() {
        let t: VersionType = serde_json::from_str("\"old_alpha\"").unwrap();
        assert_eq!(t, VersionType::OldAlpha);
        assert_eq!(t.as_str(), "old_alpha");
    }
}
