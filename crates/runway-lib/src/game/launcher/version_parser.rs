/// Library declarations shared by every version file
use crate::game::launcher::classpath::maven_to_path;
use crate::utils::platform::{Arch, OsType, Platform};
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Library definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    /// Maven coordinates
    pub name: String,

    /// Download information
    #[serde(default)]
    pub downloads: LibraryDownloads,

    /// Custom Maven repository URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Rules for conditional inclusion
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,

    /// Platform key -> native classifier, in declaration order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub natives: IndexMap<String, String>,

    /// Extract rules for natives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractRules>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub classifiers: HashMap<String, Artifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Artifact {
    /// Get the artifact path, either from the field or derived from Maven coordinates
    pub fn get_path(&self, maven_name: &str) -> Result<String> {
        match self.path {
            Some(ref path) => Ok(path.clone()),
            None => maven_to_path(maven_name),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Rule for conditional libraries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub action: RuleAction,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

impl OsRule {
    fn matches(&self, platform: &Platform) -> bool {
        if let Some(ref name) = self.name {
            if OsType::from_name(name) != Some(platform.os) {
                return false;
            }
        }

        if let Some(ref arch) = self.arch {
            if Arch::from_name(arch) != Some(platform.arch) {
                return false;
            }
        }

        // OS version is a regex over the host's long version string; it can
        // only be evaluated for the host itself.
        if let Some(ref version_expr) = self.version {
            if *platform != Platform::current() {
                return false;
            }
            let host_version = sysinfo::System::long_os_version().unwrap_or_default();
            match regex::Regex::new(version_expr) {
                Ok(re) => return re.is_match(&host_version),
                Err(_) => return false,
            }
        }

        true
    }
}

/// Evaluate a rule list: empty means allowed, otherwise the last matching rule decides
pub fn evaluate_rules(rules: &[Rule], platform: &Platform) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allow = false;
    for rule in rules {
        let matches = rule.os.as_ref().map_or(true, |os| os.matches(platform));
        if matches {
            allow = rule.action == RuleAction::Allow;
        }
    }
    allow
}

impl Library {
    pub fn applies_to(&self, platform: &Platform) -> bool {
        evaluate_rules(&self.rules, platform)
    }

    /// Classifier carried by the coordinate itself (`g:a:v:classifier`)
    pub fn coordinate_classifier(&self) -> Option<&str> {
        let mut parts = self.name.split(':');
        let classifier = parts.nth(3)?;
        Some(classifier.split_once('@').map_or(classifier, |(c, _)| c))
    }

    /// A native jar declared as its own coordinate, e.g. `org.lwjgl:lwjgl:3.2.2:natives-linux`
    pub fn is_native_coordinate(&self) -> bool {
        self.coordinate_classifier()
            .is_some_and(|c| c.starts_with("natives"))
    }

    /// Whether the library ships a main jar for the classpath (or, for native
    /// coordinates, for extraction). Libraries that only declare per-OS natives have none.
    pub fn has_main_artifact(&self) -> bool {
        self.downloads.artifact.is_some() || self.natives.is_empty()
    }

    /// Dedup identity: `group:artifact`, or `group:artifact:classifier` for native coordinates
    pub fn identity(&self) -> String {
        let mut parts = self.name.split(':');
        let group = parts.next().unwrap_or_default();
        let artifact = parts.next().unwrap_or_default();
        match self.coordinate_classifier() {
            Some(classifier) if self.is_native_coordinate() => {
                format!("{}:{}:{}", group, artifact, classifier)
            }
            _ => format!("{}:{}", group, artifact),
        }
    }

    /// Version component of the coordinate
    pub fn version(&self) -> &str {
        self.name.split(':').nth(2).unwrap_or_default()
    }

    /// Relative path of the main jar under the libraries directory
    pub fn main_path(&self) -> Result<String> {
        match self.downloads.artifact {
            Some(ref artifact) => artifact.get_path(&self.name),
            None => maven_to_path(&self.name),
        }
    }

    /// Relative path of the native jar selected for `platform`, if any
    pub fn native_path(&self, platform: &Platform) -> Result<Option<String>> {
        let Some(classifier) = platform.select_native(&self.natives) else {
            return Ok(None);
        };

        let coords = format!("{}:{}", self.name, classifier);
        let path = match self.downloads.classifiers.get(&classifier) {
            Some(artifact) => artifact.get_path(&coords)?,
            None => maven_to_path(&coords)?,
        };
        Ok(Some(path))
    }

    pub fn extract_excludes(&self) -> &[String] {
        self.extract
            .as_ref()
            .map(|e| e.exclude.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib(json: &str) -> Library {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn rules_follow_last_match() {
        let l = lib(r#"{
            "name": "ca.weblite:java-objc-bridge:1.0.0",
            "rules": [{"action": "allow", "os": {"name": "osx"}}]
        }"#);
        assert!(l.applies_to(&Platform::new(OsType::MacOS, Arch::Arm64)));
        assert!(!l.applies_to(&Platform::new(OsType::Linux, Arch::X64)));

        let l = lib(r#"{
            "name": "org.lwjgl.lwjgl:lwjgl:2.9.4",
            "rules": [{"action": "allow"}, {"action": "disallow", "os": {"name": "osx"}}]
        }"#);
        assert!(l.applies_to(&Platform::new(OsType::Windows, Arch::X64)));
        assert!(!l.applies_to(&Platform::new(OsType::MacOS, Arch::X64)));
    }

    #[test]
    fn no_rules_is_unrestricted() {
        let l = lib(r#"{"name": "com.google.guava:guava:21.0"}"#);
        assert!(l.applies_to(&Platform::new(OsType::Linux, Arch::Arm32)));
        assert!(l.has_main_artifact());
        assert_eq!(l.identity(), "com.google.guava:guava");
        assert_eq!(l.version(), "21.0");
    }

    #[test]
    fn native_coordinates_keep_their_classifier_identity() {
        let l = lib(r#"{"name": "org.lwjgl:lwjgl:3.2.2:natives-linux"}"#);
        assert!(l.is_native_coordinate());
        assert_eq!(l.identity(), "org.lwjgl:lwjgl:natives-linux");
        assert_eq!(l.version(), "3.2.2");
    }

    #[test]
    fn native_path_uses_classifier_download() {
        let l = lib(r#"{
            "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
            "downloads": {
                "classifiers": {
                    "natives-windows-64": {"path": "custom/platform-win64.jar"}
                }
            },
            "natives": {"linux": "natives-linux", "windows": "natives-windows-${arch}"}
        }"#);
        assert!(!l.has_main_artifact());

        let win = Platform::new(OsType::Windows, Arch::X64);
        assert_eq!(
            l.native_path(&win).unwrap().as_deref(),
            Some("custom/platform-win64.jar")
        );

        let linux = Platform::new(OsType::Linux, Arch::X64);
        assert_eq!(
            l.native_path(&linux).unwrap().as_deref(),
            Some("org/lwjgl/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-natives-linux.jar")
        );

        let mac = Platform::new(OsType::MacOS, Arch::X64);
        assert_eq!(l.native_path(&mac).unwrap(), None);
    }
}
