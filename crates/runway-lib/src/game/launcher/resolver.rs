/// Merging library lists from several version files into one launch set
use crate::error::ResolveError;
use crate::game::launcher::version_parser::Library;
use crate::utils::platform::Platform;
use crate::utils::version::compare_versions;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Which version file a library list came from. The declaration order is the
/// merge priority: later sources win version ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContributionSource {
    /// The game version itself
    Core,
    /// The windowing library (LWJGL 2 or 3)
    Windowing,
    /// The mod loader
    Loader,
    /// The name-mapping layer
    Mapping,
}

/// One version file's library list
#[derive(Debug, Clone)]
pub struct Contribution {
    pub source: ContributionSource,
    pub libraries: Vec<Library>,
}

impl Contribution {
    pub fn new(source: ContributionSource, libraries: Vec<Library>) -> Self {
        Self { source, libraries }
    }
}

/// A native jar to unpack before launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeArtifact {
    pub library: String,
    pub path: PathBuf,
    pub exclude: Vec<String>,
}

/// Per-launch library output: classpath jars in order, native jars separately
#[derive(Debug, Clone, Default)]
pub struct ResolvedLibrarySet {
    pub classpath: Vec<PathBuf>,
    pub natives: Vec<NativeArtifact>,
}

pub struct LibraryResolver {
    libraries_dir: PathBuf,
    platform: Platform,
}

impl LibraryResolver {
    pub fn new(libraries_dir: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            libraries_dir: libraries_dir.into(),
            platform,
        }
    }

    pub fn libraries_dir(&self) -> &Path {
        &self.libraries_dir
    }

    /// Platform-filter and deduplicate contributed libraries.
    ///
    /// Each `group:artifact` identity keeps its highest version; on equal
    /// versions the entry from the later source (or later in the same list)
    /// wins. Output is in order of each identity's first appearance.
    pub fn merge(&self, mut contributions: Vec<Contribution>) -> Vec<Library> {
        contributions.sort_by_key(|c| c.source);

        let mut selected: IndexMap<String, Library> = IndexMap::new();
        for contribution in contributions {
            for library in contribution.libraries {
                if !library.applies_to(&self.platform) {
                    log::debug!("Library {} excluded by platform rules", library.name);
                    continue;
                }

                let identity = library.identity();
                match selected.get_mut(&identity) {
                    Some(current) => {
                        match compare_versions(library.version(), current.version()) {
                            Ordering::Less => log::debug!(
                                "Keeping {} over older {}",
                                current.name,
                                library.name
                            ),
                            _ => {
                                log::debug!("Replacing {} with {}", current.name, library.name);
                                *current = library;
                            }
                        }
                    }
                    None => {
                        selected.insert(identity, library);
                    }
                }
            }
        }

        selected.into_values().collect()
    }

    /// Merge, then resolve every survivor to files on disk
    pub fn resolve(&self, contributions: Vec<Contribution>) -> Result<ResolvedLibrarySet, ResolveError> {
        let merged = self.merge(contributions);
        let mut set = ResolvedLibrarySet::default();

        for library in &merged {
            if library.is_native_coordinate() {
                let path = self.main_jar(library)?;
                self.require_native(library, &path)?;
                set.natives.push(NativeArtifact {
                    library: library.name.clone(),
                    path,
                    exclude: library.extract_excludes().to_vec(),
                });
                continue;
            }

            if library.has_main_artifact() {
                let path = self.main_jar(library)?;
                if !path.exists() {
                    return Err(ResolveError::LibraryNotFound {
                        library_path: path.to_string_lossy().to_string(),
                    });
                }
                set.classpath.push(path);
            }

            let native = library
                .native_path(&self.platform)
                .map_err(|_| ResolveError::InvalidMavenCoords {
                    coords: library.name.clone(),
                })?;
            if let Some(relative) = native {
                let path = self.libraries_dir.join(relative);
                self.require_native(library, &path)?;
                set.natives.push(NativeArtifact {
                    library: library.name.clone(),
                    path,
                    exclude: library.extract_excludes().to_vec(),
                });
            }
        }

        log::info!(
            "Resolved {} classpath libraries and {} native jars",
            set.classpath.len(),
            set.natives.len()
        );
        Ok(set)
    }

    /// Absolute path of a library's main jar
    pub fn main_jar(&self, library: &Library) -> Result<PathBuf, ResolveError> {
        library
            .main_path()
            .map(|relative| self.libraries_dir.join(relative))
            .map_err(|_| ResolveError::InvalidMavenCoords {
                coords: library.name.clone(),
            })
    }

    fn require_native(&self, library: &Library, path: &Path) -> Result<(), ResolveError> {
        if path.exists() {
            Ok(())
        } else {
            Err(ResolveError::NativeNotFound {
                library: library.name.clone(),
                path: path.to_string_lossy().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::platform::{Arch, OsType};

    fn lib(name: &str) -> Library {
        serde_json::from_str(&format!(r#"{{"name": "{}"}}"#, name)).unwrap()
    }

    fn names(libs: &[Library]) -> Vec<&str> {
        libs.iter().map(|l| l.name.as_str()).collect()
    }

    fn resolver() -> LibraryResolver {
        LibraryResolver::new("/libs", Platform::new(OsType::Linux, Arch::X64))
    }

    #[test]
    fn higher_version_wins_regardless_of_source() {
        let merged = resolver().merge(vec![
            Contribution::new(
                ContributionSource::Core,
                vec![lib("org.ow2.asm:asm:9.1"), lib("com.google.guava:guava:21.0")],
            ),
            Contribution::new(ContributionSource::Loader, vec![lib("org.ow2.asm:asm:8.0")]),
        ]);
        assert_eq!(
            names(&merged),
            vec!["org.ow2.asm:asm:9.1", "com.google.guava:guava:21.0"]
        );
    }

    #[test]
    fn later_source_wins_ties_and_keeps_first_position() {
        let mut loader_asm = lib("org.ow2.asm:asm:9.1");
        loader_asm.url = Some("https://maven.fabricmc.net/".to_string());

        let merged = resolver().merge(vec![
            Contribution::new(ContributionSource::Loader, vec![loader_asm]),
            Contribution::new(
                ContributionSource::Core,
                vec![lib("org.ow2.asm:asm:9.1"), lib("com.google.guava:guava:21.0")],
            ),
        ]);

        // call order does not matter: Core is merged before Loader
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "org.ow2.asm:asm:9.1");
        assert_eq!(merged[0].url.as_deref(), Some("https://maven.fabricmc.net/"));
        assert_eq!(merged[1].name, "com.google.guava:guava:21.0");
    }

    #[test]
    fn platform_rules_filter_before_dedup() {
        let mac_only: Library = serde_json::from_str(
            r#"{"name": "org.lwjgl:lwjgl:3.3.1", "rules": [{"action": "allow", "os": {"name": "osx"}}]}"#,
        )
        .unwrap();
        let merged = resolver().merge(vec![Contribution::new(
            ContributionSource::Windowing,
            vec![lib("org.lwjgl:lwjgl:3.2.2"), mac_only],
        )]);
        assert_eq!(names(&merged), vec!["org.lwjgl:lwjgl:3.2.2"]);
    }

    #[test]
    fn per_platform_native_coordinates_do_not_collapse() {
        let merged = resolver().merge(vec![Contribution::new(
            ContributionSource::Windowing,
            vec![
                lib("org.lwjgl:lwjgl:3.2.2"),
                lib("org.lwjgl:lwjgl:3.2.2:natives-linux"),
                lib("org.lwjgl:lwjgl:3.2.2:natives-linux-arm64"),
            ],
        )]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn missing_library_names_the_path() {
        let err = resolver()
            .resolve(vec![Contribution::new(
                ContributionSource::Core,
                vec![lib("com.example:missing:1.0")],
            )])
            .unwrap_err();
        match err {
            ResolveError::LibraryNotFound { library_path } => {
                assert!(library_path.ends_with("com/example/missing/1.0/missing-1.0.jar"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
