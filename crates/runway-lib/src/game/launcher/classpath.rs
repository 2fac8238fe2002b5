/// Classpath construction for the launcher
use crate::utils::platform::OsType;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Convert Maven coordinates to file path
/// Format: group:artifact:version[:classifier][@extension]
/// Example: "com.google.guava:guava:21.0" -> "com/google/guava/guava/21.0/guava-21.0.jar"
pub fn maven_to_path(coords: &str) -> Result<String> {
    let parts: Vec<&str> = coords.split(':').collect();

    if parts.len() < 3 || parts[..3].iter().any(|p| p.is_empty()) {
        anyhow::bail!("Invalid Maven coordinates: {}", coords);
    }

    let group = parts[0].replace('.', "/");
    let artifact = parts[1];
    let mut version = parts[2];
    let mut classifier = None;
    let mut extension = "jar";

    if parts.len() == 3 {
        if let Some((v, ext)) = version.split_once('@') {
            version = v;
            extension = ext;
        }
    } else {
        match parts[3].split_once('@') {
            Some((clf, ext)) => {
                classifier = Some(clf);
                extension = ext;
            }
            None => classifier = Some(parts[3]),
        }
    }

    let filename = match classifier {
        Some(clf) => format!("{}-{}-{}.{}", artifact, version, clf, extension),
        None => format!("{}-{}.{}", artifact, version, extension),
    };

    Ok(format!("{}/{}/{}/{}", group, artifact, version, filename))
}

/// Join classpath entries with the separator of `os`
pub fn build_classpath(entries: &[PathBuf], os: OsType) -> String {
    entries
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(os.classpath_separator())
}

/// Absolute form of a path for arguments; falls back to the input when it
/// cannot be canonicalized (e.g. not created yet)
pub fn absolute(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
