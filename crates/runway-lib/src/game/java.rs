//! Java runtime inspection
//!
//! A runtime is identified by the `release` properties file shipped two levels
//! above its executable (`<home>/bin/java` -> `<home>/release`). Runtimes
//! without one are probed by running `java -version` and reading stderr.

use crate::error::LaunchError;
use crate::utils::process::RunwayCommandExt;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::process::Stdio;

static QUOTED_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)""#).expect("static regex is valid"));

/// Vendor, version and bitness of one java executable
#[derive(Debug, Clone, Serialize)]
pub struct JavaInstallation {
    pub path: PathBuf,
    pub vendor: String,
    pub version: String,
    pub major_version: u32,
    /// `OS_ARCH` from the release file, or `64`/`32` from `-version` output
    pub arch: String,
}

impl PartialEq for JavaInstallation {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.vendor == other.vendor
    }
}

impl Eq for JavaInstallation {}

impl Hash for JavaInstallation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vendor.hash(state);
        self.version.hash(state);
    }
}

impl JavaInstallation {
    /// `x64` or `x86`, as shown in the launch preamble
    pub fn arch_label(&self) -> &'static str {
        if self.arch.contains("64") {
            "x64"
        } else {
            "x86"
        }
    }

    /// Refuse runtimes older than the lowest major a game version accepts
    pub fn ensure_compatible(&self, required: Option<u32>) -> Result<(), LaunchError> {
        match required {
            Some(required) if required > self.major_version => Err(LaunchError::IncompatibleJava {
                required,
                actual: self.major_version,
            }),
            _ => Ok(()),
        }
    }
}

/// Inspect the java executable at `path`
pub async fn probe_java(path: &Path) -> Result<JavaInstallation> {
    if !path.exists() {
        anyhow::bail!("Java executable not found: {:?}", path);
    }

    let release = path
        .parent()
        .and_then(|bin| bin.parent())
        .map(|home| home.join("release"));

    let mut info = None;
    if let Some(release) = release.filter(|p| p.exists()) {
        match tokio::fs::read_to_string(&release).await {
            Ok(contents) => info = parse_release(&contents),
            Err(e) => log::error!("Failed to find java information in {:?}: {}", release, e),
        }
    }

    let (vendor, version, arch) = match info {
        Some(info) => info,
        None => {
            let stderr = run_version_command(&runtime_executable(path)).await?;
            parse_version_output(&stderr)?
        }
    };

    let major_version = parse_major(&version)
        .context(format!("Could not parse Java major version from: {}", version))?;

    log::debug!(
        "Probed Java at {:?}: {} {} ({}, major {})",
        path,
        vendor,
        version,
        arch,
        major_version
    );

    Ok(JavaInstallation {
        path: path.to_path_buf(),
        vendor,
        version,
        major_version,
        arch,
    })
}

/// `javaw` prints nothing; ask its console sibling instead
fn runtime_executable(path: &Path) -> PathBuf {
    match path.file_name().and_then(|n| n.to_str()) {
        Some("javaw.exe") => path.with_file_name("java.exe"),
        Some("javaw") => path.with_file_name("java"),
        _ => path.to_path_buf(),
    }
}

async fn run_version_command(java: &Path) -> Result<String> {
    // Note: java -version outputs to STDERR unusually
    let output = tokio::process::Command::new(java)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .suppress_console()
        .output()
        .await
        .context("Failed to run java -version")?;

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    if stderr.trim().is_empty() {
        anyhow::bail!("No output from java -version");
    }
    Ok(stderr)
}

/// Read `IMPLEMENTOR`, `JAVA_VERSION` and `OS_ARCH` from a release file.
/// Without a `JAVA_VERSION` the file is useless and `None` is returned.
fn parse_release(contents: &str) -> Option<(String, String, String)> {
    let mut vendor = None;
    let mut version = None;
    let mut arch = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().replace('"', "");
        match key.trim() {
            "IMPLEMENTOR" => vendor = Some(value),
            "JAVA_VERSION" => version = Some(value),
            "OS_ARCH" => arch = Some(value),
            _ => {}
        }
    }

    Some((
        vendor.unwrap_or_else(|| "Unknown".to_string()),
        version?,
        arch.unwrap_or_else(|| "Unknown Architecture".to_string()),
    ))
}

/// Classify `java -version` stderr into (vendor, version, arch bits)
fn parse_version_output(stderr: &str) -> Result<(String, String, String)> {
    let lines: Vec<&str> = stderr.lines().collect();

    let version_line = lines
        .iter()
        .find(|l| l.contains("version"))
        .context("Cannot detect Java version")?;
    let version = QUOTED_VERSION
        .captures(version_line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .context(format!("Cannot parse Java version from: {}", version_line))?;

    let vendor_line = lines.iter().skip(1).copied().collect::<Vec<_>>().join(" ");
    let lower = vendor_line.to_lowercase();
    let vendor = if lower.contains("oracle") {
        "Oracle".to_string()
    } else if lower.contains("openjdk") {
        "OpenJDK".to_string()
    } else if lower.contains("adoptium") {
        "Eclipse Adoptium".to_string()
    } else if lower.contains("amazon") {
        "Amazon Corretto".to_string()
    } else if lower.contains("zulu") {
        "Zulu".to_string()
    } else if lower.contains("ibm") {
        "IBM".to_string()
    } else {
        vendor_line.chars().take(64).collect()
    };

    let arch_line = lines.iter().skip(2).copied().collect::<Vec<_>>().join(" ");
    let arch = if arch_line.to_lowercase().contains("64-bit") {
        "64"
    } else {
        "32"
    };

    Ok((vendor, version, arch.to_string()))
}

/// `1.8.0_311` -> 8, `17.0.1` -> 17, `21-ea` -> 21
pub fn parse_major(version: &str) -> Option<u32> {
    fn leading_digits(s: &str) -> Option<u32> {
        let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }

    let mut parts = version.split('.');
    let first = leading_digits(parts.next()?)?;
    if first == 1 {
        return parts.next().and_then(leading_digits);
    }
    Some(first)
}
