/// Host platform detection and platform-key matching for native classifiers
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system family as named in library rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsType {
    Windows,
    Linux,
    #[serde(rename = "osx")]
    MacOS,
}

impl OsType {
    /// Detect the current OS
    pub fn current() -> Self {
        #[cfg(target_os = "windows")]
        return OsType::Windows;

        #[cfg(target_os = "macos")]
        return OsType::MacOS;

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        return OsType::Linux;
    }

    /// Get the OS name as a string (for rule matching)
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Windows => "windows",
            OsType::Linux => "linux",
            OsType::MacOS => "osx",
        }
    }

    /// Accepts both spellings used in catalogs for macOS
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "windows" => Some(OsType::Windows),
            "linux" => Some(OsType::Linux),
            "osx" | "macos" | "mac-os" => Some(OsType::MacOS),
            _ => None,
        }
    }

    /// Get the classpath separator for this OS
    pub fn classpath_separator(&self) -> &'static str {
        match self {
            OsType::Windows => ";",
            _ => ":",
        }
    }

    /// Program and flag used to hand a command line to the platform shell
    pub fn shell_flags(&self) -> (&'static str, &'static str) {
        match self {
            OsType::Windows => ("cmd", "/c"),
            _ => ("sh", "-c"),
        }
    }

    /// Rewrites `$VAR` / `${VAR}` references into the platform shell's syntax.
    ///
    /// Hook commands are written POSIX-style; `cmd` expects `%VAR%`.
    pub fn shell_command_text(&self, command: &str) -> String {
        match self {
            OsType::Windows => ENV_REFERENCE
                .replace_all(command, |caps: &regex::Captures| {
                    let name = caps
                        .get(1)
                        .or_else(|| caps.get(2))
                        .map(|m| m.as_str())
                        .unwrap_or_default();
                    format!("%{}%", name)
                })
                .into_owned(),
            _ => command.to_string(),
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static ENV_REFERENCE: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
    regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("static regex is valid")
});

/// CPU architecture as named in platform keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    X86,
    Arm64,
    Arm32,
}

impl Arch {
    pub fn current() -> Self {
        #[cfg(target_arch = "x86_64")]
        return Arch::X64;

        #[cfg(target_arch = "x86")]
        return Arch::X86;

        #[cfg(target_arch = "aarch64")]
        return Arch::Arm64;

        #[cfg(target_arch = "arm")]
        return Arch::Arm32;

        #[cfg(not(any(
            target_arch = "x86_64",
            target_arch = "x86",
            target_arch = "aarch64",
            target_arch = "arm"
        )))]
        return if cfg!(target_pointer_width = "32") {
            Arch::X86
        } else {
            Arch::X64
        };
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::X86 => "x86",
            Arch::Arm64 => "arm64",
            Arch::Arm32 => "arm32",
        }
    }

    /// Pointer width substituted for `${arch}` in classifier templates
    pub fn bits(&self) -> u8 {
        match self {
            Arch::X64 | Arch::Arm64 => 64,
            Arch::X86 | Arch::Arm32 => 32,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "x64" | "x86_64" | "amd64" => Some(Arch::X64),
            "x86" | "i386" | "i686" => Some(Arch::X86),
            "arm64" | "aarch64" => Some(Arch::Arm64),
            "arm32" | "arm" => Some(Arch::Arm32),
            _ => None,
        }
    }
}

/// An OS plus architecture pair. Launch code takes one explicitly so tests can
/// resolve libraries for a platform other than the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: OsType,
    pub arch: Arch,
}

impl Platform {
    pub fn new(os: OsType, arch: Arch) -> Self {
        Self { os, arch }
    }

    pub fn current() -> Self {
        Self::new(OsType::current(), Arch::current())
    }

    /// Parse a native platform key such as `linux`, `mac-os-arm64` or
    /// `windows-x86` into its OS and optional architecture constraint.
    pub fn parse_key(key: &str) -> Option<(OsType, Option<Arch>)> {
        if let Some(os) = OsType::from_name(key) {
            return Some((os, None));
        }
        let (os_part, arch_part) = key.rsplit_once('-')?;
        let os = OsType::from_name(os_part)?;
        let arch = Arch::from_name(arch_part)?;
        Some((os, Some(arch)))
    }

    /// Pick the native classifier for this platform from an ordered key map.
    ///
    /// Keys carrying an architecture beat bare OS keys; among equally specific
    /// keys the last declared one wins. `${arch}` is replaced by the pointer width.
    pub fn select_native<'a, I>(&self, natives: I) -> Option<String>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut best: Option<(bool, &String)> = None;
        for (key, classifier) in natives {
            let Some((os, arch)) = Self::parse_key(key) else {
                continue;
            };
            if os != self.os || arch.is_some_and(|a| a != self.arch) {
                continue;
            }
            let specific = arch.is_some();
            match best {
                Some((best_specific, _)) if best_specific && !specific => {}
                _ => best = Some((specific, classifier)),
            }
        }
        best.map(|(_, classifier)| classifier.replace("${arch}", &self.arch.bits().to_string()))
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}
