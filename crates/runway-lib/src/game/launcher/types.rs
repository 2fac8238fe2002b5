/// Core types for game launching
use crate::auth::Account;
use crate::game::instance::EffectiveOptions;
use crate::game::java::JavaInstallation;
use crate::game::launcher::classpath::{absolute, build_classpath};
use crate::utils::platform::OsType;
use serde::Serialize;
use std::path::PathBuf;

/// Lifecycle of one launch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessState {
    NotStarted,
    Starting,
    Running { pid: u32 },
    Exited { code: i32, by_user: bool },
}

impl ProcessState {
    pub fn is_exited(&self) -> bool {
        matches!(self, ProcessState::Exited { .. })
    }
}

/// Everything decided before spawning the game
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub instance_id: String,
    pub instance_name: String,
    pub minecraft_version: String,

    /// Instance directory (`INST_DIR`)
    pub instance_dir: PathBuf,

    /// Working directory of the game (`INST_MC_DIR`)
    pub game_dir: PathBuf,

    /// Freshly extracted native libraries
    pub natives_dir: PathBuf,

    pub java: JavaInstallation,
    pub account: Account,
    pub options: EffectiveOptions,

    /// Loader main class when a loader is installed, else the game's
    pub main_class: String,

    /// Heap flags, user arguments and platform flags, in order
    pub jvm_args: Vec<String>,

    /// Libraries in resolution order, game jar last
    pub classpath: Vec<PathBuf>,

    pub game_args: Vec<String>,
    pub os: OsType,
}

impl LaunchPlan {
    /// `[java, -Djava.library.path=.., jvm args.., -cp, classpath, main class, game args..]`
    ///
    /// Paths are made absolute: the game runs from its own directory.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.jvm_args.len() + self.game_args.len() + 5);
        args.push(absolute(&self.java.path).to_string_lossy().to_string());
        args.push(format!(
            "-Djava.library.path={}",
            absolute(&self.natives_dir).to_string_lossy()
        ));
        args.extend(self.jvm_args.iter().cloned());
        args.push("-cp".to_string());
        let classpath: Vec<PathBuf> = self.classpath.iter().map(|p| absolute(p)).collect();
        args.push(build_classpath(&classpath, self.os));
        args.push(self.main_class.clone());
        args.extend(self.game_args.iter().cloned());
        args
    }

    pub fn java_args_text(&self) -> String {
        self.jvm_args.join(" ")
    }
}

/// Program and arguments actually handed to the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split `[program, args..]`; `None` for an empty list
    pub fn from_argv(mut argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            return None;
        }
        let program = argv.remove(0);
        Some(Self {
            program,
            args: argv,
        })
    }

    pub fn to_argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}
