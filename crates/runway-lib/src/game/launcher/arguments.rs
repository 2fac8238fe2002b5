/// Argument builder for the game process
use crate::auth::Account;
use crate::game::launcher::classpath::absolute;
use crate::utils::platform::OsType;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Placeholders a game argument template may use
pub const KNOWN_PLACEHOLDERS: &[&str] = &[
    "auth_player_name",
    "version_name",
    "game_directory",
    "assets_root",
    "game_assets",
    "assets_index_name",
    "auth_uuid",
    "auth_access_token",
    "auth_session",
    "user_type",
    "version_type",
    "user_properties",
];

/// Windows graphics drivers pick per-executable profiles by this heap dump path
const WINDOWS_DRIVER_HEAP_DUMP: &str =
    "-XX:HeapDumpPath=MojangTricksIntelDriversForPerformance_javaw.exe_minecraft.exe.heapdump";

/// Values for the game argument template
pub struct GameVariables<'a> {
    pub account: &'a Account,
    pub version_name: &'a str,
    pub version_type: &'a str,
    pub game_dir: &'a Path,
    pub assets_dir: &'a Path,
    pub assets_index_name: &'a str,
}

impl GameVariables<'_> {
    /// Build the placeholder map
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        let token = self.account.token_or_empty().to_string();
        let game_dir = absolute(self.game_dir);

        vars.insert("auth_player_name".to_string(), self.account.nickname.clone());
        vars.insert("version_name".to_string(), self.version_name.to_string());
        vars.insert(
            "game_directory".to_string(),
            game_dir.to_string_lossy().to_string(),
        );
        vars.insert(
            "assets_root".to_string(),
            absolute(self.assets_dir).to_string_lossy().to_string(),
        );
        // Pre-1.6 versions read loose resources from inside the game directory
        vars.insert(
            "game_assets".to_string(),
            game_dir.join("resources").to_string_lossy().to_string(),
        );
        vars.insert(
            "assets_index_name".to_string(),
            self.assets_index_name.to_string(),
        );
        vars.insert("auth_uuid".to_string(), self.account.uuid.clone());
        vars.insert("auth_access_token".to_string(), token.clone());
        vars.insert("auth_session".to_string(), token);
        vars.insert("user_type".to_string(), "msa".to_string());
        vars.insert("version_type".to_string(), self.version_type.to_string());
        vars.insert("user_properties".to_string(), "{}".to_string());

        vars
    }
}

/// Substitute variables in a string; unknown placeholders are left as-is
pub fn substitute_variables(text: &str, variables: &HashMap<String, String>) -> String {
    let mut result = text.to_string();

    for (key, value) in variables {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

/// Names of every `${name}` placeholder in `text`
pub fn placeholders(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut idx = 0usize;
    while let Some(start) = text[idx..].find("${") {
        let abs = idx + start + 2;
        match text[abs..].find('}') {
            Some(end_rel) => {
                found.push(text[abs..abs + end_rel].to_string());
                idx = abs + end_rel + 1;
            }
            None => break,
        }
    }
    found
}

/// Placeholders in `template` outside [`KNOWN_PLACEHOLDERS`], each reported
/// once with a warning. They stay in the arguments as literal text.
pub fn validate_template(template: &str) -> Vec<String> {
    let unknown: BTreeSet<String> = placeholders(template)
        .into_iter()
        .filter(|p| !KNOWN_PLACEHOLDERS.contains(&p.as_str()))
        .collect();

    for name in &unknown {
        log::warn!(
            "Game argument template uses unknown placeholder ${{{}}}; it is passed through unchanged",
            name
        );
    }

    unknown.into_iter().collect()
}

/// Split the user's JVM argument text on spaces and newlines, dropping blanks
pub fn split_jvm_args(text: &str) -> Vec<String> {
    text.split([' ', '\n', '\r', '\t'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Heap size flags, plus the driver profile hint on Windows
pub fn memory_arguments(min_memory: u32, max_memory: u32, os: OsType) -> Vec<String> {
    let mut args = vec![
        format!("-Xms{}M", min_memory),
        format!("-Xmx{}M", max_memory),
    ];
    if os == OsType::Windows {
        args.push(WINDOWS_DRIVER_HEAP_DUMP.to_string());
    }
    args
}

/// Build game arguments from the version's template
pub fn build_game_arguments(
    template: &str,
    variables: &HashMap<String, String>,
    resolution: Option<(u32, u32)>,
) -> Vec<String> {
    validate_template(template);

    let mut args: Vec<String> = template
        .split(' ')
        .filter(|s| !s.trim().is_empty())
        .map(|arg| substitute_variables(arg, variables))
        .collect();

    if let Some((width, height)) = resolution {
        args.push("--width".to_string());
        args.push(width.to_string());
        args.push("--height".to_string());
        args.push(height.to_string());
    }

    args
}

/// Copy of `args` with every occurrence of the access token masked, for logging
pub fn redact_token(args: &[String], token: &str) -> Vec<String> {
    if token.is_empty() {
        return args.to_vec();
    }
    args.iter()
        .map(|a| a.replace(token, "[ACCESS TOKEN]"))
        .collect()
}
