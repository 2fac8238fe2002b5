/// Process management and game launch orchestration
use crate::context::LauncherContext;
use crate::error::{LaunchError, MetadataError, ResolveError};
use crate::game::instance::{list_mods, EffectiveOptions, Instance, WorkaroundOptions};
use crate::game::java::probe_java;
use crate::game::launcher::arguments::{
    build_game_arguments, memory_arguments, redact_token, split_jvm_args, GameVariables,
};
use crate::game::launcher::classpath::absolute;
use crate::game::launcher::logs::LogStreamer;
use crate::game::launcher::natives::extract_natives;
use crate::game::launcher::resolver::{Contribution, ContributionSource, LibraryResolver};
use crate::game::launcher::types::{CommandLine, LaunchPlan, ProcessState};
use crate::game::metadata::{
    Component, FabricLoaderFile, IntermediaryFile, LauncherTrait, LwjglFile, MinecraftFile,
    TypedVersionFile,
};
use crate::utils::platform::OsType;
use crate::utils::process::{join_script, RunwayCommandExt};
use anyhow::Context;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

const GAMEMODE_HELPER: &str = "gamemoderun";
const MANGOHUD_HELPER: &str = "mangohud";

/// Output still buffered in the pipes is drained for at most this long after exit
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Runtime state of one launched instance
pub struct InstanceProcess {
    instance_id: String,
    state: watch::Sender<ProcessState>,
    logs: LogStreamer,
    exit_by_user: AtomicBool,
    kill: Notify,
    started_at: OnceCell<DateTime<Utc>>,
}

impl InstanceProcess {
    pub fn new(instance_id: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ProcessState::NotStarted);
        Self {
            instance_id: instance_id.into(),
            state,
            logs: LogStreamer::new(),
            exit_by_user: AtomicBool::new(false),
            kill: Notify::new(),
            started_at: OnceCell::new(),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    /// Set while the process is running
    pub fn pid(&self) -> Option<u32> {
        match self.state() {
            ProcessState::Running { pid } => Some(pid),
            _ => None,
        }
    }

    pub fn logs(&self) -> &LogStreamer {
        &self.logs
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at.get().copied()
    }

    pub fn exit_by_user(&self) -> bool {
        self.exit_by_user.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ProcessState) {
        self.state.send_replace(state);
    }

    /// Stop the game on the user's request: SIGTERM on Unix, kill elsewhere
    pub fn exit(&self) {
        self.exit_by_user.store(true, Ordering::SeqCst);

        match self.state() {
            ProcessState::Exited { .. } => {}
            ProcessState::Running { pid } => {
                log::info!("Stopping instance {} (PID {})", self.instance_id, pid);
                #[cfg(unix)]
                {
                    use nix::sys::signal::{kill, Signal};
                    use nix::unistd::Pid;

                    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                        Ok(()) => return,
                        Err(e) => log::warn!("Failed to send SIGTERM to {}: {}", pid, e),
                    }
                }
                self.kill.notify_one();
            }
            // Killed as soon as it is spawned
            ProcessState::NotStarted | ProcessState::Starting => self.kill.notify_one(),
        }
    }

    /// Resolves once the process has exited
    pub async fn wait_for_exit(&self) -> ProcessState {
        let mut receiver = self.state.subscribe();
        let state = match receiver.wait_for(ProcessState::is_exited).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        state
    }
}

/// Shell commands run around the game process
#[derive(Debug, Clone, Copy)]
enum Hook {
    PreLaunch,
    PostExit,
}

impl Hook {
    fn label(&self) -> &'static str {
        match self {
            Hook::PreLaunch => "pre-launch",
            Hook::PostExit => "post-exit",
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            Hook::PreLaunch => "Pre-launch command finished successfully.",
            Hook::PostExit => "Post-exit command ran successfully.",
        }
    }

    fn failure_prefix(&self) -> &'static str {
        match self {
            Hook::PreLaunch => "Pre-launch",
            Hook::PostExit => "Post-exit",
        }
    }
}

/// Launch an instance and return its live process.
///
/// The registry slot is claimed before anything else, so a second launch of
/// a running instance fails with [`LaunchError::AlreadyRunning`] and spawns
/// nothing.
pub async fn launch_instance(
    ctx: Arc<LauncherContext>,
    instance_id: &str,
) -> Result<Arc<InstanceProcess>, LaunchError> {
    log::info!("Launching game instance: {}", instance_id);

    let instance = ctx
        .instances()
        .get(instance_id)
        .await
        .ok_or_else(|| LaunchError::InstanceNotFound(instance_id.to_string()))?;

    let process = Arc::new(InstanceProcess::new(instance_id));
    ctx.registry().try_register(process.clone()).await?;
    process.set_state(ProcessState::Starting);

    match start(&ctx, &instance, &process).await {
        Ok(()) => Ok(process),
        Err(e) => {
            log::error!("Failed to launch instance {}: {}", instance_id, e);
            process.logs().push(format!("ERROR: {}", e));
            process.set_state(ProcessState::Exited {
                code: -1,
                by_user: process.exit_by_user(),
            });
            ctx.registry().unregister(instance_id).await;
            process.logs().close();
            Err(e)
        }
    }
}

/// Check preconditions, resolve every artifact and build the launch arguments.
/// Natives are extracted as part of this; nothing is spawned.
pub async fn compose_launch(
    ctx: &LauncherContext,
    instance: &Instance,
) -> Result<LaunchPlan, LaunchError> {
    let options = EffectiveOptions::resolve(&ctx.options().await, &instance.options);
    let platform = ctx.platform();
    let instances_dir = ctx.instances().instances_dir();

    // Java
    let java_path = options.java.java_path.trim();
    if java_path.is_empty() {
        return Err(LaunchError::JavaNotConfigured);
    }
    let java = probe_java(&absolute(Path::new(java_path)))
        .await
        .map_err(|e| LaunchError::JavaProbe {
            path: java_path.to_string(),
            reason: format!("{:#}", e),
        })?;

    // Account
    let account = ctx.auth().active_account().ok_or(LaunchError::NoAccount)?;
    let account = ctx.auth().validate_for_launch(&account).await?;

    // Version files
    ctx.metadata().ensure_loaded().await?;
    let minecraft: MinecraftFile =
        version_meta(ctx, Component::Minecraft, &instance.minecraft_version).await?;
    java.ensure_compatible(minecraft.min_java_major())?;

    let mut jvm_args = memory_arguments(
        options.java.min_memory,
        options.java.max_memory,
        platform.os,
    );
    jvm_args.extend(split_jvm_args(&options.java.jvm_arguments));
    let glfw = options.workarounds.custom_glfw_path.trim();
    if !glfw.is_empty() {
        jvm_args.push(format!("-Dorg.lwjgl.glfw.libname={}", glfw));
    }
    if platform.os == OsType::MacOS && minecraft.has_trait(LauncherTrait::FirstThreadOnMacOS) {
        jvm_args.push("-XstartOnFirstThread".to_string());
    }

    let lwjgl: LwjglFile =
        version_meta(ctx, instance.lwjgl.component, &instance.lwjgl.version).await?;

    let mut main_class = minecraft.main_class.clone();
    let mut contributions = vec![
        Contribution::new(ContributionSource::Core, minecraft.libraries.clone()),
        Contribution::new(ContributionSource::Windowing, lwjgl.libraries),
    ];

    if let Some(ref fabric) = instance.fabric {
        let loader: FabricLoaderFile =
            version_meta(ctx, Component::FabricLoader, &fabric.loader_version).await?;
        main_class = loader.main_class;
        contributions.push(Contribution::new(ContributionSource::Loader, loader.libraries));

        let intermediary: IntermediaryFile = version_meta(
            ctx,
            Component::FabricIntermediary,
            &fabric.intermediary_version,
        )
        .await?;
        let mapping = intermediary
            .library_for(&fabric.intermediary_type)
            .cloned()
            .ok_or_else(|| {
                LaunchError::Other(anyhow::anyhow!(
                    "Intermediary {} has no {} mappings",
                    fabric.intermediary_version,
                    fabric.intermediary_type
                ))
            })?;
        contributions.push(Contribution::new(ContributionSource::Mapping, vec![mapping]));
    }

    // Libraries and natives
    let resolver = LibraryResolver::new(ctx.paths().libraries_dir(), platform);
    let resolved = resolver.resolve(contributions)?;

    let main_jar = resolver.main_jar(&minecraft.main_jar)?;
    if !main_jar.exists() {
        return Err(ResolveError::LibraryNotFound {
            library_path: main_jar.to_string_lossy().to_string(),
        }
        .into());
    }
    let mut classpath = resolved.classpath;
    classpath.push(main_jar);

    let natives_dir = instance.natives_dir(instances_dir);
    extract_natives(&resolved.natives, &natives_dir).await?;

    // Game arguments
    let game_dir = instance.game_dir(instances_dir);
    tokio::fs::create_dir_all(&game_dir)
        .await
        .context(format!("Failed to create game directory {:?}", game_dir))?;

    let resolution = if minecraft.has_trait(LauncherTrait::LegacyLaunch) {
        None
    } else if options.resolution.maximum_resolution {
        Some(ctx.display().primary_resolution().unwrap_or((
            options.resolution.resolution_width,
            options.resolution.resolution_height,
        )))
    } else {
        Some((
            options.resolution.resolution_width,
            options.resolution.resolution_height,
        ))
    };

    let variables = GameVariables {
        account: &account,
        version_name: &minecraft.version,
        version_type: minecraft.version_type.as_str(),
        game_dir: &game_dir,
        assets_dir: &ctx.paths().assets_dir(),
        assets_index_name: &minecraft.asset_index.id,
    }
    .to_map();
    let game_args = build_game_arguments(&minecraft.minecraft_arguments, &variables, resolution);

    Ok(LaunchPlan {
        instance_id: instance.id.clone(),
        instance_name: instance.display_name.clone(),
        minecraft_version: instance.minecraft_version.clone(),
        instance_dir: instance.instance_dir(instances_dir),
        game_dir,
        natives_dir,
        java,
        account,
        options,
        main_class,
        jvm_args,
        classpath,
        game_args,
        os: platform.os,
    })
}

/// A typed version file; a missing catalog entry is reported per component
async fn version_meta<T: TypedVersionFile>(
    ctx: &LauncherContext,
    component: Component,
    version: &str,
) -> Result<T, LaunchError> {
    ctx.metadata()
        .get_version_meta::<T>(component, version)
        .await
        .map_err(|e| match e {
            MetadataError::VersionNotFound { component, .. } => {
                LaunchError::VersionFileMissing(component.uid().to_string())
            }
            other => LaunchError::Metadata(other),
        })
}

/// Launch helpers enabled in `workarounds` that are installed
pub fn launch_helpers(workarounds: &WorkaroundOptions) -> Vec<String> {
    let mut helpers = Vec::new();
    for (enabled, helper) in [
        (workarounds.enable_feral_gamemode, GAMEMODE_HELPER),
        (workarounds.enable_mango_hud, MANGOHUD_HELPER),
    ] {
        if !enabled {
            continue;
        }
        match which::which(helper) {
            Ok(_) => helpers.push(helper.to_string()),
            Err(_) => log::warn!("{} is enabled but was not found on PATH, skipping", helper),
        }
    }
    helpers
}

/// Apply the wrapper command and launch helpers.
///
/// Returns the command to spawn and the `GAME_SCRIPT` line: the quoted
/// launch arguments a wrapper receives. A wrapper mentioning `$GAME_SCRIPT`
/// or `${GAME_SCRIPT}` runs through the platform shell with the script
/// substituted in; any other wrapper is split into words and prepended.
/// Helpers always come first.
pub fn compose_command(
    helpers: &[String],
    launch_args: &[String],
    wrapper: &str,
    os: OsType,
) -> (CommandLine, String) {
    let game_script = join_script(launch_args);

    let wrapper = wrapper.trim();
    let wrapped: Vec<String> =
        if wrapper.contains("$GAME_SCRIPT") || wrapper.contains("${GAME_SCRIPT}") {
            let script = wrapper
                .replace("${GAME_SCRIPT}", &game_script)
                .replace("$GAME_SCRIPT", &game_script);
            let (shell, flag) = os.shell_flags();
            vec![shell.to_string(), flag.to_string(), script]
        } else if !wrapper.is_empty() {
            let mut words = shlex::split(wrapper)
                .unwrap_or_else(|| wrapper.split_whitespace().map(str::to_string).collect());
            words.extend(launch_args.iter().cloned());
            words
        } else {
            launch_args.to_vec()
        };
    let mut argv = helpers.to_vec();
    argv.extend(wrapped);

    let command = CommandLine::from_argv(argv).unwrap_or_else(|| CommandLine {
        program: String::new(),
        args: Vec::new(),
    });
    (command, game_script)
}

/// Variables exported to the game, the wrapper and both hooks
pub fn build_environment(plan: &LaunchPlan, game_script: &str) -> Vec<(String, String)> {
    let mut env = vec![
        ("INST_ID".to_string(), plan.instance_id.clone()),
        ("INST_NAME".to_string(), plan.instance_name.clone()),
        (
            "INST_DIR".to_string(),
            absolute(&plan.instance_dir).to_string_lossy().to_string(),
        ),
        (
            "INST_MC_DIR".to_string(),
            absolute(&plan.game_dir).to_string_lossy().to_string(),
        ),
        ("INST_MC_VER".to_string(), plan.minecraft_version.clone()),
        (
            "INST_JAVA".to_string(),
            plan.java.path.to_string_lossy().to_string(),
        ),
        ("INST_JAVA_ARGS".to_string(), plan.java_args_text()),
        ("GAME_SCRIPT".to_string(), game_script.to_string()),
    ];

    let workarounds = &plan.options.workarounds;
    if workarounds.use_discrete_gpu {
        env.push(("DRI_PRIME".to_string(), "1".to_string()));
    }
    if workarounds.use_zink {
        env.push((
            "MESA_LOADER_DRIVER_OVERRIDE".to_string(),
            "zink".to_string(),
        ));
    }
    if workarounds.enable_environment_variables {
        for (key, value) in &workarounds.environment_variables {
            if key.trim().is_empty() {
                continue;
            }
            env.push((key.trim().to_string(), value.clone()));
        }
    }

    env
}

/// Lines written to the log before the game's own output
fn preamble(ctx: &LauncherContext, plan: &LaunchPlan, helpers: &[String]) -> Vec<String> {
    let app = ctx.app_info();
    let workarounds = &plan.options.workarounds;
    let mut lines = vec![
        format!("{} version: {}", app.name, app.version),
        String::new(),
        "Minecraft folder is:".to_string(),
        absolute(&plan.game_dir).to_string_lossy().to_string(),
        String::new(),
        "Java path is:".to_string(),
        plan.java.path.to_string_lossy().to_string(),
        String::new(),
        format!(
            "Java is version: {} using {} architecture from {}",
            plan.java.version,
            plan.java.arch_label(),
            plan.java.vendor
        ),
        String::new(),
        "Java arguments are:".to_string(),
        plan.java_args_text(),
        String::new(),
        "Main Class:".to_string(),
        plan.main_class.clone(),
        String::new(),
    ];

    let mut block = |title: &str, value: &str| {
        lines.push(title.to_string());
        lines.extend(value.lines().map(str::to_string));
        lines.push(String::new());
    };
    if !workarounds.wrapper_command.trim().is_empty() {
        block("Wrapper command:", workarounds.wrapper_command.trim());
    }
    if !workarounds.custom_glfw_path.trim().is_empty() {
        block("Custom GLFW library:", workarounds.custom_glfw_path.trim());
    }
    if !workarounds.pre_launch_command.trim().is_empty() {
        block("Pre-launch command:", workarounds.pre_launch_command.trim());
    }
    if !workarounds.post_exit_command.trim().is_empty() {
        block("Post-exit command:", workarounds.post_exit_command.trim());
    }

    if helpers.iter().any(|h| h == GAMEMODE_HELPER) {
        lines.push("Running with Feral GameMode".to_string());
    }
    if helpers.iter().any(|h| h == MANGOHUD_HELPER) {
        lines.push("Running with MangoHUD".to_string());
    }
    if workarounds.use_discrete_gpu {
        lines.push("Running with discrete GPU (DRI_PRIME=1)".to_string());
    }
    if workarounds.use_zink {
        lines.push("Running with Zink renderer".to_string());
    }

    if workarounds.enable_environment_variables {
        let custom: Vec<String> = workarounds
            .environment_variables
            .iter()
            .filter(|(k, _)| !k.trim().is_empty())
            .map(|(k, v)| format!("{}={}", k.trim(), v))
            .collect();
        if !custom.is_empty() {
            lines.push(String::new());
            lines.push("Custom environment variables:".to_string());
            lines.extend(custom);
        }
    }

    lines
}

async fn start(
    ctx: &Arc<LauncherContext>,
    instance: &Instance,
    process: &Arc<InstanceProcess>,
) -> Result<(), LaunchError> {
    let plan = compose_launch(ctx, instance).await?;
    let workarounds = plan.options.workarounds.clone();

    let helpers = launch_helpers(&workarounds);
    let (command_line, game_script) = compose_command(
        &helpers,
        &plan.launch_args(),
        &workarounds.wrapper_command,
        plan.os,
    );
    let env = build_environment(&plan, &game_script);

    let logs = process.logs();
    for line in preamble(ctx, &plan, &helpers) {
        logs.push(line);
    }
    logs.push("");
    logs.push("Mods:");
    for entry in list_mods(&instance.mods_dir(ctx.instances().instances_dir())).await {
        logs.push(entry.preamble_line());
    }
    logs.push("");

    let pre_launch = workarounds.pre_launch_command.trim();
    if !pre_launch.is_empty() {
        run_hook(Hook::PreLaunch, pre_launch, &plan.instance_dir, &env, plan.os, logs).await;
    }

    log::debug!(
        "Exec command: {}",
        redact_token(&command_line.to_argv(), plan.account.token_or_empty()).join(" ")
    );

    let mut command = tokio::process::Command::new(&command_line.program);
    command
        .args(&command_line.args)
        .current_dir(&plan.game_dir)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .detach();

    let mut child = command.spawn().map_err(LaunchError::Spawn)?;
    let pid = child.id().unwrap_or_default();
    let started_at = Utc::now();
    if process.started_at.set(started_at).is_err() {
        log::warn!("Start time of {} was already recorded", instance.id);
    }
    process.set_state(ProcessState::Running { pid });
    log::info!("Game process started with PID: {}", pid);

    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, process.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, process.clone()));
    }

    if let Err(e) = ctx.instances().record_launch(&instance.id, started_at).await {
        log::warn!("Failed to record launch of {}: {}", instance.id, e);
    }
    ctx.events().broadcast(
        "instance.launched",
        serde_json::json!({ "instance_id": instance.id, "pid": pid }),
    );

    let ctx = ctx.clone();
    let process = process.clone();
    let post_exit = workarounds.post_exit_command.trim().to_string();
    let instance_dir = plan.instance_dir.clone();
    let os = plan.os;
    tokio::spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            _ = process.kill.notified() => {
                if let Err(e) = child.start_kill() {
                    log::warn!("Failed to kill game process {}: {}", pid, e);
                }
                child.wait().await
            }
        };

        for reader in readers {
            if tokio::time::timeout(READER_DRAIN_TIMEOUT, reader).await.is_err() {
                log::debug!("Output of {} still open after exit, detaching reader", pid);
            }
        }

        let code = match status {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                log::error!("Failed to wait for game process {} (PID {}): {}", process.instance_id, pid, e);
                -1
            }
        };

        finish(&ctx, &process, code, started_at, &post_exit, &instance_dir, &env, os).await;
    });

    Ok(())
}

fn spawn_reader<R>(stream: R, process: Arc<InstanceProcess>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            process.logs().push(line);
        }
    })
}

#[allow(clippy::too_many_arguments)]
async fn finish(
    ctx: &LauncherContext,
    process: &InstanceProcess,
    code: i32,
    started_at: DateTime<Utc>,
    post_exit: &str,
    instance_dir: &Path,
    env: &[(String, String)],
    os: OsType,
) {
    let by_user = process.exit_by_user();
    let id = process.instance_id();
    log::info!("Game process {} exited with code {}", id, code);

    let logs = process.logs();
    logs.push("");
    logs.push(format!("Process exited with exit code {}", code));
    logs.push("");

    ctx.registry().unregister(id).await;
    process.set_state(ProcessState::Exited { code, by_user });

    if let Err(e) = ctx.instances().record_exit(id, started_at, code, by_user).await {
        log::warn!("Failed to record exit of {}: {}", id, e);
    }
    ctx.events().broadcast(
        "instance.exited",
        serde_json::json!({ "instance_id": id, "exit_code": code, "by_user": by_user }),
    );

    if !post_exit.is_empty() {
        run_hook(Hook::PostExit, post_exit, instance_dir, env, os, logs).await;
    }

    logs.close();
}

/// Run a hook through the platform shell, appending its output to the log.
/// Failures only produce warnings.
async fn run_hook(
    hook: Hook,
    command: &str,
    dir: &Path,
    env: &[(String, String)],
    os: OsType,
    logs: &LogStreamer,
) {
    logs.push(format!("Running {} command:", hook.label()));
    logs.push_lines(command);
    logs.push("");

    let (shell, flag) = os.shell_flags();
    let output = tokio::process::Command::new(shell)
        .arg(flag)
        .arg(os.shell_command_text(command))
        .current_dir(dir)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .suppress_console()
        .output()
        .await;

    match output {
        Ok(output) => {
            logs.push_lines(&String::from_utf8_lossy(&output.stdout));
            logs.push_lines(&String::from_utf8_lossy(&output.stderr));
            if output.status.success() {
                logs.push(hook.success_message());
            } else {
                let code = output.status.code().unwrap_or(-1);
                log::warn!("{} command exited with code {}", hook.failure_prefix(), code);
                logs.push(format!(
                    "WARN: {} command exited with code {}.",
                    hook.failure_prefix(),
                    code
                ));
            }
        }
        Err(e) => {
            log::warn!("Failed to run {} command: {}", hook.label(), e);
            logs.push(format!("WARN: Failed to run {} command: {}", hook.label(), e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_launch_without_wrapper() {
        let launch = args(&["/jdk/bin/java", "-cp", "a.jar", "Main"]);
        let (command, script) = compose_command(&[], &launch, "", OsType::Linux);
        assert_eq!(command.program, "/jdk/bin/java");
        assert_eq!(command.args, args(&["-cp", "a.jar", "Main"]));
        assert_eq!(script, "/jdk/bin/java -cp a.jar Main");
    }

    #[test]
    fn helpers_wrap_the_wrapper() {
        let launch = args(&["java", "Main"]);
        let helpers = args(&["gamemoderun", "mangohud"]);
        let (command, script) =
            compose_command(&helpers, &launch, "prime-run  --flag", OsType::Linux);
        assert_eq!(
            command.to_argv(),
            args(&["gamemoderun", "mangohud", "prime-run", "--flag", "java", "Main"])
        );
        // The script a wrapper sees is the bare launch
        assert_eq!(script, "java Main");

        let (command, script) =
            compose_command(&helpers, &launch, "obs-gamecapture $GAME_SCRIPT", OsType::Linux);
        assert_eq!(
            command.to_argv(),
            args(&["gamemoderun", "mangohud", "sh", "-c", "obs-gamecapture java Main"])
        );
        assert_eq!(script, "java Main");
    }

    #[test]
    fn game_script_wrapper_runs_through_shell() {
        let launch = args(&["java", "-Dname=with space", "Main"]);
        let (command, script) =
            compose_command(&[], &launch, "obs-gamecapture ${GAME_SCRIPT}", OsType::Linux);
        assert_eq!(script, "java '-Dname=with space' Main");
        assert_eq!(command.program, "sh");
        assert_eq!(
            command.args,
            args(&["-c", "obs-gamecapture java '-Dname=with space' Main"])
        );

        let (command, _) = compose_command(&[], &launch, "run $GAME_SCRIPT", OsType::Windows);
        assert_eq!(command.program, "cmd");
        assert_eq!(command.args[0], "/c");
    }

    #[tokio::test]
    async fn hooks_log_output_and_failures() {
        let tmp = tempfile::TempDir::new().unwrap();
        let logs = LogStreamer::new();
        let env = vec![("INST_ID".to_string(), "run1".to_string())];

        if cfg!(unix) {
            run_hook(Hook::PreLaunch, "echo hello $INST_ID", tmp.path(), &env, OsType::Linux, &logs).await;
            run_hook(Hook::PostExit, "exit 3", tmp.path(), &env, OsType::Linux, &logs).await;

            let archive = logs.archive();
            assert!(archive.contains(&"hello run1".to_string()));
            assert!(archive.contains(&"Pre-launch command finished successfully.".to_string()));
            assert!(archive.contains(&"WARN: Post-exit command exited with code 3.".to_string()));
        }
    }

    #[tokio::test]
    async fn exit_before_spawn_marks_user_stop() {
        let process = InstanceProcess::new("a");
        assert_eq!(process.state(), ProcessState::NotStarted);
        process.exit();
        assert!(process.exit_by_user());
        assert_eq!(process.pid(), None);

        process.set_state(ProcessState::Exited { code: 0, by_user: true });
        assert_eq!(
            process.wait_for_exit().await,
            ProcessState::Exited { code: 0, by_user: true }
        );
    }
}
