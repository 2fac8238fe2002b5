#[cfg(windows)]
use std::os::windows::process::CommandExt;

/// Extension trait for launcher-spawned commands, providing unified support
/// for console suppression and process detachment.
pub trait RunwayCommandExt {
    /// Hides the console window on Windows. No-op on other platforms.
    fn suppress_console(&mut self) -> &mut Self;

    /// Puts the process in its own session / process group so it survives
    /// the launcher closing. Output pipes keep working.
    fn detach(&mut self) -> &mut Self;
}

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x00000200;

impl RunwayCommandExt for std::process::Command {
    fn suppress_console(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            self.creation_flags(CREATE_NO_WINDOW);
        }
        self
    }

    fn detach(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            self.creation_flags(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                self.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }
        self
    }
}

impl RunwayCommandExt for tokio::process::Command {
    fn suppress_console(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            self.creation_flags(CREATE_NO_WINDOW);
        }
        self
    }

    fn detach(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            self.creation_flags(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
        }
        #[cfg(unix)]
        {
            unsafe {
                self.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }
        self
    }
}

/// Quote one argument for the `GAME_SCRIPT` line handed to wrappers.
///
/// Arguments containing a space, `$` or `"` are single-quoted POSIX style.
pub fn script_quote(arg: &str) -> String {
    if arg.contains(' ') || arg.contains('$') || arg.contains('"') {
        format!("'{}'", arg.replace('\'', "'\\''"))
    } else {
        arg.to_string()
    }
}

/// Join a full command line into a single shell-ready script string
pub fn join_script(args: &[String]) -> String {
    args.iter()
        .map(|a| script_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}
