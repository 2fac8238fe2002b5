pub mod hardware;
pub mod platform;
pub mod process;
pub mod version;

pub use platform::{Arch, OsType, Platform};
pub use process::RunwayCommandExt;
pub use version::compare_versions;
