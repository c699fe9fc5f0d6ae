//! Worker binary and config file lookup
//!
//! Packaged builds ship the binary directly under `<resources>/binaries/`.
//! Development trees keep one subdirectory per platform, e.g.
//! `<resources>/binaries/darwin-arm64/cliproxy`.

use crate::constants::binary::{BINARIES_DIR, BINARY_NAME, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

/// Worker executable name for the given target OS
pub fn binary_name(os: &str) -> String {
    if os == "windows" {
        format!("{}.exe", BINARY_NAME)
    } else {
        BINARY_NAME.to_string()
    }
}

/// Platform directory name used by development resource trees
pub fn platform_dir(os: &str, arch: &str) -> String {
    match (os, arch) {
        ("macos", "aarch64") => "darwin-arm64".to_string(),
        ("macos", "x86_64") => "darwin-x64".to_string(),
        ("windows", "x86_64") => "win32-x64".to_string(),
        ("linux", "x86_64") => "linux-x64".to_string(),
        _ => format!("{}-{}", os, arch),
    }
}

/// Resolve the worker binary for the running platform
pub fn resolve_binary_path(resources_dir: &Path, packaged: bool) -> PathBuf {
    resolve_binary_path_for(
        resources_dir,
        packaged,
        std::env::consts::OS,
        std::env::consts::ARCH,
    )
}

pub fn resolve_binary_path_for(
    resources_dir: &Path,
    packaged: bool,
    os: &str,
    arch: &str,
) -> PathBuf {
    let binaries = resources_dir.join(BINARIES_DIR);
    if packaged {
        binaries.join(binary_name(os))
    } else {
        binaries.join(platform_dir(os, arch)).join(binary_name(os))
    }
}

/// `<data_dir>/config.yaml`
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}
