//! Locating the bundled ffmpeg binary.
//!
//! Where ffmpeg lives depends on how the app was shipped: inside a macOS
//! `.app` bundle, next to a packaged Windows/Linux executable, or in the
//! source checkout during development. Path construction is a table keyed by
//! `(PackagingMode, Platform)`; only [`locate`] touches the filesystem.

use crate::error::{FetchError, FetchResult};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackagingMode {
    Bundled,
    Development,
}

impl PackagingMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bundled" => Some(PackagingMode::Bundled),
            "development" | "dev" => Some(PackagingMode::Development),
            _ => None,
        }
    }

    /// Binaries built by cargo run from `target/`; anything else was shipped.
    pub fn detect(current_exe: &Path) -> Self {
        let in_target = current_exe
            .components()
            .any(|c| matches!(c, Component::Normal(name) if name == "target"));
        if in_target { PackagingMode::Development } else { PackagingMode::Bundled }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    fn ffmpeg_name(self) -> &'static str {
        match self {
            Platform::Windows => "ffmpeg.exe",
            Platform::MacOs | Platform::Linux => "ffmpeg",
        }
    }
}

/// Sets the executable bit on a file that lacks it.
pub type PermissionFix = fn(&Path) -> std::io::Result<()>;

/// Everything path resolution depends on, captured up front so it can be faked.
#[derive(Debug, Clone)]
pub struct LocateContext {
    pub mode: PackagingMode,
    pub platform: Platform,
    pub current_exe: PathBuf, // Absolute path of the running binary
    pub crate_root: PathBuf,  // Source checkout root, used in development
    pub permission_fix: PermissionFix,
}

impl LocateContext {
    pub fn new(mode: PackagingMode, platform: Platform, current_exe: PathBuf, crate_root: PathBuf) -> Self {
        LocateContext {
            mode,
            platform,
            current_exe,
            crate_root,
            permission_fix: make_executable,
        }
    }

    /// Build a context for this process. `mode` overrides auto-detection.
    pub fn detect(mode: Option<PackagingMode>) -> FetchResult<Self> {
        let current_exe = std::env::current_exe()?;
        let mode = mode.unwrap_or_else(|| PackagingMode::detect(&current_exe));
        Ok(LocateContext::new(mode, Platform::current(), current_exe, crate_root()))
    }

    pub fn with_permission_fix(mut self, fix: PermissionFix) -> Self {
        self.permission_fix = fix;
        self
    }

    fn exe_dir(&self) -> PathBuf {
        self.current_exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

/// Two levels above this source file.
fn crate_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .join(file!())
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest.to_path_buf())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutablePath {
    pub path: PathBuf,
    pub is_executable: bool,
    pub repaired: bool, // The executable bit had to be set by us
}

impl ExecutablePath {
    /// Directory handed to the extractor as its ffmpeg location.
    pub fn directory(&self) -> PathBuf {
        self.path.parent().map(Path::to_path_buf).unwrap_or_default()
    }
}

type PathStrategy = fn(&LocateContext) -> PathBuf;

fn strategy(mode: PackagingMode, platform: Platform) -> PathStrategy {
    match (mode, platform) {
        (PackagingMode::Bundled, Platform::MacOs) => macos_bundle_path,
        (PackagingMode::Bundled, Platform::Windows | Platform::Linux) => beside_exe_path,
        (PackagingMode::Development, _) => development_path,
    }
}

fn macos_bundle_path(ctx: &LocateContext) -> PathBuf {
    let exe_dir = ctx.exe_dir();
    let inside_app = exe_dir.ends_with("Contents/MacOS");
    let bundle_dir = match exe_dir.parent() {
        Some(contents) if inside_app => contents.join("Resources"),
        _ => exe_dir.clone(),
    };
    bundle_dir.join("resources").join(ctx.platform.ffmpeg_name())
}

fn beside_exe_path(ctx: &LocateContext) -> PathBuf {
    ctx.exe_dir().join("resources").join(ctx.platform.ffmpeg_name())
}

fn development_path(ctx: &LocateContext) -> PathBuf {
    ctx.crate_root.join("resources").join("ffmpeg")
}

/// Expected ffmpeg path for `ctx`. Pure; does not touch the filesystem.
pub fn resolve(ctx: &LocateContext) -> PathBuf {
    strategy(ctx.mode, ctx.platform)(ctx)
}

/// Resolve ffmpeg and make sure it can be run, setting the executable bit if needed.
pub fn locate(ctx: &LocateContext) -> FetchResult<ExecutablePath> {
    let path = resolve(ctx);
    debug!(
        exe = %ctx.current_exe.display(),
        mode = ?ctx.mode,
        platform = ?ctx.platform,
        ffmpeg = %path.display(),
        "resolved ffmpeg path"
    );

    // A directory or other non-file at the path is as good as missing
    if !path.is_file() {
        return Err(FetchError::ExecutableNotFound { path });
    }

    if is_executable(&path) {
        return Ok(ExecutablePath { path, is_executable: true, repaired: false });
    }

    warn!(ffmpeg = %path.display(), "ffmpeg is not executable, fixing permissions");
    if let Err(source) = (ctx.permission_fix)(&path) {
        return Err(FetchError::ExecutablePermission { path, source });
    }
    Ok(ExecutablePath { path, is_executable: true, repaired: true })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(mode: PackagingMode, platform: Platform, exe: &str) -> LocateContext {
        LocateContext::new(mode, platform, PathBuf::from(exe), PathBuf::from("/src/tubefetch"))
    }

    #[test]
    fn macos_app_bundle_uses_resources_dir() {
        let c = ctx(PackagingMode::Bundled, Platform::MacOs, "/Applications/Tube.app/Contents/MacOS/tube");
        assert_eq!(resolve(&c), PathBuf::from("/Applications/Tube.app/Contents/Resources/resources/ffmpeg"));
    }

    #[test]
    fn macos_outside_app_bundle_falls_back_to_exe_dir() {
        let c = ctx(PackagingMode::Bundled, Platform::MacOs, "/opt/tube/tube");
        assert_eq!(resolve(&c), PathBuf::from("/opt/tube/resources/ffmpeg"));
    }

    #[test]
    fn windows_bundle_uses_exe_suffix() {
        let c = ctx(PackagingMode::Bundled, Platform::Windows, "/apps/tube/tube.exe");
        assert_eq!(resolve(&c), PathBuf::from("/apps/tube/resources/ffmpeg.exe"));
    }

    #[test]
    fn linux_bundle_sits_beside_exe() {
        let c = ctx(PackagingMode::Bundled, Platform::Linux, "/usr/lib/tube/tube");
        assert_eq!(resolve(&c), PathBuf::from("/usr/lib/tube/resources/ffmpeg"));
    }

    #[test]
    fn development_ignores_platform_and_exe() {
        for platform in [Platform::MacOs, Platform::Windows, Platform::Linux] {
            let c = ctx(PackagingMode::Development, platform, "/anywhere/bin");
            assert_eq!(resolve(&c), PathBuf::from("/src/tubefetch/resources/ffmpeg"));
        }
    }

    #[test]
    fn crate_root_holds_manifest() {
        assert!(crate_root().join("Cargo.toml").exists());
    }

    #[test]
    fn detect_mode_from_exe_location() {
        assert_eq!(PackagingMode::detect(Path::new("/home/u/tube/target/debug/tubefetch")), PackagingMode::Development);
        assert_eq!(PackagingMode::detect(Path::new("/usr/lib/tube/tubefetch")), PackagingMode::Bundled);
        assert_eq!(PackagingMode::parse(" Bundled "), Some(PackagingMode::Bundled));
        assert_eq!(PackagingMode::parse("dev"), Some(PackagingMode::Development));
        assert_eq!(PackagingMode::parse("frozen"), None);
    }

    #[test]
    fn missing_binary_is_not_found_and_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = ctx(PackagingMode::Development, Platform::Linux, "/bin/x");
        c.crate_root = dir.path().to_path_buf();

        match locate(&c) {
            Err(FetchError::ExecutableNotFound { path }) => {
                assert_eq!(path, dir.path().join("resources").join("ffmpeg"));
                assert!(!path.exists());
            }
            other => panic!("expected ExecutableNotFound, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_binary_is_repaired() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let resources = dir.path().join("resources");
        std::fs::create_dir_all(&resources).unwrap();
        let ffmpeg = resources.join("ffmpeg");
        std::fs::write(&ffmpeg, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&ffmpeg, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut c = ctx(PackagingMode::Development, Platform::Linux, "/bin/x");
        c.crate_root = dir.path().to_path_buf();

        let found = locate(&c).unwrap();
        assert!(found.is_executable);
        assert!(found.repaired);
        assert_eq!(found.directory(), resources);
        let mode = std::fs::metadata(&ffmpeg).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        let again = locate(&c).unwrap();
        assert!(!again.repaired);
    }

    #[test]
    fn directory_at_ffmpeg_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("resources").join("ffmpeg");
        std::fs::create_dir_all(&bogus).unwrap();
        let before = std::fs::metadata(&bogus).unwrap().permissions();

        let mut c = ctx(PackagingMode::Development, Platform::Linux, "/bin/x");
        c.crate_root = dir.path().to_path_buf();

        assert!(matches!(locate(&c), Err(FetchError::ExecutableNotFound { path }) if path == bogus));
        assert_eq!(std::fs::metadata(&bogus).unwrap().permissions(), before);
    }

    #[cfg(unix)]
    #[test]
    fn failed_permission_fix_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let resources = dir.path().join("resources");
        std::fs::create_dir_all(&resources).unwrap();
        let ffmpeg = resources.join("ffmpeg");
        std::fs::write(&ffmpeg, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&ffmpeg, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut c = ctx(PackagingMode::Development, Platform::Linux, "/bin/x")
            .with_permission_fix(|_| Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Operation not permitted")));
        c.crate_root = dir.path().to_path_buf();

        match locate(&c) {
            Err(FetchError::ExecutablePermission { path, source }) => {
                assert_eq!(path, ffmpeg);
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected ExecutablePermission, got {:?}", other),
        }
        let mode = std::fs::metadata(&ffmpeg).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
