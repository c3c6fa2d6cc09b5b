//! rclone detection and installation.
//!
//! Detection is cheap: find `rclone` on PATH and probe it with
//! `--version`. Installation follows the platform conventions:
//!
//! - Linux: system package managers (apt-get, yum, dnf, zypper) via
//!   sudo, falling back to a manual download from downloads.rclone.org.
//! - macOS: Homebrew, falling back to the manual download.
//! - Windows: manual download only.
//!
//! The returned [`RcloneHandle`] carries the concrete binary path, so a
//! fallback install into `~/bin` works in the current session even
//! before PATH is updated.

pub mod download;
pub mod package_manager;

use std::path::{Path, PathBuf};
use std::process::Command;

use colored::Colorize;
use thiserror::Error;
use which::which;

/// Errors from rclone detection or installation.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("rclone not found in PATH (pass --rclone-path or drop --no-install)")]
    NotFound,

    #[error("{0} does not behave like rclone (`--version` failed)")]
    BadBinary(PathBuf),

    #[error("unsupported operating system: {0}")]
    UnsupportedPlatform(String),

    #[error("rclone installation appeared to succeed but the binary is still missing")]
    StillMissing,

    #[error(transparent)]
    Download(#[from] download::DownloadError),
}

/// A usable rclone binary.
#[derive(Debug, Clone)]
pub struct RcloneHandle {
    pub path: PathBuf,
    /// First line of `rclone --version`, e.g. `rclone v1.66.0`.
    pub version: Option<String>,
}

impl RcloneHandle {
    pub fn describe(&self) -> String {
        match &self.version {
            Some(v) => format!("{} ({})", self.path.display(), v),
            None => self.path.display().to_string(),
        }
    }
}

/// Locate rclone on PATH and probe it.
pub fn detect() -> Option<RcloneHandle> {
    let path = which("rclone").ok()?;
    let version = probe(&path)?;
    Some(RcloneHandle {
        path,
        version: Some(version),
    })
}

/// Run `<binary> --version` and return the first output line.
///
/// Returns None when the binary cannot be executed or exits non-zero.
/// An empty first line maps to an empty string, not None, so oddly
/// quiet builds still count as working.
pub fn probe(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Some(parse_version_line(&stdout))
}

/// First non-empty line of `rclone --version` output.
pub fn parse_version_line(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Find rclone, installing it if permitted.
///
/// `explicit` short-circuits everything: the given binary must probe
/// successfully or the run fails.
pub fn ensure_installed(
    explicit: Option<&Path>,
    allow_install: bool,
) -> Result<RcloneHandle, InstallError> {
    if let Some(path) = explicit {
        return match probe(path) {
            Some(version) => Ok(RcloneHandle {
                path: path.to_path_buf(),
                version: Some(version),
            }),
            None => Err(InstallError::BadBinary(path.to_path_buf())),
        };
    }

    if let Some(handle) = detect() {
        return Ok(handle);
    }

    if !allow_install {
        return Err(InstallError::NotFound);
    }

    let os = std::env::consts::OS;
    println!("Rclone not found. Installing rclone for {}...", os.bold());

    let installed_path = match os {
        "linux" => {
            if package_manager::install_linux() {
                None // installed onto PATH; re-detect below
            } else {
                println!("No package manager worked. Falling back to a manual download...");
                Some(download::install_manual()?)
            }
        }
        "macos" => {
            if package_manager::install_macos_brew() {
                None
            } else {
                println!("Homebrew not available. Falling back to a manual download...");
                Some(download::install_manual()?)
            }
        }
        "windows" => Some(download::install_manual()?),
        other => return Err(InstallError::UnsupportedPlatform(other.to_string())),
    };

    // Verify whatever route we took actually produced a working binary.
    let handle = match installed_path {
        Some(path) => match probe(&path) {
            Some(version) => RcloneHandle {
                path,
                version: Some(version),
            },
            None => return Err(InstallError::StillMissing),
        },
        None => detect().ok_or(InstallError::StillMissing)?,
    };

    println!("{} Rclone installed successfully!", "✓".green());
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_line_takes_first_nonempty() {
        let out = "rclone v1.66.0\n- os/version: ubuntu 22.04\n- go/version: go1.22\n";
        assert_eq!(parse_version_line(out), "rclone v1.66.0");
        assert_eq!(parse_version_line("\n\n  rclone v1.60.1  \n"), "rclone v1.60.1");
        assert_eq!(parse_version_line(""), "");
    }

    #[test]
    fn probe_rejects_missing_binary() {
        assert!(probe(Path::new("/definitely/not/a/real/rclone")).is_none());
    }

    #[test]
    fn explicit_bad_binary_is_an_error() {
        let err = ensure_installed(Some(Path::new("/definitely/not/a/real/rclone")), true)
            .expect_err("bad binary must fail");
        assert!(matches!(err, InstallError::BadBinary(_)));
    }

    #[cfg(unix)]
    #[test]
    fn explicit_working_binary_is_accepted() {
        // Any executable that exits 0 on --version counts; /bin/sh -c is
        // not usable here, so rely on `true` which ignores its args.
        let path = which::which("true").expect("`true` available on unix");
        let handle = ensure_installed(Some(&path), false).expect("true(1) probes fine");
        assert_eq!(handle.path, path);
        assert_eq!(handle.version.as_deref(), Some(""));
    }

    #[test]
    fn handle_describe_includes_version() {
        let handle = RcloneHandle {
            path: PathBuf::from("/usr/bin/rclone"),
            version: Some("rclone v1.66.0".into()),
        };
        assert_eq!(handle.describe(), "/usr/bin/rclone (rclone v1.66.0)");

        let bare = RcloneHandle {
            path: PathBuf::from("/usr/bin/rclone"),
            version: None,
        };
        assert_eq!(bare.describe(), "/usr/bin/rclone");
    }
}
