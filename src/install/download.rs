//! Manual rclone download fallback.
//!
//! Downloads the current rclone release archive from
//! downloads.rclone.org, verifies it against the published SHA256SUMS
//! when those can be fetched, extracts it with the system archiver and
//! installs the binary into `/usr/local/bin` (sudo) or `~/bin`.
//!
//! Everything happens inside a [`tempfile::TempDir`] that is removed on
//! drop, including on error paths.

use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::dir_on_path;

const BASE_URL: &str = "https://downloads.rclone.org";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Errors from the manual download/install path.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error {status} fetching {url}")]
    Http { status: u16, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("failed to extract archive: {0}")]
    ExtractFailed(String),

    #[error("no prebuilt rclone archive for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("could not determine a home directory for the fallback install")]
    NoInstallLocation,
}

/// Release archive file name for an OS/arch pair.
///
/// rclone names macOS builds `osx` and uses `amd64`/`arm64` for the
/// architectures.
pub fn archive_name(os: &str, arch: &str) -> Result<String, DownloadError> {
    let os_part = match os {
        "linux" => "linux",
        "macos" => "osx",
        "windows" => "windows",
        _ => {
            return Err(DownloadError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            });
        }
    };
    let arch_part = match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        _ => {
            return Err(DownloadError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            });
        }
    };
    Ok(format!("rclone-current-{}-{}.zip", os_part, arch_part))
}

/// Download, verify, extract and install rclone.
///
/// Returns the absolute path of the installed binary.
pub fn install_manual() -> Result<PathBuf, DownloadError> {
    let archive = archive_name(std::env::consts::OS, std::env::consts::ARCH)?;
    let url = format!("{}/{}", BASE_URL, archive);

    let work_dir = tempfile::tempdir()?;
    let archive_path = work_dir.path().join(&archive);

    println!("Downloading rclone...");
    download_file(&url, &archive_path)?;

    verify_archive(&archive, &archive_path)?;

    extract_archive(&archive_path, work_dir.path())?;
    let binary = find_extracted_binary(work_dir.path())?;

    #[cfg(unix)]
    make_executable(&binary)?;

    install_binary(&binary)
}

/// Stream a URL to disk with a progress bar.
fn download_file(url: &str, dest: &Path) -> Result<(), DownloadError> {
    let client = reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| DownloadError::Network(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| DownloadError::Network(e.to_string()))?;

    let status = response.status().as_u16();
    if status >= 400 {
        return Err(DownloadError::Http {
            status,
            url: url.to_string(),
        });
    }

    let total = response.content_length().unwrap_or(0);
    let bar = if total > 0 {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    } else {
        ProgressBar::new_spinner()
    };

    let mut file = File::create(dest)?;
    let mut reader = BufReader::new(response);
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader
            .read(&mut buffer)
            .map_err(|e| DownloadError::Network(e.to_string()))?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n])?;
        bar.inc(n as u64);
    }

    file.sync_all()?;
    bar.finish_and_clear();
    Ok(())
}

/// Verify the downloaded archive against the published SHA256SUMS.
///
/// The checksum file not being reachable is a warning, not a failure;
/// a reachable checksum that disagrees is fatal.
fn verify_archive(archive: &str, path: &Path) -> Result<(), DownloadError> {
    let sums_url = format!("{}/SHA256SUMS", BASE_URL);
    let sums = match fetch_text(&sums_url) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "could not fetch SHA256SUMS");
            println!(
                "{} Could not fetch the rclone checksum file; skipping verification.",
                "!".yellow()
            );
            return Ok(());
        }
    };

    let Some(expected) = parse_sha256sums(&sums, archive) else {
        tracing::warn!(archive, "no checksum entry for archive");
        println!(
            "{} No checksum entry found for {}; skipping verification.",
            "!".yellow(),
            archive
        );
        return Ok(());
    };

    let actual = compute_sha256(path)?;
    if actual != expected {
        return Err(DownloadError::ChecksumMismatch {
            file: archive.to_string(),
            expected,
            actual,
        });
    }

    println!("{} Archive checksum verified.", "✓".green());
    Ok(())
}

fn fetch_text(url: &str) -> Result<String, DownloadError> {
    let client = reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| DownloadError::Network(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| DownloadError::Network(e.to_string()))?;

    let status = response.status().as_u16();
    if status >= 400 {
        return Err(DownloadError::Http {
            status,
            url: url.to_string(),
        });
    }

    response.text().map_err(|e| DownloadError::Network(e.to_string()))
}

/// Find the checksum entry for a file in `sha256sum`-format output.
pub fn parse_sha256sums(body: &str, file_name: &str) -> Option<String> {
    for line in body.lines() {
        let mut parts = line.split_whitespace();
        let hash = parts.next()?;
        if let Some(name) = parts.next() {
            // Entries may be "hash  name" or "hash  *name".
            if name.trim_start_matches('*') == file_name {
                return Some(hash.to_lowercase());
            }
        }
    }
    None
}

/// Compute the SHA256 of a file as lowercase hex.
pub fn compute_sha256(path: &Path) -> Result<String, DownloadError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();

    let mut buffer = [0u8; 8192];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Extract the zip using whatever archiver the system has.
///
/// `unzip` first, then `tar` (bsdtar reads zip files and is the only
/// option shipped with Windows).
fn extract_archive(archive: &Path, dest: &Path) -> Result<(), DownloadError> {
    let attempts: [&[&str]; 2] = [
        &["unzip", "-o", "-q"],
        &["tar", "-xf"],
    ];

    let mut last_failure = String::from("no archiver available");
    for attempt in attempts {
        let Some((program, base_args)) = attempt.split_first() else {
            continue;
        };

        let mut cmd = Command::new(program);
        cmd.args(base_args).arg(archive);
        if *program == "unzip" {
            cmd.arg("-d").arg(dest);
        } else {
            cmd.arg("-C").arg(dest);
        }

        match cmd.output() {
            Ok(output) if output.status.success() => return Ok(()),
            Ok(output) => {
                last_failure = format!(
                    "{} failed: {}",
                    program,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => {
                last_failure = format!("{} unavailable: {}", program, e);
            }
        }
    }

    Err(DownloadError::ExtractFailed(last_failure))
}

/// Locate the rclone binary inside the extracted `rclone-*` directory.
fn find_extracted_binary(dir: &Path) -> Result<PathBuf, DownloadError> {
    let binary_name = if cfg!(windows) { "rclone.exe" } else { "rclone" };

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("rclone-"))
        {
            let candidate = path.join(binary_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(DownloadError::ExtractFailed(
        "extracted archive does not contain an rclone binary".to_string(),
    ))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), DownloadError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Install the extracted binary.
///
/// Unix tries `/usr/local/bin` via sudo first, then falls back to
/// `~/bin`. Windows goes straight to the per-user bin directory. The
/// returned path is what the rest of the run uses, so the fallback is
/// fully usable even before PATH picks it up.
fn install_binary(binary: &Path) -> Result<PathBuf, DownloadError> {
    #[cfg(unix)]
    {
        if sudo_install(binary) {
            println!("Rclone installed to /usr/local/bin/");
            return Ok(PathBuf::from("/usr/local/bin/rclone"));
        }
        println!("Could not install to /usr/local/bin. Installing to user directory...");
    }

    user_install(binary)
}

#[cfg(unix)]
fn sudo_install(binary: &Path) -> bool {
    let mkdir = Command::new("sudo")
        .args(["mkdir", "-p", "/usr/local/bin"])
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !mkdir {
        return false;
    }

    Command::new("sudo")
        .arg("cp")
        .arg(binary)
        .arg("/usr/local/bin/rclone")
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn user_install(binary: &Path) -> Result<PathBuf, DownloadError> {
    let user_bin = dirs::home_dir()
        .ok_or(DownloadError::NoInstallLocation)?
        .join("bin");
    fs::create_dir_all(&user_bin)?;

    let file_name = binary
        .file_name()
        .ok_or(DownloadError::NoInstallLocation)?;
    let dest = user_bin.join(file_name);
    fs::copy(binary, &dest)?;

    #[cfg(unix)]
    make_executable(&dest)?;

    println!("Rclone installed to {}", user_bin.display());
    if !dir_on_path(&user_bin) {
        println!(
            "{} {} is not on your PATH; this run will use the full path, but future shells need it added.",
            "!".yellow(),
            user_bin.display()
        );
    }

    Ok(dest)
}
