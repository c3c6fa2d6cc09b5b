//! Two-phase sync engine driving the rclone binary.
//!
//! The engine writes a short-lived rclone config file, invokes
//! `rclone sync` against it, and parses the final transfer statistics
//! from rclone's output. All transfer, diffing, retry and checksum work
//! happens inside rclone itself.
//!
//! # Safety
//!
//! The destructive `--delete-after` flag is only passed when the user
//! explicitly opted in, and the default flow runs `--dry-run` first and
//! asks for confirmation before the live phase.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::SyncJob;

/// Errors that can occur before rclone even runs.
///
/// Failures of rclone itself are reported through [`PhaseResult`] so the
/// caller can show output and hints instead of aborting with a bare error.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("failed to write temporary rclone config: {0}")]
    ConfigWrite(#[from] std::io::Error),

    #[error("failed to execute rclone ({binary}): {message}")]
    Spawn { binary: String, message: String },
}

/// Which of the two invocations this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// `--dry-run`: report what would change, modify nothing.
    DryRun,
    /// The real transfer.
    Live,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DryRun => write!(f, "dry-run"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Statistics parsed from rclone output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Number of files transferred (live phase).
    pub files_transferred: u64,
    /// Total bytes transferred (live phase).
    pub bytes_transferred: u64,
    /// Operations rclone skipped because of `--dry-run`.
    pub planned_actions: u64,
}

/// Result of one rclone invocation.
#[derive(Debug, Clone)]
pub struct PhaseResult {
    pub phase: SyncPhase,
    pub success: bool,
    pub stats: TransferStats,
    pub duration_ms: u64,
    /// Classified error message if the phase failed.
    pub error: Option<String>,
    /// Combined rclone output, shown to the user.
    pub output: String,
}

/// Engine bound to a concrete rclone binary.
pub struct SyncEngine {
    rclone: PathBuf,
}

impl SyncEngine {
    pub fn new(rclone: impl Into<PathBuf>) -> Self {
        Self {
            rclone: rclone.into(),
        }
    }

    /// Run one phase of the sync.
    ///
    /// Writes the ephemeral config file, invokes rclone and parses its
    /// output. The config file is deleted when the temp handle drops,
    /// including on the error paths.
    pub fn run_phase(&self, job: &SyncJob, phase: SyncPhase) -> Result<PhaseResult, SyncError> {
        let start = Instant::now();

        let mut config_file = NamedTempFile::new()?;
        config_file.write_all(render_config(job).as_bytes())?;
        config_file.flush()?;

        let args = build_args(job, config_file.path(), phase);
        println!("Running: {}", display_command(&self.rclone, &args));

        tracing::debug!(
            phase = %phase,
            source = %job.source.display(),
            remote = %job.target.remote_spec(),
            "invoking rclone"
        );

        let output = Command::new(&self.rclone)
            .args(&args)
            .output()
            .map_err(|e| SyncError::Spawn {
                binary: self.rclone.display().to_string(),
                message: e.to_string(),
            })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{}{}", stdout, stderr);

        if !output.status.success() {
            let error_msg = classify_failure(&stderr, output.status.code());

            tracing::warn!(
                phase = %phase,
                status = ?output.status.code(),
                error = %error_msg,
                "rclone failed"
            );

            return Ok(PhaseResult {
                phase,
                success: false,
                stats: parse_rclone_stats(&combined),
                duration_ms,
                error: Some(error_msg),
                output: combined,
            });
        }

        let stats = parse_rclone_stats(&combined);

        tracing::info!(
            phase = %phase,
            files = stats.files_transferred,
            bytes = stats.bytes_transferred,
            planned = stats.planned_actions,
            duration_ms,
            "rclone completed"
        );

        Ok(PhaseResult {
            phase,
            success: true,
            stats,
            duration_ms,
            error: None,
            output: combined,
        })
    }
}

/// Render the ephemeral rclone config for this job.
///
/// The field set mirrors the classic minimal S3 remote definition,
/// including `env_auth = true` alongside the explicit keys.
pub fn render_config(job: &SyncJob) -> String {
    format!(
        "[s3]\n\
         type = s3\n\
         provider = AWS\n\
         env_auth = true\n\
         region = {}\n\
         access_key_id = {}\n\
         secret_access_key = {}\n",
        job.target.region, job.credentials.access_key_id, job.credentials.secret_access_key
    )
}

/// Build the full rclone argument list for a phase.
pub fn build_args(job: &SyncJob, config_path: &Path, phase: SyncPhase) -> Vec<String> {
    let mut args = vec![
        "--config".to_string(),
        config_path.display().to_string(),
        "sync".to_string(),
        job.source.display().to_string(),
        job.target.remote_spec(),
        "--progress".to_string(),
        "--verbose".to_string(),
    ];

    for pattern in &job.options.excludes {
        args.push(format!("--exclude={}", pattern));
    }

    if job.options.delete_extraneous {
        args.push("--delete-after".to_string());
    }

    if phase == SyncPhase::DryRun {
        args.push("--dry-run".to_string());
    }

    args
}

/// Render a command line for user display, hiding the temp config path.
///
/// The config file holds credentials; its path is noise at best and a
/// pointer to secrets at worst.
pub fn display_command(rclone: &Path, args: &[String]) -> String {
    let mut shown: Vec<String> = Vec::with_capacity(args.len() + 1);
    shown.push(rclone.display().to_string());

    let mut redact_next = false;
    for arg in args {
        if redact_next {
            shown.push("[temp-config]".to_string());
            redact_next = false;
            continue;
        }
        if arg == "--config" {
            redact_next = true;
        }
        shown.push(arg.clone());
    }

    shown.join(" ")
}

/// Classify an rclone failure from its stderr.
fn classify_failure(stderr: &str, code: Option<i32>) -> String {
    let trimmed = stderr.trim();

    if trimmed.contains("InvalidAccessKeyId")
        || trimmed.contains("SignatureDoesNotMatch")
        || trimmed.contains("AccessDenied")
    {
        format!("S3 rejected the credentials: {}", last_line(trimmed))
    } else if trimmed.contains("NoSuchBucket") {
        format!("bucket not found: {}", last_line(trimmed))
    } else if trimmed.contains("no such host")
        || trimmed.contains("connection refused")
        || trimmed.contains("i/o timeout")
    {
        format!("network error: {}", last_line(trimmed))
    } else if trimmed.is_empty() {
        format!("rclone exited with code {}", code.unwrap_or(-1))
    } else {
        format!("rclone failed: {}", last_line(trimmed))
    }
}

fn last_line(text: &str) -> &str {
    text.lines().last().unwrap_or(text).trim()
}

/// Parse the final `Transferred:` statistics from rclone output.
///
/// rclone prints two lines at the end of a run:
///
/// ```text
/// Transferred:        1.234 KiB / 1.234 KiB, 100%, 421 B/s, ETA 0s
/// Transferred:            3 / 3, 100%
/// ```
///
/// The first is bytes (with a unit), the second is a file count. Under
/// `--dry-run`, skipped operations are counted from the per-file
/// NOTICE lines instead.
pub fn parse_rclone_stats(output: &str) -> TransferStats {
    let mut stats = TransferStats::default();

    for line in output.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("Transferred:") {
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            if tokens.len() < 2 {
                continue;
            }
            if tokens[1] == "/" {
                // File count line: "3 / 3, 100%"
                stats.files_transferred =
                    tokens[0].replace(',', "").parse().unwrap_or(stats.files_transferred);
            } else {
                // Byte line: "1.234 KiB / 1.234 KiB, 100%, ..."
                let value: f64 = tokens[0].replace(',', "").parse().unwrap_or(0.0);
                let unit = tokens[1].trim_end_matches(',');
                stats.bytes_transferred = apply_unit(value, unit);
            }
        }

        if line.contains("as --dry-run is set") {
            stats.planned_actions += 1;
        }
    }

    stats
}

fn apply_unit(value: f64, unit: &str) -> u64 {
    let factor: f64 = match unit {
        "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return 0,
    };
    (value * factor).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, S3Target, SyncOptions};

    fn job() -> SyncJob {
        SyncJob {
            source: PathBuf::from("/data/photos"),
            target: S3Target::new("my-bucket", "us-east-1").with_dest_path("/archive"),
            credentials: Credentials::new("AKIAEXAMPLE", "sekrit"),
            options: SyncOptions {
                dry_run_first: true,
                delete_extraneous: true,
                excludes: vec!["*.tmp".into(), "cache/".into()],
            },
        }
    }

    #[test]
    fn config_rendering_includes_credentials() {
        let rendered = render_config(&job());
        assert!(rendered.starts_with("[s3]\n"));
        assert!(rendered.contains("type = s3"));
        assert!(rendered.contains("provider = AWS"));
        assert!(rendered.contains("region = us-east-1"));
        assert!(rendered.contains("access_key_id = AKIAEXAMPLE"));
        assert!(rendered.contains("secret_access_key = sekrit"));
    }

    #[test]
    fn dry_run_args_carry_all_flags() {
        let args = build_args(&job(), Path::new("/tmp/rc.conf"), SyncPhase::DryRun);
        assert_eq!(args[0], "--config");
        assert_eq!(args[1], "/tmp/rc.conf");
        assert_eq!(args[2], "sync");
        assert_eq!(args[3], "/data/photos");
        assert_eq!(args[4], "s3:my-bucket/archive");
        assert!(args.contains(&"--exclude=*.tmp".to_string()));
        assert!(args.contains(&"--exclude=cache/".to_string()));
        assert!(args.contains(&"--delete-after".to_string()));
        assert!(args.contains(&"--dry-run".to_string()));
    }

    #[test]
    fn live_args_omit_dry_run() {
        let args = build_args(&job(), Path::new("/tmp/rc.conf"), SyncPhase::Live);
        assert!(!args.contains(&"--dry-run".to_string()));
        assert!(args.contains(&"--delete-after".to_string()));
    }

    #[test]
    fn delete_flag_only_when_requested() {
        let mut j = job();
        j.options.delete_extraneous = false;
        let args = build_args(&j, Path::new("/tmp/rc.conf"), SyncPhase::Live);
        assert!(!args.contains(&"--delete-after".to_string()));
    }

    #[test]
    fn displayed_command_redacts_config_path() {
        let args = build_args(&job(), Path::new("/tmp/secret-location.conf"), SyncPhase::Live);
        let shown = display_command(Path::new("rclone"), &args);
        assert!(!shown.contains("secret-location"));
        assert!(shown.contains("[temp-config]"));
        assert!(shown.contains("s3:my-bucket/archive"));
    }

    #[test]
    fn parses_transfer_stats() {
        let output = "\
2024/05/01 10:00:03 INFO  : photo.jpg: Copied (new)
Transferred:   \t  1.234 KiB / 1.234 KiB, 100%, 421 B/s, ETA 0s
Transferred:            3 / 3, 100%
Elapsed time:         2.1s
";
        let stats = parse_rclone_stats(output);
        assert_eq!(stats.files_transferred, 3);
        assert_eq!(stats.bytes_transferred, 1264); // 1.234 * 1024, rounded
        assert_eq!(stats.planned_actions, 0);
    }

    #[test]
    fn parses_plain_byte_stats() {
        let output = "Transferred:            512 B / 512 B, 100%\nTransferred:            1 / 1, 100%\n";
        let stats = parse_rclone_stats(output);
        assert_eq!(stats.files_transferred, 1);
        assert_eq!(stats.bytes_transferred, 512);
    }

    #[test]
    fn counts_dry_run_notices() {
        let output = "\
2024/05/01 10:00:01 NOTICE: a.txt: Skipped copy as --dry-run is set (size 1.2Ki)
2024/05/01 10:00:01 NOTICE: b.txt: Skipped copy as --dry-run is set (size 40)
2024/05/01 10:00:01 NOTICE: old.txt: Skipped delete as --dry-run is set
Transferred:              0 B / 0 B, -
Transferred:            0 / 0, -
";
        let stats = parse_rclone_stats(output);
        assert_eq!(stats.planned_actions, 3);
        assert_eq!(stats.files_transferred, 0);
    }

    #[test]
    fn empty_output_parses_to_zero() {
        assert_eq!(parse_rclone_stats(""), TransferStats::default());
    }

    #[test]
    fn classifies_credential_failures() {
        let msg = classify_failure(
            "2024/05/01 ERROR : S3 bucket: InvalidAccessKeyId: The AWS Access Key Id you provided does not exist",
            Some(1),
        );
        assert!(msg.contains("rejected the credentials"));
    }

    #[test]
    fn classifies_missing_bucket() {
        let msg = classify_failure("ERROR : attempt 3/3 failed: NoSuchBucket", Some(1));
        assert!(msg.contains("bucket not found"));
    }

    #[test]
    fn classifies_network_failures() {
        let msg = classify_failure("dial tcp: lookup s3.amazonaws.com: no such host", Some(1));
        assert!(msg.contains("network error"));
    }

    #[test]
    fn classifies_silent_failures_by_code() {
        let msg = classify_failure("", Some(7));
        assert!(msg.contains("code 7"));
    }

    #[test]
    fn phase_display() {
        assert_eq!(SyncPhase::DryRun.to_string(), "dry-run");
        assert_eq!(SyncPhase::Live.to_string(), "live");
    }
}
