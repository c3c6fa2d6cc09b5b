//! Credential verification via the aws CLI.
//!
//! Before any data moves, a single `aws s3 ls s3://<bucket>` probe
//! checks that the credentials can see the bucket. The aws CLI being
//! absent is not an error; the check is simply skipped, matching the
//! tool's delegate-everything philosophy.

use std::process::Command;

use which::which;

use crate::config::{Credentials, S3Target};

/// Outcome of the credential probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The bucket listed successfully.
    Verified,
    /// The probe ran and failed; the message is aws-cli stderr.
    Failed(String),
    /// The aws CLI is not installed; verification skipped.
    SkippedNoCli,
}

/// Hints printed when verification fails, in the order users should
/// check them.
pub const FAILURE_HINTS: [&str; 4] = [
    "The access key or secret key may be incorrect",
    "The specified bucket may not exist or you don't have access to it",
    "The region may be incorrect",
    "There may be network connectivity issues",
];

/// Probe bucket access with the aws CLI.
///
/// Credentials are passed through the child environment only and are
/// never written anywhere.
pub fn verify_credentials(target: &S3Target, credentials: &Credentials) -> VerifyOutcome {
    let aws = match which("aws") {
        Ok(path) => path,
        Err(_) => {
            tracing::debug!("aws CLI not found; skipping credential verification");
            return VerifyOutcome::SkippedNoCli;
        }
    };

    println!("Testing access to bucket: {}", target.bucket);

    let result = Command::new(aws)
        .args(["s3", "ls", &format!("s3://{}", target.bucket)])
        .env("AWS_ACCESS_KEY_ID", &credentials.access_key_id)
        .env("AWS_SECRET_ACCESS_KEY", &credentials.secret_access_key)
        .env("AWS_REGION", &target.region)
        .output();

    match result {
        Ok(output) if output.status.success() => VerifyOutcome::Verified,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(error = %stderr, "credential probe failed");
            VerifyOutcome::Failed(stderr)
        }
        Err(e) => VerifyOutcome::Failed(format!("failed to run aws CLI: {}", e)),
    }
}
