//! Package-manager installation chains for Linux and macOS.
//!
//! Each manager is only attempted when its binary is present, and a
//! failed install moves on to the next candidate rather than aborting.
//! Callers fall back to the manual download when the whole chain fails.

use std::process::Command;

use which::which;

/// One package-manager candidate in the Linux chain.
struct Manager {
    name: &'static str,
    /// Run before installing (e.g. `apt-get update`).
    update: Option<&'static [&'static str]>,
    install: &'static [&'static str],
}

const LINUX_MANAGERS: &[Manager] = &[
    Manager {
        name: "apt-get",
        update: Some(&["sudo", "apt-get", "update"]),
        install: &["sudo", "apt-get", "install", "-y", "rclone"],
    },
    Manager {
        name: "yum",
        update: None,
        install: &["sudo", "yum", "install", "-y", "rclone"],
    },
    Manager {
        name: "dnf",
        update: None,
        install: &["sudo", "dnf", "install", "-y", "rclone"],
    },
    Manager {
        name: "zypper",
        update: None,
        install: &["sudo", "zypper", "install", "-y", "rclone"],
    },
];

/// Try each known Linux package manager in order.
///
/// Returns true as soon as one install command succeeds.
pub fn install_linux() -> bool {
    for manager in LINUX_MANAGERS {
        if which(manager.name).is_err() {
            tracing::debug!(manager = manager.name, "package manager not present");
            continue;
        }

        if let Some(update) = manager.update {
            if !run(update) {
                tracing::warn!(manager = manager.name, "update step failed, skipping");
                continue;
            }
        }

        println!("Installing rclone with {}...", manager.name);
        if run(manager.install) {
            return true;
        }
        tracing::warn!(manager = manager.name, "install failed, trying next");
    }

    false
}

/// Install via Homebrew when it is available.
pub fn install_macos_brew() -> bool {
    if which("brew").is_err() {
        tracing::debug!("brew not present");
        return false;
    }

    println!("Installing rclone with Homebrew...");
    run(&["brew", "install", "rclone"])
}

/// Run a command inheriting stdio, returning whether it exited zero.
fn run(argv: &[&str]) -> bool {
    let (program, args) = match argv.split_first() {
        Some(split) => split,
        None => return false,
    };

    match Command::new(program).args(args).status() {
        Ok(status) => status.success(),
        Err(e) => {
            tracing::debug!(command = %program, error = %e, "failed to spawn");
            false
        }
    }
}
