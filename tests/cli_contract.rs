use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn base_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("s3sync"))
}

#[test]
fn help_lists_the_full_flag_surface() {
    let mut cmd = base_cmd();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(contains("--source"))
        .stdout(contains("--bucket"))
        .stdout(contains("--region"))
        .stdout(contains("--dest-path"))
        .stdout(contains("--exclude"))
        .stdout(contains("--delete"))
        .stdout(contains("--skip-dry-run"))
        .stdout(contains("--rclone-path"))
        .stdout(contains("rclone"));
}

#[test]
fn help_does_not_leak_env_credential_values() {
    let mut cmd = base_cmd();
    cmd.env("AWS_SECRET_ACCESS_KEY", "hunter2-very-secret");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("hunter2-very-secret").not());
}

#[test]
fn version_prints() {
    let mut cmd = base_cmd();
    cmd.arg("--version");
    cmd.assert().success().stdout(contains("s3sync"));
}

#[cfg(unix)]
#[test]
fn missing_source_fails_before_any_sync() {
    let mut cmd = base_cmd();
    cmd.args([
        "--yes",
        "--skip-verify",
        "--rclone-path",
        "true",
        "--source",
        "/definitely/not/a/real/source/dir",
        "--bucket",
        "some-bucket",
    ])
    .env("AWS_ACCESS_KEY_ID", "AKIATEST")
    .env("AWS_SECRET_ACCESS_KEY", "testsecret");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("source directory not found"));
}

#[cfg(unix)]
#[test]
fn yes_mode_requires_a_bucket() {
    let tmp = tempfile::tempdir().unwrap();

    let mut cmd = base_cmd();
    cmd.args([
        "--yes",
        "--skip-verify",
        "--rclone-path",
        "true",
        "--source",
        tmp.path().to_str().unwrap(),
    ])
    .env("AWS_ACCESS_KEY_ID", "AKIATEST")
    .env("AWS_SECRET_ACCESS_KEY", "testsecret");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("--bucket is required"));
}

#[test]
fn no_install_fails_fast_when_rclone_is_a_bad_binary() {
    let mut cmd = base_cmd();
    cmd.args([
        "--yes",
        "--no-install",
        "--rclone-path",
        "/definitely/not/a/real/rclone",
        "--bucket",
        "b",
    ]);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("does not behave like rclone"));
}
