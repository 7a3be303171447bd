//! End-to-end tests for the promote binary

use std::path::PathBuf;
use std::process::{Command, Output};

use mockito::{Server, ServerGuard};
use tempfile::TempDir;

/// Test context with a scratch directory and a clean environment
struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        Self { temp_dir }
    }

    fn promote_cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_promote"));
        cmd.current_dir(self.temp_dir.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("PROMOTE_SOURCE")
            .env_remove("PROMOTE_DESTINATION")
            .env_remove("PROMOTE_SOURCE_USERNAME")
            .env_remove("PROMOTE_SOURCE_PASSWORD")
            .env_remove("PROMOTE_DESTINATION_API_KEY");
        cmd
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content).expect("failed to write file");
        path
    }
}

fn run(cmd: &mut Command) -> (Output, String, String) {
    let output = cmd.output().expect("failed to run promote");
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    (output, stdout, stderr)
}

/// One mock server hosting a source feed under /src and a destination
/// under /dst. The source has `Pkg 1.0.0` with the given license
/// expression; the destination has nothing.
fn feeds(license_expression: &str) -> ServerGuard {
    let mut server = Server::new();
    let url = server.url();

    for feed in ["src", "dst"] {
        server
            .mock("GET", format!("/{feed}/index.json").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"version": "3.0.0", "resources": [
                    {{"@id": "{url}/{feed}/flat/", "@type": "PackageBaseAddress/3.0.0"}},
                    {{"@id": "{url}/{feed}/reg/", "@type": "RegistrationsBaseUrl/3.6.0"}}
                ]}}"#
            ))
            .create();
    }

    server
        .mock("GET", "/src/flat/pkg/index.json")
        .with_status(200)
        .with_body(r#"{"versions": ["0.9.0", "1.0.0"]}"#)
        .create();
    server
        .mock("GET", "/src/reg/pkg/1.0.0.json")
        .with_status(200)
        .with_body(format!(
            r#"{{"listed": true, "catalogEntry": {{
                "licenseExpression": "{license_expression}",
                "dependencyGroups": []
            }}}}"#
        ))
        .create();
    server
        .mock("HEAD", "/dst/flat/pkg/1.0.0/pkg.1.0.0.nupkg")
        .with_status(404)
        .create();

    server
}

fn feed_args(server: &ServerGuard) -> Vec<String> {
    vec![
        "--source".to_string(),
        format!("{}/src/index.json", server.url()),
        "--destination".to_string(),
        format!("{}/dst/index.json", server.url()),
    ]
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let (output, stdout, _) = run(ctx.promote_cmd().arg("--help"));
    assert!(output.status.success());
    assert!(stdout.contains("Usage:"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let (output, stdout, _) = run(ctx.promote_cmd().arg("--version"));
    assert!(output.status.success());
    assert!(stdout.starts_with("promote "));
}

#[test]
fn test_package_requires_feeds() {
    let ctx = TestContext::new();
    let (output, _, stderr) = run(ctx.promote_cmd().args(["package", "Pkg"]));
    assert!(!output.status.success());
    assert!(stderr.contains("--source"));
}

#[test]
fn test_missing_config_file() {
    let ctx = TestContext::new();
    let (output, _, stderr) = run(ctx.promote_cmd().args(["config", "missing.toml"]));
    assert!(!output.status.success());
    assert!(stderr.contains("Failed to read config"));
}

#[test]
fn test_invalid_version_policy() {
    let ctx = TestContext::new();
    let (output, _, stderr) = run(ctx.promote_cmd().args([
        "package",
        "Pkg",
        "--version",
        "[1.0",
        "--source",
        "http://127.0.0.1:9/index.json",
        "--destination",
        "http://127.0.0.1:9/index.json",
    ]));
    assert!(!output.status.success());
    assert!(stderr.contains("Invalid package request 'Pkg'"));
}

#[test]
fn test_empty_package_list() {
    let ctx = TestContext::new();
    let list = ctx.write("packages.yaml", "[]\n");
    let (output, _, stderr) = run(ctx.promote_cmd().arg("list").arg(&list).args([
        "--source",
        "http://127.0.0.1:9/index.json",
        "--destination",
        "http://127.0.0.1:9/index.json",
    ]));
    assert!(!output.status.success());
    assert!(stderr.contains("is empty"));
}

#[test]
fn test_dry_run_prints_tree_without_pushing() {
    let server = feeds("MIT");
    let ctx = TestContext::new();

    let (output, stdout, stderr) = run(ctx
        .promote_cmd()
        .args(["--dry-run", "package", "Pkg", "--version", "1.0.0"])
        .args(feed_args(&server)));

    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stdout.contains("Resolving packages"));
    assert!(stdout.contains("  Pkg 1.0.0\n"));
    assert!(stdout.contains("1 package resolved, 1 to promote"));
    assert!(stdout.contains("Dry run: 1 package(s) would be promoted"));
    assert!(!stdout.contains("Transferring packages"));
}

#[test]
fn test_license_violation_fails_the_run() {
    let server = feeds("GPL-3.0-only");
    let ctx = TestContext::new();
    let license = ctx.write(
        "license.toml",
        "[license]\nenabled = true\naccepted_expressions = [\"MIT\"]\n",
    );

    let (output, stdout, stderr) = run(ctx
        .promote_cmd()
        .args(["--dry-run", "package", "Pkg", "--version", "1.0.0"])
        .args(feed_args(&server))
        .arg("--license-config")
        .arg(&license));

    assert!(!output.status.success());
    assert!(stdout.contains("Pkg 1.0.0"));
    assert!(stdout.contains("GPL-3.0-only"));
    assert!(stderr.contains("1 package(s) failed license validation"));
    assert!(!stdout.contains("Dry run"));
}

#[test]
fn test_config_file_drives_the_run() {
    let server = feeds("MIT");
    let ctx = TestContext::new();
    let config = ctx.write(
        "promote.toml",
        &format!(
            r#"
[source]
url = "{url}/src/index.json"

[destination]
url = "{url}/dst/index.json"

[options]
dry_run = true

[license]
enabled = true
accepted_expressions = ["MIT"]

[[packages]]
id = "Pkg"
versions = ["[1.0,2.0)"]
"#,
            url = server.url()
        ),
    );

    let (output, stdout, stderr) = run(ctx.promote_cmd().arg("config").arg(&config));

    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stdout.contains("License validation passed for 1 package"));
    assert!(stdout.contains("Dry run: 1 package(s) would be promoted"));
}
