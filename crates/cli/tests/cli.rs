use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn qta_project(dir: &Path) {
    fs::create_dir_all(dir.join("cases")).unwrap();
    fs::write(dir.join("manage.py"), "").unwrap();
    fs::write(dir.join("settings.py"), "").unwrap();
    fs::write(
        dir.join("cases").join("test_login.py"),
        "class LoginTest(object):\n    pass\n",
    )
    .unwrap();
}

fn qta_runner() -> Command {
    let mut cmd = Command::cargo_bin("qta-runner").unwrap();
    cmd.env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_help_lists_commands() {
    qta_runner()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tree"))
        .stdout(predicate::str::contains("test"))
        .stdout(predicate::str::contains("RUST_LOG=debug"));
}

#[test]
fn test_run_outside_project_fails() {
    let temp = TempDir::new().unwrap();
    let script = temp.path().join("script.py");
    fs::write(&script, "print('hi')\n").unwrap();

    qta_runner()
        .args(["run", "--dry-run"])
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not inside a QTA project"));
}

#[test]
fn test_dry_run_prints_terminal_lines() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("proj");
    qta_project(&root);

    qta_runner()
        .args(["--never", "run", "--dry-run"])
        .arg(root.join("cases").join("test_login.py"))
        .assert()
        .success()
        .stdout(predicate::str::contains("PYTHONPATH="))
        .stdout(predicate::str::contains("test_login.py"));
}

#[test]
fn test_init_writes_settings_once() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("proj");
    qta_project(&root);

    qta_runner()
        .arg("init")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created settings"));
    assert!(root.join(".vscode").join("settings.json").is_file());

    qta_runner()
        .arg("init")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));
}

#[test]
fn test_test_needs_line_or_class() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("proj");
    qta_project(&root);

    qta_runner()
        .args(["--never", "test", "--dry-run"])
        .arg(root.join("cases").join("test_login.py"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("FILE:LINE"));
}

#[test]
fn test_tree_without_settings_dir_suggests_init() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("proj");
    qta_project(&root);
    let module = root.join("cases").join("test_login.py");

    for command in ["tree", "lenses"] {
        qta_runner()
            .args(["--never", command])
            .arg(&module)
            .assert()
            .failure()
            .stderr(predicate::str::contains("outside any project cache root"))
            .stderr(predicate::str::contains("qta-runner init"))
            .stdout(predicate::str::contains("No classes or functions").not())
            .stdout(predicate::str::contains("No test cases").not());
    }
}

#[test]
fn test_env_without_requirements_file() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("proj");
    qta_project(&root);

    qta_runner()
        .args(["--never", "env", "--dry-run"])
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("No virtualenv in use"))
        .stdout(predicate::str::contains("No requirements file"));
}
