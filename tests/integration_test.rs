use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_command(args: &[&str]) -> Output {
    Command::new("cargo")
        .arg("run")
        .arg("--")
        .args(args)
        .env("MARP_PATH", "slide-bridge-missing-marp")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_list_themes_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("corporate.css"), "/* @theme corporate */")
        .expect("Failed to write theme");

    let output = run_command(&[
        "--list-themes",
        "--theme-dir",
        temp_dir.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("default"));
    assert!(stdout.contains("gaia"));
    assert!(stdout.contains("uncover"));
    assert!(stdout.contains("corporate"));
    assert!(stdout.contains("custom"));
}

#[test]
fn test_check_marp_reports_missing_renderer() {
    let output = run_command(&["--check-marp"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("not installed"));
    assert!(stdout.contains("npm install -g @marp-team/marp-cli"));
}

#[test]
fn test_missing_input_file_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let missing = temp_dir.path().join("missing.md");

    let output = run_command(&[
        missing.to_str().unwrap(),
        "--output-dir",
        temp_dir.path().to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Path not found"), "stderr: {}", stderr);
}

#[test]
fn test_fast_path_without_marp_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let markdown_path = temp_dir.path().join("notes.md");
    fs::write(&markdown_path, "# Notes\n\nA short line.").expect("Failed to write markdown");

    let out_dir = temp_dir.path().join("out");

    let output = run_command(&[
        markdown_path.to_str().unwrap(),
        "--output-dir",
        out_dir.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Marp CLI not found"), "stderr: {}", stderr);
    // The composed markdown is kept for debugging
    let composed = fs::read_to_string(out_dir.join("notes.md")).expect("Missing composed markdown");
    assert!(composed.contains("marp: true"));
    assert!(!out_dir.join("notes.pptx").exists());
}

#[test]
fn test_invalid_mode_is_rejected() {
    let output = run_command(&["deck.md", "-m", "sideways"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sideways"));
}
