#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

pub fn have_git() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run git in `dir`, asserting success; returns trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Initialize a repository on branch `branch` with a local identity.
pub fn init_repo_on(dir: &Path, branch: &str) {
    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")]);
    git(dir, &["config", "user.name", "Archy Test"]);
    git(dir, &["config", "user.email", "archy@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

pub fn init_repo(dir: &Path) {
    init_repo_on(dir, "main");
}

pub fn write_file(dir: &Path, rel: &str, contents: &str) {
    let p = dir.join(rel);
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(p, contents).expect("write");
}

pub fn commit_all(dir: &Path, msg: &str) {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", msg]);
}

/// Repository with `app/service.py` on main and a `feature` branch checked out.
pub fn repo_with_main(dir: &Path) {
    init_repo(dir);
    write_file(dir, "app/service.py", "def serve():\n    return 1\n");
    write_file(dir, "web/index.ts", "export const x = 1;\n");
    commit_all(dir, "initial");
    git(dir, &["checkout", "-q", "-b", "feature"]);
}

/// Write prompt templates into `dir/patterns` and return that directory.
pub fn write_patterns(dir: &Path) -> PathBuf {
    let p = dir.join("patterns");
    fs::create_dir_all(&p).expect("mkdir patterns");
    fs::write(
        p.join("create_design_document_pattern.md"),
        "CREATE TEMPLATE\n\n# INPUT:\n",
    )
    .expect("write create");
    fs::write(
        p.join("update_arch_diagram_pattern.md"),
        "UPDATE TEMPLATE\n\n# INPUT:\n",
    )
    .expect("write update");
    p
}

/// Backend stand-in: a shell script that records each call under `state`
/// (`count`, `args_<n>`, `prompt_<n>`, `stdin_<n>`) and then runs `body` with `$n` set to the
/// call number.
pub fn write_stub(dir: &Path, name: &str, state: &Path, body: &str) -> PathBuf {
    fs::create_dir_all(state).expect("mkdir state");
    let script = format!(
        r#"#!/bin/sh
state='{state}'
n=$(( $(cat "$state/count" 2>/dev/null || echo 0) + 1 ))
echo "$n" > "$state/count"
printf '%s\n' "$@" > "$state/args_$n"
for last; do :; done
printf '%s' "$last" > "$state/prompt_$n"
cat > "$state/stdin_$n"
{body}
"#,
        state = state.display(),
        body = body
    );
    let p = dir.join(name);
    fs::write(&p, script).expect("write stub");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&p, fs::Permissions::from_mode(0o755)).expect("chmod stub");
    }
    p
}

pub fn call_count(state: &Path) -> usize {
    fs::read_to_string(state.join("count"))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

pub fn read_state(state: &Path, file: &str) -> String {
    fs::read_to_string(state.join(file)).unwrap_or_default()
}

/// `archy` with a hermetic environment: no inherited ARCHY_* settings, HOME and TMPDIR under
/// `sandbox`, colors off.
pub fn archy(sandbox: &Path) -> Command {
    let home = sandbox.join("home");
    let tmp = sandbox.join("tmp");
    fs::create_dir_all(&home).expect("mkdir home");
    fs::create_dir_all(&tmp).expect("mkdir tmp");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_archy"));
    for (k, _) in std::env::vars() {
        if k.starts_with("ARCHY_") {
            cmd.env_remove(k);
        }
    }
    cmd.env("HOME", &home)
        .env("TMPDIR", &tmp)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

/// Entries left in the sandbox TMPDIR (scratch directories that were not cleaned up).
pub fn leftover_tmp(sandbox: &Path) -> Vec<String> {
    fs::read_dir(sandbox.join("tmp"))
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

pub fn stdout_json(out: &Output) -> serde_json::Value {
    let s = String::from_utf8_lossy(&out.stdout);
    serde_json::from_str(s.trim()).unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {s}"))
}

/// The JSON error object: last non-empty stderr line.
pub fn stderr_json(out: &Output) -> serde_json::Value {
    let s = String::from_utf8_lossy(&out.stderr);
    let line = s
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_else(|| panic!("empty stderr"));
    serde_json::from_str(line).unwrap_or_else(|e| panic!("stderr line is not JSON ({e}): {s}"))
}

pub fn describe(out: &Output) -> String {
    format!(
        "status={:?}\nstdout:\n{}\nstderr:\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    )
}
