//! Git plumbing: repository root discovery, default-branch resolution and the
//! extension-restricted diff used by change-driven runs.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::instrument;

use crate::errors::ArchyError;

/// Source and configuration file types included in change diffs by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "ts", "tsx", "mjs", "go", "rs", "java", "kt", "scala", "rb", "php", "cs",
    "c", "h", "cc", "cpp", "hpp", "swift", "m", "sh", "sql", "proto", "graphql", "tf", "yaml",
    "yml", "json", "toml", "ini", "cfg", "xml", "gradle", "dockerfile",
];

/// Lock files and generated artifacts that are never worth a prompt token.
pub const EXCLUDED_PATTERNS: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Pipfile.lock",
    "poetry.lock",
    "Cargo.lock",
    "composer.lock",
    "Gemfile.lock",
    "go.sum",
    "*.min.js",
    "*.min.css",
    "*.bundle.js",
    "*.bundle.css",
];

/// Run a git command with optional -C <repo>. Returns Output on invocation success.
pub fn git(repo: Option<&Path>, args: &[&str]) -> std::io::Result<Output> {
    let mut cmd = Command::new("git");
    if let Some(r) = repo {
        cmd.arg("-C").arg(r);
    }
    for a in args {
        cmd.arg(a);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd.output()
}

/// Run a git command and capture trimmed stdout as UTF-8 String on success.
pub fn git_stdout_str(repo: Option<&Path>, args: &[&str]) -> Option<String> {
    git(repo, args).ok().and_then(|o| {
        if o.status.success() {
            Some(String::from_utf8_lossy(&o.stdout).trim().to_string())
        } else {
            None
        }
    })
}

/// Walk upward from `start` to the filesystem root looking for a `.git` entry (directory, or
/// file for worktrees and submodules).
pub fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut cur = Some(start);
    while let Some(dir) = cur {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        cur = dir.parent();
    }
    None
}

/// Relative prefix (ending in `/`) of `target` below `git_root`; empty when they are the same.
pub fn path_filter(git_root: &Path, target: &Path) -> String {
    match target.strip_prefix(git_root) {
        Ok(rel) if !rel.as_os_str().is_empty() => {
            let mut s = rel.to_string_lossy().replace('\\', "/");
            if !s.ends_with('/') {
                s.push('/');
            }
            s
        }
        _ => String::new(),
    }
}

fn local_branch_exists(repo: &Path, name: &str) -> bool {
    let refname = format!("refs/heads/{name}");
    git(Some(repo), &["show-ref", "--verify", "--quiet", &refname])
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn remote_head_branch(repo: &Path) -> Option<String> {
    let full = git_stdout_str(
        Some(repo),
        &["symbolic-ref", "--quiet", "refs/remotes/origin/HEAD"],
    )?;
    let name = full.strip_prefix("refs/remotes/origin/")?.to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Name of the checked-out branch; None when HEAD is detached or git fails.
pub fn current_branch(repo: &Path) -> Option<String> {
    git_stdout_str(Some(repo), &["symbolic-ref", "--quiet", "--short", "HEAD"])
        .filter(|s| !s.is_empty())
}

/// Branch used as the diff base. Never fails.
///
/// Order: origin/HEAD target, local `main`, local `master`, current branch, literal `main`.
#[instrument(level = "debug", ret)]
pub fn resolve_default_branch(repo_root: &Path) -> String {
    if let Some(b) = remote_head_branch(repo_root) {
        return b;
    }
    for candidate in ["main", "master"] {
        if local_branch_exists(repo_root, candidate) {
            return candidate.to_string();
        }
    }
    current_branch(repo_root).unwrap_or_else(|| "main".to_string())
}

/// Prefer the remote-tracking ref of `branch` when it resolves, else the local branch.
pub fn diff_base(repo_root: &Path, branch: &str) -> String {
    let remote = format!("origin/{branch}");
    let spec = format!("{remote}^{{commit}}");
    let ok = git(Some(repo_root), &["rev-parse", "--verify", "--quiet", &spec])
        .map(|o| o.status.success())
        .unwrap_or(false);
    if ok {
        remote
    } else {
        branch.to_string()
    }
}

/// Escape wildmatch metacharacters so a literal directory prefix can be combined with a glob.
fn escape_pathspec_glob(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Pathspecs restricting a diff to `path_filter` and `extensions`, minus EXCLUDED_PATTERNS.
pub fn diff_pathspecs(path_filter: &str, extensions: &[String]) -> Vec<String> {
    let prefix = escape_pathspec_glob(path_filter);
    let mut specs: Vec<String> = extensions
        .iter()
        .map(|ext| format!("{prefix}*.{ext}"))
        .collect();
    for pat in EXCLUDED_PATTERNS {
        specs.push(format!(":(exclude){prefix}*{pat}"));
    }
    specs
}

/// Changes of the current branch against its base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Ref the diff was taken against (`origin/<branch>` or `<branch>`).
    pub base: String,
    /// Stat summary followed by the full patch.
    pub diff: String,
    /// Changed paths, relative to the repository root.
    pub files: Vec<String>,
}

fn run_diff(repo_root: &Path, range: &str, mode: &[&str], specs: &[String]) -> Result<String, ArchyError> {
    let mut args: Vec<&str> = vec!["diff", "--no-color", "--no-ext-diff"];
    args.extend_from_slice(mode);
    args.push(range);
    args.push("--");
    args.extend(specs.iter().map(|s| s.as_str()));

    let out = git(Some(repo_root), &args)
        .map_err(|e| ArchyError::Git(format!("failed to run git diff: {e}")))?;
    if !out.status.success() {
        return Err(ArchyError::Git(format!(
            "git diff {range} failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Diff of `<base>...HEAD` restricted to the path filter and extension allowlist. An empty diff
/// is `NoChangesFound`, distinct from git failures.
#[instrument(level = "info", skip(extensions), fields(extensions = extensions.len()))]
pub fn extract_changes(
    repo_root: &Path,
    default_branch: &str,
    path_filter: &str,
    extensions: &[String],
) -> Result<ChangeSet, ArchyError> {
    let base = diff_base(repo_root, default_branch);
    let range = format!("{base}...HEAD");
    let specs = diff_pathspecs(path_filter, extensions);

    let diff = run_diff(repo_root, &range, &["--stat", "--patch"], &specs)?;
    if diff.trim().is_empty() {
        return Err(ArchyError::NoChangesFound { base });
    }
    let files = run_diff(repo_root, &range, &["--name-only"], &specs)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    Ok(ChangeSet { base, diff, files })
}

/// Tracked files under `path_filter` (root-relative, sorted as git lists them), minus
/// EXCLUDED_PATTERNS and files deleted from the working tree.
pub fn tracked_files(repo_root: &Path, path_filter: &str) -> Result<Vec<String>, ArchyError> {
    let mut args = vec!["ls-files", "-z", "--"];
    if !path_filter.is_empty() {
        args.push(path_filter);
    }
    let out = git(Some(repo_root), &args)
        .map_err(|e| ArchyError::Git(format!("failed to run git ls-files: {e}")))?;
    if !out.status.success() {
        return Err(ArchyError::Git(format!(
            "git ls-files failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&out.stdout)
        .split('\0')
        .filter(|f| !f.is_empty())
        .filter(|f| !is_excluded(f))
        .filter(|f| repo_root.join(f).exists())
        .map(str::to_string)
        .collect())
}

/// Match a root-relative path against EXCLUDED_PATTERNS (basename match, `*` prefix wildcard).
pub fn is_excluded(path: &str) -> bool {
    let base = path.rsplit('/').next().unwrap_or(path);
    EXCLUDED_PATTERNS.iter().any(|pat| match pat.strip_prefix('*') {
        Some(suffix) => base.ends_with(suffix),
        None => base == *pat,
    })
}
