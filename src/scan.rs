//! Directory overview for fresh-mode prompts.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "__pycache__", "dist", "build", "target"];

/// Default nesting limit of the overview.
pub const DEFAULT_MAX_DEPTH: usize = 4;

fn skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|n| SKIPPED_DIRS.contains(&n))
            .unwrap_or(false)
}

/// Indented, name-sorted listing of the directories below `root` (root itself excluded).
pub fn directory_structure(root: &Path, max_depth: usize) -> String {
    let mut out = String::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !skipped(e));
    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_dir() {
            continue;
        }
        let indent = "  ".repeat(entry.depth() - 1);
        out.push_str(&format!("{indent}{}/\n", entry.file_name().to_string_lossy()));
    }
    out
}
