//! Prompt template store.
//!
//! Two templates live in a local directory: one for creating a document from scratch and one for
//! updating an existing document. Their content is opaque; it is read fresh on every run.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ArchyError;

pub const CREATE_PATTERN_FILE: &str = "create_design_document_pattern.md";
pub const UPDATE_PATTERN_FILE: &str = "update_arch_diagram_pattern.md";

/// Separator placed between an extension pattern and the built-in template.
pub const EXTENSION_SEPARATOR: &str = "# BASE PATTERN FOLLOWS";

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PatternKind {
    Create,
    Update,
}

impl PatternKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            PatternKind::Create => CREATE_PATTERN_FILE,
            PatternKind::Update => UPDATE_PATTERN_FILE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatternStore {
    dir: PathBuf,
    extension: Option<PathBuf>,
}

impl PatternStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: None,
        }
    }

    /// Prepend the content of `path` to every loaded template.
    pub fn with_extension(mut self, path: Option<PathBuf>) -> Self {
        self.extension = path;
        self
    }

    pub fn path_for(&self, kind: PatternKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    pub fn load(&self, kind: PatternKind) -> Result<String, ArchyError> {
        let path = self.path_for(kind);
        if !path.is_file() {
            return Err(ArchyError::TemplateNotFound(path));
        }
        let built_in = fs::read_to_string(&path)
            .map_err(|e| ArchyError::io(format!("failed to read {}", path.display()), e))?;

        match &self.extension {
            Some(ext) => {
                let extra = fs::read_to_string(ext).map_err(|e| {
                    ArchyError::io(format!("failed to read extension pattern {}", ext.display()), e)
                })?;
                Ok(format!(
                    "{}\n\n{EXTENSION_SEPARATOR}\n\n{built_in}",
                    extra.trim()
                ))
            }
            None => Ok(built_in),
        }
    }
}

/// Candidate template directories, most specific first.
///
/// - `explicit` (flag or ARCHY_PATTERNS_DIR)
/// - `~/.archy/patterns` (installer target)
/// - `<exe dir>/patterns`, `<exe dir>/../share/archy/patterns`
/// - the crate's own `patterns/` directory (development checkouts)
pub fn candidate_pattern_dirs(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(p) = explicit {
        out.push(p.to_path_buf());
        return out;
    }
    if let Some(home) = home::home_dir() {
        out.push(home.join(".archy").join("patterns"));
    }
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            out.push(dir.join("patterns"));
            out.push(dir.join("..").join("share").join("archy").join("patterns"));
        }
    }
    out.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("patterns"));
    out
}

/// First candidate directory that exists; falls back to the first candidate so the eventual
/// `TemplateNotFound` names a meaningful path.
pub fn resolve_patterns_dir(explicit: Option<&Path>) -> PathBuf {
    let candidates = candidate_pattern_dirs(explicit);
    candidates
        .iter()
        .find(|p| p.is_dir())
        .or_else(|| candidates.first())
        .cloned()
        .unwrap_or_else(|| PathBuf::from("patterns"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_both_kinds() {
        let td = tempfile::tempdir().expect("tmpdir");
        fs::write(td.path().join(CREATE_PATTERN_FILE), "CREATE\n# INPUT:\n").unwrap();
        fs::write(td.path().join(UPDATE_PATTERN_FILE), "UPDATE\n# INPUT:\n").unwrap();
        let store = PatternStore::new(td.path());
        assert_eq!(store.load(PatternKind::Create).unwrap(), "CREATE\n# INPUT:\n");
        assert_eq!(store.load(PatternKind::Update).unwrap(), "UPDATE\n# INPUT:\n");
    }

    #[test]
    fn test_missing_template_is_distinct_error() {
        let td = tempfile::tempdir().expect("tmpdir");
        let e = PatternStore::new(td.path())
            .load(PatternKind::Update)
            .unwrap_err();
        assert_eq!(e.kind(), "template_not_found");
        assert!(e.to_string().contains(UPDATE_PATTERN_FILE), "{e}");
    }

    #[test]
    fn test_extension_is_prepended() {
        let td = tempfile::tempdir().expect("tmpdir");
        fs::write(td.path().join(CREATE_PATTERN_FILE), "BASE").unwrap();
        let ext = td.path().join("ext.md");
        fs::write(&ext, "  Use our naming rules.\n").unwrap();
        let store = PatternStore::new(td.path()).with_extension(Some(ext));
        assert_eq!(
            store.load(PatternKind::Create).unwrap(),
            format!("Use our naming rules.\n\n{EXTENSION_SEPARATOR}\n\nBASE")
        );
    }

    #[test]
    fn test_explicit_dir_wins() {
        let td = tempfile::tempdir().expect("tmpdir");
        assert_eq!(resolve_patterns_dir(Some(td.path())), td.path());
        assert_eq!(candidate_pattern_dirs(Some(td.path())).len(), 1);
    }

    #[test]
    fn test_shipped_templates_exist() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("patterns");
        let store = PatternStore::new(dir);
        assert!(store.load(PatternKind::Create).is_ok());
        assert!(store.load(PatternKind::Update).is_ok());
    }
}
