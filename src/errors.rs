//! Error mapping guide:
//! - Every fatal path maps to exit code 1, except interruption which maps to 130.
//! - `kind()` is the stable identifier written into the stderr JSON error object; wrapper
//!   scripts match on it, so never rename an existing kind.
//! - Backend failures only become `ArchyError::Backend` when the stage has no fallback.
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit code for an external interruption (SIGINT/SIGTERM/SIGHUP), shell convention.
pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug)]
pub enum ArchyError {
    /// A path contains a `..` segment.
    PathTraversal { description: String, path: String },
    /// A path is rooted under a denied system directory.
    BlockedSystemDirectory { description: String, path: String },
    /// A path exceeds the maximum accepted length.
    PathTooLong { description: String, length: usize },
    /// A filename uses characters outside `[A-Za-z0-9._-]`.
    UnsafeFilename(String),
    /// A subfolder argument is absolute or uses characters outside `[A-Za-z0-9._/-]`.
    UnsafeSubfolder(String),
    /// Command line could not be parsed.
    InvalidArguments(String),
    /// Backend selector outside the closed set of known backends.
    UnknownBackend(String),
    ProjectNotFound(PathBuf),
    NotADirectory(PathBuf),
    SubfolderNotFound(String),
    DirectoryNotWritable(PathBuf),
    FileNotOverwritable(PathBuf),
    RepositoryNotFound(PathBuf),
    /// Git invocation failed (not an empty diff; see `NoChangesFound`).
    Git(String),
    /// Empty diff against the default branch: nothing to document.
    NoChangesFound { base: String },
    Backend { backend: String, detail: String },
    TemplateNotFound(PathBuf),
    Configuration(String),
    Io { context: String, source: io::Error },
    Interrupted,
}

impl ArchyError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        ArchyError::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable snake_case identifier of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            ArchyError::PathTraversal { .. } => "path_traversal",
            ArchyError::BlockedSystemDirectory { .. } => "blocked_system_directory",
            ArchyError::PathTooLong { .. } => "path_too_long",
            ArchyError::UnsafeFilename(_) => "unsafe_filename",
            ArchyError::UnsafeSubfolder(_) => "unsafe_subfolder",
            ArchyError::InvalidArguments(_) => "invalid_arguments",
            ArchyError::UnknownBackend(_) => "unknown_backend",
            ArchyError::ProjectNotFound(_) => "project_not_found",
            ArchyError::NotADirectory(_) => "not_a_directory",
            ArchyError::SubfolderNotFound(_) => "subfolder_not_found",
            ArchyError::DirectoryNotWritable(_) => "directory_not_writable",
            ArchyError::FileNotOverwritable(_) => "file_not_overwritable",
            ArchyError::RepositoryNotFound(_) => "repository_not_found",
            ArchyError::Git(_) => "git_error",
            ArchyError::NoChangesFound { .. } => "no_changes_found",
            ArchyError::Backend { .. } => "backend_failed",
            ArchyError::TemplateNotFound(_) => "template_not_found",
            ArchyError::Configuration(_) => "configuration_error",
            ArchyError::Io { .. } => "io_error",
            ArchyError::Interrupted => "interrupted",
        }
    }

    /// True for errors raised while validating inputs, before any resource is acquired.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ArchyError::PathTraversal { .. }
                | ArchyError::BlockedSystemDirectory { .. }
                | ArchyError::PathTooLong { .. }
                | ArchyError::UnsafeFilename(_)
                | ArchyError::UnsafeSubfolder(_)
                | ArchyError::InvalidArguments(_)
                | ArchyError::UnknownBackend(_)
                | ArchyError::ProjectNotFound(_)
                | ArchyError::NotADirectory(_)
                | ArchyError::SubfolderNotFound(_)
                | ArchyError::DirectoryNotWritable(_)
                | ArchyError::FileNotOverwritable(_)
        )
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            ArchyError::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

impl fmt::Display for ArchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchyError::PathTraversal { description, path } => {
                write!(f, "path traversal detected in {description}: {path}")
            }
            ArchyError::BlockedSystemDirectory { description, path } => {
                write!(f, "access to system directory not allowed for {description}: {path}")
            }
            ArchyError::PathTooLong {
                description,
                length,
            } => write!(
                f,
                "{description} too long ({length} > {} characters)",
                crate::security::MAX_PATH_LENGTH
            ),
            ArchyError::UnsafeFilename(name) => {
                write!(f, "invalid characters in filename: {name}")
            }
            ArchyError::UnsafeSubfolder(sub) => {
                write!(f, "invalid subfolder (must be relative, [A-Za-z0-9._/-] only): {sub}")
            }
            ArchyError::InvalidArguments(msg) => write!(f, "invalid arguments: {msg}"),
            ArchyError::UnknownBackend(name) => write!(
                f,
                "unknown AI backend '{name}' (expected one of: {})",
                crate::backend::BackendKind::names().join(", ")
            ),
            ArchyError::ProjectNotFound(p) => {
                write!(f, "project path does not exist: {}", p.display())
            }
            ArchyError::NotADirectory(p) => {
                write!(f, "project path is not a directory: {}", p.display())
            }
            ArchyError::SubfolderNotFound(sub) => write!(f, "subfolder does not exist: {sub}"),
            ArchyError::DirectoryNotWritable(p) => {
                write!(f, "cannot write to directory: {}", p.display())
            }
            ArchyError::FileNotOverwritable(p) => {
                write!(f, "cannot overwrite existing file: {}", p.display())
            }
            ArchyError::RepositoryNotFound(p) => {
                write!(f, "not a git repository (or any parent): {}", p.display())
            }
            ArchyError::Git(msg) => write!(f, "git: {msg}"),
            ArchyError::NoChangesFound { base } => write!(
                f,
                "no relevant changes found between {base} and HEAD; nothing to document"
            ),
            ArchyError::Backend { backend, detail } => {
                write!(f, "{backend} backend failed: {detail}")
            }
            ArchyError::TemplateNotFound(p) => {
                write!(f, "pattern template not found: {}", p.display())
            }
            ArchyError::Configuration(msg) => write!(f, "configuration: {msg}"),
            ArchyError::Io { context, source } => write!(f, "{context}: {source}"),
            ArchyError::Interrupted => write!(f, "interrupted by signal"),
        }
    }
}

impl std::error::Error for ArchyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArchyError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}
