//! Run configuration: the immutable request built from CLI arguments, environment settings, and
//! the context resolved from both before any resource is acquired.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::instrument;

use crate::backend::{BackendConfig, BackendKind};
use crate::errors::ArchyError;
use crate::git;
use crate::patterns::{resolve_patterns_dir, PatternStore};
use crate::security::{
    validate_filename_safety, validate_path_security, validate_subfolder,
    validate_write_permission,
};

pub const DEFAULT_ARCH_FILENAME: &str = "arch.md";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Mode {
    /// Analyze the full current state of the target.
    Fresh,
    /// Document the changes against the default branch.
    ChangeDriven,
}

impl Mode {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Mode::Fresh)
    }
}

/// Input of one run. Built once; never mutated.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub mode: Mode,
    pub project_path: PathBuf,
    pub subfolder: Option<String>,
    pub arch_filename: String,
    pub project_name: Option<String>,
    pub backend: BackendKind,
}

impl InvocationRequest {
    /// Build a request; the backend selector is parsed here so an unknown backend is the first
    /// validation failure of a run.
    pub fn new(
        mode: Mode,
        project_path: impl Into<PathBuf>,
        subfolder: Option<String>,
        arch_filename: impl Into<String>,
        project_name: Option<String>,
        backend_selector: &str,
    ) -> Result<Self, ArchyError> {
        let backend = backend_selector.parse::<BackendKind>()?;
        Ok(Self {
            mode,
            project_path: project_path.into(),
            subfolder: subfolder.filter(|s| !s.trim().is_empty()),
            arch_filename: arch_filename.into(),
            project_name: project_name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            backend,
        })
    }
}

/// Values derived from an `InvocationRequest` once validation has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    pub project_path_abs: PathBuf,
    pub analysis_target_abs: PathBuf,
    pub git_root_abs: PathBuf,
    /// Prefix of the analysis target relative to the git root, ending in `/`; empty at the root.
    pub path_filter: String,
    pub default_branch: String,
    pub arch_file_path: PathBuf,
    pub project_name: String,
}

impl ResolvedContext {
    /// Validate the request and resolve absolute paths, repository root and default branch.
    ///
    /// Checks run in a fixed order: filename, project path, subfolder syntax, project existence,
    /// subfolder existence, repository root, output path permissions. Nothing is created.
    #[instrument(level = "info", skip(request), fields(project = %request.project_path.display()))]
    pub fn resolve(request: &InvocationRequest) -> Result<Self, ArchyError> {
        validate_filename_safety(&request.arch_filename)?;
        validate_path_security(&request.project_path, "project path")?;
        if let Some(sub) = &request.subfolder {
            validate_subfolder(sub)?;
        }

        let project = &request.project_path;
        if !project.exists() {
            return Err(ArchyError::ProjectNotFound(project.clone()));
        }
        if !project.is_dir() {
            return Err(ArchyError::NotADirectory(project.clone()));
        }
        let project_path_abs = canonicalize(project)?;
        validate_path_security(&project_path_abs, "project path")?;

        let analysis_target_abs = match &request.subfolder {
            Some(sub) => {
                let candidate = project_path_abs.join(sub);
                if !candidate.is_dir() {
                    return Err(ArchyError::SubfolderNotFound(sub.clone()));
                }
                let abs = canonicalize(&candidate)?;
                // a symlinked subfolder must not lead outside the project
                if !abs.starts_with(&project_path_abs) {
                    return Err(ArchyError::PathTraversal {
                        description: "subfolder".to_string(),
                        path: sub.clone(),
                    });
                }
                validate_path_security(&abs, "analysis target")?;
                abs
            }
            None => project_path_abs.clone(),
        };

        let git_root_abs = git::find_git_root(&analysis_target_abs)
            .ok_or_else(|| ArchyError::RepositoryNotFound(analysis_target_abs.clone()))?;
        let path_filter = git::path_filter(&git_root_abs, &analysis_target_abs);
        let default_branch = git::resolve_default_branch(&git_root_abs);

        let arch_file_path = analysis_target_abs.join(&request.arch_filename);
        validate_write_permission(&arch_file_path)?;

        let project_name = request.project_name.clone().unwrap_or_else(|| {
            analysis_target_abs
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string())
        });

        Ok(Self {
            project_path_abs,
            analysis_target_abs,
            git_root_abs,
            path_filter,
            default_branch,
            arch_file_path,
            project_name,
        })
    }
}

fn canonicalize(p: &Path) -> Result<PathBuf, ArchyError> {
    fs::canonicalize(p).map_err(|e| ArchyError::io(format!("failed to resolve {}", p.display()), e))
}

/// Environment-driven settings. CLI flags override individual fields afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    pub timeout: Duration,
    pub patterns_dir: Option<PathBuf>,
    pub extend_pattern: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub cursor_agent_bin: PathBuf,
    pub fabric_bin: PathBuf,
    pub fabric_model: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let backend = BackendConfig::default();
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            patterns_dir: None,
            extend_pattern: None,
            extensions: git::DEFAULT_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cursor_agent_bin: backend.cursor_agent_bin,
            fabric_bin: backend.fabric_bin,
            fabric_model: None,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ArchyError> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Read settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ArchyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut s = Settings::default();

        if let Some(v) = get("ARCHY_TIMEOUT_SECS") {
            s.timeout = parse_timeout_secs(&v)?;
        }
        s.patterns_dir = get("ARCHY_PATTERNS_DIR").map(PathBuf::from);
        s.extend_pattern = get("ARCHY_EXTEND_PATTERN").map(PathBuf::from);
        if let Some(v) = get("ARCHY_EXTENSIONS") {
            s.extensions = parse_extensions(&v)?;
        }
        if let Some(v) = get("ARCHY_CURSOR_AGENT_BIN") {
            s.cursor_agent_bin = PathBuf::from(v);
        }
        if let Some(v) = get("ARCHY_FABRIC_BIN") {
            s.fabric_bin = PathBuf::from(v);
        }
        s.fabric_model = get("ARCHY_FABRIC_MODEL");
        Ok(s)
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            timeout: self.timeout,
            cursor_agent_bin: self.cursor_agent_bin.clone(),
            fabric_bin: self.fabric_bin.clone(),
            fabric_model: self.fabric_model.clone(),
        }
    }

    /// Template store for this run. A configured extension pattern must exist.
    pub fn pattern_store(&self) -> Result<PatternStore, ArchyError> {
        if let Some(ext) = &self.extend_pattern {
            validate_path_security(ext, "extension pattern")?;
            if !ext.is_file() {
                return Err(ArchyError::Configuration(format!(
                    "extension pattern file not found: {}",
                    ext.display()
                )));
            }
        }
        let dir = resolve_patterns_dir(self.patterns_dir.as_deref());
        Ok(PatternStore::new(dir).with_extension(self.extend_pattern.clone()))
    }
}

/// Parse a positive number of seconds.
pub fn parse_timeout_secs(v: &str) -> Result<Duration, ArchyError> {
    match v.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
        _ => Err(ArchyError::Configuration(format!(
            "invalid timeout '{v}': expected a positive number of seconds"
        ))),
    }
}

/// Parse a comma-separated extension list (`rs, .py,go`). Extensions are alphanumeric.
pub fn parse_extensions(v: &str) -> Result<Vec<String>, ArchyError> {
    let mut out: Vec<String> = Vec::new();
    for raw in v.split(',') {
        let ext = raw.trim().trim_start_matches('.');
        if ext.is_empty() {
            continue;
        }
        if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ArchyError::Configuration(format!("invalid extension '{ext}'")));
        }
        if !out.iter().any(|e| e == ext) {
            out.push(ext.to_string());
        }
    }
    if out.is_empty() {
        return Err(ArchyError::Configuration(
            "extension list is empty".to_string(),
        ));
    }
    Ok(out)
}

/// Default location of the optional dotenv file.
pub fn default_config_file() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(".archy").join("config.env"))
}

/// Load `ARCHY_CONFIG_FILE` (or `~/.archy/config.env`) into the environment without overriding
/// variables that are already set. Returns the file that was loaded, if any.
pub fn load_config_file() -> Result<Option<PathBuf>, ArchyError> {
    let explicit = env::var("ARCHY_CONFIG_FILE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);
    let path = match explicit {
        Some(p) => {
            if !p.is_file() {
                return Err(ArchyError::Configuration(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => match default_config_file() {
            Some(p) if p.is_file() => p,
            _ => return Ok(None),
        },
    };
    dotenvy::from_path(&path).map_err(|e| {
        ArchyError::Configuration(format!("failed to load {}: {e}", path.display()))
    })?;
    Ok(Some(path))
}
