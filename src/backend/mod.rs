//! AI backend adapters.
//!
//! Each adapter turns a prompt into a `BackendResult` by running an external CLI. Adapters never
//! return errors: spawn failures, timeouts, interruptions and non-zero exits all become
//! `BackendResult::failed`, and the orchestrator decides whether that is fatal.

mod cursor_agent;
mod fabric;

pub use cursor_agent::CursorAgentBackend;
pub use fabric::FabricBackend;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ArchyError;
use crate::util::exec::ExecService;

/// Closed set of supported backends.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BackendKind {
    CursorAgent,
    Fabric,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::CursorAgent, BackendKind::Fabric];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::CursorAgent => "cursor-agent",
            BackendKind::Fabric => "fabric",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.as_str()).collect()
    }
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::CursorAgent
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ArchyError;

    /// Exact, case-insensitive match on the backend name. `fabric-ai` is accepted as the
    /// binary name of the fabric backend; anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cursor-agent" => Ok(BackendKind::CursorAgent),
            "fabric" | "fabric-ai" => Ok(BackendKind::Fabric),
            _ => Err(ArchyError::UnknownBackend(s.to_string())),
        }
    }
}

/// Outcome of one backend invocation. Always produced, even on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResult {
    /// Structured payload (`{"result": ...}` shaped for every adapter), or empty on failure.
    pub raw_text: String,
    pub succeeded: bool,
    pub error_detail: Option<String>,
}

impl BackendResult {
    pub fn ok(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            succeeded: true,
            error_detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            raw_text: String::new(),
            succeeded: false,
            error_detail: Some(detail.into()),
        }
    }

    pub fn detail(&self) -> &str {
        self.error_detail.as_deref().unwrap_or("unknown backend error")
    }
}

/// Uniform contract over AI text-generation backends.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// Send `prompt`; `force` asks the backend to overwrite/apply without confirmation.
    fn invoke(&self, prompt: &str, force: bool) -> BackendResult;

    /// Whether the backend executable can be found.
    fn is_available(&self) -> bool;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// Executables, timeout and options shared by the adapters.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub timeout: Duration,
    pub cursor_agent_bin: PathBuf,
    pub fabric_bin: PathBuf,
    pub fabric_model: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            cursor_agent_bin: PathBuf::from("cursor-agent"),
            fabric_bin: PathBuf::from("fabric-ai"),
            fabric_model: None,
        }
    }
}

impl BackendConfig {
    fn exec(&self) -> ExecService {
        ExecService::new(self.timeout)
    }
}

/// Construct the adapter for `kind`.
pub fn for_kind(kind: BackendKind, config: &BackendConfig) -> Box<dyn Backend> {
    match kind {
        BackendKind::CursorAgent => Box::new(CursorAgentBackend::new(config)),
        BackendKind::Fabric => Box::new(FabricBackend::new(config)),
    }
}

/// Resolve an executable either as an explicit path or through PATH.
pub(crate) fn binary_available(bin: &std::path::Path) -> bool {
    if bin.components().count() > 1 {
        return bin.is_file();
    }
    which::which(bin).is_ok()
}

/// Trim and shorten stderr for inclusion in an error detail.
pub(crate) fn stderr_excerpt(stderr: &str) -> String {
    const MAX: usize = 2000;
    let t = stderr.trim();
    if t.chars().count() <= MAX {
        t.to_string()
    } else {
        let head: String = t.chars().take(MAX).collect();
        format!("{head}…")
    }
}
