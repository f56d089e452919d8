//! JSON reports written at the end of a run: the success outcome on stdout, the error object on
//! stderr and the dry-run plan on stdout.

use std::path::PathBuf;

use serde::Serialize;

use crate::errors::ArchyError;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct RunOutcome {
    pub success: bool,
    pub action: Action,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub fresh_mode: bool,
    /// Number of changed files fed into the run; 0 in fresh mode.
    pub changes_processed: usize,
    /// Set when the backend failed on the final call and an error document was written instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_error: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct ErrorReport {
    pub success: bool,
    pub error: String,
    pub kind: &'static str,
}

impl From<&ArchyError> for ErrorReport {
    fn from(e: &ArchyError) -> Self {
        Self {
            success: false,
            error: e.to_string(),
            kind: e.kind(),
        }
    }
}

/// What a run would do, without calling the backend or writing anything.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct DryRunReport {
    pub dry_run: bool,
    pub fresh_mode: bool,
    pub backend: String,
    pub analysis_target: PathBuf,
    pub git_root: PathBuf,
    pub path_filter: String,
    pub default_branch: String,
    pub file_path: PathBuf,
    pub action: Action,
    pub template: PathBuf,
    pub prompt_chars: usize,
    pub changes_processed: usize,
}

/// Serialize `value` as a single JSON line.
pub fn to_json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        format!(
            "{{\"success\":false,\"error\":{},\"kind\":\"io_error\"}}",
            serde_json::Value::String(format!("failed to serialize report: {e}"))
        )
    })
}
