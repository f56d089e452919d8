use std::path::PathBuf;

use tracing::instrument;

use super::{binary_available, stderr_excerpt, Backend, BackendConfig, BackendKind, BackendResult};
use crate::util::exec::{ExecRequest, ExecService};

/// `cursor-agent -p --output-format json [--force] <prompt>`.
///
/// The CLI answers with a JSON object whose `result` field holds the generated text; that object
/// is passed through untouched as the `raw_text` of the result.
pub struct CursorAgentBackend {
    bin: PathBuf,
    exec: ExecService,
}

impl CursorAgentBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            bin: config.cursor_agent_bin.clone(),
            exec: config.exec(),
        }
    }

    /// Arguments excluding the program; the prompt is always the final, discrete argument.
    pub fn build_args(prompt: &str, force: bool) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--output-format".to_string(),
            "json".to_string(),
        ];
        if force {
            args.push("--force".to_string());
        }
        args.push(prompt.to_string());
        args
    }
}

/// Detect `{"is_error": true, ...}` payloads the CLI emits with a zero exit status.
fn reported_error(stdout: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(stdout.trim()).ok()?;
    if v.get("is_error").and_then(|b| b.as_bool()) == Some(true) {
        let msg = v
            .get("result")
            .and_then(|r| r.as_str())
            .or_else(|| v.get("error").and_then(|r| r.as_str()))
            .unwrap_or("cursor-agent reported an error");
        return Some(msg.to_string());
    }
    None
}

impl Backend for CursorAgentBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CursorAgent
    }

    #[instrument(level = "info", skip(self, prompt), fields(prompt_len = prompt.len()))]
    fn invoke(&self, prompt: &str, force: bool) -> BackendResult {
        let req = ExecRequest::new(&self.bin)
            .args(Self::build_args(prompt, force))
            .inherit_env(true)
            .capture_output(true);

        let out = match self.exec.run(req) {
            Ok(out) => out,
            Err(e) => return BackendResult::failed(format!("cursor-agent: {e:#}")),
        };
        tracing::debug!(
            exit = ?out.status.code(),
            elapsed_ms = out.duration.as_millis() as u64,
            stdout_len = out.stdout.len(),
            "cursor-agent finished"
        );

        if !out.status.success() {
            let err = stderr_excerpt(&out.stderr);
            let code = out
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return BackendResult::failed(if err.is_empty() {
                format!("cursor-agent failed (exit code {code})")
            } else {
                format!("cursor-agent failed (exit code {code}): {err}")
            });
        }
        if let Some(msg) = reported_error(&out.stdout) {
            return BackendResult::failed(format!("cursor-agent reported an error: {msg}"));
        }
        BackendResult::ok(out.stdout)
    }

    fn is_available(&self) -> bool {
        binary_available(&self.bin)
    }
}
