use std::path::PathBuf;

use tracing::instrument;

use super::{binary_available, stderr_excerpt, Backend, BackendConfig, BackendKind, BackendResult};
use crate::util::exec::{ExecRequest, ExecService};

/// `fabric-ai [--model <m>]` with the prompt on stdin and raw text on stdout.
///
/// The raw text is wrapped as `{"result": <text>}` so downstream normalization does not depend
/// on which backend produced it. fabric has no force semantics; the flag is ignored.
pub struct FabricBackend {
    bin: PathBuf,
    model: Option<String>,
    exec: ExecService,
}

impl FabricBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            bin: config.fabric_bin.clone(),
            model: config.fabric_model.clone(),
            exec: config.exec(),
        }
    }

    pub fn build_args(&self) -> Vec<String> {
        match &self.model {
            Some(m) => vec!["--model".to_string(), m.clone()],
            None => Vec::new(),
        }
    }
}

/// Wrap raw backend text into the structured `{"result": ...}` shape.
pub fn wrap_raw_text(text: &str) -> String {
    serde_json::json!({ "result": text.trim() }).to_string()
}

impl Backend for FabricBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Fabric
    }

    #[instrument(level = "info", skip(self, prompt, _force), fields(prompt_len = prompt.len()))]
    fn invoke(&self, prompt: &str, _force: bool) -> BackendResult {
        let req = ExecRequest::new(&self.bin)
            .args(self.build_args())
            .input(prompt.as_bytes().to_vec())
            .inherit_env(true)
            .capture_output(true);

        let out = match self.exec.run(req) {
            Ok(out) => out,
            Err(e) => return BackendResult::failed(format!("fabric-ai: {e:#}")),
        };
        tracing::debug!(
            exit = ?out.status.code(),
            elapsed_ms = out.duration.as_millis() as u64,
            stdout_len = out.stdout.len(),
            "fabric-ai finished"
        );

        if !out.status.success() {
            let err = stderr_excerpt(&out.stderr);
            let code = out
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return BackendResult::failed(if err.is_empty() {
                format!("fabric-ai failed (exit code {code})")
            } else {
                format!("fabric-ai failed (exit code {code}): {err}")
            });
        }

        let text = out.stdout.trim();
        if text.starts_with("Error:") {
            return BackendResult::failed(format!("fabric-ai error: {}", stderr_excerpt(text)));
        }
        BackendResult::ok(wrap_raw_text(text))
    }

    fn is_available(&self) -> bool {
        binary_available(&self.bin)
    }
}
