//! Run driver: validation, context resolution, mode selection, backend calls, persistence.
//!
//! Stages of a run, in order:
//! `Init -> Validated -> ContextResolved -> FreshBuild | ChangeExtraction -> BackendInvoked ->
//! Normalized -> Persisted -> Reported`.
//! Only ChangeDriven's final backend call has a degraded-success path: its failure is written as
//! an error document instead of aborting the run.

use std::fs;

use tracing::instrument;

use crate::backend::{self, Backend, BackendResult};
use crate::color::{color_enabled_stderr, log_info_stderr, log_warn_stderr};
use crate::config::{InvocationRequest, Mode, ResolvedContext, Settings};
use crate::errors::ArchyError;
use crate::git::{self, ChangeSet};
use crate::normalize::{extract_result, normalize_document};
use crate::outcome::{Action, DryRunReport, RunOutcome};
use crate::patterns::{PatternKind, PatternStore};
use crate::prompt::{self, RepoFacts};
use crate::scan;
use crate::scratch::ScratchDir;
use crate::signals::check_interrupted;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Stage {
    Init,
    Validated,
    ContextResolved,
    FreshBuild,
    ChangeExtraction,
    BackendInvoked,
    Normalized,
    Persisted,
    Reported,
}

pub struct Orchestrator {
    request: InvocationRequest,
    settings: Settings,
    backend: Option<Box<dyn Backend>>,
    progress: bool,
    stage: Stage,
}

/// Everything the mode-specific paths need after validation.
struct Prepared {
    ctx: ResolvedContext,
    store: PatternStore,
    doc_exists: bool,
}

impl Orchestrator {
    pub fn new(request: InvocationRequest, settings: Settings) -> Self {
        Self {
            request,
            settings,
            backend: None,
            progress: false,
            stage: Stage::Init,
        }
    }

    /// Use `backend` instead of the adapter selected by the request.
    pub fn with_backend(mut self, backend: Box<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Print `archy:` progress lines on stderr.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(from = ?self.stage, to = ?stage, "stage");
        self.stage = stage;
    }

    fn info(&self, msg: &str) {
        if self.progress {
            log_info_stderr(color_enabled_stderr(), &format!("archy: {msg}"));
        }
    }

    fn warn(&self, msg: &str) {
        if self.progress {
            log_warn_stderr(color_enabled_stderr(), &format!("archy: {msg}"));
        }
    }

    fn prepare(&mut self) -> Result<Prepared, ArchyError> {
        self.enter(Stage::Init);
        let ctx = ResolvedContext::resolve(&self.request)?;
        self.enter(Stage::Validated);
        let store = self.settings.pattern_store()?;
        let doc_exists = ctx.arch_file_path.is_file();
        self.enter(Stage::ContextResolved);
        self.info(&format!(
            "analyzing {} (git root {}, default branch {})",
            ctx.analysis_target_abs.display(),
            ctx.git_root_abs.display(),
            ctx.default_branch
        ));
        Ok(Prepared {
            ctx,
            store,
            doc_exists,
        })
    }

    fn template_kind(&self, doc_exists: bool) -> PatternKind {
        match self.request.mode {
            Mode::ChangeDriven if doc_exists => PatternKind::Update,
            _ => PatternKind::Create,
        }
    }

    fn extract_changes(&mut self, ctx: &ResolvedContext) -> Result<ChangeSet, ArchyError> {
        self.enter(Stage::ChangeExtraction);
        let changes = git::extract_changes(
            &ctx.git_root_abs,
            &ctx.default_branch,
            &ctx.path_filter,
            &self.settings.extensions,
        )?;
        self.info(&format!(
            "{} changed file(s) against {}",
            changes.files.len(),
            changes.base
        ));
        Ok(changes)
    }

    fn fresh_prompt(&mut self, ctx: &ResolvedContext, template: &str) -> Result<String, ArchyError> {
        self.enter(Stage::FreshBuild);
        let current = git::current_branch(&ctx.git_root_abs);
        let structure = scan::directory_structure(&ctx.analysis_target_abs, scan::DEFAULT_MAX_DEPTH);
        let files = git::tracked_files(&ctx.git_root_abs, &ctx.path_filter)?;
        let facts = RepoFacts {
            ctx,
            current_branch: current.as_deref(),
            directory_structure: &structure,
            files: &files,
        };
        Ok(prompt::fresh_prompt(template, &facts))
    }

    /// Send one prompt, keeping prompt and response in the scratch directory.
    fn call(
        &mut self,
        backend: &dyn Backend,
        scratch: &ScratchDir,
        step: usize,
        prompt: &str,
        force: bool,
    ) -> Result<BackendResult, ArchyError> {
        scratch.write(&format!("prompt_{step}.txt"), prompt)?;
        self.info(&format!("calling {} (step {step})", backend.name()));
        let result = backend.invoke(prompt, force);
        check_interrupted()?;
        self.enter(Stage::BackendInvoked);
        if result.succeeded {
            scratch.write(&format!("response_{step}.json"), &result.raw_text)?;
        }
        Ok(result)
    }

    fn persist(&mut self, ctx: &ResolvedContext, document: &str) -> Result<u64, ArchyError> {
        check_interrupted()?;
        fs::write(&ctx.arch_file_path, document).map_err(|e| {
            ArchyError::io(format!("failed to write {}", ctx.arch_file_path.display()), e)
        })?;
        self.enter(Stage::Persisted);
        let size = fs::metadata(&ctx.arch_file_path)
            .map(|m| m.len())
            .map_err(|e| {
                ArchyError::io(format!("failed to stat {}", ctx.arch_file_path.display()), e)
            })?;
        self.info(&format!("wrote {} ({size} bytes)", ctx.arch_file_path.display()));
        Ok(size)
    }

    fn take_backend(&mut self) -> Box<dyn Backend> {
        match self.backend.take() {
            Some(b) => b,
            None => backend::for_kind(self.request.backend, &self.settings.backend_config()),
        }
    }

    /// Execute the run.
    #[instrument(level = "info", skip(self), fields(mode = ?self.request.mode, backend = %self.request.backend))]
    pub fn run(&mut self) -> Result<RunOutcome, ArchyError> {
        let prepared = self.prepare()?;
        let outcome = match self.request.mode {
            Mode::Fresh => self.run_fresh(&prepared)?,
            Mode::ChangeDriven => self.run_change_driven(&prepared)?,
        };
        self.enter(Stage::Reported);
        Ok(outcome)
    }

    fn run_fresh(&mut self, p: &Prepared) -> Result<RunOutcome, ArchyError> {
        let template = p.store.load(PatternKind::Create)?;
        let prompt = self.fresh_prompt(&p.ctx, &template)?;
        check_interrupted()?;

        let backend = self.take_backend();
        let scratch = ScratchDir::create()?;
        let result = self.call(backend.as_ref(), &scratch, 1, &prompt, false)?;
        if !result.succeeded {
            return Err(ArchyError::Backend {
                backend: backend.name().to_string(),
                detail: result.detail().to_string(),
            });
        }
        let document = normalize_document(&result.raw_text);
        self.enter(Stage::Normalized);
        let file_size = self.persist(&p.ctx, &document)?;

        Ok(RunOutcome {
            success: true,
            action: Action::Created,
            file_path: p.ctx.arch_file_path.clone(),
            file_size,
            fresh_mode: true,
            changes_processed: 0,
            backend_error: None,
        })
    }

    fn run_change_driven(&mut self, p: &Prepared) -> Result<RunOutcome, ArchyError> {
        let kind = self.template_kind(p.doc_exists);
        let template = p.store.load(kind)?;
        let existing = if p.doc_exists {
            Some(fs::read_to_string(&p.ctx.arch_file_path).map_err(|e| {
                ArchyError::io(format!("failed to read {}", p.ctx.arch_file_path.display()), e)
            })?)
        } else {
            None
        };
        let changes = self.extract_changes(&p.ctx)?;
        check_interrupted()?;

        let backend = self.take_backend();
        let scratch = ScratchDir::create()?;
        scratch.write("changes.diff", &changes.diff)?;

        let summary_result = self.call(
            backend.as_ref(),
            &scratch,
            1,
            &prompt::summarize_prompt(&changes),
            false,
        )?;
        if !summary_result.succeeded {
            return Err(ArchyError::Backend {
                backend: backend.name().to_string(),
                detail: summary_result.detail().to_string(),
            });
        }
        let summary = extract_result(&summary_result.raw_text);

        let current = git::current_branch(&p.ctx.git_root_abs);
        let (action, second_prompt, force) = match &existing {
            Some(doc) => {
                let facts = RepoFacts {
                    ctx: &p.ctx,
                    current_branch: current.as_deref(),
                    directory_structure: "",
                    files: &changes.files,
                };
                (
                    Action::Updated,
                    prompt::update_prompt(&template, doc, &facts, &summary),
                    true,
                )
            }
            None => {
                let structure =
                    scan::directory_structure(&p.ctx.analysis_target_abs, scan::DEFAULT_MAX_DEPTH);
                let facts = RepoFacts {
                    ctx: &p.ctx,
                    current_branch: current.as_deref(),
                    directory_structure: &structure,
                    files: &changes.files,
                };
                (
                    Action::Created,
                    prompt::create_from_changes_prompt(&template, &facts, &summary),
                    false,
                )
            }
        };

        let result = self.call(backend.as_ref(), &scratch, 2, &second_prompt, force)?;
        let (document, backend_error) = if result.succeeded {
            (normalize_document(&result.raw_text), None)
        } else {
            self.warn(&format!(
                "{} failed; writing error document: {}",
                backend.name(),
                result.detail()
            ));
            (
                failure_document(
                    &p.ctx.project_name,
                    action,
                    backend.name(),
                    changes.files.len(),
                    result.detail(),
                    &summary,
                ),
                Some(result.detail().to_string()),
            )
        };
        self.enter(Stage::Normalized);
        let file_size = self.persist(&p.ctx, &document)?;

        Ok(RunOutcome {
            success: true,
            action,
            file_path: p.ctx.arch_file_path.clone(),
            file_size,
            fresh_mode: false,
            changes_processed: changes.files.len(),
            backend_error,
        })
    }

    /// Validate, resolve and assemble the first prompt without calling the backend or writing.
    #[instrument(level = "info", skip(self), fields(mode = ?self.request.mode))]
    pub fn plan(&mut self) -> Result<DryRunReport, ArchyError> {
        let p = self.prepare()?;
        let kind = self.template_kind(p.doc_exists);
        let template = p.store.load(kind)?;
        let (prompt, changes_processed) = match self.request.mode {
            Mode::Fresh => (self.fresh_prompt(&p.ctx, &template)?, 0),
            Mode::ChangeDriven => {
                let changes = self.extract_changes(&p.ctx)?;
                (prompt::summarize_prompt(&changes), changes.files.len())
            }
        };
        let action = if kind == PatternKind::Update {
            Action::Updated
        } else {
            Action::Created
        };
        self.enter(Stage::Reported);
        Ok(DryRunReport {
            dry_run: true,
            fresh_mode: self.request.mode.is_fresh(),
            backend: self.request.backend.to_string(),
            analysis_target: p.ctx.analysis_target_abs.clone(),
            git_root: p.ctx.git_root_abs.clone(),
            path_filter: p.ctx.path_filter.clone(),
            default_branch: p.ctx.default_branch.clone(),
            file_path: p.ctx.arch_file_path.clone(),
            action,
            template: p.store.path_for(kind),
            prompt_chars: prompt.chars().count(),
            changes_processed,
        })
    }
}

/// Document written when ChangeDriven's final backend call fails.
pub fn failure_document(
    project: &str,
    action: Action,
    backend: &str,
    changed_files: usize,
    detail: &str,
    summary: &str,
) -> String {
    let (what, mode) = match action {
        Action::Updated => ("Update", "Update (existing architecture + git changes)"),
        Action::Created => ("Creation", "Create from Changes (no existing architecture)"),
    };
    format!(
        "# Architecture Documentation for {project}\n\n\
         ## Error: AI Backend {what} Failed\n\n\
         **Error Details:**\n{detail}\n\n\
         **Configuration:**\n\
         - Mode: {mode}\n\
         - Project: {project}\n\
         - Changes: {changed_files} files modified\n\
         - AI Backend: {backend}\n\n\
         **Changes Summary:**\n{summary}\n"
    )
}
