//! Prompt assembly. Templates end with an `# INPUT:` section; the builders append the data the
//! template asks for.

use crate::config::ResolvedContext;
use crate::git::ChangeSet;

/// Cap on the number of files listed in a prompt.
pub const MAX_LISTED_FILES: usize = 100;

const SUMMARIZE_INSTRUCTIONS: &str = "\
You are a senior software architect. Summarize the following code changes for the purpose of
updating architecture documentation. Focus on new or removed components, changed responsibilities,
new dependencies or integrations, data flow and deployment changes, and security-relevant changes.
Ignore formatting-only edits. Answer with a concise Markdown bullet list grouped by component.

# CODE CHANGES:
";

/// Repository facts shared by the fresh and create-from-changes prompts.
#[derive(Debug, Clone)]
pub struct RepoFacts<'a> {
    pub ctx: &'a ResolvedContext,
    pub current_branch: Option<&'a str>,
    pub directory_structure: &'a str,
    pub files: &'a [String],
}

impl RepoFacts<'_> {
    fn git_info(&self) -> String {
        format!(
            "Git Repository: {}\nCurrent Branch: {}\nDefault Branch: {}",
            self.ctx.git_root_abs.display(),
            self.current_branch.unwrap_or("(detached)"),
            self.ctx.default_branch
        )
    }

    fn codebase_input(&self, files_heading: &str) -> String {
        let mut listing: String = self
            .files
            .iter()
            .take(MAX_LISTED_FILES)
            .map(|f| format!("- {f}\n"))
            .collect();
        if self.files.len() > MAX_LISTED_FILES {
            listing.push_str(&format!(
                "... and {} more files\n",
                self.files.len() - MAX_LISTED_FILES
            ));
        }
        format!(
            "Project Name: {}\nAnalysis Target: {}\n{}\n\nDirectory Structure:\n```\n{}```\n\n{} ({} total):\n{}",
            self.ctx.project_name,
            self.ctx.analysis_target_abs.display(),
            self.git_info(),
            self.directory_structure,
            files_heading,
            self.files.len(),
            listing
        )
    }
}

/// Create template + full-codebase facts.
pub fn fresh_prompt(template: &str, facts: &RepoFacts<'_>) -> String {
    format!("{template}\n\n{}", facts.codebase_input("Files to Analyze"))
}

/// First ChangeDriven call: ask the backend for a summary of the diff.
pub fn summarize_prompt(changes: &ChangeSet) -> String {
    format!(
        "{SUMMARIZE_INSTRUCTIONS}\nBase: {}\nChanged files ({}):\n{}\n\n{}",
        changes.base,
        changes.files.len(),
        changes
            .files
            .iter()
            .take(MAX_LISTED_FILES)
            .map(|f| format!("- {f}"))
            .collect::<Vec<_>>()
            .join("\n"),
        changes.diff
    )
}

/// Second ChangeDriven call when a document exists: update template + document + summary.
pub fn update_prompt(template: &str, existing_doc: &str, facts: &RepoFacts<'_>, summary: &str) -> String {
    format!(
        "{template}\n\nDESIGN DOCUMENT:\n\n{existing_doc}\n\nCODE CHANGES:\n\n{}\n\n{summary}\n",
        facts.git_info()
    )
}

/// Second ChangeDriven call when no document exists: create template seeded with the summary.
///
/// `facts.files` should hold the changed files rather than every tracked file.
pub fn create_from_changes_prompt(template: &str, facts: &RepoFacts<'_>, summary: &str) -> String {
    format!(
        "{template}\n\n{}\n## FOCUS ON RECENT CHANGES\n\nNo architecture document exists yet. Base the analysis on the recent changes summarized below, together with the changed files and directory structure above.\n\n{summary}\n",
        facts.codebase_input("Changed Files")
    )
}
