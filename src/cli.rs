use std::path::PathBuf;

use clap::{Parser, Subcommand};

use archy::{DEFAULT_ARCH_FILENAME, LONG_VERSION};

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Send a message to the selected backend and print its reply
    Test {
        /// Message to send
        #[arg(default_value = "Hello! Please reply with a short greeting.")]
        message: String,
    },

    /// Check git, backend executables and templates
    Doctor,
}

#[derive(Parser, Debug)]
#[command(
    name = "archy",
    version,
    long_version = LONG_VERSION,
    subcommand_precedence_over_arg = true,
    about = "Generate and update C4 architecture documentation for a git repository using an AI backend.",
    after_long_help = "Examples:\n  archy --fresh\n  archy --fresh ./test    (a project directory named like a subcommand)\n  archy --fresh -f backend -n \"Shop API\"\n  archy -t fabric ./service\n  archy --dry-run\n  archy test \"ping\"\n  archy doctor\n\n",
    after_help = "\n"
)]
pub(crate) struct Cli {
    /// Analyze the full codebase instead of the changes against the default branch
    #[arg(long)]
    pub(crate) fresh: bool,

    /// Project directory (inside a git repository). A directory named `test` or `doctor` must be
    /// written as a path, e.g. `./test`, or it is taken as the subcommand.
    #[arg(value_name = "PROJECT", default_value = ".")]
    pub(crate) project: PathBuf,

    /// Subfolder of the project to analyze
    #[arg(short = 'f', long = "folder", value_name = "SUBFOLDER")]
    pub(crate) folder: Option<String>,

    /// Name of the architecture document inside the analysis target
    #[arg(short = 'd', long = "doc", value_name = "FILENAME", default_value = DEFAULT_ARCH_FILENAME)]
    pub(crate) doc: String,

    /// Project name used in prompts (default: name of the analysis target)
    #[arg(short = 'n', long = "name")]
    pub(crate) name: Option<String>,

    /// AI backend: cursor-agent or fabric
    #[arg(
        short = 't',
        long = "tool",
        env = "ARCHY_AI_TOOL",
        default_value = "cursor-agent",
        global = true
    )]
    pub(crate) tool: String,

    /// Backend timeout in seconds (overrides ARCHY_TIMEOUT_SECS)
    #[arg(long, value_name = "SECS", global = true)]
    pub(crate) timeout: Option<String>,

    /// Directory holding the prompt templates (overrides ARCHY_PATTERNS_DIR)
    #[arg(long = "patterns-dir", value_name = "DIR", global = true)]
    pub(crate) patterns_dir: Option<PathBuf>,

    /// File prepended to the built-in template (overrides ARCHY_EXTEND_PATTERN)
    #[arg(long = "extend-pattern", value_name = "FILE", global = true)]
    pub(crate) extend_pattern: Option<PathBuf>,

    /// Validate and print the plan as JSON without calling the backend or writing
    #[arg(long)]
    pub(crate) dry_run: bool,

    /// Enable diagnostic tracing on stderr (RUST_LOG filters)
    #[arg(long, global = true)]
    pub(crate) verbose: bool,

    /// Suppress progress lines on stderr
    #[arg(long, short = 'q', global = true)]
    pub(crate) quiet: bool,

    /// Colorize output: auto|always|never
    #[arg(long = "color", value_enum, global = true)]
    pub(crate) color: Option<archy::ColorMode>,

    #[command(subcommand)]
    pub(crate) command: Option<Command>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("archy").chain(args.iter().copied())).expect("parse")
    }

    #[test]
    fn test_defaults() {
        let c = parse(&[]);
        assert!(!c.fresh);
        assert_eq!(c.project, PathBuf::from("."));
        assert_eq!(c.doc, "arch.md");
        assert!(c.command.is_none());
    }

    #[test]
    fn test_run_flags() {
        let c = parse(&["--fresh", "-f", "backend", "-d", "ARCH.md", "-n", "Shop", "-t", "fabric", "repo"]);
        assert!(c.fresh);
        assert_eq!(c.folder.as_deref(), Some("backend"));
        assert_eq!(c.doc, "ARCH.md");
        assert_eq!(c.name.as_deref(), Some("Shop"));
        assert_eq!(c.tool, "fabric");
        assert_eq!(c.project, PathBuf::from("repo"));
    }

    #[test]
    fn test_unknown_tool_is_left_to_validation() {
        let c = parse(&["--tool", "gpt"]);
        assert_eq!(c.tool, "gpt");
    }

    #[test]
    fn test_subcommands() {
        let c = parse(&["doctor"]);
        assert!(matches!(c.command, Some(Command::Doctor)));
        let c = parse(&["-t", "fabric", "test", "ping"]);
        match c.command {
            Some(Command::Test { message }) => assert_eq!(message, "ping"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(c.tool, "fabric");
    }

    #[test]
    fn test_project_named_like_subcommand_needs_path_form() {
        let c = parse(&["./test"]);
        assert!(c.command.is_none());
        assert_eq!(c.project, PathBuf::from("./test"));
        let c = parse(&["--fresh", "./doctor"]);
        assert!(c.command.is_none());
        assert_eq!(c.project, PathBuf::from("./doctor"));
        let c = parse(&["test"]);
        assert!(matches!(c.command, Some(Command::Test { .. })));
    }
}
