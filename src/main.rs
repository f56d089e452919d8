use std::io;
use std::process::ExitCode;

use clap::Parser;

use archy::{
    color_enabled_stderr, exit_code_for_io_error, extract_result, log_error_stderr,
    log_warn_stderr, to_json_line, ArchyError, BackendKind, ErrorReport, InvocationRequest, Mode,
    Orchestrator, Settings,
};

mod cli;

use cli::{Cli, Command};

/// Print the failure as a human line (unless quiet) followed by the JSON error object.
fn report_error(err: &ArchyError, quiet: bool) -> ExitCode {
    if !quiet {
        log_error_stderr(color_enabled_stderr(), &format!("archy: error: {err}"));
    }
    eprintln!("{}", to_json_line(&ErrorReport::from(err)));
    ExitCode::from(err.exit_code())
}

/// Environment settings with CLI overrides applied.
fn settings_from(cli: &Cli) -> Result<Settings, ArchyError> {
    let mut settings = Settings::from_env()?;
    if let Some(t) = &cli.timeout {
        settings.timeout = archy::parse_timeout_secs(t)?;
    }
    if let Some(d) = &cli.patterns_dir {
        settings.patterns_dir = Some(d.clone());
    }
    if let Some(e) = &cli.extend_pattern {
        settings.extend_pattern = Some(e.clone());
    }
    Ok(settings)
}

fn run_test_command(cli: &Cli, message: &str) -> ExitCode {
    let kind = match cli.tool.parse::<BackendKind>() {
        Ok(k) => k,
        Err(e) => return report_error(&e, cli.quiet),
    };
    let settings = match settings_from(cli) {
        Ok(s) => s,
        Err(e) => return report_error(&e, cli.quiet),
    };
    let backend = archy::backend::for_kind(kind, &settings.backend_config());
    if !backend.is_available() {
        let err = ArchyError::Backend {
            backend: kind.to_string(),
            detail: "executable not found in PATH".to_string(),
        };
        report_error(&err, cli.quiet);
        let nf = io::Error::new(io::ErrorKind::NotFound, "backend executable not found");
        return ExitCode::from(exit_code_for_io_error(&nf));
    }

    let result = backend.invoke(message, false);
    if let Err(e) = archy::check_interrupted() {
        return report_error(&e, cli.quiet);
    }
    if !result.succeeded {
        let err = ArchyError::Backend {
            backend: kind.to_string(),
            detail: result.detail().to_string(),
        };
        return report_error(&err, cli.quiet);
    }
    println!("{}", extract_result(&result.raw_text));
    ExitCode::from(0)
}

fn run_main(cli: &Cli) -> ExitCode {
    let request = match InvocationRequest::new(
        if cli.fresh { Mode::Fresh } else { Mode::ChangeDriven },
        cli.project.clone(),
        cli.folder.clone(),
        cli.doc.clone(),
        cli.name.clone(),
        &cli.tool,
    ) {
        Ok(r) => r,
        Err(e) => return report_error(&e, cli.quiet),
    };
    let settings = match settings_from(cli) {
        Ok(s) => s,
        Err(e) => return report_error(&e, cli.quiet),
    };

    let mut orchestrator = Orchestrator::new(request, settings).with_progress(!cli.quiet);
    if cli.dry_run {
        return match orchestrator.plan() {
            Ok(plan) => {
                println!("{}", to_json_line(&plan));
                ExitCode::from(0)
            }
            Err(e) => report_error(&e, cli.quiet),
        };
    }
    match orchestrator.run() {
        Ok(outcome) => {
            if let Some(detail) = &outcome.backend_error {
                if !cli.quiet {
                    log_warn_stderr(
                        color_enabled_stderr(),
                        &format!("archy: warning: backend failed, error document written: {detail}"),
                    );
                }
            }
            println!("{}", to_json_line(&outcome));
            ExitCode::from(0)
        }
        Err(e) => report_error(&e, cli.quiet),
    }
}

fn main() -> ExitCode {
    if let Err(e) = archy::install_interrupt_handlers() {
        eprintln!("archy: warning: failed to install signal handlers: {e}");
    }

    // Config file first so ARCHY_* values from it are visible to clap's env lookups
    if let Err(e) = archy::load_config_file() {
        return report_error(&e, false);
    }

    let cli = match Cli::try_parse() {
        Ok(c) => c,
        Err(e) => {
            if !e.use_stderr() {
                // --help / --version
                let _ = e.print();
                return ExitCode::from(0);
            }
            let _ = e.print();
            let msg = e
                .to_string()
                .lines()
                .next()
                .unwrap_or("invalid arguments")
                .trim_start_matches("error: ")
                .to_string();
            eprintln!(
                "{}",
                to_json_line(&ErrorReport::from(&ArchyError::InvalidArguments(msg)))
            );
            return ExitCode::from(1);
        }
    };

    if let Some(mode) = cli.color {
        archy::set_color_mode(mode);
    }
    archy::telemetry_init(cli.verbose);

    match &cli.command {
        Some(Command::Doctor) => {
            let kind = match cli.tool.parse::<BackendKind>() {
                Ok(k) => k,
                Err(e) => return report_error(&e, cli.quiet),
            };
            let settings = match settings_from(&cli) {
                Ok(s) => s,
                Err(e) => return report_error(&e, cli.quiet),
            };
            archy::run_doctor(&settings, kind);
            ExitCode::from(0)
        }
        Some(Command::Test { message }) => run_test_command(&cli, message),
        None => run_main(&cli),
    }
}
