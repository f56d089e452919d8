use std::path::Path;

use crate::backend::BackendKind;
use crate::color::{color_enabled_stderr, paint};
use crate::config::{default_config_file, Settings};
use crate::git;
use crate::patterns::{resolve_patterns_dir, PatternKind};

/// Version string with build metadata, e.g. `0.3.0 (2026-01-01T00:00:00Z, x86_64-unknown-linux-gnu, release, rustc 1.80.0)`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("ARCHY_BUILD_DATE"),
    ", ",
    env!("ARCHY_BUILD_TARGET"),
    ", ",
    env!("ARCHY_BUILD_PROFILE"),
    ", ",
    env!("ARCHY_BUILD_RUSTC"),
    ")"
);

fn status(use_color: bool, ok: bool, text: &str) -> String {
    paint(use_color, if ok { "\x1b[32m" } else { "\x1b[31;1m" }, text)
}

fn which_display(bin: &Path) -> Option<String> {
    if bin.components().count() > 1 {
        return bin.is_file().then(|| bin.display().to_string());
    }
    which::which(bin).ok().map(|p| p.display().to_string())
}

/// Print environment diagnostics to stderr. Failed checks are reported in the summary line; the
/// command itself always succeeds.
pub fn run_doctor(settings: &Settings, selected: BackendKind) {
    let use_err = color_enabled_stderr();
    let mut healthy = true;

    eprintln!("archy doctor");
    eprintln!();
    eprintln!("  version: v{LONG_VERSION}");
    eprintln!(
        "  host:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    eprintln!();

    match git::git_stdout_str(None, &["--version"]) {
        Some(v) => eprintln!("  git:          {}", status(use_err, true, &v)),
        None => {
            healthy = false;
            eprintln!("  git:          {}", status(use_err, false, "not found"));
        }
    }

    let config = settings.backend_config();
    for kind in BackendKind::ALL {
        let bin = match kind {
            BackendKind::CursorAgent => &config.cursor_agent_bin,
            BackendKind::Fabric => &config.fabric_bin,
        };
        let marker = if kind == selected { " (selected)" } else { "" };
        match which_display(bin) {
            Some(p) => eprintln!(
                "  {:<13} {}{marker}",
                format!("{kind}:"),
                status(use_err, true, &p)
            ),
            None => {
                if kind == selected {
                    healthy = false;
                }
                eprintln!(
                    "  {:<13} {}{marker}",
                    format!("{kind}:"),
                    status(use_err, false, &format!("not found ({})", bin.display()))
                );
            }
        }
    }
    eprintln!("  timeout:      {}s", settings.timeout.as_secs());
    eprintln!();

    let dir = resolve_patterns_dir(settings.patterns_dir.as_deref());
    eprintln!("  patterns:     {}", dir.display());
    for kind in [PatternKind::Create, PatternKind::Update] {
        let present = dir.join(kind.file_name()).is_file();
        healthy &= present;
        eprintln!(
            "    {}: {}",
            kind.file_name(),
            status(use_err, present, if present { "ok" } else { "missing" })
        );
    }
    if let Some(ext) = &settings.extend_pattern {
        let present = ext.is_file();
        healthy &= present;
        eprintln!(
            "  extension:    {} ({})",
            ext.display(),
            status(use_err, present, if present { "ok" } else { "missing" })
        );
    }

    let cfg = std::env::var("ARCHY_CONFIG_FILE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(std::path::PathBuf::from)
        .or_else(default_config_file);
    match cfg {
        Some(p) if p.is_file() => eprintln!("  config file:  {}", p.display()),
        _ => eprintln!("  config file:  (none)"),
    }
    eprintln!();

    if healthy {
        eprintln!("doctor: completed diagnostics.");
    } else {
        eprintln!("doctor: completed diagnostics; some checks failed.");
    }
}
