//! Interrupt tracking.
//!
//! SIGINT/SIGTERM/SIGHUP only set a flag. Long waits (backend subprocesses) poll it, kill their
//! child and return an error, so the run unwinds through ordinary returns and every RAII guard
//! (notably the scratch directory) is dropped.

use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static INSTALLED: OnceCell<()> = OnceCell::new();

#[cfg(unix)]
extern "C" fn on_interrupt(_sig: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install the interrupt handlers once per process.
#[cfg(unix)]
pub fn install_interrupt_handlers() -> nix::Result<()> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    if INSTALLED.get().is_some() {
        return Ok(());
    }
    let action = SigAction::new(
        SigHandler::Handler(on_interrupt),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP] {
        // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
        unsafe { sigaction(sig, &action) }?;
    }
    let _ = INSTALLED.set(());
    Ok(())
}

#[cfg(not(unix))]
pub fn install_interrupt_handlers() -> std::io::Result<()> {
    let _ = INSTALLED.set(());
    Ok(())
}

pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Return `Err(Interrupted)` once a signal has been received.
pub fn check_interrupted() -> Result<(), crate::errors::ArchyError> {
    if interrupted() {
        Err(crate::errors::ArchyError::Interrupted)
    } else {
        Ok(())
    }
}
