//! Process execution helpers.

pub mod exec;

pub use exec::{ExecOutput, ExecRequest, ExecService};
