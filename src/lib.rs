#![allow(clippy::module_name_repetitions)]
//! archy: generate and update C4 architecture documentation for a git repository by driving an
//! external AI CLI (cursor-agent or fabric).
//!
//! A run validates its inputs, resolves the analysis context, builds a prompt from a template
//! plus repository data (full codebase in fresh mode, branch diff otherwise), calls the backend,
//! normalizes the answer and writes the document.

pub mod backend;
mod color;
mod config;
mod doctor;
mod errors;
pub mod git;
mod normalize;
mod orchestrator;
mod outcome;
pub mod patterns;
pub mod prompt;
pub mod scan;
mod scratch;
pub mod security;
mod signals;
mod telemetry;
pub mod util;

pub use backend::{Backend, BackendConfig, BackendKind, BackendResult};
pub use color::*;
pub use config::*;
pub use doctor::*;
pub use errors::*;
pub use normalize::*;
pub use orchestrator::*;
pub use outcome::*;
pub use scratch::ScratchDir;
pub use signals::*;
pub use telemetry::*;
