//! Grammar data model, regex IR, DFA builder, LALR(1) builder, and the
//! persisted binary grammar format (§2 System Overview, components 1-3).
//!
//! This crate has no runtime/streaming concerns; those live in
//! `farkle_runtime`. It corresponds to the teacher workspace's `radlr_core`.

pub mod blob;
pub mod config;
pub mod dfa;
pub mod diagnostics;
pub mod error;
pub mod lalr;
pub mod proxy;
pub mod regex;
pub mod types;

pub use config::BuildConfig;
pub use diagnostics::{BuildLog, Diagnostic, Severity};
pub use error::{BuildError, BuildResult};
