//! Build-time error and diagnostic types.
//!
//! Modeled directly on the teacher workspace's hand-rolled `HCError` /
//! `SherpaError` / `RadlrError` enums: a single `Display`-able enum with
//! `From` conversions for the handful of `std` error types that can leak in,
//! no `thiserror`/`anyhow` dependency.

use std::fmt::{self, Display};

use crate::types::{NonTermId, TokenSymbolId};

/// A fatal build-time error: the builder returns no grammar/DFA at all.
#[derive(Debug, Clone)]
pub enum BuildError {
  /// A regex failed to parse. `position` is a byte offset into the source
  /// pattern text, if the pattern came from a string.
  RegexSyntax { symbol: TokenSymbolId, message: String, position: Option<usize> },
  /// Two nonterminals declared under the same name.
  DuplicateNonTerminalName { name: String },
  /// A nonterminal's productions were committed twice (§3 Lifecycle).
  NonTerminalAlreadyFrozen { nonterm: NonTermId },
  /// The DFA builder exceeded `BuildConfig::max_tokenizer_states` before
  /// reaching a fixed point; per §4.1 no partial DFA is emitted.
  TokenizerStateLimitExceeded { limit: u32 },
  /// A production member, start-nonterminal, or precedence token referenced
  /// a handle out of range.
  InvalidHandle { what: &'static str },
  /// The build was cancelled via the caller's cancellation token.
  Cancelled,
  Io(String),
}

impl Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::RegexSyntax { symbol, message, position } => match position {
        Some(p) => write!(f, "regex syntax error in token symbol {symbol:?} at offset {p}: {message}"),
        None => write!(f, "regex syntax error in token symbol {symbol:?}: {message}"),
      },
      BuildError::DuplicateNonTerminalName { name } => {
        write!(f, "duplicate nonterminal name `{name}`")
      }
      BuildError::NonTerminalAlreadyFrozen { nonterm } => {
        write!(f, "productions for {nonterm:?} were already committed")
      }
      BuildError::TokenizerStateLimitExceeded { limit } => {
        write!(f, "tokenizer DFA exceeded the {limit} state limit")
      }
      BuildError::InvalidHandle { what } => write!(f, "invalid handle: {what}"),
      BuildError::Cancelled => write!(f, "build was cancelled"),
      BuildError::Io(msg) => write!(f, "I/O error: {msg}"),
    }
  }
}

impl std::error::Error for BuildError {}

impl From<std::io::Error> for BuildError {
  fn from(e: std::io::Error) -> Self {
    BuildError::Io(e.to_string())
  }
}

pub type BuildResult<T> = Result<T, BuildError>;
