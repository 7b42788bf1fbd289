//! Build-time diagnostics that accumulate rather than abort the build.
//!
//! Grounded on the teacher's `Journal`/`Report` pair (`sherpa-core::journal`):
//! a plain accumulator struct, not a logging-framework integration. Unlike
//! `Journal`, `BuildLog` has no notion of "active report" scoping — Farkle's
//! build pipeline is linear enough that a flat `Vec` is sufficient.

use std::fmt::{self, Display};

use crate::types::{SpecialNameTarget, TokenSymbolId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
  Warning,
  Error,
}

#[derive(Debug, Clone)]
pub enum Diagnostic {
  /// A regex whose match set is provably empty; it contributes no DFA
  /// states and can never fire (§4.1 step 2).
  VoidRegex { symbol: TokenSymbolId },
  /// Two or more token symbols are accepted in the same DFA state with equal
  /// priority and neither is fixed-length (§4.1 step 5).
  IndistinguishableSymbols { symbols: Vec<TokenSymbolId> },
  /// A shift/reduce conflict the operator scope could not resolve (§4.2).
  UnresolvedShiftReduce { state: u32, lookahead: TokenSymbolId, production: u32 },
  /// A reduce/reduce conflict the operator scope could not resolve (§4.2).
  UnresolvedReduceReduce { state: u32, lookahead: TokenSymbolId, productions: Vec<u32> },
  /// Two grammar symbols share a special name (§3 invariants). `first` is
  /// whichever registered the name first; `second` is the later declaration
  /// that lost the name.
  DuplicateSpecialName { name: String, first: SpecialNameTarget, second: SpecialNameTarget },
  /// The tokenizer DFA's start state itself accepts, meaning some token
  /// matches the empty string. Boundary Behaviors requires this be rejected
  /// at build rather than silently looping the tokenizer in place.
  DfaStartStateAccepts { symbol: TokenSymbolId },
}

impl Diagnostic {
  pub fn severity(&self) -> Severity {
    match self {
      Diagnostic::VoidRegex { .. } => Severity::Warning,
      _ => Severity::Error,
    }
  }

  /// Whether this diagnostic, by itself, forces the grammar's `Unparsable`
  /// flag per §3's invariant list.
  pub fn marks_unparsable(&self) -> bool {
    !matches!(self, Diagnostic::VoidRegex { .. })
  }
}

impl Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Diagnostic::VoidRegex { symbol } => write!(f, "token symbol {symbol:?} has a regex that matches no input"),
      Diagnostic::IndistinguishableSymbols { symbols } => {
        write!(f, "symbols {symbols:?} are indistinguishable in at least one tokenizer state")
      }
      Diagnostic::UnresolvedShiftReduce { state, lookahead, production } => {
        write!(f, "unresolved shift/reduce conflict in state {state} on {lookahead:?} (production {production})")
      }
      Diagnostic::UnresolvedReduceReduce { state, lookahead, productions } => {
        write!(f, "unresolved reduce/reduce conflict in state {state} on {lookahead:?} among productions {productions:?}")
      }
      Diagnostic::DuplicateSpecialName { name, first, second } => {
        write!(f, "special name `{name}` is used by both {first:?} and {second:?}")
      }
      Diagnostic::DfaStartStateAccepts { symbol } => {
        write!(f, "token symbol {symbol:?} matches the empty string, which the tokenizer start state cannot accept")
      }
    }
  }
}

/// Accumulates diagnostics for a single build. Grammar construction proceeds
/// even when diagnostics are logged; callers inspect
/// [BuildLog::is_unparsable] to decide whether the resulting grammar may be
/// safely used for parsing.
#[derive(Debug, Default, Clone)]
pub struct BuildLog {
  diagnostics: Vec<Diagnostic>,
}

impl BuildLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, diagnostic: Diagnostic) {
    self.diagnostics.push(diagnostic);
  }

  pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
    self.diagnostics.iter()
  }

  pub fn is_empty(&self) -> bool {
    self.diagnostics.is_empty()
  }

  pub fn len(&self) -> usize {
    self.diagnostics.len()
  }

  /// True once any accumulated diagnostic forces the grammar's `Unparsable`
  /// flag (§3): unresolved LALR conflicts, DFA conflicts, or duplicate
  /// special names. Void-regex warnings alone do not set it.
  pub fn is_unparsable(&self) -> bool {
    self.diagnostics.iter().any(Diagnostic::marks_unparsable)
  }
}

impl Display for BuildLog {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for d in &self.diagnostics {
      writeln!(f, "[{:?}] {}", d.severity(), d)?;
    }
    Ok(())
  }
}
