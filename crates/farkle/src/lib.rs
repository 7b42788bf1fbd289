//! Farkle: a table-driven LALR(1) parser toolkit with an integrated DFA
//! tokenizer, built from programmatically-constructed grammars.
//!
//! This crate is a thin facade over [farkle_core] (grammar model, DFA/LALR
//! builders, binary format) and [farkle_runtime] (streaming tokenizer, LALR
//! driver, parser API), the way the teacher workspace's top-level `radlr`
//! crate sits over `radlr_core`/`radlr_rust_runtime`. Most callers only need
//! this crate's re-exports plus [build_grammar].

pub use farkle_core::blob::{self, GrammarBlob};
pub use farkle_core::config::{BuildConfig, CancellationToken, NeverCancel};
pub use farkle_core::diagnostics::{BuildLog, Diagnostic, Severity};
pub use farkle_core::dfa::{self, Dfa, TokenPattern};
pub use farkle_core::error::{BuildError, BuildResult};
pub use farkle_core::lalr::{self, LalrTable};
pub use farkle_core::regex::{self, CharRange, CharSet, Regex};
pub use farkle_core::types::{
  self, Associativity, GrammarBuilder, GrammarDef, GroupId, NonTermId, OperatorScope, ProductionId, ProductionSpec,
  SymbolHandle, TokenAttributes, TokenRole, TokenSymbolId,
};

pub use farkle_runtime::{
  BufferPool, CharBuffer, ChainedTokenizer, DfaTokenizer, DriveOutcome, LalrDriver, ParseConfig, Parser,
  ParserApplicationError, ParserState, Position, PositionTracker, RuntimeError, SemanticProvider, StreamingParse,
  SyntaxCheckProvider, TokenOutcome, Tokenizer, TokenizerInput,
};

use std::sync::Arc;

/// Runs the DFA and LALR builders over an already-frozen [GrammarDef] and
/// serializes the result into a loadable [GrammarBlob] in one call (§4.4,
/// §6 "build_grammar(source) -> Result<GrammarBlob, Diagnostics>").
///
/// `case_sensitive_by_default` comes from `config` and applies to every
/// token pattern that did not request a case sensitivity override via
/// [GrammarBuilder::set_token_case_sensitivity].
pub fn build_grammar(
  grammar: &GrammarDef,
  config: &BuildConfig,
  log: &mut BuildLog,
  cancel: &dyn CancellationToken,
) -> BuildResult<Arc<GrammarBlob>> {
  let patterns: Vec<TokenPattern> = grammar
    .token_patterns
    .iter()
    .enumerate()
    .map(|(i, spec)| {
      let symbol = types::TokenSymbolId::from_index(i);
      let case_sensitive = spec.case_sensitive.unwrap_or(config.case_sensitive_by_default);
      TokenPattern::new(symbol, spec.regex.clone(), case_sensitive)
        .map_err(|message| BuildError::RegexSyntax { symbol, message, position: None })
    })
    .collect::<BuildResult<_>>()?;

  let dfa = dfa::build_dfa(&patterns, config, log, cancel)?;
  let lalr = lalr::build_lalr(grammar, config, log, cancel)?;
  let bytes = blob::write_grammar(grammar, &dfa, &lalr, log);
  GrammarBlob::read(&bytes).map(Arc::new).map_err(|_| BuildError::InvalidHandle { what: "freshly written grammar blob failed to parse" })
}
