//! The persisted grammar binary format (§3 Grammar file, §4.4, §6): the
//! byte-level contract connecting the build pipeline (writer) to the
//! runtime parser (reader).

mod layout;
mod reader;
mod writer;

pub use layout::{FORMAT_VERSION, MAGIC};
pub use reader::{
  DfaStateView, GrammarBlob, GrammarHeaderView, GroupView, LalrStateView, NonTermView, ProductionView, ReaderError,
  TokenSymbolView,
};
pub use writer::write_grammar;

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{BuildConfig, NeverCancel};
  use crate::dfa::{build_dfa, TokenPattern};
  use crate::diagnostics::BuildLog;
  use crate::lalr::build_lalr;
  use crate::regex::{CharRange, CharSet, Regex};
  use crate::types::{GrammarBuilder, ProductionSpec, SymbolHandle, TokenAttributes, TokenRole};

  fn tiny_grammar() -> crate::types::GrammarDef {
    let mut b = GrammarBuilder::new();
    let digit = b.declare_token(
      "digit",
      Regex::Chars(CharSet::from_ranges([CharRange { lo: '0', hi: '9' }])).plus(),
      TokenRole::Terminal,
      TokenAttributes::default(),
    );
    b.set_special_name(digit, "Digit");
    let start = b.declare_nonterm("Start").unwrap();
    b.set_start(start);
    b.define_productions(
      start,
      vec![ProductionSpec { members: vec![SymbolHandle::Token(digit)], precedence_token: None }],
    )
    .unwrap();
    b.build(&mut BuildLog::new()).unwrap()
  }

  #[test]
  fn round_trips_bit_for_bit() {
    let grammar = tiny_grammar();
    let mut log = BuildLog::new();
    let cancel = NeverCancel;
    let config = BuildConfig::default();
    let patterns: Vec<TokenPattern> = grammar
      .token_patterns
      .iter()
      .enumerate()
      .map(|(i, spec)| {
        TokenPattern::new(
          crate::types::TokenSymbolId::from_index(i),
          spec.regex.clone(),
          spec.case_sensitive.unwrap_or(config.case_sensitive_by_default),
        )
        .unwrap()
      })
      .collect();
    let dfa = build_dfa(&patterns, &config, &mut log, &cancel).unwrap();
    let lalr = build_lalr(&grammar, &config, &mut log, &cancel).unwrap();

    let bytes = write_grammar(&grammar, &dfa, &lalr, &log);
    let blob = GrammarBlob::read(&bytes).unwrap();
    let bytes_again = write_grammar(&grammar, &dfa, &lalr, &log);

    assert_eq!(bytes, bytes_again, "writing the same grammar twice must be byte-identical");
    assert_eq!(blob.token_symbol_count(), 1);
    assert_eq!(blob.token_symbol(0).special_name, Some("Digit"));
    assert_eq!(blob.header().start_nonterm, grammar.start_nonterm.0);
  }

  /// An unresolved reduce/reduce conflict is only known once the LALR
  /// builder runs, well after `GrammarBuilder::build` froze
  /// `grammar.unparsable`. The persisted header bit must still come out
  /// `true` because it also accounts for the build log.
  #[test]
  fn unparsable_bit_reflects_lalr_conflicts_not_just_the_frozen_grammar_field() {
    let mut b = GrammarBuilder::new();
    let num = b.declare_token("num", Regex::Chars(CharSet::from_ranges([CharRange { lo: '0', hi: '9' }])).plus(), TokenRole::Terminal, TokenAttributes::default());
    let start = b.declare_nonterm("Start").unwrap();
    let a = b.declare_nonterm("A").unwrap();
    let bb = b.declare_nonterm("B").unwrap();
    b.set_start(start);
    b.define_productions(
      start,
      vec![
        ProductionSpec { members: vec![SymbolHandle::NonTerm(a)], precedence_token: None },
        ProductionSpec { members: vec![SymbolHandle::NonTerm(bb)], precedence_token: None },
      ],
    )
    .unwrap();
    b.define_productions(a, vec![ProductionSpec { members: vec![SymbolHandle::Token(num)], precedence_token: None }]).unwrap();
    b.define_productions(bb, vec![ProductionSpec { members: vec![SymbolHandle::Token(num)], precedence_token: None }]).unwrap();
    let mut log = BuildLog::new();
    let grammar = b.build(&mut log).unwrap();
    assert!(!grammar.unparsable, "no duplicate special names, so the frozen field alone reports parsable");

    let cancel = NeverCancel;
    let config = BuildConfig::default();
    let patterns: Vec<TokenPattern> = grammar
      .token_patterns
      .iter()
      .enumerate()
      .map(|(i, spec)| TokenPattern::new(crate::types::TokenSymbolId::from_index(i), spec.regex.clone(), true).unwrap())
      .collect();
    let dfa = build_dfa(&patterns, &config, &mut log, &cancel).unwrap();
    let lalr = build_lalr(&grammar, &config, &mut log, &cancel).unwrap();
    assert!(log.is_unparsable(), "A and B both reducing `num` under Start is an unresolved reduce/reduce conflict");

    let bytes = write_grammar(&grammar, &dfa, &lalr, &log);
    let blob = GrammarBlob::read(&bytes).unwrap();
    assert!(blob.header().unparsable, "the persisted header bit must OR in the build log, not just the frozen grammar field");
  }
}
