//! Serializing the same frozen grammar twice must yield byte-identical
//! blobs, and parsing through either one must agree (§8 scenario 6,
//! Testable Properties "`read(write(G)) == G` bit-for-bit").

use std::sync::Arc;

use farkle::{
  build_grammar, BuildConfig, BuildLog, CharRange, CharSet, GrammarBlob, GrammarBuilder, NeverCancel, Position,
  ProductionSpec, Regex, SemanticProvider, SymbolHandle, TokenAttributes, TokenRole, TokenSymbolId,
};

use crate::utils::parse_ok;

struct Echo;

impl SemanticProvider<char, String, String> for Echo {
  fn transform(&self, _symbol: TokenSymbolId, _pos: Position, span: &[char]) -> Result<String, String> {
    Ok(span.iter().collect())
  }

  fn fuse(&self, _production: u32, children: Vec<String>) -> Result<String, String> {
    Ok(children.concat())
  }
}

fn build_def() -> farkle::GrammarDef {
  let mut b = GrammarBuilder::new();
  let letters = CharSet::from_ranges([CharRange { lo: 'a', hi: 'z' }]);
  let word = b.declare_token("word", Regex::Chars(letters).plus(), TokenRole::Terminal, TokenAttributes::default());
  b.set_special_name(word, "Word");
  let start = b.declare_nonterm("Start").unwrap();
  b.set_start(start);
  b.define_productions(start, vec![ProductionSpec { members: vec![SymbolHandle::Token(word)], precedence_token: None }])
    .unwrap();
  b.build(&mut BuildLog::new()).unwrap()
}

/// Builds and serializes the same grammar definition twice independently
/// (rather than reusing one compiled blob), so this exercises the whole
/// build-then-write-then-read pipeline twice rather than just cloning a
/// result.
fn build_blob_twice() -> (Arc<GrammarBlob>, BuildLog, Arc<GrammarBlob>, BuildLog) {
  let grammar = build_def();
  let config = BuildConfig::default();

  let mut log_a = BuildLog::new();
  let blob_a = build_grammar(&grammar, &config, &mut log_a, &NeverCancel).unwrap();

  let mut log_b = BuildLog::new();
  let blob_b = build_grammar(&grammar, &config, &mut log_b, &NeverCancel).unwrap();

  (blob_a, log_a, blob_b, log_b)
}

#[test]
fn serializing_the_same_grammar_twice_is_byte_identical() {
  let (blob_a, log_a, blob_b, log_b) = build_blob_twice();

  // `GrammarBlob` has no `PartialEq`, but its `Debug` output walks every
  // field including the raw byte image, so identical `Debug` strings imply
  // identical bytes.
  assert_eq!(format!("{blob_a:?}"), format!("{blob_b:?}"), "two builds of the same grammar must serialize identically");
  assert_eq!(log_a.is_empty(), log_b.is_empty());
  assert!(log_a.is_empty(), "unexpected diagnostics: {log_a}");
}

#[test]
fn parsing_through_either_serialized_copy_agrees() {
  let (blob_a, _, blob_b, _) = build_blob_twice();

  let result_a = parse_ok(&blob_a, "foo", &Echo);
  let result_b = parse_ok(&blob_b, "foo", &Echo);
  assert_eq!(result_a, "foo");
  assert_eq!(result_a, result_b);

  assert_eq!(blob_a.token_symbol(0).special_name, Some("Word"));
  assert_eq!(blob_a.token_symbol(0).special_name, blob_b.token_symbol(0).special_name);
}
