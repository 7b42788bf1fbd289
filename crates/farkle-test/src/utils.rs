//! Shared helpers for building a small grammar and driving it to a parsed
//! result, so each scenario module only states the grammar and the input.

use std::sync::Arc;

use farkle::{
  build_grammar, BuildConfig, BuildLog, GrammarBlob, GrammarBuilder, NeverCancel, Parser, RuntimeError,
  SemanticProvider,
};

/// Compiles `builder` with default settings and asserts the build produced
/// no diagnostics, returning the loadable blob.
pub fn compile(builder: GrammarBuilder) -> Arc<GrammarBlob> {
  compile_with(builder, BuildConfig::default())
}

pub fn compile_with(builder: GrammarBuilder, config: BuildConfig) -> Arc<GrammarBlob> {
  let mut log = BuildLog::new();
  let grammar = builder.build(&mut log).expect("grammar definition is internally consistent");
  let blob = build_grammar(&grammar, &config, &mut log, &NeverCancel).expect("grammar compiles");
  assert!(!log.is_unparsable(), "grammar compiled with unparsable diagnostics: {log}");
  blob
}

/// Parses `input` against `blob` to completion, panicking with the runtime
/// error on failure. Scenarios that want to assert on a specific failure
/// mode call [farkle::Parser] directly instead.
pub fn parse_ok<V, E: std::fmt::Debug>(blob: &Arc<GrammarBlob>, input: &str, sem: &dyn SemanticProvider<char, V, E>) -> V {
  let parser = Parser::new(Arc::clone(blob));
  match parser.parse(input, sem) {
    Ok(v) => v,
    Err(e) => panic!("expected a successful parse of {input:?}, got {e:?}"),
  }
}

pub fn parse_err<V: std::fmt::Debug, E>(blob: &Arc<GrammarBlob>, input: &str, sem: &dyn SemanticProvider<char, V, E>) -> RuntimeError<E> {
  let parser = Parser::new(Arc::clone(blob));
  match parser.parse(input, sem) {
    Ok(v) => panic!("expected {input:?} to fail to parse, got {v:?}"),
    Err(e) => e,
  }
}
