//! A custom [Tokenizer] component that recognizes a run of digits as one
//! physical match but suspends after emitting the first character, so the
//! chain delivers the run as two separate tokens before it ever advances to
//! another component (§8 scenario 4).

use farkle::{
  CharBuffer, ChainedTokenizer, GrammarBuilder, LalrDriver, ParserApplicationError, Position, PositionTracker,
  ProductionSpec, RuntimeError, SemanticProvider, SymbolHandle, TokenAttributes, TokenOutcome, TokenRole,
  TokenSymbolId, Tokenizer, TokenizerInput,
};

use crate::utils::compile;

struct Concat;

impl SemanticProvider<char, String, String> for Concat {
  fn transform(&self, _symbol: TokenSymbolId, _pos: Position, span: &[char]) -> Result<String, String> {
    Ok(span.iter().collect())
  }

  fn fuse(&self, _production: u32, children: Vec<String>) -> Result<String, String> {
    Ok(children.concat())
  }
}

/// Matches a run of ASCII digits the way a grammar's DFA would, but instead
/// of surfacing the whole run as one token it splits the run into one
/// `digit` token per character: the first is returned immediately, the rest
/// are saved as a pending continuation resumed on the following call.
struct DigitSplitter {
  digit: TokenSymbolId,
  pending: Option<(char, Position)>,
}

impl DigitSplitter {
  fn new(digit: TokenSymbolId) -> Self {
    Self { digit, pending: None }
  }

  fn emit(
    &self,
    ch: char,
    pos: Position,
    input: &mut TokenizerInput<'_>,
    sem: &dyn SemanticProvider<char, String, String>,
    result: &mut Option<Result<TokenOutcome<String>, RuntimeError<String>>>,
  ) -> bool {
    match sem.transform(self.digit, pos, &[ch]) {
      Ok(value) => {
        input.commit(1);
        *result = Some(Ok(TokenOutcome::Token { symbol: self.digit, value, start: pos, is_noise: false }));
      }
      Err(e) => *result = Some(Err(RuntimeError::User(ParserApplicationError::at(pos, e)))),
    }
    true
  }
}

impl Tokenizer<String, String> for DigitSplitter {
  fn try_get_next_token(
    &mut self,
    input: &mut TokenizerInput<'_>,
    sem: &dyn SemanticProvider<char, String, String>,
    result: &mut Option<Result<TokenOutcome<String>, RuntimeError<String>>>,
  ) -> bool {
    if let Some((ch, pos)) = self.pending.take() {
      return self.emit(ch, pos, input, sem, result);
    }

    let chars = input.available();
    if chars.is_empty() {
      if input.is_final_block {
        *result = Some(Ok(TokenOutcome::EndOfInput { position: input.position() }));
        return true;
      }
      return false;
    }
    if !chars[0].is_ascii_digit() {
      *result = Some(Err(RuntimeError::Lexical { position: input.position(), character: chars[0] }));
      return true;
    }

    let pairs_with_next = chars.len() >= 2 && chars[1].is_ascii_digit();
    let first = chars[0];
    let start = input.position();
    let produced = self.emit(first, start, input, sem, result);
    if produced && pairs_with_next {
      if let Some(Ok(TokenOutcome::Token { .. })) = result {
        let next = input.available()[0];
        self.pending = Some((next, input.position()));
      }
    }
    produced
  }
}

fn digit_grammar() -> (std::sync::Arc<farkle::GrammarBlob>, TokenSymbolId) {
  let mut b = GrammarBuilder::new();
  let digit = b.declare_token("digit", farkle::Regex::Any, TokenRole::Terminal, TokenAttributes::default());
  let start = b.declare_nonterm("Start").unwrap();
  b.set_start(start);
  b.define_productions(
    start,
    vec![ProductionSpec {
      members: vec![SymbolHandle::Token(digit), SymbolHandle::Token(digit)],
      precedence_token: None,
    }],
  )
  .unwrap();
  (compile(b), digit)
}

/// Drives `tokenizer` and the LALR table directly, the way [farkle::Parser]
/// does internally, but over a hand-built [ChainedTokenizer] instead of the
/// grammar's own [farkle::DfaTokenizer] (§8 scenario 4's setup needs a
/// custom component, which [farkle::Parser] doesn't currently accept).
fn run(blob: &farkle::GrammarBlob, tokenizer: &mut ChainedTokenizer<String, String>, text: &str) -> String {
  let mut buffer = CharBuffer::new();
  let mut tracker = PositionTracker::new();
  let chars: Vec<char> = text.chars().collect();
  let span = buffer.get_span(chars.len().max(1));
  span[..chars.len()].copy_from_slice(&chars);
  buffer.advance(chars.len());
  buffer.complete_input();

  let mut input = TokenizerInput::new(&mut buffer, &mut tracker, true);
  let driver = LalrDriver::new(blob);
  match driver.drive(tokenizer, &mut input, &Concat) {
    farkle::DriveOutcome::Accepted(value) => value,
    farkle::DriveOutcome::Error(e) => panic!("unexpected parse error: {e}"),
    farkle::DriveOutcome::NeedMoreInput => panic!("a final-block drive must always reach a decision"),
  }
}

#[test]
fn splitter_delivers_both_digits_from_one_matched_run_before_the_chain_advances() {
  let (blob, digit) = digit_grammar();
  let mut chain: ChainedTokenizer<String, String> = ChainedTokenizer::new(vec![Box::new(DigitSplitter::new(digit))]);
  assert_eq!(run(&blob, &mut chain, "12"), "12");
}

#[test]
fn splitter_rejects_a_non_digit_as_a_lexical_error() {
  let (blob, digit) = digit_grammar();
  let mut chain: ChainedTokenizer<String, String> = ChainedTokenizer::new(vec![Box::new(DigitSplitter::new(digit))]);

  let mut buffer = CharBuffer::new();
  let mut tracker = PositionTracker::new();
  let chars: Vec<char> = "1a".chars().collect();
  let span = buffer.get_span(chars.len());
  span[..chars.len()].copy_from_slice(&chars);
  buffer.advance(chars.len());
  buffer.complete_input();

  let mut input = TokenizerInput::new(&mut buffer, &mut tracker, true);
  let driver = LalrDriver::new(&blob);
  match driver.drive(&mut chain, &mut input, &Concat) {
    farkle::DriveOutcome::Error(RuntimeError::Lexical { character, .. }) => assert_eq!(character, 'a'),
    farkle::DriveOutcome::Accepted(v) => panic!("expected a lexical error, parse accepted instead: {v:?}"),
    farkle::DriveOutcome::Error(e) => panic!("expected a lexical error, got a different error instead: {e}"),
    farkle::DriveOutcome::NeedMoreInput => panic!("a final-block drive must always reach a decision"),
  }
}

/// Exercises [ChainedTokenizer::suspend] directly: a manually recorded
/// continuation is resumed on the next call, and a real token from the
/// resumed tokenizer resets the chain's round-robin back to component 0
/// (§8 scenario 4, §9 "Coroutine-like tokenizer suspension").
mod chain_suspend {
  use super::*;

  struct FixedToken {
    symbol: TokenSymbolId,
    text: &'static str,
  }

  impl Tokenizer<String, String> for FixedToken {
    fn try_get_next_token(
      &mut self,
      input: &mut TokenizerInput<'_>,
      sem: &dyn SemanticProvider<char, String, String>,
      result: &mut Option<Result<TokenOutcome<String>, RuntimeError<String>>>,
    ) -> bool {
      let start = input.position();
      match sem.transform(self.symbol, start, &self.text.chars().collect::<Vec<_>>()) {
        Ok(value) => {
          *result = Some(Ok(TokenOutcome::Token { symbol: self.symbol, value, start, is_noise: false }));
        }
        Err(e) => *result = Some(Err(RuntimeError::User(ParserApplicationError::at(start, e)))),
      }
      true
    }
  }

  struct NeverCalled;

  impl Tokenizer<String, String> for NeverCalled {
    fn try_get_next_token(
      &mut self,
      _input: &mut TokenizerInput<'_>,
      _sem: &dyn SemanticProvider<char, String, String>,
      _result: &mut Option<Result<TokenOutcome<String>, RuntimeError<String>>>,
    ) -> bool {
      panic!("a resumed suspension must not fall through to later components");
    }
  }

  fn scratch_input(buffer: &mut CharBuffer, tracker: &mut PositionTracker) -> TokenizerInput<'_> {
    buffer.complete_input();
    TokenizerInput::new(buffer, tracker, true)
  }

  #[test]
  fn resuming_a_suspension_returns_the_saved_continuations_token_and_resets_rotation() {
    let marker = TokenSymbolId::from_index(0);
    let mut chain: ChainedTokenizer<String, String> =
      ChainedTokenizer::new(vec![Box::new(NeverCalled), Box::new(NeverCalled)]);
    chain.suspend(1, Box::new(FixedToken { symbol: marker, text: "x" }));

    let mut buffer = CharBuffer::new();
    let mut tracker = PositionTracker::new();
    let mut input = scratch_input(&mut buffer, &mut tracker);

    let mut result = None;
    let done = chain.try_get_next_token(&mut input, &Concat, &mut result);
    assert!(done);
    match result {
      Some(Ok(TokenOutcome::Token { value, is_noise, .. })) => {
        assert_eq!(value, "x");
        assert!(!is_noise);
      }
      _ => panic!("expected a token from the resumed continuation"),
    }
  }

  #[test]
  fn a_resumed_tokenizer_that_needs_more_input_keeps_the_suspension_pending() {
    struct NeedsMore;
    impl Tokenizer<String, String> for NeedsMore {
      fn try_get_next_token(
        &mut self,
        _input: &mut TokenizerInput<'_>,
        _sem: &dyn SemanticProvider<char, String, String>,
        _result: &mut Option<Result<TokenOutcome<String>, RuntimeError<String>>>,
      ) -> bool {
        false
      }
    }

    let mut chain: ChainedTokenizer<String, String> = ChainedTokenizer::new(vec![Box::new(NeverCalled)]);
    chain.suspend(0, Box::new(NeedsMore));

    let mut buffer = CharBuffer::new();
    let mut tracker = PositionTracker::new();
    // Not final: `NeedsMore` reporting `false` must propagate as `false`
    // without the chain ever reaching `NeverCalled`.
    let mut input = TokenizerInput::new(&mut buffer, &mut tracker, false);

    let mut result = None;
    let done = chain.try_get_next_token(&mut input, &Concat, &mut result);
    assert!(!done, "a pending suspension needing more input must not be silently dropped");
  }
}
