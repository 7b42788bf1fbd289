//! A word list with `/* ... */` block comments: comments are swallowed
//! entirely by group-mode lexing and never reach the LALR driver, unlike
//! the noise tokens exercised elsewhere.

use farkle::{
  CharRange, CharSet, GrammarBuilder, Position, ProductionSpec, Regex, SemanticProvider, SymbolHandle,
  TokenAttributes, TokenRole, TokenSymbolId,
};

use crate::utils::{compile, parse_ok};

struct Collect;

impl SemanticProvider<char, Vec<String>, String> for Collect {
  fn transform(&self, _symbol: TokenSymbolId, _pos: Position, span: &[char]) -> Result<Vec<String>, String> {
    Ok(vec![span.iter().collect()])
  }

  fn fuse(&self, production: u32, mut children: Vec<Vec<String>>) -> Result<Vec<String>, String> {
    match production {
      // WordList -> word
      0 => Ok(children.remove(0)),
      // WordList -> WordList word
      1 => {
        let mut rest = children.remove(1);
        let mut head = children.remove(0);
        head.append(&mut rest);
        Ok(head)
      }
      other => Err(format!("unhandled production {other}")),
    }
  }
}

fn build() -> std::sync::Arc<farkle::GrammarBlob> {
  let mut b = GrammarBuilder::new();

  let letters = CharSet::from_ranges([CharRange { lo: 'a', hi: 'z' }, CharRange { lo: 'A', hi: 'Z' }]);
  let word = b.declare_token("word", Regex::Chars(letters).plus(), TokenRole::Terminal, TokenAttributes::default());
  b.declare_token(
    "space",
    Regex::Chars(CharSet::from_ranges([CharRange { lo: ' ', hi: ' ' }, CharRange { lo: '\n', hi: '\n' }])).plus(),
    TokenRole::Terminal,
    TokenAttributes { noise: true, ..TokenAttributes::default() },
  );

  let comment_start = b.declare_token("comment_start", Regex::Literal("/*".into()), TokenRole::GroupStart, TokenAttributes::default());
  let comment_end = b.declare_token("comment_end", Regex::Literal("*/".into()), TokenRole::GroupEnd, TokenAttributes::default());
  b.declare_group("block_comment", comment_start, Some(comment_end), true, false, false).unwrap();

  let word_list = b.declare_nonterm("WordList").unwrap();
  b.set_start(word_list);
  b.define_productions(
    word_list,
    vec![
      ProductionSpec { members: vec![SymbolHandle::Token(word)], precedence_token: None },
      ProductionSpec { members: vec![SymbolHandle::NonTerm(word_list), SymbolHandle::Token(word)], precedence_token: None },
    ],
  )
  .unwrap();

  compile(b)
}

#[test]
fn comment_between_words_is_fully_skipped() {
  let blob = build();
  let result = parse_ok(&blob, "alpha /* not a word */ beta", &Collect);
  assert_eq!(result, vec!["alpha".to_string(), "beta".to_string()]);
}

#[test]
fn adjacent_comments_with_no_content_between_them() {
  let blob = build();
  let result = parse_ok(&blob, "one/**//**/two", &Collect);
  assert_eq!(result, vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn comment_containing_asterisks_and_slashes_that_are_not_the_closer() {
  let blob = build();
  let result = parse_ok(&blob, "x /* a * b / c */ y", &Collect);
  assert_eq!(result, vec!["x".to_string(), "y".to_string()]);
}

/// A quoted-string group whose content carries a backslash escape. The
/// escape token (backslash plus any one character) is longer than the
/// group's own closer, so the DFA's longest-match rule picks it over the
/// closer whenever a backslash sits right before one — including right
/// before the string's real terminator. `AdvanceByCharacter` exists for
/// exactly this: committing one character at a time means the backslash is
/// consumed on its own, leaving the terminator to be recognized on its own
/// at the very next step, instead of being swallowed as half of the escape.
mod escaped_string {
  use super::*;

  fn build() -> std::sync::Arc<farkle::GrammarBlob> {
    let mut b = GrammarBuilder::new();

    let letters = CharSet::from_ranges([CharRange { lo: 'a', hi: 'z' }]);
    let word = b.declare_token("word", Regex::Chars(letters).plus(), TokenRole::Terminal, TokenAttributes::default());
    b.declare_token(
      "space",
      Regex::Chars(CharSet::single(' ')).plus(),
      TokenRole::Terminal,
      TokenAttributes { noise: true, ..TokenAttributes::default() },
    );
    // Distinct open/close glyphs (like typographic curly quotes), so the
    // group's own start and end tokens never tie for the same match.
    let open = b.declare_token("open_quote", Regex::Literal("\u{201C}".into()), TokenRole::GroupStart, TokenAttributes::default());
    let close = b.declare_token("close_quote", Regex::Literal("\u{201D}".into()), TokenRole::GroupEnd, TokenAttributes::default());
    b.declare_token(
      "escape",
      Regex::Concat(vec![Regex::Chars(CharSet::single('\\')), Regex::Any]),
      TokenRole::Terminal,
      TokenAttributes::default(),
    );
    b.declare_group("string", open, Some(close), true, false, false).unwrap();

    let word_list = b.declare_nonterm("WordList").unwrap();
    b.set_start(word_list);
    b.define_productions(
      word_list,
      vec![
        ProductionSpec { members: vec![SymbolHandle::Token(word)], precedence_token: None },
        ProductionSpec { members: vec![SymbolHandle::NonTerm(word_list), SymbolHandle::Token(word)], precedence_token: None },
      ],
    )
    .unwrap();

    compile(b)
  }

  #[test]
  fn a_backslash_right_before_the_real_terminator_does_not_escape_it() {
    let blob = build();
    let result = parse_ok(&blob, "x \u{201C}abc\\\u{201D}", &Collect);
    assert_eq!(result, vec!["x".to_string()]);
  }
}
