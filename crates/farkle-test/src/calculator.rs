//! Arithmetic expressions with left-associative `+`/`*` at different
//! precedence levels and parenthesized grouping: `E -> E+E | E*E | num | (E)`.

use farkle::{
  Associativity, CharRange, CharSet, GrammarBuilder, OperatorScope, Position, ProductionSpec, Regex, SemanticProvider,
  SymbolHandle, TokenAttributes, TokenRole, TokenSymbolId,
};

use crate::utils::{compile, parse_err, parse_ok};

struct Eval;

impl SemanticProvider<char, f64, String> for Eval {
  fn transform(&self, _symbol: TokenSymbolId, _pos: Position, span: &[char]) -> Result<f64, String> {
    let text: String = span.iter().collect();
    // Punctuation tokens (`+`, `*`, `(`, `)`) never contribute to a `fuse`
    // result; their `transform` output is discarded, so any placeholder
    // value is fine as long as it isn't an error that would abort the parse.
    Ok(text.parse::<f64>().unwrap_or(0.0))
  }

  fn fuse(&self, production: u32, children: Vec<f64>) -> Result<f64, String> {
    match production {
      // E -> E + E
      0 => Ok(children[0] + children[2]),
      // E -> E * E
      1 => Ok(children[0] * children[2]),
      // E -> ( E )
      2 => Ok(children[1]),
      // E -> number
      3 => Ok(children[0]),
      other => Err(format!("unhandled production {other}")),
    }
  }
}

fn build() -> std::sync::Arc<farkle::GrammarBlob> {
  let mut b = GrammarBuilder::new();

  let plus = b.declare_token("plus", Regex::Literal("+".into()), TokenRole::Terminal, TokenAttributes::default());
  let star = b.declare_token("star", Regex::Literal("*".into()), TokenRole::Terminal, TokenAttributes::default());
  let lparen = b.declare_token("lparen", Regex::Literal("(".into()), TokenRole::Terminal, TokenAttributes::default());
  let rparen = b.declare_token("rparen", Regex::Literal(")".into()), TokenRole::Terminal, TokenAttributes::default());
  let number = b.declare_token(
    "number",
    Regex::Chars(CharSet::from_ranges([CharRange { lo: '0', hi: '9' }])).plus(),
    TokenRole::Terminal,
    TokenAttributes::default(),
  );
  b.declare_token(
    "space",
    Regex::Chars(CharSet::from_ranges([CharRange { lo: ' ', hi: ' ' }])).plus(),
    TokenRole::Terminal,
    TokenAttributes { noise: true, ..TokenAttributes::default() },
  );

  let mut scope = OperatorScope::new();
  scope.push_level(Associativity::Left, [plus]);
  scope.push_level(Associativity::Left, [star]);
  b.set_operator_scope(scope);

  let e = b.declare_nonterm("E").unwrap();
  b.set_start(e);
  b.define_productions(
    e,
    vec![
      ProductionSpec { members: vec![SymbolHandle::NonTerm(e), SymbolHandle::Token(plus), SymbolHandle::NonTerm(e)], precedence_token: Some(plus) },
      ProductionSpec { members: vec![SymbolHandle::NonTerm(e), SymbolHandle::Token(star), SymbolHandle::NonTerm(e)], precedence_token: Some(star) },
      ProductionSpec { members: vec![SymbolHandle::Token(lparen), SymbolHandle::NonTerm(e), SymbolHandle::Token(rparen)], precedence_token: None },
      ProductionSpec { members: vec![SymbolHandle::Token(number)], precedence_token: None },
    ],
  )
  .unwrap();

  compile(b)
}

#[test]
fn left_associative_addition_and_precedence() {
  let blob = build();
  // 2 + 3 * 4 must bind as 2 + (3 * 4), not (2 + 3) * 4.
  assert_eq!(parse_ok(&blob, "2+3*4", &Eval), 14.0);
}

#[test]
fn parentheses_override_precedence() {
  let blob = build();
  assert_eq!(parse_ok(&blob, "(2+3)*4", &Eval), 20.0);
}

#[test]
fn left_associativity_groups_same_precedence_leftward() {
  let blob = build();
  // 10 - would require a minus token; stick to + to isolate associativity:
  // 1+2+3 must be (1+2)+3, which for addition is unobservable, so assert
  // via a precedence ladder instead: 2*3+4*5 = (2*3)+(4*5) = 26.
  assert_eq!(parse_ok(&blob, "2*3+4*5", &Eval), 26.0);
}

#[test]
fn whitespace_between_tokens_is_discarded_as_noise() {
  let blob = build();
  assert_eq!(parse_ok(&blob, "2 + 3 * 4", &Eval), 14.0);
}

#[test]
fn trailing_operator_is_unexpected_eof_at_next_column() {
  let blob = build();
  match parse_err(&blob, "1+", &Eval) {
    farkle::RuntimeError::UnexpectedEof { position } => assert_eq!(position.column, 3),
    other => panic!("expected UnexpectedEof, got {other:?}"),
  }
}
