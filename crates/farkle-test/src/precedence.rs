//! Operator precedence via the operator scope: `^` binds tighter than `+`
//! and is right-associative, so `2^3^2` must reduce as `2^(3^2)`, not
//! `(2^3)^2`.

use farkle::{
  Associativity, CharRange, CharSet, GrammarBuilder, OperatorScope, Position, ProductionSpec, Regex, SemanticProvider,
  SymbolHandle, TokenAttributes, TokenRole, TokenSymbolId,
};

use crate::utils::{compile, parse_ok};

struct Eval;

impl SemanticProvider<char, f64, String> for Eval {
  fn transform(&self, _symbol: TokenSymbolId, _pos: Position, span: &[char]) -> Result<f64, String> {
    let text: String = span.iter().collect();
    Ok(text.parse::<f64>().unwrap_or(0.0))
  }

  fn fuse(&self, production: u32, children: Vec<f64>) -> Result<f64, String> {
    match production {
      // E -> E + E
      0 => Ok(children[0] + children[2]),
      // E -> E ^ E
      1 => Ok(children[0].powf(children[2])),
      // E -> number
      2 => Ok(children[0]),
      other => Err(format!("unhandled production {other}")),
    }
  }
}

fn build() -> std::sync::Arc<farkle::GrammarBlob> {
  let mut b = GrammarBuilder::new();

  let plus = b.declare_token("plus", Regex::Literal("+".into()), TokenRole::Terminal, TokenAttributes::default());
  let caret = b.declare_token("caret", Regex::Literal("^".into()), TokenRole::Terminal, TokenAttributes::default());
  let number = b.declare_token(
    "number",
    Regex::Chars(CharSet::from_ranges([CharRange { lo: '0', hi: '9' }])).plus(),
    TokenRole::Terminal,
    TokenAttributes::default(),
  );

  // `^` sits at a higher precedence level than `+` and is right-associative,
  // so it binds tighter and groups rightward (§8 scenario 5).
  let mut scope = OperatorScope::new();
  scope.push_level(Associativity::Left, [plus]);
  scope.push_level(Associativity::Right, [caret]);
  b.set_operator_scope(scope);

  let e = b.declare_nonterm("E").unwrap();
  b.set_start(e);
  b.define_productions(
    e,
    vec![
      ProductionSpec {
        members: vec![SymbolHandle::NonTerm(e), SymbolHandle::Token(plus), SymbolHandle::NonTerm(e)],
        precedence_token: Some(plus),
      },
      ProductionSpec {
        members: vec![SymbolHandle::NonTerm(e), SymbolHandle::Token(caret), SymbolHandle::NonTerm(e)],
        precedence_token: Some(caret),
      },
      ProductionSpec { members: vec![SymbolHandle::Token(number)], precedence_token: None },
    ],
  )
  .unwrap();

  compile(b)
}

#[test]
fn caret_is_right_associative_and_binds_tighter_than_plus() {
  let blob = build();
  // 2^3^2 must be 2^(3^2) = 2^9 = 512, not (2^3)^2 = 64.
  assert_eq!(parse_ok(&blob, "2^3^2", &Eval), 512.0);
}

#[test]
fn caret_binds_tighter_than_addition() {
  let blob = build();
  // 1+2^3 must be 1+(2^3) = 9, not (1+2)^3 = 27.
  assert_eq!(parse_ok(&blob, "1+2^3", &Eval), 9.0);
}
