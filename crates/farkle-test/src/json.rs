//! A JSON value grammar: objects, arrays, strings, numbers, and the three
//! literal keywords, built without recursive-descent helpers — every
//! nonterminal is LALR(1) on its own.

use farkle::{
  CharRange, CharSet, DriveOutcome, GrammarBuilder, Parser, Position, ProductionSpec, Regex, SemanticProvider,
  SymbolHandle, TokenAttributes, TokenRole, TokenSymbolId,
};

use crate::utils::{compile, parse_err, parse_ok};

/// A parsed JSON value. `Pairs`/`Items` are accumulators that only ever
/// appear as intermediate `fuse` results, never as a final parse result.
#[derive(Debug, Clone, PartialEq)]
enum Json {
  Null,
  Bool(bool),
  Number(f64),
  String(String),
  Array(Vec<Json>),
  Object(Vec<(String, Json)>),
  Pairs(Vec<(String, Json)>),
  Items(Vec<Json>),
}

struct Build;

impl SemanticProvider<char, Json, String> for Build {
  fn transform(&self, _symbol: TokenSymbolId, _pos: Position, span: &[char]) -> Result<Json, String> {
    let text: String = span.iter().collect();
    Ok(match text.as_str() {
      "true" => Json::Bool(true),
      "false" => Json::Bool(false),
      "null" => Json::Null,
      _ if text.starts_with('"') => Json::String(unescape(&text[1..text.len() - 1])),
      _ if text.starts_with(|c: char| c == '-' || c.is_ascii_digit()) => {
        Json::Number(text.parse().map_err(|e| format!("bad number literal {text:?}: {e}"))?)
      }
      // Punctuation (`{`, `}`, `[`, `]`, `:`, `,`): never read back by `fuse`.
      _ => Json::Null,
    })
  }

  fn fuse(&self, production: u32, children: Vec<Json>) -> Result<Json, String> {
    let mut it = children.into_iter();
    let mut next = || it.next().expect("production arity matches its declared member count");
    match production {
      // Value -> Object | Array | string | number | true | false | null
      0..=6 => Ok(next()),
      // Object -> '{' '}'
      7 => Ok(Json::Object(vec![])),
      // Object -> '{' Members '}'
      8 => {
        next(); // '{'
        match next() {
          Json::Pairs(p) => Ok(Json::Object(p)),
          _ => Err("expected a member list".into()),
        }
      }
      // Members -> Pair
      9 => Ok(next()),
      // Members -> Members ',' Pair
      10 => {
        let mut pairs = match next() {
          Json::Pairs(p) => p,
          _ => return Err("expected a member list".into()),
        };
        next(); // ','
        match next() {
          Json::Pairs(more) => {
            pairs.extend(more);
            Ok(Json::Pairs(pairs))
          }
          _ => Err("expected a single pair".into()),
        }
      }
      // Pair -> string ':' Value
      11 => {
        let key = match next() {
          Json::String(s) => s,
          _ => return Err("object key must be a string".into()),
        };
        next(); // ':'
        Ok(Json::Pairs(vec![(key, next())]))
      }
      // Array -> '[' ']'
      12 => Ok(Json::Array(vec![])),
      // Array -> '[' Elements ']'
      13 => {
        next(); // '['
        match next() {
          Json::Items(v) => Ok(Json::Array(v)),
          _ => Err("expected an element list".into()),
        }
      }
      // Elements -> Value
      14 => Ok(Json::Items(vec![next()])),
      // Elements -> Elements ',' Value
      15 => {
        let mut items = match next() {
          Json::Items(v) => v,
          _ => return Err("expected an element list".into()),
        };
        next(); // ','
        items.push(next());
        Ok(Json::Items(items))
      }
      other => Err(format!("unhandled production {other}")),
    }
  }
}

fn unescape(body: &str) -> String {
  let mut out = String::with_capacity(body.len());
  let mut chars = body.chars();
  while let Some(c) = chars.next() {
    if c == '\\' {
      match chars.next() {
        Some('n') => out.push('\n'),
        Some('t') => out.push('\t'),
        Some(other) => out.push(other),
        None => {}
      }
    } else {
      out.push(c);
    }
  }
  out
}

fn build() -> std::sync::Arc<farkle::GrammarBlob> {
  let mut b = GrammarBuilder::new();

  let digit = CharRange { lo: '0', hi: '9' };
  let lbrace = b.declare_token("lbrace", Regex::Literal("{".into()), TokenRole::Terminal, TokenAttributes::default());
  let rbrace = b.declare_token("rbrace", Regex::Literal("}".into()), TokenRole::Terminal, TokenAttributes::default());
  let lbracket = b.declare_token("lbracket", Regex::Literal("[".into()), TokenRole::Terminal, TokenAttributes::default());
  let rbracket = b.declare_token("rbracket", Regex::Literal("]".into()), TokenRole::Terminal, TokenAttributes::default());
  let colon = b.declare_token("colon", Regex::Literal(":".into()), TokenRole::Terminal, TokenAttributes::default());
  let comma = b.declare_token("comma", Regex::Literal(",".into()), TokenRole::Terminal, TokenAttributes::default());
  let true_lit = b.declare_token("true_lit", Regex::Literal("true".into()), TokenRole::Terminal, TokenAttributes::default());
  let false_lit = b.declare_token("false_lit", Regex::Literal("false".into()), TokenRole::Terminal, TokenAttributes::default());
  let null_lit = b.declare_token("null_lit", Regex::Literal("null".into()), TokenRole::Terminal, TokenAttributes::default());

  // A JSON string: a quote, any run of non-quote/non-backslash characters
  // or backslash escapes, then a closing quote.
  let normal_char = Regex::Chars(CharSet { ranges: vec![CharRange::single('"'), CharRange::single('\\')], invert: true });
  let escape = Regex::Concat(vec![Regex::Chars(CharSet::single('\\')), Regex::Any]);
  let string_body = Regex::Alt(vec![normal_char, escape]).star();
  let string = b.declare_token(
    "string",
    Regex::Concat(vec![Regex::Chars(CharSet::single('"')), string_body, Regex::Chars(CharSet::single('"'))]),
    TokenRole::Terminal,
    TokenAttributes::default(),
  );

  let number = b.declare_token(
    "number",
    Regex::Concat(vec![
      Regex::Chars(CharSet::single('-')).optional(),
      Regex::Chars(CharSet::from_ranges([digit])).plus(),
      Regex::Concat(vec![Regex::Chars(CharSet::single('.')), Regex::Chars(CharSet::from_ranges([digit])).plus()]).optional(),
    ]),
    TokenRole::Terminal,
    TokenAttributes::default(),
  );

  b.declare_token(
    "space",
    Regex::Chars(CharSet::from_ranges([CharRange { lo: ' ', hi: ' ' }, CharRange { lo: '\t', hi: '\n' }])).plus(),
    TokenRole::Terminal,
    TokenAttributes { noise: true, ..TokenAttributes::default() },
  );

  let value = b.declare_nonterm("Value").unwrap();
  let object = b.declare_nonterm("Object").unwrap();
  let members = b.declare_nonterm("Members").unwrap();
  let pair = b.declare_nonterm("Pair").unwrap();
  let array = b.declare_nonterm("Array").unwrap();
  let elements = b.declare_nonterm("Elements").unwrap();
  b.set_start(value);

  let spec = |members: Vec<SymbolHandle>| ProductionSpec { members, precedence_token: None };

  b.define_productions(
    value,
    vec![
      spec(vec![SymbolHandle::NonTerm(object)]),
      spec(vec![SymbolHandle::NonTerm(array)]),
      spec(vec![SymbolHandle::Token(string)]),
      spec(vec![SymbolHandle::Token(number)]),
      spec(vec![SymbolHandle::Token(true_lit)]),
      spec(vec![SymbolHandle::Token(false_lit)]),
      spec(vec![SymbolHandle::Token(null_lit)]),
    ],
  )
  .unwrap();

  b.define_productions(
    object,
    vec![
      spec(vec![SymbolHandle::Token(lbrace), SymbolHandle::Token(rbrace)]),
      spec(vec![SymbolHandle::Token(lbrace), SymbolHandle::NonTerm(members), SymbolHandle::Token(rbrace)]),
    ],
  )
  .unwrap();

  b.define_productions(
    members,
    vec![
      spec(vec![SymbolHandle::NonTerm(pair)]),
      spec(vec![SymbolHandle::NonTerm(members), SymbolHandle::Token(comma), SymbolHandle::NonTerm(pair)]),
    ],
  )
  .unwrap();

  b.define_productions(
    pair,
    vec![spec(vec![SymbolHandle::Token(string), SymbolHandle::Token(colon), SymbolHandle::NonTerm(value)])],
  )
  .unwrap();

  b.define_productions(
    array,
    vec![
      spec(vec![SymbolHandle::Token(lbracket), SymbolHandle::Token(rbracket)]),
      spec(vec![SymbolHandle::Token(lbracket), SymbolHandle::NonTerm(elements), SymbolHandle::Token(rbracket)]),
    ],
  )
  .unwrap();

  b.define_productions(
    elements,
    vec![
      spec(vec![SymbolHandle::NonTerm(value)]),
      spec(vec![SymbolHandle::NonTerm(elements), SymbolHandle::Token(comma), SymbolHandle::NonTerm(value)]),
    ],
  )
  .unwrap();

  compile(b)
}

#[test]
fn parses_nested_object_with_array_and_literals() {
  let blob = build();
  let result = parse_ok(&blob, r#"{"a": 1, "b": [true, false, null], "c": {"d": "x"}}"#, &Build);
  assert_eq!(
    result,
    Json::Object(vec![
      ("a".into(), Json::Number(1.0)),
      ("b".into(), Json::Array(vec![Json::Bool(true), Json::Bool(false), Json::Null])),
      ("c".into(), Json::Object(vec![("d".into(), Json::String("x".into()))])),
    ])
  );
}

#[test]
fn parses_empty_object_and_array() {
  let blob = build();
  assert_eq!(parse_ok(&blob, "{}", &Build), Json::Object(vec![]));
  assert_eq!(parse_ok(&blob, "[]", &Build), Json::Array(vec![]));
}

#[test]
fn string_escapes_are_decoded() {
  let blob = build();
  assert_eq!(parse_ok(&blob, r#""a\nb""#, &Build), Json::String("a\nb".into()));
}

#[test]
fn negative_and_fractional_numbers() {
  let blob = build();
  assert_eq!(parse_ok(&blob, "-3.5", &Build), Json::Number(-3.5));
}

#[test]
fn partial_keyword_on_final_block_is_an_error() {
  let blob = build();
  // "tru" never completes the "true" literal, so on a final block there is
  // no token to offer the parser and the driver reports unexpected-eof.
  match parse_err(&blob, "tru", &Build) {
    farkle::RuntimeError::UnexpectedEof { .. } => {}
    other => panic!("expected an error for a truncated keyword, got {other:?}"),
  }
}

#[test]
fn partial_keyword_before_final_block_asks_for_more_input() {
  let blob = build();
  let parser = Parser::new(blob);
  let mut stream = parser.begin_streaming(None);
  let chars: Vec<char> = "tru".chars().collect();
  let span = stream.get_buffer(chars.len());
  span[..chars.len()].copy_from_slice(&chars);
  stream.advance(chars.len());

  match stream.resume(&Build) {
    DriveOutcome::NeedMoreInput => {}
    _ => panic!("expected NeedMoreInput while the keyword could still complete"),
  }

  stream.complete_input();
  match stream.resume(&Build) {
    DriveOutcome::Error(farkle::RuntimeError::UnexpectedEof { .. }) => {}
    _ => panic!("expected an unexpected-eof error once input is marked final"),
  }
}
