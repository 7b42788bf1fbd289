//! Parses a textual regex pattern into the [super::Regex] algebraic form.
//!
//! This is the resolution step for [super::Regex::Pattern] placeholders
//! (§3: "a lazy string-regex placeholder that parses into one of the above
//! forms at build time"). The grammar supports the common subset used by
//! tokenizer patterns: literals, `.`, character classes `[...]`/`[^...]`,
//! grouping, alternation `|`, and the quantifiers `*`, `+`, `?`, `{m,n}`.
//! Unicode-category classes (`\p{...}`) are intentionally unsupported per
//! the spec's Non-goals.

use super::{CharRange, CharSet, Regex};

#[derive(Clone, Copy)]
struct Cursor<'a> {
  src: &'a str,
  bytes: &'a [u8],
  pos: usize,
}

pub fn parse_pattern(pattern: &str) -> Result<Regex, String> {
  let mut c = Cursor { src: pattern, bytes: pattern.as_bytes(), pos: 0 };
  let node = parse_alternation(&mut c)?;
  if !c.at_end() {
    return Err(format!("unexpected trailing input at offset {} in pattern `{}`", c.pos, pattern));
  }
  Ok(node)
}

impl<'a> Cursor<'a> {
  fn at_end(&self) -> bool {
    self.pos >= self.bytes.len()
  }

  fn peek(&self) -> Option<char> {
    self.src[self.pos..].chars().next()
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += c.len_utf8();
    Some(c)
  }

  fn eat(&mut self, expect: char) -> bool {
    if self.peek() == Some(expect) {
      self.pos += expect.len_utf8();
      true
    } else {
      false
    }
  }
}

fn parse_alternation(c: &mut Cursor) -> Result<Regex, String> {
  let mut branches = vec![parse_concat(c)?];
  while c.eat('|') {
    branches.push(parse_concat(c)?);
  }
  Ok(if branches.len() == 1 { branches.pop().unwrap() } else { Regex::Alt(branches) })
}

fn parse_concat(c: &mut Cursor) -> Result<Regex, String> {
  let mut parts = Vec::new();
  while !c.at_end() && c.peek() != Some('|') && c.peek() != Some(')') {
    parts.push(parse_quantified(c)?);
  }
  Ok(match parts.len() {
    0 => Regex::Concat(Vec::new()),
    1 => parts.pop().unwrap(),
    _ => Regex::Concat(parts),
  })
}

fn parse_quantified(c: &mut Cursor) -> Result<Regex, String> {
  let atom = parse_atom(c)?;
  Ok(match c.peek() {
    Some('*') => {
      c.bump();
      atom.star()
    }
    Some('+') => {
      c.bump();
      atom.plus()
    }
    Some('?') => {
      c.bump();
      atom.optional()
    }
    Some('{') => {
      let save = c.pos;
      match parse_counted(c) {
        Some((min, max)) => atom.repeated(min, max),
        None => {
          c.pos = save;
          atom
        }
      }
    }
    _ => atom,
  })
}

/// Parses a `{m,n}`, `{m,}`, or `{m}` quantifier tail. Returns `None` (and
/// leaves the cursor where the caller can roll it back) if what follows `{`
/// doesn't look like a counted loop, so callers can decide whether `{` was
/// meant literally.
fn parse_counted(c: &mut Cursor) -> Option<(u32, Option<u32>)> {
  if !c.eat('{') {
    return None;
  }
  let min = parse_number(c)?;
  if c.eat('}') {
    return Some((min, Some(min)));
  }
  if !c.eat(',') {
    return None;
  }
  if c.eat('}') {
    return Some((min, None));
  }
  let max = parse_number(c)?;
  if !c.eat('}') {
    return None;
  }
  Some((min, Some(max)))
}

fn parse_number(c: &mut Cursor) -> Option<u32> {
  let start = c.pos;
  while matches!(c.peek(), Some(d) if d.is_ascii_digit()) {
    c.bump();
  }
  if c.pos == start {
    return None;
  }
  c.src[start..c.pos].parse().ok()
}

fn parse_atom(c: &mut Cursor) -> Result<Regex, String> {
  match c.peek() {
    Some('(') => {
      c.bump();
      let inner = parse_alternation(c)?;
      if !c.eat(')') {
        return Err(format!("unclosed group at offset {}", c.pos));
      }
      Ok(inner)
    }
    Some('.') => {
      c.bump();
      Ok(Regex::Any)
    }
    Some('[') => parse_class(c),
    Some('\\') => {
      c.bump();
      let escaped = c.bump().ok_or_else(|| "dangling escape at end of pattern".to_string())?;
      Ok(Regex::Chars(CharSet::single(unescape(escaped))))
    }
    Some(lit) => {
      c.bump();
      Ok(Regex::Chars(CharSet::single(lit)))
    }
    None => Err("unexpected end of pattern".to_string()),
  }
}

fn unescape(c: char) -> char {
  match c {
    'n' => '\n',
    't' => '\t',
    'r' => '\r',
    '0' => '\0',
    other => other,
  }
}

fn parse_class(c: &mut Cursor) -> Result<Regex, String> {
  c.bump(); // consume '['
  let invert = c.eat('^');
  let mut ranges = Vec::new();
  let mut first = true;
  loop {
    match c.peek() {
      None => return Err("unclosed character class".to_string()),
      Some(']') if !first => {
        c.bump();
        break;
      }
      _ => {
        first = false;
        let lo = parse_class_char(c)?;
        if c.peek() == Some('-') {
          let save = c.pos;
          c.bump();
          if c.peek() == Some(']') {
            // Trailing literal `-`, e.g. `[a-]`.
            c.pos = save;
            ranges.push(CharRange::single(lo));
          } else {
            let hi = parse_class_char(c)?;
            ranges.push(CharRange { lo, hi });
          }
        } else {
          ranges.push(CharRange::single(lo));
        }
      }
    }
  }
  Ok(Regex::Chars(CharSet { ranges, invert }))
}

fn parse_class_char(c: &mut Cursor) -> Result<char, String> {
  match c.bump() {
    Some('\\') => c.bump().map(unescape).ok_or_else(|| "dangling escape in character class".to_string()),
    Some(ch) => Ok(ch),
    None => Err("unexpected end of character class".to_string()),
  }
}
