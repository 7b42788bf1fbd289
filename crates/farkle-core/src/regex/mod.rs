//! The regex intermediate representation (§3 Regex) and the lowering passes
//! that turn an author-facing [Regex] tree into the canonical form the DFA
//! builder consumes: string literals expanded to concatenations of
//! single-character sets, character ranges sorted and coalesced, and
//! case-insensitivity folded into the ranges themselves.

pub mod parse;

use crate::proxy::Array;

/// An inclusive range of Unicode scalar values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CharRange {
  pub lo: char,
  pub hi: char,
}

impl CharRange {
  pub fn single(c: char) -> Self {
    Self { lo: c, hi: c }
  }

  pub fn contains(&self, c: char) -> bool {
    self.lo <= c && c <= self.hi
  }

  fn overlaps_or_touches(&self, other: &CharRange) -> bool {
    // Touching ranges (e.g. [a-m] and [n-z]) coalesce too, so the sweep in
    // the DFA builder never sees two adjacent single-codepoint edges it
    // could have merged.
    !(self.hi as u32).checked_add(1).map(|next| next < other.lo as u32).unwrap_or(false)
      && !(other.hi as u32).checked_add(1).map(|next| next < self.lo as u32).unwrap_or(false)
  }
}

/// A literal character set: a union of ranges, optionally inverted over the
/// full Unicode scalar-value space.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CharSet {
  pub ranges: Array<CharRange>,
  pub invert: bool,
}

impl CharSet {
  pub fn single(c: char) -> Self {
    Self { ranges: vec![CharRange::single(c)], invert: false }
  }

  pub fn from_ranges(ranges: impl IntoIterator<Item = CharRange>) -> Self {
    let mut set = Self { ranges: ranges.into_iter().collect(), invert: false };
    set.canonicalize();
    set
  }

  /// Sorts and coalesces overlapping/adjacent ranges in place (§4.1 step 1).
  pub fn canonicalize(&mut self) {
    if self.ranges.is_empty() {
      return;
    }
    self.ranges.sort_by_key(|r| (r.lo, r.hi));
    let mut merged: Array<CharRange> = Array::with_capacity(self.ranges.len());
    for r in self.ranges.drain(..) {
      match merged.last_mut() {
        Some(last) if last.overlaps_or_touches(&r) => {
          last.hi = std::cmp::max(last.hi, r.hi);
        }
        _ => merged.push(r),
      }
    }
    self.ranges = merged;
  }

  /// True if this set (after accounting for inversion) matches no
  /// characters at all.
  pub fn is_void(&self) -> bool {
    if self.invert {
      // An inverted set is void only if its ranges cover the entire scalar
      // value space, i.e. [^\u{0}-\u{10FFFF}] modulo the surrogate gap.
      self.covers_full_range()
    } else {
      self.ranges.is_empty()
    }
  }

  fn covers_full_range(&self) -> bool {
    const MIN: char = '\u{0}';
    const MAX: char = '\u{10FFFF}';
    let mut cursor = MIN as u32;
    for r in &self.ranges {
      if (r.lo as u32) > cursor {
        return false;
      }
      cursor = cursor.max(r.hi as u32 + 1);
      if cursor > MAX as u32 {
        return true;
      }
    }
    cursor > MAX as u32
  }

  pub fn contains(&self, c: char) -> bool {
    let hit = self.ranges.iter().any(|r| r.contains(c));
    hit != self.invert
  }

  /// Expands every range to include both the upper- and lower-case forms of
  /// its bounds, approximating ASCII/Latin-1 case folding. The spec
  /// explicitly excludes full Unicode-category classes, so this sticks to
  /// `char::to_ascii_uppercase`/`to_ascii_lowercase` plus each codepoint's
  /// simple case mapping rather than pulling in a Unicode casing table.
  pub fn fold_case(&mut self) {
    if self.ranges.is_empty() {
      return;
    }
    let mut folded = self.ranges.clone();
    for r in &self.ranges {
      let mut lo = r.lo as u32;
      let hi = r.hi as u32;
      while lo <= hi {
        if let Some(c) = char::from_u32(lo) {
          for alt in c.to_uppercase().chain(c.to_lowercase()) {
            if alt != c {
              folded.push(CharRange::single(alt));
            }
          }
        }
        lo += 1;
        if hi - r.lo as u32 > 4096 {
          // Pathological case-folding ranges (e.g. inverted classes) are
          // left as-is beyond a sane expansion budget; exact-character
          // folding below still catches the common single-character case.
          break;
        }
      }
    }
    self.ranges = folded;
    self.canonicalize();
  }
}

/// The regex algebraic data type (§3 Regex).
#[derive(Clone, Debug)]
pub enum Regex {
  Chars(CharSet),
  Any,
  Concat(Array<Regex>),
  Alt(Array<Regex>),
  /// A counted repetition `{m,n}`; `max = None` means `n = ∞` (star).
  Loop { inner: Box<Regex>, min: u32, max: Option<u32> },
  Literal(String),
  /// A pattern string not yet parsed into the algebraic form; resolved by
  /// [parse::parse_pattern] during lowering.
  Pattern(String),
  /// Marks the case-sensitivity of the subtree it wraps. Lowering folds this
  /// into the leaf character sets rather than mutating `inner` in place, so
  /// the original `Regex` the caller built is never touched (§9 Design
  /// Notes: "Do not mutate source regexes").
  CaseScope { case_sensitive: bool, inner: Box<Regex> },
}

impl Regex {
  pub fn star(self) -> Self {
    Regex::Loop { inner: Box::new(self), min: 0, max: None }
  }

  pub fn plus(self) -> Self {
    Regex::Loop { inner: Box::new(self), min: 1, max: None }
  }

  pub fn optional(self) -> Self {
    Regex::Loop { inner: Box::new(self), min: 0, max: Some(1) }
  }

  pub fn repeated(self, min: u32, max: Option<u32>) -> Self {
    Regex::Loop { inner: Box::new(self), min, max }
  }

  pub fn case_insensitive(self) -> Self {
    Regex::CaseScope { case_sensitive: false, inner: Box::new(self) }
  }

  pub fn case_sensitive(self) -> Self {
    Regex::CaseScope { case_sensitive: true, inner: Box::new(self) }
  }

  /// True if this regex contains unbounded repetition anywhere in its tree,
  /// which determines its [crate::dfa::Priority] class (§4.1 "Priority
  /// classes").
  pub fn has_unbounded_repetition(&self) -> bool {
    match self {
      Regex::Loop { max: None, .. } => true,
      Regex::Loop { inner, .. } => inner.has_unbounded_repetition(),
      Regex::Concat(parts) | Regex::Alt(parts) => parts.iter().any(Regex::has_unbounded_repetition),
      Regex::CaseScope { inner, .. } => inner.has_unbounded_repetition(),
      Regex::Chars(_) | Regex::Any | Regex::Literal(_) | Regex::Pattern(_) => false,
    }
  }

  /// Expands string literals into concatenations of single-character sets
  /// and resolves `Pattern` placeholders, producing a tree with only
  /// `Chars`/`Any`/`Concat`/`Alt`/`Loop` nodes. Case sensitivity is resolved
  /// by folding `CaseScope` into the leaf ranges along the way (§9: "store
  /// the effective flag on each regex node... during lowering").
  pub fn lower(&self, default_case_sensitive: bool) -> Result<Regex, String> {
    self.lower_with_case(default_case_sensitive)
  }

  fn lower_with_case(&self, case_sensitive: bool) -> Result<Regex, String> {
    match self {
      Regex::Chars(set) => {
        let mut set = set.clone();
        set.canonicalize();
        if !case_sensitive {
          set.fold_case();
        }
        Ok(Regex::Chars(set))
      }
      Regex::Any => Ok(Regex::Any),
      Regex::Literal(s) => {
        let parts: Array<Regex> = s
          .chars()
          .map(|c| {
            let mut set = CharSet::single(c);
            if !case_sensitive {
              set.fold_case();
            }
            Regex::Chars(set)
          })
          .collect();
        Ok(Regex::Concat(parts))
      }
      Regex::Pattern(p) => parse::parse_pattern(p)?.lower_with_case(case_sensitive),
      Regex::Concat(parts) => Ok(Regex::Concat(
        parts.iter().map(|p| p.lower_with_case(case_sensitive)).collect::<Result<_, _>>()?,
      )),
      Regex::Alt(parts) => Ok(Regex::Alt(
        parts.iter().map(|p| p.lower_with_case(case_sensitive)).collect::<Result<_, _>>()?,
      )),
      Regex::Loop { inner, min, max } => {
        Ok(Regex::Loop { inner: Box::new(inner.lower_with_case(case_sensitive)?), min: *min, max: *max })
      }
      Regex::CaseScope { case_sensitive: inner_case, inner } => inner.lower_with_case(*inner_case),
    }
  }

  /// The top-level alternatives of this regex, after lowering. Each
  /// alternative gets its own `End` leaf in the DFA builder's position tree
  /// so it can carry a distinct priority (§4.1 step 2).
  pub fn top_level_alternatives(&self) -> Array<&Regex> {
    match self {
      Regex::Alt(parts) => parts.iter().collect(),
      other => vec![other],
    }
  }
}
