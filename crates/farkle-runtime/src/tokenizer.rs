//! The streaming tokenizer (§4.3.3): a DFA driver with group/noise handling,
//! plus the chained/suspendable composition that lets several component
//! tokenizers share one input stream.

use std::sync::Arc;

use farkle_core::blob::GrammarBlob;
use farkle_core::types::TokenSymbolId;

use crate::buffer::CharBuffer;
use crate::error::{ParserApplicationError, RuntimeError};
use crate::position::{Position, PositionTracker};
use crate::semantic::SemanticProvider;

/// The tokenizer's view of the input: the character buffer plus whether the
/// caller has signaled this is the last block it will ever supply.
pub struct TokenizerInput<'b> {
  buffer: &'b mut CharBuffer,
  tracker: &'b mut PositionTracker,
  pub is_final_block: bool,
}

impl<'b> TokenizerInput<'b> {
  pub fn new(buffer: &'b mut CharBuffer, tracker: &'b mut PositionTracker, is_final_block: bool) -> Self {
    Self { buffer, tracker, is_final_block }
  }

  /// The characters available right now, starting at the current position.
  /// A custom [Tokenizer] sees only what has been buffered so far; an empty
  /// slice with `is_final_block` false means "ask again once more arrives".
  pub fn available(&self) -> &[char] {
    self.buffer.live()
  }

  pub fn position(&self) -> Position {
    self.tracker.position()
  }

  /// Commits `len` characters as consumed: both the buffer window and the
  /// position tracker advance together.
  pub fn commit(&mut self, len: usize) {
    let chars: Vec<char> = self.buffer.live()[..len].to_vec();
    self.tracker.advance(&chars);
    self.buffer.update_from_parser(len, false);
  }
}

/// A decided tokenizer outcome: either a token (possibly noise, for the
/// driver to discard) or a confirmed end of input.
pub enum TokenOutcome<V> {
  Token { symbol: TokenSymbolId, value: V, start: Position, is_noise: bool },
  EndOfInput { position: Position },
}

/// The shared tokenizer capability (§9 "model as a capability trait"). Most
/// callers use [DfaTokenizer] directly; [ChainedTokenizer] composes several
/// behind this trait so the LALR driver doesn't care which it's talking to.
pub trait Tokenizer<V, E> {
  #[allow(clippy::type_complexity)]
  fn try_get_next_token(
    &mut self,
    input: &mut TokenizerInput<'_>,
    sem: &dyn SemanticProvider<char, V, E>,
    result: &mut Option<Result<TokenOutcome<V>, RuntimeError<E>>>,
  ) -> bool;
}

struct GroupFrame {
  end_token: Option<u32>,
  advance_by_character: bool,
  ends_on_end_of_input: bool,
  keep_end_token: bool,
  nested_starts: Vec<u32>,
}

/// Drives the grammar's DFA over the input, handling group (comment/string)
/// regions and emitting noise tokens only when this tokenizer is not the
/// sole component of its chain.
pub struct DfaTokenizer {
  blob: Arc<GrammarBlob>,
  groups: Vec<GroupFrame>,
  solo: bool,
}

impl DfaTokenizer {
  pub fn new(blob: Arc<GrammarBlob>) -> Self {
    Self { blob, groups: Vec::new(), solo: true }
  }

  /// Marks this tokenizer as one component among several in a chain: noise
  /// tokens are surfaced to the caller (for the driver to discard) rather
  /// than silently skipped (§4.3.3 step 1).
  pub fn set_solo(&mut self, solo: bool) {
    self.solo = solo;
  }

  fn group_starts_for(&self, symbol: u32) -> Option<usize> {
    for i in 0..self.blob.group_count() {
      if self.blob.group(i).start == symbol {
        return Some(i as usize);
      }
    }
    None
  }

  fn push_group(&mut self, group_index: usize) {
    let g = self.blob.group(group_index as u32);
    let nested_starts = (g.nesting_start..g.nesting_start + g.nesting_count)
      .map(|n| self.blob.group_nesting(n))
      .map(|nested_group| self.blob.group(nested_group).start)
      .collect();
    self.groups.push(GroupFrame {
      end_token: g.end,
      advance_by_character: g.advance_by_character,
      ends_on_end_of_input: g.ends_on_end_of_input,
      keep_end_token: g.keep_end_token,
      nested_starts,
    });
  }

  /// Runs one step of group-mode consumption: either returns a decided
  /// outcome (entering a nested group, closing the current group, or an
  /// unterminated-group error) or `None` meaning "keep consuming raw
  /// characters as group content and call again".
  fn step_group<E>(&mut self, input: &mut TokenizerInput<'_>) -> Option<Result<GroupStep, RuntimeError<E>>> {
    let chars = input.available();
    if chars.is_empty() {
      if input.is_final_block {
        let frame = self.groups.last().unwrap();
        return if frame.ends_on_end_of_input {
          Some(Ok(GroupStep::ClosedByEndOfInput))
        } else {
          Some(Err(RuntimeError::GroupUnterminated { position: input.position() }))
        };
      }
      return None;
    }

    let scan = scan_dfa(&self.blob, chars, input.is_final_block);
    match scan {
      ScanResult::NeedMore => None,
      ScanResult::Mismatch { .. } => {
        // No recognizable token (end marker or allowed nested start) at
        // this position: consume one raw character as group content and
        // try again next call. `AdvanceByCharacter` groups scan this way
        // by definition; non-character-advancing groups still fall back to
        // it whenever no whole token matches here.
        input.commit(1);
        None
      }
      ScanResult::Accepted { symbol, len } => {
        let frame = self.groups.last().unwrap();
        if Some(symbol) == frame.end_token {
          let keep = frame.keep_end_token;
          if !keep {
            input.commit(len);
          }
          Some(Ok(GroupStep::Closed))
        } else if frame.nested_starts.contains(&symbol) {
          if let Some(group_index) = self.group_starts_for(symbol) {
            input.commit(len);
            self.push_group(group_index);
            Some(Ok(GroupStep::EnteredNested))
          } else {
            input.commit(len);
            None
          }
        } else if frame.advance_by_character {
          // Ordinary content token, but this group scans one character at a
          // time regardless of what the DFA happened to match here: a match
          // that runs past the next character could otherwise swallow an
          // escape sequence together with text that coincidentally forms
          // some unrelated token, hiding an end marker or nested start that
          // starts partway through it.
          input.commit(1);
          None
        } else {
          // Ordinary content token inside the group: swallow it whole.
          input.commit(len);
          None
        }
      }
    }
  }
}

enum GroupStep {
  Closed,
  ClosedByEndOfInput,
  EnteredNested,
}

impl<V, E> Tokenizer<V, E> for DfaTokenizer {
  fn try_get_next_token(
    &mut self,
    input: &mut TokenizerInput<'_>,
    sem: &dyn SemanticProvider<char, V, E>,
    result: &mut Option<Result<TokenOutcome<V>, RuntimeError<E>>>,
  ) -> bool {
    while !self.groups.is_empty() {
      match self.step_group(input) {
        None => {
          if !input.is_final_block && input.available().is_empty() {
            return false;
          }
          continue;
        }
        Some(Ok(GroupStep::Closed | GroupStep::ClosedByEndOfInput)) => {
          self.groups.pop();
        }
        Some(Ok(GroupStep::EnteredNested)) => continue,
        Some(Err(e)) => {
          *result = Some(Err(e));
          return true;
        }
      }
    }

    let start = input.position();
    let chars = input.available();
    if chars.is_empty() && input.is_final_block {
      *result = Some(Ok(TokenOutcome::EndOfInput { position: start }));
      return true;
    }
    match scan_dfa(&self.blob, chars, input.is_final_block) {
      ScanResult::NeedMore => false,
      ScanResult::Mismatch { consumed_before_dead } => {
        let offending = chars.get(consumed_before_dead).copied();
        match offending {
          Some(c) => {
            *result = Some(Err(RuntimeError::Lexical { position: start, character: c }));
          }
          None => {
            *result = Some(Ok(TokenOutcome::EndOfInput { position: start }));
          }
        }
        true
      }
      ScanResult::Accepted { symbol, len } => {
        let view = self.blob.token_symbol(symbol - 1);
        let role = view.role;
        let span = chars[..len].to_vec();
        let symbol_id = TokenSymbolId(symbol);

        if role == 1 {
          // GroupStart: enter group mode instead of surfacing a token.
          if let Some(group_index) = self.group_starts_for(symbol) {
            input.commit(len);
            self.push_group(group_index);
            return self.try_get_next_token(input, sem, result);
          }
        }

        let is_noise = view.attrs & 0x2 != 0;
        if is_noise && self.solo {
          input.commit(len);
          return self.try_get_next_token(input, sem, result);
        }

        match sem.transform(symbol_id, start, &span) {
          Ok(value) => {
            input.commit(len);
            *result = Some(Ok(TokenOutcome::Token { symbol: symbol_id, value, start, is_noise }));
          }
          Err(e) => {
            *result = Some(Err(RuntimeError::User(ParserApplicationError::at(start, e))));
          }
        }
        true
      }
    }
  }
}

enum ScanResult {
  NeedMore,
  Accepted { symbol: u32, len: usize },
  Mismatch { consumed_before_dead: usize },
}

/// Runs the grammar's DFA over `chars` from its start state, tracking the
/// last accepting state seen (longest-match rule, §4.1/§8).
fn scan_dfa(blob: &GrammarBlob, chars: &[char], is_final_block: bool) -> ScanResult {
  let header = blob.header();
  // `dfa_start` is the raw 1-based DfaStateIndex; the state table is
  // addressed by plain 0-based row index.
  let mut state = header.dfa_start - 1;
  let mut last_accept: Option<(u32, usize)> = None;
  if let Some(winner) = blob.dfa_state(state).winner {
    last_accept = Some((winner, 0));
  }
  let mut pos = 0usize;
  loop {
    if pos == chars.len() {
      if !is_final_block {
        return ScanResult::NeedMore;
      }
      break;
    }
    let view = blob.dfa_state(state);
    let c = chars[pos] as u32;
    let next = view.edges.iter().find(|(lo, hi, _)| *lo <= c && c <= *hi).map(|(_, _, t)| *t).unwrap_or(view.default);
    match next {
      None => break,
      Some(target) => {
        state = target;
        pos += 1;
        if let Some(winner) = blob.dfa_state(state).winner {
          last_accept = Some((winner, pos));
        }
      }
    }
  }
  match last_accept {
    Some((symbol, len)) => ScanResult::Accepted { symbol, len },
    None => ScanResult::Mismatch { consumed_before_dead: pos },
  }
}

/// A tokenizer's saved continuation (§9 "Coroutine-like tokenizer
/// suspension"): the component to resume into, invoked before the chain
/// continues its round-robin.
struct SuspensionPoint<V, E> {
  component_index: usize,
  resumed: Box<dyn Tokenizer<V, E>>,
}

/// Drives an ordered list of component tokenizers round-robin, starting
/// after the one that last returned noise/nothing, and honoring at most one
/// live suspension at a time (§4.3.3 "Suspension & chaining").
pub struct ChainedTokenizer<V, E> {
  components: Vec<Box<dyn Tokenizer<V, E>>>,
  next_index: usize,
  suspension: Option<SuspensionPoint<V, E>>,
  /// Set when [Self::suspend] is called while a suspension is already
  /// pending, in builds where the `debug_assert!` didn't already stop
  /// execution. Surfaced as [RuntimeError::NestedSuspension] on the next
  /// call rather than silently discarding the earlier continuation.
  nested_suspension: bool,
}

impl<V, E> ChainedTokenizer<V, E> {
  pub fn new(components: Vec<Box<dyn Tokenizer<V, E>>>) -> Self {
    Self { components, next_index: 0, suspension: None, nested_suspension: false }
  }

  /// Records a suspension for the component currently at `component_index`,
  /// to be resumed with `resumed` before the chain advances further.
  ///
  /// # Panics
  /// Panics in debug builds if a suspension is already pending: nesting
  /// suspensions is a programming error (§9 Open Questions), not a
  /// recoverable run-time condition. In release builds, where the assertion
  /// is compiled out, the next [Tokenizer::try_get_next_token] call reports
  /// [RuntimeError::NestedSuspension] instead of silently discarding the
  /// continuation that was already pending.
  pub fn suspend(&mut self, component_index: usize, resumed: Box<dyn Tokenizer<V, E>>) {
    debug_assert!(self.suspension.is_none(), "tokenizer suspension must not nest");
    if self.suspension.is_some() {
      self.nested_suspension = true;
    }
    self.suspension = Some(SuspensionPoint { component_index, resumed });
  }
}

impl<V, E> Tokenizer<V, E> for ChainedTokenizer<V, E> {
  fn try_get_next_token(
    &mut self,
    input: &mut TokenizerInput<'_>,
    sem: &dyn SemanticProvider<char, V, E>,
    result: &mut Option<Result<TokenOutcome<V>, RuntimeError<E>>>,
  ) -> bool {
    if self.nested_suspension {
      self.nested_suspension = false;
      *result = Some(Err(RuntimeError::NestedSuspension));
      return true;
    }
    if self.components.is_empty() {
      *result = Some(Ok(TokenOutcome::EndOfInput { position: input.position() }));
      return true;
    }

    if let Some(mut point) = self.suspension.take() {
      let done = point.resumed.try_get_next_token(input, sem, result);
      if !done {
        self.suspension = Some(point);
        return false;
      }
      let reset_to_zero = matches!(result, Some(Ok(TokenOutcome::Token { is_noise: false, .. })));
      self.next_index = if reset_to_zero { 0 } else { point.component_index };
      return true;
    }

    let count = self.components.len();
    for step in 0..count {
      let i = (self.next_index + step) % count;
      let done = self.components[i].try_get_next_token(input, sem, result);
      if !done {
        if input.is_final_block {
          continue;
        }
        return false;
      }
      match result {
        Some(Ok(TokenOutcome::Token { is_noise: false, .. })) => {
          self.next_index = 0;
          return true;
        }
        Some(Ok(TokenOutcome::Token { is_noise: true, .. })) => {
          self.next_index = (i + 1) % count;
          return true;
        }
        Some(Ok(TokenOutcome::EndOfInput { .. })) => {
          continue;
        }
        Some(Err(_)) => return true,
        None => continue,
      }
    }

    // Full rotation with no component producing a real token or signaling
    // it needs more input: confirmed end of input (§8 "chained tokenizer
    // fairness: the chain returns false after at most one full rotation").
    *result = Some(Ok(TokenOutcome::EndOfInput { position: input.position() }));
    true
  }
}
