//! The LALR driver (§4.3.4): walks the table-driven parser over tokens
//! pulled from a [Tokenizer], maintaining a stack of `(state, value)` pairs.

use farkle_core::blob::GrammarBlob;
use farkle_core::types::TokenSymbolId;

use crate::error::RuntimeError;
use crate::position::Position;
use crate::semantic::SemanticProvider;
use crate::tokenizer::{TokenOutcome, Tokenizer, TokenizerInput};

/// What happened after driving the parser as far as the available input
/// allows.
pub enum DriveOutcome<V, E> {
  Accepted(V),
  NeedMoreInput,
  Error(RuntimeError<E>),
}

/// A table-driven LALR(1) parser bound to one grammar blob. Immutable and
/// shareable; each parse drives its own stack (§5 "parser objects themselves
/// are immutable and freely shared across threads").
pub struct LalrDriver<'g> {
  blob: &'g GrammarBlob,
}

struct Frame<V> {
  state: u32,
  /// `None` only for the bottom-of-stack frame, which the driver never
  /// reads: no production's right-hand side pops past the initial state.
  value: Option<V>,
}

impl<'g> LalrDriver<'g> {
  pub fn new(blob: &'g GrammarBlob) -> Self {
    Self { blob }
  }

  /// Drives the parser to completion or until more input is required,
  /// pulling tokens from `tokenizer` and applying `sem`'s callbacks.
  pub fn drive<V, E>(
    &self,
    tokenizer: &mut dyn Tokenizer<V, E>,
    input: &mut TokenizerInput<'_>,
    sem: &dyn SemanticProvider<char, V, E>,
  ) -> DriveOutcome<V, E> {
    let header = self.blob.header();
    // `lalr_start` is the raw 1-based LalrStateIndex; state-table rows are
    // addressed by plain 0-based index.
    let mut stack: Vec<Frame<V>> = vec![Frame { state: header.lalr_start - 1, value: None }];

    let mut pending: Option<(TokenSymbolId, Option<V>, Position)> = None;

    loop {
      if pending.is_none() {
        let mut result = None;
        if !tokenizer.try_get_next_token(input, sem, &mut result) {
          return DriveOutcome::NeedMoreInput;
        }
        match result {
          Some(Ok(TokenOutcome::Token { is_noise: true, .. })) => continue,
          Some(Ok(TokenOutcome::Token { symbol, value, start, .. })) => {
            pending = Some((symbol, Some(value), start));
          }
          Some(Ok(TokenOutcome::EndOfInput { position })) => {
            pending = Some((TokenSymbolId::NIL, None, position));
          }
          Some(Err(e)) => return DriveOutcome::Error(e),
          None => unreachable!("tokenizer returned true without a result"),
        }
      }

      let (symbol, _, position) = pending.as_ref().map(|(s, _, p)| (*s, (), *p)).unwrap();
      let state = stack.last().unwrap().state;
      let lalr_state = self.blob.lalr_state(state);

      let action = lalr_state.actions.iter().find(|(la_kind, la_token, ..)| {
        if symbol.is_nil() {
          *la_kind == 1
        } else {
          *la_kind == 0 && *la_token == symbol.0
        }
      });

      match action {
        None => {
          let expected: Vec<TokenSymbolId> = lalr_state
            .actions
            .iter()
            .filter(|(la_kind, ..)| *la_kind == 0)
            .map(|(_, la_token, ..)| TokenSymbolId(*la_token))
            .collect();
          if symbol.is_nil() {
            return DriveOutcome::Error(RuntimeError::UnexpectedEof { position });
          }
          return DriveOutcome::Error(RuntimeError::UnexpectedToken { position, symbol, expected });
        }
        Some((_, _, action_kind, value)) => match *action_kind {
          0 => {
            // Shift.
            let (_, token_value, _) = pending.take().unwrap();
            stack.push(Frame { state: *value, value: Some(token_value.expect("shift action requires a token value")) });
          }
          1 => {
            // Reduce by production `value`.
            let production = self.blob.production(*value);
            let n = production.member_count as usize;
            let mut children = Vec::with_capacity(n);
            for _ in 0..n {
              let frame = stack.pop().expect("reduce popped past the bottom of the stack");
              children.push(frame.value.expect("reduce popped a value-less frame"));
            }
            children.reverse();
            match sem.fuse(*value, children) {
              Ok(produced) => {
                let on_top = stack.last().unwrap().state;
                let goto_state = self.goto(on_top, production.head);
                stack.push(Frame { state: goto_state, value: Some(produced) });
              }
              Err(e) => {
                return DriveOutcome::Error(RuntimeError::User(crate::error::ParserApplicationError::at(position, e)));
              }
            }
          }
          2 => {
            // Accept: the sole remaining value (above the bottom sentinel)
            // is the parse result.
            let top = stack.pop().expect("accept with an empty stack").value.expect("accepted value must exist");
            return DriveOutcome::Accepted(top);
          }
          _ => unreachable!("unknown LALR action kind"),
        },
      }
    }
  }

  fn goto(&self, state: u32, head: u32) -> u32 {
    let lalr_state = self.blob.lalr_state(state);
    lalr_state
      .gotos
      .iter()
      .find(|(n, _)| *n == head)
      .map(|(_, target)| *target)
      .expect("goto must exist by grammar invariants")
  }
}
