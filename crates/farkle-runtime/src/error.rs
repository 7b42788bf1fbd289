//! Run-time error taxonomy (§7 "Run-time taxonomy", §6 "Error object model"):
//! every error carries a position and a message naming what went wrong.

use std::fmt;

use farkle_core::types::TokenSymbolId;

use crate::position::Position;

/// An error raised by a user-supplied semantic callback, converted into a
/// structured error with position auto-attached unless the callback already
/// attached one of its own (§7 "Propagation policy").
#[derive(Debug, Clone)]
pub struct ParserApplicationError<E> {
  pub position: Option<Position>,
  pub payload: E,
}

impl<E> ParserApplicationError<E> {
  pub fn new(payload: E) -> Self {
    Self { position: None, payload }
  }

  pub fn at(position: Position, payload: E) -> Self {
    Self { position: Some(position), payload }
  }
}

/// Every run-time error, generic over the user-supplied application error
/// type `E` produced by semantic callbacks.
#[derive(Debug, Clone)]
pub enum RuntimeError<E> {
  Lexical { position: Position, character: char },
  UnexpectedEof { position: Position },
  UnexpectedToken { position: Position, symbol: TokenSymbolId, expected: Vec<TokenSymbolId> },
  GroupUnterminated { position: Position },
  NestedSuspension,
  User(ParserApplicationError<E>),
}

impl<E: fmt::Display> fmt::Display for RuntimeError<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RuntimeError::Lexical { position, character } => {
        write!(f, "{}:{}: lexical error at character {:?}", position.line, position.column, character)
      }
      RuntimeError::UnexpectedEof { position } => {
        write!(f, "{}:{}: unexpected end of input", position.line, position.column)
      }
      RuntimeError::UnexpectedToken { position, symbol, expected } => {
        write!(
          f,
          "{}:{}: unexpected token {} (expected one of {} tokens)",
          position.line,
          position.column,
          symbol.index(),
          expected.len()
        )
      }
      RuntimeError::GroupUnterminated { position } => {
        write!(f, "{}:{}: unterminated group", position.line, position.column)
      }
      RuntimeError::NestedSuspension => {
        write!(f, "a tokenizer suspended while another suspension was already pending")
      }
      RuntimeError::User(e) => match e.position {
        Some(p) => write!(f, "{}:{}: {}", p.line, p.column, e.payload),
        None => write!(f, "{}", e.payload),
      },
    }
  }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RuntimeError<E> {}
