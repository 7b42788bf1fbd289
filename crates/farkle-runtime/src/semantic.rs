//! Semantic provider traits (§4.3.5): the two user-supplied callbacks the
//! LALR driver invokes to turn matched characters and completed productions
//! into values of the caller's choosing.

use farkle_core::types::TokenSymbolId;

use crate::position::Position;

/// Produces values from the parse. `transform` is called once per matched
/// terminal (in left-to-right order), `fuse` once per reduction, consuming
/// the values its production's members produced, also left-to-right.
pub trait SemanticProvider<TChar, V, E> {
  fn transform(&self, symbol: TokenSymbolId, position: Position, span: &[TChar]) -> Result<V, E>;
  fn fuse(&self, production: u32, children: Vec<V>) -> Result<V, E>;
}

/// A value-less provider that only checks the grammar accepts the input:
/// every callback succeeds and produces `()`.
pub struct SyntaxCheckProvider;

impl<TChar> SemanticProvider<TChar, (), std::convert::Infallible> for SyntaxCheckProvider {
  fn transform(&self, _symbol: TokenSymbolId, _position: Position, _span: &[TChar]) -> Result<(), std::convert::Infallible> {
    Ok(())
  }

  fn fuse(&self, _production: u32, _children: Vec<()>) -> Result<(), std::convert::Infallible> {
    Ok(())
  }
}
