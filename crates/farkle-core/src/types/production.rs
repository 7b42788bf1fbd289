use super::handles::{NonTermId, ProductionId, SymbolHandle};
use crate::proxy::{Array, IString};

/// A nonterminal: a name plus the contiguous run of productions that define
/// it. Productions belonging to a nonterminal are always laid out
/// back-to-back in the production table, so membership is a `(first, count)`
/// pair rather than a list of handles.
#[derive(Clone, Debug)]
pub struct NonTerm {
  pub name: IString,
  pub special_name: Option<IString>,
  pub first_production: ProductionId,
  pub production_count: u32,
  /// Set once productions have been committed; a second attempt to define
  /// productions for this nonterminal is a builder error (§3 Lifecycle).
  pub(crate) frozen: bool,
}

impl NonTerm {
  pub fn productions(&self) -> std::ops::Range<usize> {
    let start = self.first_production.index();
    start..start + self.production_count as usize
  }
}

/// An ordered list of members, each a handle to a token symbol or
/// nonterminal.
#[derive(Clone, Debug)]
pub struct Production {
  pub head: NonTermId,
  pub members: Array<SymbolHandle>,
  /// The token whose precedence/associativity governs conflicts against this
  /// production, per §4.2. `None` means "use the rightmost terminal member".
  pub precedence_token: Option<super::handles::TokenSymbolId>,
}

impl Production {
  pub fn rightmost_terminal(&self) -> Option<super::handles::TokenSymbolId> {
    self.members.iter().rev().find_map(|m| match m {
      SymbolHandle::Token(t) => Some(*t),
      SymbolHandle::NonTerm(_) => None,
    })
  }

  /// The token whose operator-scope entry resolves conflicts for reductions
  /// of this production, per §4.2: the explicit precedence token if set,
  /// otherwise the rightmost terminal.
  pub fn precedence_symbol(&self) -> Option<super::handles::TokenSymbolId> {
    self.precedence_token.or_else(|| self.rightmost_terminal())
  }

  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }
}
