//! The grammar data model: symbols, productions, groups, and the handles
//! that tie them together. See §3 of the spec for the full invariant list.

mod grammar;
mod handles;
mod production;
mod symbol;

pub use grammar::{
  Associativity, GrammarBuilder, GrammarDef, OperatorScope, PrecedenceLevel, ProductionSpec, SpecialNameTarget,
  TokenSpec,
};
pub use handles::*;
pub use production::{NonTerm, Production};
pub use symbol::{Group, TokenAttributes, TokenRole, TokenSymbol};
