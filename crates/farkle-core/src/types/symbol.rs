use super::handles::{GroupId, TokenSymbolId};
use crate::proxy::IString;

/// The mutually-exclusive role a token symbol plays in the tokenizer. Every
/// token symbol has exactly one role; `Hidden`, `Noise`, and `Generated` are
/// orthogonal attributes layered on top (see [TokenAttributes]).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenRole {
  /// Ordinary terminal consumed by the LALR driver.
  Terminal,
  /// Opens a [crate::types::Group].
  GroupStart,
  /// Closes a [crate::types::Group].
  GroupEnd,
}

/// Attributes layered on top of a token symbol's [TokenRole]. Modeled as
/// individual flags, matching the rest of the grammar data model, rather than
/// a packed bitset — there are only three of them and the table rows they
/// belong to are already byte-aligned.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct TokenAttributes {
  /// Not exposed through reflective/special-name lookup by friendly name.
  pub hidden: bool,
  /// Recognized by the tokenizer but discarded by the LALR driver before it
  /// ever reaches the parser's action table.
  pub noise: bool,
  /// Synthesized by the grammar builder (e.g. an anonymous group-end
  /// token), rather than declared directly by the grammar's author.
  pub generated: bool,
}

/// A terminal recognized by the tokenizer.
#[derive(Clone, Debug)]
pub struct TokenSymbol {
  pub name: IString,
  pub special_name: Option<IString>,
  pub role: TokenRole,
  pub attributes: TokenAttributes,
  /// Set only when `role == GroupStart`; the group this token opens.
  pub owning_group: Option<GroupId>,
}

impl TokenSymbol {
  pub fn is_terminal(&self) -> bool {
    self.role == TokenRole::Terminal
  }

  pub fn is_noise(&self) -> bool {
    self.attributes.noise
  }

  pub fn is_hidden(&self) -> bool {
    self.attributes.hidden
  }

  pub fn is_generated(&self) -> bool {
    self.attributes.generated
  }
}

/// A lexical region consuming characters until a terminator, e.g. a block
/// comment or a quoted string with escapes.
#[derive(Clone, Debug)]
pub struct Group {
  pub name: IString,
  pub start: TokenSymbolId,
  /// `None` means the group is only ended by end-of-input (requires
  /// `ends_on_end_of_input`).
  pub end: Option<TokenSymbolId>,
  pub advance_by_character: bool,
  pub ends_on_end_of_input: bool,
  pub keep_end_token: bool,
  /// Groups permitted to open while this one is active.
  pub nesting: crate::proxy::OrderedSet<GroupId>,
}
