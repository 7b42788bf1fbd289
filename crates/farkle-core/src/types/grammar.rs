//! The grammar definition: the frozen collection of symbols, productions,
//! and groups a build pipeline consumes (§3 Data Model, §3 Lifecycle).
//!
//! A [GrammarDef] is built incrementally through [GrammarBuilder] and then
//! frozen; table construction (DFA + LALR) only ever sees an already-frozen
//! [GrammarDef]. This mirrors the teacher's own split between a mutable
//! `GrammarSoup`/`ParserDatabase` builder stage and the immutable database
//! consumed by compilation (`radlr_core::types::parser_db::ParserDatabase`).

use crate::diagnostics::{BuildLog, Diagnostic};
use crate::error::{BuildError, BuildResult};
use crate::proxy::{Array, IString, OrderedSet, StringStore};
use crate::regex::Regex;

use super::handles::{GroupId, NonTermId, ProductionId, SymbolHandle, TokenSymbolId};
use super::production::{NonTerm, Production};
use super::symbol::{Group, TokenAttributes, TokenRole, TokenSymbol};

/// Associativity of an operator-scope entry (§4.2 Conflict resolution).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Associativity {
  Left,
  Right,
  /// Neither side wins; using the operator at this precedence in a way that
  /// would require choosing is a parse-time error.
  NonAssociative,
  /// This precedence level only orders productions against each other (used
  /// for reduce/reduce resolution); it never resolves a shift/reduce tie.
  PrecedenceOnly,
}

/// One level of the operator-precedence scope: a set of terminals sharing an
/// associativity at a given precedence. Precedence is this entry's position
/// in [OperatorScope::levels] (index 0 is lowest).
#[derive(Clone, Debug)]
pub struct PrecedenceLevel {
  pub associativity: Associativity,
  pub tokens: OrderedSet<TokenSymbolId>,
}

/// The ordered list of associativity groups used to resolve LALR conflicts
/// (§4.2, GLOSSARY "Operator scope").
#[derive(Clone, Debug, Default)]
pub struct OperatorScope {
  pub levels: Array<PrecedenceLevel>,
}

impl OperatorScope {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push_level(&mut self, associativity: Associativity, tokens: impl IntoIterator<Item = TokenSymbolId>) {
    self.levels.push(PrecedenceLevel { associativity, tokens: tokens.into_iter().collect() });
  }

  /// The `(precedence, entry)` pair for a terminal, if the scope mentions it.
  /// Precedence is the level's index; higher is tighter-binding.
  pub fn lookup(&self, token: TokenSymbolId) -> Option<(usize, &PrecedenceLevel)> {
    self.levels.iter().enumerate().find(|(_, level)| level.tokens.contains(&token))
  }
}

/// A symbol, production member, or regex not yet registered: the builder's
/// staging representation before a nonterminal's productions are frozen.
pub struct ProductionSpec {
  pub members: Array<SymbolHandle>,
  pub precedence_token: Option<TokenSymbolId>,
}

/// Staged regex plus metadata for one token symbol, carried until the DFA
/// builder consumes it (§4.1 Input).
#[derive(Clone)]
pub struct TokenSpec {
  pub regex: Regex,
  pub case_sensitive: Option<bool>,
}

/// The frozen grammar: every table the DFA/LALR builders and the binary
/// writer need. Productions of a nonterminal are laid out contiguously
/// (§3 Production) and never reordered after [GrammarBuilder::build].
#[derive(Clone, Debug, Default)]
pub struct GrammarDef {
  pub strings: StringStore,
  pub token_symbols: Array<TokenSymbol>,
  pub groups: Array<Group>,
  pub nonterms: Array<NonTerm>,
  pub productions: Array<Production>,
  pub start_nonterm: NonTermId,
  pub special_names: crate::proxy::Map<IString, SpecialNameTarget>,
  /// Regex source for each token symbol, indexed in lockstep with
  /// `token_symbols` (§4.1 Input — "an ordered list of tokenizable symbols").
  pub token_patterns: Array<TokenSpec>,
  pub operator_scope: OperatorScope,
  /// Set once [GrammarBuilder::build] finds the grammar cannot be
  /// guaranteed correct at freeze time (currently: duplicate special
  /// names). LALR conflicts, DFA conflicts, and a DFA start state that
  /// accepts are only known once the DFA/LALR builders run, so the
  /// persisted blob's `Unparsable` header bit additionally ORs in the
  /// build log's `is_unparsable()` (§3 invariants) — this field alone does
  /// not cover every unparsable condition. The tables are still built and
  /// loadable even when either is set.
  pub unparsable: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialNameTarget {
  Token(TokenSymbolId),
  NonTerm(NonTermId),
}

impl GrammarDef {
  pub fn nonterm(&self, id: NonTermId) -> &NonTerm {
    &self.nonterms[id.index()]
  }

  pub fn production(&self, id: ProductionId) -> &Production {
    &self.productions[id.index()]
  }

  pub fn token_symbol(&self, id: TokenSymbolId) -> &TokenSymbol {
    &self.token_symbols[id.index()]
  }

  pub fn group(&self, id: GroupId) -> &Group {
    &self.groups[id.index()]
  }

  /// Terminals occupy a contiguous prefix of the token-symbol table (§3
  /// invariants); this is that prefix's length.
  pub fn terminal_count(&self) -> usize {
    self.token_symbols.iter().take_while(|t| t.role == TokenRole::Terminal).count()
  }

  pub fn productions_of(&self, nonterm: NonTermId) -> &[Production] {
    &self.productions[self.nonterm(nonterm).productions()]
  }

  pub fn name_of_nonterm(&self, id: NonTermId) -> &str {
    self.strings.get(self.nonterm(id).name)
  }

  pub fn name_of_token(&self, id: TokenSymbolId) -> &str {
    self.strings.get(self.token_symbol(id).name)
  }

  /// By-special-name lookup (§10.5 "Grammar reflection accessors"): the
  /// binary format stores special names precisely so callers can resolve a
  /// stable string key back to a handle without walking every table.
  pub fn resolve_special_name(&self, name: &str) -> Option<SpecialNameTarget> {
    self.strings.lookup(name).and_then(|id| self.special_names.get(&id)).copied()
  }
}

/// The staged, not-yet-frozen grammar under construction. Mirrors the
/// teacher's `GrammarSoup` role: symbols and productions accumulate here,
/// get validated, and only become a [GrammarDef] on [GrammarBuilder::build].
#[derive(Default)]
pub struct GrammarBuilder {
  strings: StringStore,
  token_symbols: Array<TokenSymbol>,
  token_patterns: Array<TokenSpec>,
  groups: Array<Group>,
  nonterms: Array<NonTerm>,
  nonterm_names: crate::proxy::Map<IString, NonTermId>,
  productions: Array<Production>,
  start_nonterm: Option<NonTermId>,
  special_names: crate::proxy::Map<IString, SpecialNameTarget>,
  operator_scope: OperatorScope,
  duplicate_special_names: Array<(IString, SpecialNameTarget, SpecialNameTarget)>,
}

impl GrammarBuilder {
  pub fn new() -> Self {
    Self { strings: StringStore::new(), ..Default::default() }
  }

  pub fn intern(&mut self, s: &str) -> IString {
    self.strings.intern(s)
  }

  /// Declares a token symbol and its regex, returning its handle. Role and
  /// attributes are supplied up front since a symbol has exactly one kind
  /// for its whole lifetime (§3 Symbols).
  pub fn declare_token(
    &mut self,
    name: &str,
    regex: Regex,
    role: TokenRole,
    attributes: TokenAttributes,
  ) -> TokenSymbolId {
    let interned = self.intern(name);
    let id = TokenSymbolId::from_index(self.token_symbols.len());
    self.token_symbols.push(TokenSymbol { name: interned, special_name: None, role, attributes, owning_group: None });
    self.token_patterns.push(TokenSpec { regex, case_sensitive: None });
    id
  }

  pub fn set_special_name(&mut self, token: TokenSymbolId, name: &str) {
    let interned = self.intern(name);
    self.token_symbols[token.index()].special_name = Some(interned);
    self.register_special_name(interned, SpecialNameTarget::Token(token));
  }

  fn register_special_name(&mut self, name: IString, target: SpecialNameTarget) {
    if let Some(existing) = self.special_names.insert(name, target) {
      self.duplicate_special_names.push((name, existing, target));
    }
  }

  /// Declares a lexical group (§3 Group). `start` must already be a
  /// `GroupStart`-role token symbol with no owning group yet.
  pub fn declare_group(
    &mut self,
    name: &str,
    start: TokenSymbolId,
    end: Option<TokenSymbolId>,
    advance_by_character: bool,
    ends_on_end_of_input: bool,
    keep_end_token: bool,
  ) -> BuildResult<GroupId> {
    if self.token_symbols[start.index()].role != TokenRole::GroupStart {
      return Err(BuildError::InvalidHandle { what: "group start token must have role GroupStart" });
    }
    if self.token_symbols[start.index()].owning_group.is_some() {
      return Err(BuildError::InvalidHandle { what: "group start token already owned by another group" });
    }
    let interned = self.intern(name);
    let id = GroupId::from_index(self.groups.len());
    self.groups.push(Group {
      name: interned,
      start,
      end,
      advance_by_character,
      ends_on_end_of_input,
      keep_end_token,
      nesting: OrderedSet::new(),
    });
    self.token_symbols[start.index()].owning_group = Some(id);
    Ok(id)
  }

  pub fn allow_nested_group(&mut self, outer: GroupId, inner: GroupId) {
    self.groups[outer.index()].nesting.insert(inner);
  }

  /// Declares a nonterminal by name, returning its existing handle if
  /// already declared (so forward references across mutually-recursive
  /// productions resolve to the same handle) and an error on a conflicting
  /// second declaration under a different identity path.
  pub fn declare_nonterm(&mut self, name: &str) -> BuildResult<NonTermId> {
    let interned = self.intern(name);
    if let Some(&existing) = self.nonterm_names.get(&interned) {
      return Ok(existing);
    }
    let id = NonTermId::from_index(self.nonterms.len());
    self.nonterms.push(NonTerm {
      name: interned,
      special_name: None,
      first_production: ProductionId::NIL,
      production_count: 0,
      frozen: false,
    });
    self.nonterm_names.insert(interned, id);
    Ok(id)
  }

  pub fn set_nonterm_special_name(&mut self, nonterm: NonTermId, name: &str) {
    let interned = self.intern(name);
    self.nonterms[nonterm.index()].special_name = Some(interned);
    self.register_special_name(interned, SpecialNameTarget::NonTerm(nonterm));
  }

  pub fn set_start(&mut self, nonterm: NonTermId) {
    self.start_nonterm = Some(nonterm);
  }

  /// Commits the full set of productions for `nonterm` at once, since
  /// productions of a nonterminal must be laid out contiguously (§3
  /// Production) and a nonterminal's productions cannot be set twice (§3
  /// Lifecycle).
  pub fn define_productions(&mut self, nonterm: NonTermId, specs: Array<ProductionSpec>) -> BuildResult<()> {
    if self.nonterms[nonterm.index()].frozen {
      return Err(BuildError::NonTerminalAlreadyFrozen { nonterm });
    }
    let first = ProductionId::from_index(self.productions.len());
    let count = specs.len() as u32;
    for spec in specs {
      self.productions.push(Production { head: nonterm, members: spec.members, precedence_token: spec.precedence_token });
    }
    let entry = &mut self.nonterms[nonterm.index()];
    entry.first_production = first;
    entry.production_count = count;
    entry.frozen = true;
    Ok(())
  }

  pub fn set_operator_scope(&mut self, scope: OperatorScope) {
    self.operator_scope = scope;
  }

  pub fn operator_scope_mut(&mut self) -> &mut OperatorScope {
    &mut self.operator_scope
  }

  pub fn set_token_case_sensitivity(&mut self, token: TokenSymbolId, case_sensitive: bool) {
    self.token_patterns[token.index()].case_sensitive = Some(case_sensitive);
  }

  /// Validates cross-references and freezes the grammar. This does not run
  /// the DFA or LALR builders; it only checks the invariants a table builder
  /// would otherwise have to assume (§3 invariants: handle ranges, exactly
  /// one owning group per `GroupStart`, production members in range).
  ///
  /// Every collision recorded by `set_special_name`/`set_nonterm_special_name`
  /// is pushed into `log` as a [Diagnostic::DuplicateSpecialName] so callers
  /// can tell which names collided, not just that `unparsable` ended up set.
  pub fn build(mut self, log: &mut BuildLog) -> BuildResult<GrammarDef> {
    let start_nonterm = self.start_nonterm.ok_or(BuildError::InvalidHandle { what: "grammar has no start nonterminal" })?;

    for (name, first, second) in &self.duplicate_special_names {
      log.push(Diagnostic::DuplicateSpecialName { name: self.strings.get(*name).to_string(), first: *first, second: *second });
    }
    let unparsable = !self.duplicate_special_names.is_empty();

    for production in &self.productions {
      for member in &production.members {
        match member {
          SymbolHandle::Token(t) if t.index() >= self.token_symbols.len() => {
            return Err(BuildError::InvalidHandle { what: "production member token out of range" });
          }
          SymbolHandle::NonTerm(n) if n.index() >= self.nonterms.len() => {
            return Err(BuildError::InvalidHandle { what: "production member nonterminal out of range" });
          }
          _ => {}
        }
      }
    }

    // Terminals must occupy a contiguous prefix (§3 invariants). The builder
    // only ever appends via `declare_token` with a role chosen up front, so
    // this holds by construction unless callers interleave roles; verify it
    // defensively since it underwrites the binary format's layout guarantee.
    let mut seen_non_terminal = false;
    for symbol in &self.token_symbols {
      if symbol.role == TokenRole::Terminal {
        if seen_non_terminal {
          return Err(BuildError::InvalidHandle { what: "terminal token symbols must occupy a contiguous prefix" });
        }
      } else {
        seen_non_terminal = true;
      }
    }

    Ok(GrammarDef {
      strings: self.strings,
      token_symbols: self.token_symbols,
      groups: self.groups,
      nonterms: self.nonterms,
      productions: self.productions,
      start_nonterm,
      special_names: self.special_names,
      token_patterns: self.token_patterns,
      operator_scope: self.operator_scope,
      unparsable,
    })
  }
}
