//! The LALR(1) builder (§4.2): canonical item-set construction with
//! lookahead propagation, and operator-scope conflict resolution.
//!
//! Implementation strategy: build the canonical LR(1) collection directly
//! (items carry a concrete lookahead terminal, not a propagation link), then
//! merge states whose LR(0) cores coincide, unioning their lookahead sets.
//! This is the textbook "canonical LR(1) then merge" construction; the spec
//! explicitly allows it as an alternative to the incremental DeRemer–Pennello
//! algorithm ("equivalently, the efficient... variant is acceptable").

use std::collections::VecDeque;

use crate::config::{BuildConfig, CancellationToken};
use crate::diagnostics::{BuildLog, Diagnostic};
use crate::error::{BuildError, BuildResult};
use crate::proxy::{Array, Map, OrderedMap, OrderedSet};
use crate::types::{Associativity, GrammarDef, LalrStateIndex, NonTermId, ProductionId, SymbolHandle, TokenSymbolId};

/// A lookahead symbol: either a real terminal or the end-of-input sentinel
/// produced by the augmented start production's dollar marker.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Lookahead {
  Token(TokenSymbolId),
  EndOfInput,
}

/// An LALR item: a production (by index into the augmented production list,
/// where index `0` is the synthetic `S' -> start` production) and a dot
/// position.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
struct ItemCore {
  production: usize,
  dot: usize,
}

type Kernel = OrderedMap<ItemCore, OrderedSet<Lookahead>>;

struct AugProduction {
  /// `None` only for the synthetic augmented-start production at index 0.
  head: Option<NonTermId>,
  members: Array<SymbolHandle>,
}

struct AugGrammar<'g> {
  grammar: &'g GrammarDef,
  productions: Array<AugProduction>,
}

impl<'g> AugGrammar<'g> {
  fn new(grammar: &'g GrammarDef) -> Self {
    let mut productions = Array::with_capacity(grammar.productions.len() + 1);
    productions.push(AugProduction { head: None, members: vec![SymbolHandle::NonTerm(grammar.start_nonterm)] });
    for p in &grammar.productions {
      productions.push(AugProduction { head: Some(p.head), members: p.members.clone() });
    }
    Self { grammar, productions }
  }

  fn members(&self, production: usize) -> &[SymbolHandle] {
    &self.productions[production].members
  }

  fn next_symbol(&self, item: ItemCore) -> Option<SymbolHandle> {
    self.members(item.production).get(item.dot).copied()
  }

  fn is_complete(&self, item: ItemCore) -> bool {
    item.dot >= self.members(item.production).len()
  }

  fn productions_of(&self, nonterm: NonTermId) -> impl Iterator<Item = usize> + '_ {
    self.grammar.nonterm(nonterm).productions().map(|real_index| real_index + 1)
  }

  /// `None` for the synthetic augmented-start production, which never
  /// participates in conflict resolution.
  fn precedence_symbol(&self, production: usize) -> Option<TokenSymbolId> {
    if production == 0 {
      None
    } else {
      self.grammar.productions[production - 1].precedence_symbol()
    }
  }
}

/// `FIRST` sets and nullability for every nonterminal, computed once over
/// the whole grammar by fixed-point iteration (standard LR preprocessing).
struct FirstSets {
  first: Map<NonTermId, OrderedSet<TokenSymbolId>>,
  nullable: Map<NonTermId, bool>,
}

impl FirstSets {
  fn compute(grammar: &GrammarDef) -> Self {
    let mut first: Map<NonTermId, OrderedSet<TokenSymbolId>> = Map::default();
    let mut nullable: Map<NonTermId, bool> = Map::default();
    for nt in 0..grammar.nonterms.len() {
      let id = NonTermId::from_index(nt);
      first.insert(id, OrderedSet::new());
      nullable.insert(id, false);
    }

    let mut changed = true;
    while changed {
      changed = false;
      for production in &grammar.productions {
        let head = production.head;
        let mut nullable_so_far = true;
        for member in &production.members {
          match member {
            SymbolHandle::Token(t) => {
              if first.get_mut(&head).unwrap().insert(*t) {
                changed = true;
              }
              nullable_so_far = false;
              break;
            }
            SymbolHandle::NonTerm(n) => {
              let addition: Array<TokenSymbolId> = first[n].iter().copied().collect();
              let head_first = first.get_mut(&head).unwrap();
              for t in addition {
                if head_first.insert(t) {
                  changed = true;
                }
              }
              if !nullable[n] {
                nullable_so_far = false;
                break;
              }
            }
          }
        }
        if nullable_so_far && !nullable[&head] {
          nullable.insert(head, true);
          changed = true;
        }
      }
    }

    Self { first, nullable }
  }

  /// `FIRST` of the symbol sequence `members[start..]`, falling through to
  /// `trailing` when every remaining member is nullable (standard LR(1)
  /// lookahead computation for `A -> α·Bβ, la`: lookahead for `B` is
  /// `FIRST(βla)`).
  fn of_sequence(&self, members: &[SymbolHandle], start: usize, trailing: &OrderedSet<Lookahead>) -> OrderedSet<Lookahead> {
    let mut result = OrderedSet::new();
    let mut nullable_so_far = true;
    for member in &members[start..] {
      match member {
        SymbolHandle::Token(t) => {
          result.insert(Lookahead::Token(*t));
          nullable_so_far = false;
          break;
        }
        SymbolHandle::NonTerm(n) => {
          for t in &self.first[n] {
            result.insert(Lookahead::Token(*t));
          }
          if !self.nullable[n] {
            nullable_so_far = false;
            break;
          }
        }
      }
    }
    if nullable_so_far {
      result.extend(trailing.iter().copied());
    }
    result
  }
}

fn closure(aug: &AugGrammar, first: &FirstSets, seed: Kernel) -> Kernel {
  let mut items = seed;
  let mut changed = true;
  while changed {
    changed = false;
    let snapshot: Array<(ItemCore, OrderedSet<Lookahead>)> = items.iter().map(|(k, v)| (*k, v.clone())).collect();
    for (item, lookaheads) in snapshot {
      let Some(SymbolHandle::NonTerm(nt)) = aug.next_symbol(item) else { continue };
      let trailing = first.of_sequence(aug.members(item.production), item.dot + 1, &lookaheads);
      for production in aug.productions_of(nt) {
        let key = ItemCore { production, dot: 0 };
        let entry = items.entry(key).or_default();
        let before = entry.len();
        entry.extend(trailing.iter().copied());
        if entry.len() != before {
          changed = true;
        }
      }
    }
  }
  items
}

fn goto_kernel(aug: &AugGrammar, items: &Kernel, symbol: SymbolHandle) -> Kernel {
  let mut kernel = Kernel::new();
  for (item, lookaheads) in items {
    if aug.next_symbol(*item) == Some(symbol) {
      let advanced = ItemCore { production: item.production, dot: item.dot + 1 };
      kernel.entry(advanced).or_default().extend(lookaheads.iter().copied());
    }
  }
  kernel
}

/// The canonical LR(1) collection: closures indexed by state, plus the
/// symbol-keyed transition function between them. Kept separate from the
/// post-merge LALR states since multiple canonical states can collapse into
/// one LALR state.
struct CanonicalCollection {
  closures: Array<Kernel>,
  transitions: Array<OrderedMap<SymbolHandle, usize>>,
  kernels: Array<Kernel>,
}

fn build_canonical_collection(
  aug: &AugGrammar,
  first: &FirstSets,
  config: &BuildConfig,
  cancel: &dyn CancellationToken,
) -> BuildResult<CanonicalCollection> {
  let start_kernel: Kernel =
    [(ItemCore { production: 0, dot: 0 }, [Lookahead::EndOfInput].into_iter().collect())].into_iter().collect();

  let mut kernels: Array<Kernel> = vec![start_kernel.clone()];
  let mut closures: Array<Kernel> = vec![closure(aug, first, start_kernel.clone())];
  let mut index_of: OrderedMap<Kernel, usize> = [(start_kernel, 0usize)].into_iter().collect();
  let mut transitions: Array<OrderedMap<SymbolHandle, usize>> = vec![OrderedMap::new()];
  let mut queue: VecDeque<usize> = VecDeque::from([0]);

  while let Some(state_idx) = queue.pop_front() {
    if cancel.is_cancelled() {
      return Err(BuildError::Cancelled);
    }
    if kernels.len() as u32 > config.max_tokenizer_states {
      // Reuses the tokenizer's state-limit knob as a blanket safety valve;
      // LALR automata are bounded by grammar size in practice, so this only
      // fires on pathological/cyclic input.
      return Err(BuildError::TokenizerStateLimitExceeded { limit: config.max_tokenizer_states });
    }

    let symbols: OrderedSet<SymbolHandle> =
      closures[state_idx].keys().filter_map(|item| aug.next_symbol(*item)).collect();

    let mut trans_map = OrderedMap::new();
    for symbol in symbols {
      let kernel = goto_kernel(aug, &closures[state_idx], symbol);
      if kernel.is_empty() {
        continue;
      }
      let target = if let Some(&existing) = index_of.get(&kernel) {
        existing
      } else {
        let idx = kernels.len();
        index_of.insert(kernel.clone(), idx);
        kernels.push(kernel.clone());
        closures.push(closure(aug, first, kernel));
        transitions.push(OrderedMap::new());
        queue.push_back(idx);
        idx
      };
      trans_map.insert(symbol, target);
    }
    transitions[state_idx] = trans_map;
  }

  Ok(CanonicalCollection { closures, transitions, kernels })
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LalrAction {
  Shift(LalrStateIndex),
  Reduce(ProductionId),
  Accept,
}

#[derive(Clone, Debug, Default)]
pub struct LalrState {
  pub actions: OrderedMap<Lookahead, LalrAction>,
  pub gotos: OrderedMap<NonTermId, LalrStateIndex>,
}

#[derive(Clone, Debug)]
pub struct LalrTable {
  pub states: Array<LalrState>,
  pub start: LalrStateIndex,
}

impl LalrTable {
  pub fn state(&self, index: LalrStateIndex) -> &LalrState {
    &self.states[index.index()]
  }
}

/// Merges canonical LR(1) states that share an LR(0) core (item positions
/// ignoring lookahead) into LALR states, unioning lookahead sets along the
/// way.
fn merge_into_lalr(aug: &AugGrammar, collection: &CanonicalCollection) -> (Array<Kernel>, Array<usize>, Array<OrderedMap<SymbolHandle, usize>>) {
  let mut core_to_merged: OrderedMap<OrderedSet<ItemCore>, usize> = OrderedMap::new();
  let mut merged_index_of: Array<usize> = vec![0; collection.kernels.len()];
  let mut merged_items: Array<Kernel> = Array::new();

  for (i, kernel) in collection.kernels.iter().enumerate() {
    let core: OrderedSet<ItemCore> = kernel.keys().copied().collect();
    let merged_idx = *core_to_merged.entry(core).or_insert_with(|| {
      merged_items.push(Kernel::new());
      merged_items.len() - 1
    });
    merged_index_of[i] = merged_idx;
    for (item, lookaheads) in &collection.closures[i] {
      merged_items[merged_idx].entry(*item).or_default().extend(lookaheads.iter().copied());
    }
  }

  let mut merged_transitions: Array<OrderedMap<SymbolHandle, usize>> = vec![OrderedMap::new(); merged_items.len()];
  for (i, trans) in collection.transitions.iter().enumerate() {
    let from = merged_index_of[i];
    for (&symbol, &target) in trans {
      merged_transitions[from].insert(symbol, merged_index_of[target]);
    }
  }

  let _ = aug;
  (merged_items, merged_index_of, merged_transitions)
}

struct ReduceCandidate {
  production: usize,
  precedence: Option<(usize, Associativity)>,
}

fn precedence_of(aug: &AugGrammar, grammar: &GrammarDef, production: usize) -> Option<(usize, Associativity)> {
  let token = aug.precedence_symbol(production)?;
  grammar.operator_scope.lookup(token).map(|(level, entry)| (level, entry.associativity))
}

/// Resolves a shift/reduce conflict per §4.2. Returns the winning action, or
/// `None` when the spec calls for leaving the position with no action at all
/// (`NonAssociative`, reported as a parse-time error by the driver).
/// Unresolved-but-ambiguous cases fall back to a shift (the conventional
/// default LALR generators apply) and log a diagnostic so the grammar is
/// still marked `Unparsable`.
fn resolve_shift_reduce(
  shift_target: LalrStateIndex,
  reduce: &ReduceCandidate,
  lookahead: TokenSymbolId,
  grammar: &GrammarDef,
  state: u32,
  log: &mut BuildLog,
) -> LalrAction {
  let Some((t_level, t_assoc)) = grammar.operator_scope.lookup(lookahead).map(|(l, e)| (l, e.associativity)) else {
    log.push(Diagnostic::UnresolvedShiftReduce {
      state,
      lookahead,
      production: reduce.production as u32,
    });
    return LalrAction::Shift(shift_target);
  };
  let Some((p_level, _)) = reduce.precedence else {
    log.push(Diagnostic::UnresolvedShiftReduce {
      state,
      lookahead,
      production: reduce.production as u32,
    });
    return LalrAction::Shift(shift_target);
  };

  if t_level > p_level {
    LalrAction::Shift(shift_target)
  } else if p_level > t_level {
    LalrAction::Reduce(ProductionId::from_index(reduce.production - 1))
  } else {
    match t_assoc {
      Associativity::Left => LalrAction::Reduce(ProductionId::from_index(reduce.production - 1)),
      Associativity::Right => LalrAction::Shift(shift_target),
      Associativity::NonAssociative => LalrAction::Accept, // sentinel overwritten by caller to "no action"
      Associativity::PrecedenceOnly => {
        log.push(Diagnostic::UnresolvedShiftReduce { state, lookahead, production: reduce.production as u32 });
        LalrAction::Shift(shift_target)
      }
    }
  }
}

/// Resolves a reduce/reduce conflict per §4.2. `None` when every candidate
/// is left in conflict (falls back to the lowest-indexed production, the
/// classic yacc default, with a diagnostic logged).
fn resolve_reduce_reduce(
  candidates: &[ReduceCandidate],
  lookahead: TokenSymbolId,
  config: &BuildConfig,
  state: u32,
  log: &mut BuildLog,
) -> ProductionId {
  let all_precedence_only = config.allow_reduce_reduce_resolution
    && candidates.iter().all(|c| matches!(c.precedence, Some((_, Associativity::PrecedenceOnly))));

  if all_precedence_only {
    let mut sorted: Array<&ReduceCandidate> = candidates.iter().collect();
    sorted.sort_by_key(|c| std::cmp::Reverse(c.precedence.unwrap().0));
    if sorted.len() >= 2 && sorted[0].precedence.unwrap().0 == sorted[1].precedence.unwrap().0 {
      log.push(Diagnostic::UnresolvedReduceReduce {
        state,
        lookahead,
        productions: candidates.iter().map(|c| c.production as u32).collect(),
      });
      let lowest = candidates.iter().map(|c| c.production).min().unwrap();
      return ProductionId::from_index(lowest - 1);
    }
    return ProductionId::from_index(sorted[0].production - 1);
  }

  log.push(Diagnostic::UnresolvedReduceReduce {
    state,
    lookahead,
    productions: candidates.iter().map(|c| c.production as u32).collect(),
  });
  let lowest = candidates.iter().map(|c| c.production).min().unwrap();
  ProductionId::from_index(lowest - 1)
}

/// Builds the LALR(1) action/goto tables for `grammar` (§4.2).
pub fn build_lalr(
  grammar: &GrammarDef,
  config: &BuildConfig,
  log: &mut BuildLog,
  cancel: &dyn CancellationToken,
) -> BuildResult<LalrTable> {
  let aug = AugGrammar::new(grammar);
  let first = FirstSets::compute(grammar);
  let collection = build_canonical_collection(&aug, &first, config, cancel)?;
  let (merged_items, _merged_index_of, merged_transitions) = merge_into_lalr(&aug, &collection);

  let mut states: Array<LalrState> = Array::with_capacity(merged_items.len());

  for (state_idx, items) in merged_items.iter().enumerate() {
    if cancel.is_cancelled() {
      return Err(BuildError::Cancelled);
    }

    // Collect shift/reduce/accept candidates keyed by lookahead before
    // resolving, so a state with no conflict on a given terminal skips
    // resolution entirely.
    let mut shift_candidates: Map<TokenSymbolId, LalrStateIndex> = Map::default();
    if let Some(trans) = merged_transitions.get(state_idx) {
      for (&symbol, &target) in trans {
        if let SymbolHandle::Token(t) = symbol {
          shift_candidates.insert(t, LalrStateIndex::from_index(target));
        }
      }
    }

    let mut reduce_candidates: Map<Lookahead, Array<ReduceCandidate>> = Map::default();
    let mut accept = false;
    for (item, lookaheads) in items {
      if !aug.is_complete(*item) {
        continue;
      }
      if item.production == 0 {
        if lookaheads.contains(&Lookahead::EndOfInput) {
          accept = true;
        }
        continue;
      }
      let candidate = ReduceCandidate { production: item.production, precedence: precedence_of(&aug, grammar, item.production) };
      for &la in lookaheads {
        reduce_candidates.entry(la).or_default().push(ReduceCandidate {
          production: candidate.production,
          precedence: candidate.precedence,
        });
      }
    }

    let mut actions: OrderedMap<Lookahead, LalrAction> = OrderedMap::new();
    if accept {
      actions.insert(Lookahead::EndOfInput, LalrAction::Accept);
    }

    let mut handled_tokens: OrderedSet<TokenSymbolId> = OrderedSet::new();
    for (&token, &target) in &shift_candidates {
      handled_tokens.insert(token);
      let la = Lookahead::Token(token);
      match reduce_candidates.get(&la) {
        None => {
          actions.insert(la, LalrAction::Shift(target));
        }
        Some(candidates) if candidates.len() == 1 => {
          let action = resolve_shift_reduce(target, &candidates[0], token, grammar, state_idx as u32, log);
          match action {
            // `Accept` is reused as the NonAssociative "no action" sentinel:
            // leave this lookahead unresolved (reported as a parse-time error).
            LalrAction::Accept => {}
            other => {
              actions.insert(la, other);
            }
          }
        }
        Some(candidates) => {
          // Shift plus multiple reduce candidates: resolve the reduce/reduce
          // set first, then treat the winner as a single reduce candidate
          // against the shift.
          let winner = resolve_reduce_reduce(candidates, token, config, state_idx as u32, log);
          let winner_candidate = ReduceCandidate {
            production: winner.index() + 1,
            precedence: precedence_of(&aug, grammar, winner.index() + 1),
          };
          let action = resolve_shift_reduce(target, &winner_candidate, token, grammar, state_idx as u32, log);
          match action {
            LalrAction::Accept => {}
            other => {
              actions.insert(la, other);
            }
          }
        }
      }
    }

    for (&la, candidates) in &reduce_candidates {
      let Lookahead::Token(token) = la else { continue };
      if handled_tokens.contains(&token) {
        continue;
      }
      let winner = if candidates.len() == 1 {
        ProductionId::from_index(candidates[0].production - 1)
      } else {
        resolve_reduce_reduce(candidates, token, config, state_idx as u32, log)
      };
      actions.insert(la, LalrAction::Reduce(winner));
    }

    let gotos: OrderedMap<NonTermId, LalrStateIndex> = merged_transitions
      .get(state_idx)
      .into_iter()
      .flat_map(|m| m.iter())
      .filter_map(|(&symbol, &target)| match symbol {
        SymbolHandle::NonTerm(nt) => Some((nt, LalrStateIndex::from_index(target))),
        SymbolHandle::Token(_) => None,
      })
      .collect();

    states.push(LalrState { actions, gotos });
  }

  Ok(LalrTable { states, start: LalrStateIndex::from_index(0) })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::regex::Regex;
  use crate::types::{GrammarBuilder, ProductionSpec, TokenAttributes, TokenRole};

  fn build_calculator() -> GrammarDef {
    let mut b = GrammarBuilder::new();
    let plus = b.declare_token("+", Regex::Literal("+".into()), TokenRole::Terminal, TokenAttributes::default());
    let num = b.declare_token("num", Regex::Chars(crate::regex::CharSet::from_ranges([crate::regex::CharRange { lo: '0', hi: '9' }])).plus(), TokenRole::Terminal, TokenAttributes::default());

    let mut scope = crate::types::OperatorScope::new();
    scope.push_level(Associativity::Left, [plus]);
    b.set_operator_scope(scope);

    let e = b.declare_nonterm("E").unwrap();
    b.set_start(e);
    b.define_productions(
      e,
      vec![
        ProductionSpec {
          members: vec![SymbolHandle::NonTerm(e), SymbolHandle::Token(plus), SymbolHandle::NonTerm(e)],
          precedence_token: Some(plus),
        },
        ProductionSpec { members: vec![SymbolHandle::Token(num)], precedence_token: None },
      ],
    )
    .unwrap();

    b.build(&mut BuildLog::new()).unwrap()
  }

  #[test]
  fn builds_tables_for_left_recursive_calculator() {
    let grammar = build_calculator();
    let mut log = BuildLog::new();
    let cancel = crate::config::NeverCancel;
    let table = build_lalr(&grammar, &BuildConfig::default(), &mut log, &cancel).unwrap();
    assert!(!table.states.is_empty());
    // The shift/reduce conflict on `+` is resolved (left-associative reduce),
    // so no unresolved diagnostics should have been logged.
    assert!(!log.is_unparsable(), "{log}");
  }
}
