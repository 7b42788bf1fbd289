//! The DFA builder (§4.1): turns one regex per tokenizable symbol into a
//! single deterministic automaton with per-state accept sets and
//! priority-based tie-breaking.

mod leaf;

use crate::config::{BuildConfig, CancellationToken};
use crate::diagnostics::{BuildLog, Diagnostic};
use crate::error::{BuildError, BuildResult};
use crate::proxy::{Array, OrderedSet};
use crate::regex::{CharRange, Regex};
use crate::types::{DfaStateIndex, TokenSymbolId};

use leaf::{Leaf, LeafId, PNode, PositionTree};

/// Lower numeric value wins ties (§4.1 "Priority classes").
pub type Priority = u32;
pub const LITERAL_PRIORITY: Priority = 0;
pub const TERMINAL_PRIORITY: Priority = 1;

/// One tokenizable symbol's compiled input to the DFA builder: its lowered
/// regex (see [Regex::lower]) and whether it resolves to a single fixed
/// character length, used for the `prioritize_fixed_length_symbols`
/// tie-break (§4.1 step 5).
#[derive(Clone, Debug)]
pub struct TokenPattern {
  pub symbol: TokenSymbolId,
  pub regex: Regex,
  pub fixed_length: Option<u32>,
}

impl TokenPattern {
  pub fn new(symbol: TokenSymbolId, regex: Regex, case_sensitive_default: bool) -> Result<Self, String> {
    let lowered = regex.lower(case_sensitive_default)?;
    let fixed_length = fixed_length_of(&lowered);
    Ok(Self { symbol, regex: lowered, fixed_length })
  }
}

fn fixed_length_of(r: &Regex) -> Option<u32> {
  match r {
    Regex::Chars(_) | Regex::Any => Some(1),
    Regex::Concat(parts) => parts.iter().try_fold(0u32, |acc, p| fixed_length_of(p).map(|n| acc + n)),
    Regex::Alt(parts) => {
      let mut lens = parts.iter().map(fixed_length_of);
      let first = lens.next()??;
      lens.all(|l| l == Some(first)).then_some(first)
    }
    Regex::Loop { inner, min, max } if *max == Some(*min) => fixed_length_of(inner).map(|n| n * min),
    Regex::Loop { .. } => None,
    Regex::Literal(s) => Some(s.chars().count() as u32),
    Regex::Pattern(_) | Regex::CaseScope { .. } => None,
  }
}

#[derive(Clone, Copy, Debug)]
pub struct DfaEdge {
  pub lo: char,
  pub hi: char,
  pub target: Option<DfaStateIndex>,
}

#[derive(Clone, Copy, Debug)]
pub struct AcceptEntry {
  pub symbol: TokenSymbolId,
  pub priority: Priority,
}

#[derive(Clone, Debug, Default)]
pub struct DfaState {
  /// Sorted, non-overlapping edges.
  pub edges: Array<DfaEdge>,
  /// Matches when no explicit edge covers the input character (§3 Data
  /// Model: DFA state "default edge").
  pub default: Option<DfaStateIndex>,
  /// All symbols accepted in this state, sorted by priority.
  pub accepts: Array<AcceptEntry>,
  /// The symbol the conflict-resolution policy selected, if any (§4.1 step
  /// 5). `None` when `accepts` is empty.
  pub winner: Option<TokenSymbolId>,
}

impl DfaState {
  pub fn is_accepting(&self) -> bool {
    self.winner.is_some()
  }

  /// Looks up the transition for `c`, consulting the default edge when no
  /// explicit edge covers it.
  pub fn transition(&self, c: char) -> Option<DfaStateIndex> {
    match self.edges.binary_search_by(|e| {
      if c < e.lo {
        std::cmp::Ordering::Greater
      } else if c > e.hi {
        std::cmp::Ordering::Less
      } else {
        std::cmp::Ordering::Equal
      }
    }) {
      Ok(i) => self.edges[i].target.or(self.default),
      Err(_) => self.default,
    }
  }
}

#[derive(Clone, Debug)]
pub struct Dfa {
  pub states: Array<DfaState>,
  pub start: DfaStateIndex,
}

impl Dfa {
  pub fn start_state(&self) -> &DfaState {
    &self.states[self.start.index()]
  }
}

/// Builds a single DFA recognizing every pattern in `patterns` at once,
/// resolving per-state accept conflicts via `config` (§4.1).
pub fn build_dfa(
  patterns: &[TokenPattern],
  config: &BuildConfig,
  log: &mut BuildLog,
  cancel: &dyn CancellationToken,
) -> BuildResult<Dfa> {
  let mut tree = PositionTree::default();

  let mut root: Option<PNode> = None;
  for pattern in patterns {
    if cancel.is_cancelled() {
      return Err(BuildError::Cancelled);
    }
    if is_void(&pattern.regex) {
      log.push(Diagnostic::VoidRegex { symbol: pattern.symbol });
      continue;
    }
    let node = tree.add_symbol(pattern.symbol, &pattern.regex);
    root = Some(match root {
      Some(r) => PNode::Alt(Box::new(r), Box::new(node)),
      None => node,
    });
  }

  let Some(root) = root else {
    return Ok(Dfa { states: vec![DfaState::default()], start: DfaStateIndex::from_index(0) });
  };

  tree.compute_followpos(&root);

  let start_set = tree.firstpos(&root);

  let mut states: Array<DfaState> = Array::new();
  let mut index_of: crate::proxy::OrderedMap<OrderedSet<LeafId>, usize> = crate::proxy::OrderedMap::new();
  let mut queue: std::collections::VecDeque<OrderedSet<LeafId>> = std::collections::VecDeque::new();

  index_of.insert(start_set.clone(), 0);
  states.push(DfaState::default());
  queue.push_back(start_set.clone());

  while let Some(set) = queue.pop_front() {
    if cancel.is_cancelled() {
      return Err(BuildError::Cancelled);
    }
    if states.len() as u32 > config.max_tokenizer_states {
      return Err(BuildError::TokenizerStateLimitExceeded { limit: config.max_tokenizer_states });
    }
    let state_index = *index_of.get(&set).expect("state must have been registered before being queued");

    let (edges, default, new_states) = sweep_transitions(&tree, &set, &mut index_of, &mut queue);
    for s in new_states {
      states.push(DfaState::default());
      debug_assert_eq!(states.len() - 1, s);
    }

    let accepts = resolve_accepts(&tree, &set, patterns, config, log);

    states[state_index] = DfaState {
      edges,
      default,
      winner: accepts.first().map(|a| a.symbol),
      accepts,
    };
  }

  let start = DfaStateIndex::from_index(0);
  if let Some(symbol) = states[start.index()].winner {
    log.push(Diagnostic::DfaStartStateAccepts { symbol });
  }
  Ok(Dfa { states, start })
}

fn is_void(r: &Regex) -> bool {
  match r {
    Regex::Chars(set) => set.is_void(),
    Regex::Concat(parts) => parts.iter().any(is_void),
    Regex::Alt(parts) => parts.iter().all(is_void),
    Regex::Loop { inner, min, .. } => *min > 0 && is_void(inner),
    _ => false,
  }
}

/// Registers `set` in `index_of`/`queue` if it hasn't been seen before and
/// returns its state index, along with whether it was newly created.
fn intern_state(
  set: OrderedSet<LeafId>,
  index_of: &mut crate::proxy::OrderedMap<OrderedSet<LeafId>, usize>,
  queue: &mut std::collections::VecDeque<OrderedSet<LeafId>>,
  next_index: &mut usize,
) -> (usize, bool) {
  if let Some(existing) = index_of.get(&set) {
    (*existing, false)
  } else {
    let idx = *next_index;
    *next_index += 1;
    index_of.insert(set.clone(), idx);
    queue.push_back(set);
    (idx, true)
  }
}

fn sweep_transitions(
  tree: &PositionTree,
  set: &OrderedSet<LeafId>,
  index_of: &mut crate::proxy::OrderedMap<OrderedSet<LeafId>, usize>,
  queue: &mut std::collections::VecDeque<OrderedSet<LeafId>>,
) -> (Array<DfaEdge>, Option<DfaStateIndex>, Array<usize>) {
  let mut next_index = index_of.len();
  let mut new_states = Array::new();

  let mut normal: Array<(LeafId, &crate::regex::CharSet)> = Array::new();
  let mut inverted: Array<(LeafId, &crate::regex::CharSet)> = Array::new();
  for &leaf_id in set {
    if let Leaf::Chars(cs) = &tree.leaves[leaf_id] {
      if cs.invert {
        inverted.push((leaf_id, cs));
      } else {
        normal.push((leaf_id, cs));
      }
    }
  }

  if normal.is_empty() && inverted.is_empty() {
    return (Array::new(), None, new_states);
  }

  let mut breakpoints: std::collections::BTreeSet<u32> = std::collections::BTreeSet::new();
  for (_, cs) in normal.iter().chain(inverted.iter()) {
    for r in &cs.ranges {
      breakpoints.insert(r.lo as u32);
      breakpoints.insert((r.hi as u32).saturating_add(1));
    }
  }
  let breakpoints: Array<u32> = breakpoints.into_iter().collect();

  let mut edges = Array::new();
  for w in breakpoints.windows(2) {
    let (a, b) = (w[0], w[1]);
    let Some((a, b)) = clamp_surrogate_gap(a, b) else { continue };
    if a >= b {
      continue;
    }
    let probe = a; // every char in [a,b) agrees on leaf membership by construction

    let mut target: OrderedSet<LeafId> = OrderedSet::new();
    let mut covered = false;
    for (leaf_id, cs) in &normal {
      if char::from_u32(probe).map(|c| cs.ranges.iter().any(|r| r.contains(c))).unwrap_or(false) {
        covered = true;
        target.extend(tree.followpos[*leaf_id].iter().copied());
      }
    }
    for (leaf_id, cs) in &inverted {
      let excluded = char::from_u32(probe).map(|c| cs.ranges.iter().any(|r| r.contains(c))).unwrap_or(true);
      if !excluded {
        covered = true;
        target.extend(tree.followpos[*leaf_id].iter().copied());
      }
    }

    let (lo, hi) = match (char::from_u32(a), char::from_u32(b - 1)) {
      (Some(lo), Some(hi)) => (lo, hi),
      _ => continue,
    };

    if !covered || target.is_empty() {
      edges.push(DfaEdge { lo, hi, target: None });
      continue;
    }

    let (idx, is_new) = intern_state(target, index_of, queue, &mut next_index);
    if is_new {
      new_states.push(idx);
    }
    edges.push(DfaEdge { lo, hi, target: Some(DfaStateIndex::from_index(idx)) });
  }

  let default = if !inverted.is_empty() {
    let mut target: OrderedSet<LeafId> = OrderedSet::new();
    for (leaf_id, _) in &inverted {
      target.extend(tree.followpos[*leaf_id].iter().copied());
    }
    if target.is_empty() {
      None
    } else {
      let (idx, is_new) = intern_state(target, index_of, queue, &mut next_index);
      if is_new {
        new_states.push(idx);
      }
      Some(DfaStateIndex::from_index(idx))
    }
  } else {
    None
  };

  (edges, default, new_states)
}

/// `0xD800..=0xDFFF` is the UTF-16 surrogate range and has no `char` values;
/// breakpoints are always derived from valid `char` bounds, so the only way
/// an interval touches the gap is at its edges. Clamping here keeps every
/// edge we emit convertible back to a `char` pair.
fn clamp_surrogate_gap(mut a: u32, mut b: u32) -> Option<(u32, u32)> {
  const GAP_LO: u32 = 0xD800;
  const GAP_HI: u32 = 0xE000;
  if a >= GAP_LO && a < GAP_HI {
    a = GAP_HI;
  }
  if b > GAP_LO && b <= GAP_HI {
    b = GAP_LO;
  }
  if a >= b {
    None
  } else {
    Some((a, b))
  }
}

fn resolve_accepts(
  tree: &PositionTree,
  set: &OrderedSet<LeafId>,
  patterns: &[TokenPattern],
  config: &BuildConfig,
  log: &mut BuildLog,
) -> Array<AcceptEntry> {
  let mut ends: Array<(TokenSymbolId, Priority)> = Array::new();
  for &leaf_id in set {
    if let Leaf::End { symbol, priority } = &tree.leaves[leaf_id] {
      ends.push((*symbol, *priority));
    }
  }
  if ends.is_empty() {
    return Array::new();
  }
  ends.sort_by_key(|(sym, prio)| (*prio, sym.0));
  ends.dedup();

  let min_priority = ends[0].1;
  let tied: Array<TokenSymbolId> = ends.iter().filter(|(_, p)| *p == min_priority).map(|(s, _)| *s).collect();

  if tied.len() > 1 {
    let fixed_length_winner = config.prioritize_fixed_length_symbols.then(|| {
      let mut fixed: Array<TokenSymbolId> = tied
        .iter()
        .filter(|sym| patterns.iter().any(|p| p.symbol == **sym && p.fixed_length.is_some()))
        .copied()
        .collect();
      fixed.sort_by_key(|s| s.0);
      fixed
    });

    match fixed_length_winner {
      Some(fixed) if fixed.len() == 1 => {
        // Exactly one tied symbol is fixed-length: it wins the tie outright,
        // no conflict to report (§4.1 step 5).
        ends.retain(|(sym, prio)| *prio != min_priority || *sym == fixed[0]);
      }
      _ => log.push(Diagnostic::IndistinguishableSymbols { symbols: tied }),
    }
  }

  ends.into_iter().map(|(symbol, priority)| AcceptEntry { symbol, priority }).collect()
}

pub use leaf::{Leaf as DfaLeaf, PositionTree as DfaPositionTree};
