//! The position tree (Aho-style "follow-pos" construction, §4.1 step 2)
//! extended to interval alphabets.

use crate::proxy::OrderedSet;
use crate::regex::{CharSet, Regex};
use crate::types::TokenSymbolId;

use super::Priority;

pub type LeafId = usize;

#[derive(Clone, Debug)]
pub enum Leaf {
  Chars(CharSet),
  End { symbol: TokenSymbolId, priority: Priority },
}

/// A node in the position tree. Leaves are stored out-of-line in
/// [PositionTree::leaves] and referenced by index so `firstpos`/`lastpos`/
/// `followpos` can all be plain leaf-id sets.
#[derive(Clone, Debug)]
pub enum PNode {
  Empty,
  Leaf(LeafId),
  Concat(Box<PNode>, Box<PNode>),
  Alt(Box<PNode>, Box<PNode>),
  Star(Box<PNode>),
}

#[derive(Default)]
pub struct PositionTree {
  pub leaves: Vec<Leaf>,
  pub followpos: Vec<OrderedSet<LeafId>>,
}

impl PositionTree {
  fn push_leaf(&mut self, leaf: Leaf) -> LeafId {
    self.leaves.push(leaf);
    self.followpos.push(OrderedSet::new());
    self.leaves.len() - 1
  }

  /// Lowers an already-case-folded regex (see [Regex::lower]) into a
  /// position-tree node, allocating `Chars` leaves as it goes. `Any` is
  /// represented as an inverted empty set (matches every character).
  fn from_regex(&mut self, r: &Regex) -> PNode {
    match r {
      Regex::Chars(set) => {
        if set.is_void() {
          PNode::Empty
        } else {
          PNode::Leaf(self.push_leaf(Leaf::Chars(set.clone())))
        }
      }
      Regex::Any => PNode::Leaf(self.push_leaf(Leaf::Chars(CharSet { ranges: Vec::new(), invert: true }))),
      Regex::Concat(parts) => {
        let mut iter = parts.iter();
        let Some(first) = iter.next() else { return PNode::Empty };
        let mut node = self.from_regex(first);
        for part in iter {
          let next = self.from_regex(part);
          node = PNode::Concat(Box::new(node), Box::new(next));
        }
        node
      }
      Regex::Alt(parts) => {
        let mut iter = parts.iter();
        let Some(first) = iter.next() else { return PNode::Empty };
        let mut node = self.from_regex(first);
        for part in iter {
          let next = self.from_regex(part);
          node = PNode::Alt(Box::new(node), Box::new(next));
        }
        node
      }
      Regex::Loop { inner, min, max } => self.lower_loop(inner, *min, *max),
      // Resolved away by Regex::lower before the tree is built.
      Regex::Literal(_) | Regex::Pattern(_) | Regex::CaseScope { .. } => {
        unreachable!("regex must be lowered before position-tree construction")
      }
    }
  }

  fn lower_loop(&mut self, inner: &Regex, min: u32, max: Option<u32>) -> PNode {
    match max {
      None => {
        // {min,} == inner^min . inner*
        let mut node = PNode::Empty;
        for _ in 0..min {
          let copy = self.from_regex(inner);
          node = PNode::Concat(Box::new(node), Box::new(copy));
        }
        let star_body = self.from_regex(inner);
        PNode::Concat(Box::new(node), Box::new(PNode::Star(Box::new(star_body))))
      }
      Some(max) => {
        // {min,max} == inner^min . (inner?)^(max-min)
        let mut node = PNode::Empty;
        for _ in 0..min {
          let copy = self.from_regex(inner);
          node = PNode::Concat(Box::new(node), Box::new(copy));
        }
        for _ in 0..max.saturating_sub(min) {
          let copy = self.from_regex(inner);
          let optional = PNode::Alt(Box::new(copy), Box::new(PNode::Empty));
          node = PNode::Concat(Box::new(node), Box::new(optional));
        }
        node
      }
    }
  }

  /// Builds the position-tree node for one tokenizable symbol, producing one
  /// `End` leaf per top-level alternative (§4.1 step 2) so each alternative
  /// can carry its own priority class.
  pub fn add_symbol(&mut self, symbol: TokenSymbolId, lowered_regex: &Regex) -> PNode {
    let alternatives = lowered_regex.top_level_alternatives();
    let mut iter = alternatives.into_iter();
    let Some(first) = iter.next() else { return PNode::Empty };
    let mut node = self.add_alternative(symbol, first);
    for branch in iter {
      let next = self.add_alternative(symbol, branch);
      node = PNode::Alt(Box::new(node), Box::new(next));
    }
    node
  }

  fn add_alternative(&mut self, symbol: TokenSymbolId, branch: &Regex) -> PNode {
    let priority = if branch.has_unbounded_repetition() { super::TERMINAL_PRIORITY } else { super::LITERAL_PRIORITY };
    let body = self.from_regex(branch);
    let end = PNode::Leaf(self.push_leaf(Leaf::End { symbol, priority }));
    PNode::Concat(Box::new(body), Box::new(end))
  }

  pub fn nullable(&self, node: &PNode) -> bool {
    match node {
      PNode::Empty => true,
      PNode::Leaf(_) => false,
      PNode::Concat(a, b) => self.nullable(a) && self.nullable(b),
      PNode::Alt(a, b) => self.nullable(a) || self.nullable(b),
      PNode::Star(_) => true,
    }
  }

  pub fn firstpos(&self, node: &PNode) -> OrderedSet<LeafId> {
    match node {
      PNode::Empty => OrderedSet::new(),
      PNode::Leaf(id) => [*id].into_iter().collect(),
      PNode::Concat(a, b) => {
        if self.nullable(a) {
          self.firstpos(a).into_iter().chain(self.firstpos(b)).collect()
        } else {
          self.firstpos(a)
        }
      }
      PNode::Alt(a, b) => self.firstpos(a).into_iter().chain(self.firstpos(b)).collect(),
      PNode::Star(a) => self.firstpos(a),
    }
  }

  pub fn lastpos(&self, node: &PNode) -> OrderedSet<LeafId> {
    match node {
      PNode::Empty => OrderedSet::new(),
      PNode::Leaf(id) => [*id].into_iter().collect(),
      PNode::Concat(a, b) => {
        if self.nullable(b) {
          self.lastpos(a).into_iter().chain(self.lastpos(b)).collect()
        } else {
          self.lastpos(b)
        }
      }
      PNode::Alt(a, b) => self.lastpos(a).into_iter().chain(self.lastpos(b)).collect(),
      PNode::Star(a) => self.lastpos(a),
    }
  }

  /// Computes `followpos` for every leaf reachable from `node`, recursively.
  pub fn compute_followpos(&mut self, node: &PNode) {
    match node {
      PNode::Empty | PNode::Leaf(_) => {}
      PNode::Concat(a, b) => {
        self.compute_followpos(a);
        self.compute_followpos(b);
        let first_b = self.firstpos(b);
        for i in self.lastpos(a) {
          self.followpos[i].extend(first_b.iter().copied());
        }
      }
      PNode::Alt(a, b) => {
        self.compute_followpos(a);
        self.compute_followpos(b);
      }
      PNode::Star(a) => {
        self.compute_followpos(a);
        let first_a = self.firstpos(a);
        for i in self.lastpos(a) {
          self.followpos[i].extend(first_a.iter().copied());
        }
      }
    }
  }
}
