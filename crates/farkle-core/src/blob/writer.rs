//! Assembles a grammar and its built DFA/LALR tables into the on-disk byte
//! image described by §3/§6 (header, string heap, blob heap, tables in
//! fixed order).

use crate::dfa::Dfa;
use crate::diagnostics::BuildLog;
use crate::lalr::{LalrAction, LalrTable, Lookahead};
use crate::proxy::Map;
use crate::types::{GrammarDef, SymbolHandle, TokenRole};

use super::layout::*;

/// Serializes `grammar` plus its built tables into a single byte blob.
/// Callers build the DFA and LALR tables first (§4.1/§4.2) and hand them to
/// the writer together, matching §2's build-time control flow: "grammar
/// definition → DFA build → LALR build → binary writer → persisted
/// grammar".
///
/// `log` carries every diagnostic accumulated building `dfa` and `lalr`
/// (unresolved conflicts, indistinguishable symbols, a DFA start state that
/// accepts); the persisted `Unparsable` header bit is set whenever `grammar`
/// was already marked unparsable at freeze time OR `log` does (§3
/// invariants), so a caller loading the blob back doesn't have to separately
/// keep the build log around to know whether the grammar is usable.
pub fn write_grammar(grammar: &GrammarDef, dfa: &Dfa, lalr: &LalrTable, log: &BuildLog) -> Vec<u8> {
  let mut strings = StringHeapBuilder::new();
  let mut blobs = BlobHeapBuilder::new();

  // Pre-intern every name so the heap is fully sized before row widths (and
  // therefore `widths`) are decided.
  let token_names: Vec<(u32, u32)> = grammar
    .token_symbols
    .iter()
    .map(|t| {
      let name = strings.intern(grammar.strings.get(t.name));
      let special = t.special_name.map(|s| strings.intern(grammar.strings.get(s))).unwrap_or(0);
      (name, special)
    })
    .collect();
  let group_names: Vec<u32> = grammar.groups.iter().map(|g| strings.intern(grammar.strings.get(g.name))).collect();
  let nonterm_names: Vec<(u32, u32)> = grammar
    .nonterms
    .iter()
    .map(|n| {
      let name = strings.intern(grammar.strings.get(n.name));
      let special = n.special_name.map(|s| strings.intern(grammar.strings.get(s))).unwrap_or(0);
      (name, special)
    })
    .collect();
  let special_name_rows: Vec<(u32, u8, u32)> = {
    let mut rows: Vec<(u32, u8, u32)> = grammar
      .special_names
      .iter()
      .map(|(name, target)| {
        let name_off = strings.intern(grammar.strings.get(*name));
        match target {
          crate::types::SpecialNameTarget::Token(t) => (name_off, 0u8, t.0),
          crate::types::SpecialNameTarget::NonTerm(n) => (name_off, 1u8, n.0),
        }
      })
      .collect();
    rows.sort_by_key(|(name, ..)| *name);
    rows
  };

  let dfa_state_blobs: Vec<u32> = dfa.states.iter().map(|s| blobs.push(encode_dfa_state(s))).collect();
  let lalr_state_blobs: Vec<u32> = lalr.states.iter().map(|s| blobs.push(encode_lalr_state(s))).collect();

  let widths = HeapWidths {
    string_offset_bytes: HeapWidths::for_heap_len(strings.len()),
    blob_offset_bytes: HeapWidths::for_heap_len(blobs.len()),
  };

  let mut present: u64 = 0;
  for table in [
    TBL_TOKEN_SYMBOLS,
    TBL_GROUPS,
    TBL_GROUP_NESTINGS,
    TBL_NONTERMS,
    TBL_PRODUCTIONS,
    TBL_PRODUCTION_MEMBERS,
    TBL_STATE_MACHINES,
    TBL_SPECIAL_NAMES,
    TBL_GRAMMAR_HEADER,
  ] {
    present |= 1 << table;
  }

  let row_counts = [
    grammar.token_symbols.len() as u32,
    grammar.groups.len() as u32,
    grammar.groups.iter().map(|g| g.nesting.len() as u32).sum(),
    grammar.nonterms.len() as u32,
    grammar.productions.len() as u32,
    grammar.productions.iter().map(|p| p.members.len() as u32).sum(),
    (dfa.states.len() + lalr.states.len()) as u32,
    special_name_rows.len() as u32,
    1,
  ];

  let mut out = Vec::new();
  out.extend_from_slice(&MAGIC);
  out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
  out.extend_from_slice(&present.to_le_bytes());
  for count in row_counts {
    out.extend_from_slice(&count.to_le_bytes());
  }
  for table in 0..TABLE_COUNT {
    out.extend_from_slice(&fixed_row_size(table, widths).to_le_bytes());
  }
  out.push(widths.to_heap_sizes_byte());
  while out.len() % 4 != 0 {
    out.push(0);
  }

  let w = widths.string_offset_bytes;
  let bw = widths.blob_offset_bytes;

  // --- Token symbols ---
  for (i, t) in grammar.token_symbols.iter().enumerate() {
    let (name, special) = token_names[i];
    write_offset(&mut out, w, name);
    write_offset(&mut out, w, special);
    out.push(role_byte(t.role));
    out.push(attrs_byte(t.attributes));
    write_offset(&mut out, w, t.owning_group.map(|g| g.0).unwrap_or(0));
  }

  // --- Groups + group nestings ---
  let mut nesting_rows: Vec<u32> = Vec::new();
  for (i, g) in grammar.groups.iter().enumerate() {
    let nesting_start = nesting_rows.len() as u32;
    for inner in &g.nesting {
      nesting_rows.push(inner.0);
    }
    write_offset(&mut out, w, group_names[i]);
    write_offset(&mut out, w, g.start.0);
    write_offset(&mut out, w, g.end.map(|e| e.0).unwrap_or(0));
    out.push(group_flags_byte(g));
    write_offset(&mut out, w, nesting_start);
    write_offset(&mut out, w, g.nesting.len() as u32);
  }
  for inner in &nesting_rows {
    write_offset(&mut out, w, *inner);
  }

  // --- Nonterminals ---
  for (i, n) in grammar.nonterms.iter().enumerate() {
    let (name, special) = nonterm_names[i];
    write_offset(&mut out, w, name);
    write_offset(&mut out, w, special);
    write_offset(&mut out, w, n.first_production.0);
    write_offset(&mut out, w, n.production_count);
  }

  // --- Productions + production members ---
  let mut member_rows: Vec<(u8, u32)> = Vec::new();
  for p in &grammar.productions {
    let first_member = member_rows.len() as u32;
    for m in &p.members {
      member_rows.push(match m {
        SymbolHandle::Token(t) => (0u8, t.0),
        SymbolHandle::NonTerm(n) => (1u8, n.0),
      });
    }
    write_offset(&mut out, w, p.head.0);
    write_offset(&mut out, w, p.precedence_token.map(|t| t.0).unwrap_or(0));
    write_offset(&mut out, w, first_member);
    write_offset(&mut out, w, p.members.len() as u32);
  }
  for (kind, handle) in &member_rows {
    out.push(*kind);
    write_offset(&mut out, w, *handle);
  }

  // --- State machines: DFA states first, then LALR states ---
  for blob_index in &dfa_state_blobs {
    out.push(0); // kind = DfaState
    write_offset(&mut out, bw, *blob_index);
  }
  for blob_index in &lalr_state_blobs {
    out.push(1); // kind = LalrState
    write_offset(&mut out, bw, *blob_index);
  }

  // --- Special names ---
  for (name, kind, target) in &special_name_rows {
    write_offset(&mut out, w, *name);
    out.push(*kind);
    write_offset(&mut out, w, *target);
  }

  // --- Grammar header row ---
  write_offset(&mut out, w, grammar.start_nonterm.0);
  write_offset(&mut out, w, grammar.terminal_count() as u32);
  out.push((grammar.unparsable || log.is_unparsable()) as u8);
  write_offset(&mut out, w, dfa.states.len() as u32);
  write_offset(&mut out, w, dfa.start.0);
  write_offset(&mut out, w, lalr.states.len() as u32);
  write_offset(&mut out, w, lalr.start.0);

  // --- Heaps ---
  out.extend_from_slice(&(strings.bytes.len() as u32).to_le_bytes());
  out.extend_from_slice(&strings.bytes);
  out.extend_from_slice(&(blobs.bytes.len() as u32).to_le_bytes());
  out.extend_from_slice(&blobs.bytes);

  out
}

fn role_byte(role: TokenRole) -> u8 {
  match role {
    TokenRole::Terminal => 0,
    TokenRole::GroupStart => 1,
    TokenRole::GroupEnd => 2,
  }
}

fn attrs_byte(attrs: crate::types::TokenAttributes) -> u8 {
  (attrs.hidden as u8) | ((attrs.noise as u8) << 1) | ((attrs.generated as u8) << 2)
}

fn group_flags_byte(g: &crate::types::Group) -> u8 {
  (g.advance_by_character as u8) | ((g.ends_on_end_of_input as u8) << 1) | ((g.keep_end_token as u8) << 2)
}

struct StringHeapBuilder {
  bytes: Vec<u8>,
  lookup: Map<String, u32>,
}

impl StringHeapBuilder {
  fn new() -> Self {
    // Leading NUL byte; offset 0 means "no name" (§3 invariants: 0 is nil).
    Self { bytes: vec![0], lookup: Map::default() }
  }

  fn intern(&mut self, s: &str) -> u32 {
    if s.is_empty() {
      return 0;
    }
    if let Some(&off) = self.lookup.get(s) {
      return off;
    }
    let offset = self.bytes.len() as u32;
    self.bytes.extend_from_slice(s.as_bytes());
    self.bytes.push(0);
    self.lookup.insert(s.to_string(), offset);
    offset
  }

  fn len(&self) -> usize {
    self.bytes.len()
  }
}

struct BlobHeapBuilder {
  bytes: Vec<u8>,
}

impl BlobHeapBuilder {
  fn new() -> Self {
    Self { bytes: Vec::new() }
  }

  /// Appends a length-prefixed blob and returns its byte offset.
  fn push(&mut self, content: Vec<u8>) -> u32 {
    let offset = self.bytes.len() as u32;
    write_compressed_len(&mut self.bytes, content.len() as u32);
    self.bytes.extend_from_slice(&content);
    offset
  }

  fn len(&self) -> usize {
    self.bytes.len()
  }
}

fn encode_dfa_state(state: &crate::dfa::DfaState) -> Vec<u8> {
  let mut buf = Vec::new();
  buf.extend_from_slice(&(state.edges.len() as u32).to_le_bytes());
  for e in &state.edges {
    buf.extend_from_slice(&(e.lo as u32).to_le_bytes());
    buf.extend_from_slice(&(e.hi as u32).to_le_bytes());
    // DfaStateIndex is already 1-based (0 = nil), so its raw value doubles
    // as the nil-safe encoding; no extra offset needed here.
    buf.extend_from_slice(&e.target.map(|t| t.0).unwrap_or(0).to_le_bytes());
  }
  buf.extend_from_slice(&state.default.map(|d| d.0).unwrap_or(0).to_le_bytes());
  buf.extend_from_slice(&(state.accepts.len() as u32).to_le_bytes());
  for a in &state.accepts {
    buf.extend_from_slice(&a.symbol.0.to_le_bytes());
    buf.extend_from_slice(&a.priority.to_le_bytes());
  }
  buf.extend_from_slice(&state.winner.map(|s| s.0).unwrap_or(0).to_le_bytes());
  buf
}

fn encode_lalr_state(state: &crate::lalr::LalrState) -> Vec<u8> {
  let mut buf = Vec::new();
  buf.extend_from_slice(&(state.actions.len() as u32).to_le_bytes());
  for (lookahead, action) in &state.actions {
    let (la_kind, la_token) = match lookahead {
      Lookahead::Token(t) => (0u8, t.0),
      Lookahead::EndOfInput => (1u8, 0),
    };
    buf.push(la_kind);
    buf.extend_from_slice(&la_token.to_le_bytes());
    let (action_kind, value) = match action {
      LalrAction::Shift(target) => (0u8, target.0),
      LalrAction::Reduce(production) => (1u8, production.0),
      LalrAction::Accept => (2u8, 0),
    };
    buf.push(action_kind);
    buf.extend_from_slice(&value.to_le_bytes());
  }
  buf.extend_from_slice(&(state.gotos.len() as u32).to_le_bytes());
  for (nonterm, target) in &state.gotos {
    buf.extend_from_slice(&nonterm.0.to_le_bytes());
    buf.extend_from_slice(&target.0.to_le_bytes());
  }
  buf
}
