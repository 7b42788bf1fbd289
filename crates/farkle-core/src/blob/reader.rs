//! Reads a grammar binary image back into an immutable, `Arc`-shareable
//! view with O(1) access by handle (§4.4 Reader, §5 "the grammar blob is
//! read-only and shareable").

use crate::proxy::Array;

use super::layout::*;

#[derive(Debug, Clone)]
pub enum ReaderError {
  BadMagic,
  UnsupportedVersion(u16),
  Truncated(&'static str),
  RowSizeMismatch { table: usize, declared: u16, computed: u16 },
  HandleOutOfRange { what: &'static str },
  DanglingStringOffset { offset: u32 },
}

impl std::fmt::Display for ReaderError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ReaderError::BadMagic => write!(f, "grammar blob has an invalid magic number"),
      ReaderError::UnsupportedVersion(v) => write!(f, "unsupported grammar blob format version {v}"),
      ReaderError::Truncated(what) => write!(f, "grammar blob truncated while reading {what}"),
      ReaderError::RowSizeMismatch { table, declared, computed } => {
        write!(f, "table {table} declares row size {declared} but computed {computed} from heap widths")
      }
      ReaderError::HandleOutOfRange { what } => write!(f, "handle out of range: {what}"),
      ReaderError::DanglingStringOffset { offset } => write!(f, "string heap offset {offset} has no null terminator"),
    }
  }
}

impl std::error::Error for ReaderError {}

#[derive(Clone, Copy, Debug)]
struct TableLoc {
  offset: usize,
  row_count: u32,
  row_size: u16,
}

/// A parsed grammar blob. Table rows are kept as raw byte slices and decoded
/// lazily per access rather than expanded into owned Rust structs, matching
/// the teacher's zero-copy reader idiom (`radlr_rust_runtime`'s bytecode
/// reader indexes directly into the loaded byte buffer).
#[derive(Debug, Clone)]
pub struct GrammarBlob {
  data: Array<u8>,
  widths: HeapWidths,
  tables: [Option<TableLoc>; TABLE_COUNT],
  string_heap_offset: usize,
  string_heap_len: usize,
  blob_heap_offset: usize,
  blob_heap_len: usize,
}

impl GrammarBlob {
  /// Parses and deep-validates `data`: magic, version, declared row sizes,
  /// cross-table handle ranges, and that every string-heap offset lands on
  /// a NUL-terminated string (§4.4 Reader).
  pub fn read(data: &[u8]) -> Result<Self, ReaderError> {
    let blob = Self::parse_header(data)?;
    blob.validate()?;
    Ok(blob)
  }

  /// Parses `data` without the deep validation pass, for trusted input
  /// produced by the same build (§4.4 "An 'unsafe create' variant skips deep
  /// validation for trusted input").
  ///
  /// # Safety
  /// The caller must guarantee `data` was produced by [super::writer::write_grammar]
  /// (or an equally well-formed writer): out-of-range handles or dangling
  /// heap offsets in malformed input will panic or return garbage from
  /// accessors rather than a typed error.
  pub unsafe fn read_unchecked(data: &[u8]) -> Result<Self, ReaderError> {
    Self::parse_header(data)
  }

  fn parse_header(data: &[u8]) -> Result<Self, ReaderError> {
    if data.len() < 4 + 2 + 8 {
      return Err(ReaderError::Truncated("header"));
    }
    if data[0..4] != MAGIC {
      return Err(ReaderError::BadMagic);
    }
    let version = u16::from_le_bytes(data[4..6].try_into().unwrap());
    if version != FORMAT_VERSION {
      return Err(ReaderError::UnsupportedVersion(version));
    }
    let present = u64::from_le_bytes(data[6..14].try_into().unwrap());

    let mut pos = 14;
    let mut row_counts = [0u32; TABLE_COUNT];
    for table in 0..TABLE_COUNT {
      if present & (1 << table) != 0 {
        let bytes = data.get(pos..pos + 4).ok_or(ReaderError::Truncated("row counts"))?;
        row_counts[table] = u32::from_le_bytes(bytes.try_into().unwrap());
        pos += 4;
      }
    }
    let mut row_sizes = [0u16; TABLE_COUNT];
    for table in 0..TABLE_COUNT {
      if present & (1 << table) != 0 {
        let bytes = data.get(pos..pos + 2).ok_or(ReaderError::Truncated("row sizes"))?;
        row_sizes[table] = u16::from_le_bytes(bytes.try_into().unwrap());
        pos += 2;
      }
    }
    let heap_sizes = *data.get(pos).ok_or(ReaderError::Truncated("heap sizes byte"))?;
    pos += 1;
    let widths = HeapWidths::from_heap_sizes_byte(heap_sizes);

    while pos % 4 != 0 {
      pos += 1;
    }

    let mut tables: [Option<TableLoc>; TABLE_COUNT] = [None; TABLE_COUNT];
    for table in 0..TABLE_COUNT {
      if present & (1 << table) == 0 {
        continue;
      }
      let row_size = row_sizes[table];
      let row_count = row_counts[table];
      tables[table] = Some(TableLoc { offset: pos, row_count, row_size });
      pos += row_size as usize * row_count as usize;
    }

    let string_heap_len = u32::from_le_bytes(
      data.get(pos..pos + 4).ok_or(ReaderError::Truncated("string heap length"))?.try_into().unwrap(),
    ) as usize;
    pos += 4;
    let string_heap_offset = pos;
    pos += string_heap_len;

    let blob_heap_len = u32::from_le_bytes(
      data.get(pos..pos + 4).ok_or(ReaderError::Truncated("blob heap length"))?.try_into().unwrap(),
    ) as usize;
    pos += 4;
    let blob_heap_offset = pos;

    if data.len() < blob_heap_offset + blob_heap_len {
      return Err(ReaderError::Truncated("blob heap"));
    }

    Ok(Self { data: data.to_vec(), widths, tables, string_heap_offset, string_heap_len, blob_heap_offset, blob_heap_len })
  }

  fn validate(&self) -> Result<(), ReaderError> {
    for table in 0..TABLE_COUNT {
      if let Some(loc) = self.tables[table] {
        let computed = fixed_row_size(table, self.widths);
        if loc.row_size != computed {
          return Err(ReaderError::RowSizeMismatch { table, declared: loc.row_size, computed });
        }
      }
    }
    // Every declared token-symbol/nonterminal name offset must be zero
    // (nil) or resolve to a NUL-terminated string (§4.4 Reader).
    if let Some(loc) = self.tables[TBL_TOKEN_SYMBOLS] {
      for row in 0..loc.row_count {
        let (name, special, ..) = self.token_symbol_row(loc, row);
        self.check_string_offset(name)?;
        self.check_string_offset(special)?;
      }
    }
    if let Some(loc) = self.tables[TBL_NONTERMS] {
      for row in 0..loc.row_count {
        let (name, special, ..) = self.nonterm_row(loc, row);
        self.check_string_offset(name)?;
        self.check_string_offset(special)?;
      }
    }
    if let (Some(prod_loc), Some(member_loc)) = (self.tables[TBL_PRODUCTIONS], self.tables[TBL_PRODUCTION_MEMBERS]) {
      for row in 0..prod_loc.row_count {
        let (_, _, first_member, count) = self.production_row(prod_loc, row);
        if first_member + count > member_loc.row_count {
          return Err(ReaderError::HandleOutOfRange { what: "production member range" });
        }
      }
    }
    Ok(())
  }

  fn check_string_offset(&self, offset: u32) -> Result<(), ReaderError> {
    if offset == 0 {
      return Ok(());
    }
    let start = self.string_heap_offset + offset as usize;
    if start >= self.string_heap_offset + self.string_heap_len {
      return Err(ReaderError::DanglingStringOffset { offset });
    }
    let heap_end = self.string_heap_offset + self.string_heap_len;
    if self.data[start..heap_end].iter().any(|b| *b == 0) {
      Ok(())
    } else {
      Err(ReaderError::DanglingStringOffset { offset })
    }
  }

  fn row_bytes(&self, loc: TableLoc, row: u32) -> &[u8] {
    let start = loc.offset + row as usize * loc.row_size as usize;
    &self.data[start..start + loc.row_size as usize]
  }

  fn w(&self) -> u8 {
    self.widths.string_offset_bytes
  }

  fn bw(&self) -> u8 {
    self.widths.blob_offset_bytes
  }

  fn token_symbol_row(&self, loc: TableLoc, row: u32) -> (u32, u32, u8, u8, u32) {
    let bytes = self.row_bytes(loc, row);
    let w = self.w() as usize;
    let name = read_offset(bytes, 0, self.w()).unwrap();
    let special = read_offset(bytes, w, self.w()).unwrap();
    let role = bytes[2 * w];
    let attrs = bytes[2 * w + 1];
    let owning_group = read_offset(bytes, 2 * w + 2, self.w()).unwrap();
    (name, special, role, attrs, owning_group)
  }

  fn nonterm_row(&self, loc: TableLoc, row: u32) -> (u32, u32, u32, u32) {
    let bytes = self.row_bytes(loc, row);
    let w = self.w() as usize;
    (
      read_offset(bytes, 0, self.w()).unwrap(),
      read_offset(bytes, w, self.w()).unwrap(),
      read_offset(bytes, 2 * w, self.w()).unwrap(),
      read_offset(bytes, 3 * w, self.w()).unwrap(),
    )
  }

  fn production_row(&self, loc: TableLoc, row: u32) -> (u32, u32, u32, u32) {
    let bytes = self.row_bytes(loc, row);
    let w = self.w() as usize;
    (
      read_offset(bytes, 0, self.w()).unwrap(),
      read_offset(bytes, w, self.w()).unwrap(),
      read_offset(bytes, 2 * w, self.w()).unwrap(),
      read_offset(bytes, 3 * w, self.w()).unwrap(),
    )
  }

  pub fn string_at(&self, offset: u32) -> &str {
    if offset == 0 {
      return "";
    }
    let start = self.string_heap_offset + offset as usize;
    let heap_end = self.string_heap_offset + self.string_heap_len;
    let end = self.data[start..heap_end].iter().position(|b| *b == 0).map(|p| start + p).unwrap_or(heap_end);
    std::str::from_utf8(&self.data[start..end]).unwrap_or("")
  }

  fn blob_at(&self, offset: u32) -> &[u8] {
    let start = self.blob_heap_offset + offset as usize;
    let (len, header) = read_compressed_len(&self.data[start..]).expect("well-formed blob heap entry");
    &self.data[start + header..start + header + len as usize]
  }

  pub fn token_symbol_count(&self) -> u32 {
    self.tables[TBL_TOKEN_SYMBOLS].map(|l| l.row_count).unwrap_or(0)
  }

  pub fn token_symbol(&self, index: u32) -> TokenSymbolView<'_> {
    let loc = self.tables[TBL_TOKEN_SYMBOLS].expect("token symbol table present");
    let (name, special, role, attrs, owning_group) = self.token_symbol_row(loc, index);
    TokenSymbolView {
      name: self.string_at(name),
      special_name: (special != 0).then(|| self.string_at(special)),
      role,
      attrs,
      owning_group: (owning_group != 0).then_some(owning_group - 1),
    }
  }

  pub fn nonterm_count(&self) -> u32 {
    self.tables[TBL_NONTERMS].map(|l| l.row_count).unwrap_or(0)
  }

  pub fn nonterm(&self, index: u32) -> NonTermView<'_> {
    let loc = self.tables[TBL_NONTERMS].expect("nonterm table present");
    let (name, special, first_production, production_count) = self.nonterm_row(loc, index);
    NonTermView {
      name: self.string_at(name),
      special_name: (special != 0).then(|| self.string_at(special)),
      first_production,
      production_count,
    }
  }

  pub fn production_count(&self) -> u32 {
    self.tables[TBL_PRODUCTIONS].map(|l| l.row_count).unwrap_or(0)
  }

  pub fn production(&self, index: u32) -> ProductionView {
    let loc = self.tables[TBL_PRODUCTIONS].expect("production table present");
    let (head, precedence_token, first_member, member_count) = self.production_row(loc, index);
    ProductionView {
      head,
      precedence_token: (precedence_token != 0).then_some(precedence_token),
      first_member,
      member_count,
    }
  }

  pub fn production_member(&self, index: u32) -> (u8, u32) {
    let loc = self.tables[TBL_PRODUCTION_MEMBERS].expect("production member table present");
    let bytes = self.row_bytes(loc, index);
    let kind = bytes[0];
    let handle = read_offset(bytes, 1, self.w()).unwrap();
    (kind, handle)
  }

  pub fn group_count(&self) -> u32 {
    self.tables[TBL_GROUPS].map(|l| l.row_count).unwrap_or(0)
  }

  pub fn group(&self, index: u32) -> GroupView<'_> {
    let loc = self.tables[TBL_GROUPS].expect("group table present");
    let bytes = self.row_bytes(loc, index);
    let w = self.w() as usize;
    let name = read_offset(bytes, 0, self.w()).unwrap();
    let start = read_offset(bytes, w, self.w()).unwrap();
    let end = read_offset(bytes, 2 * w, self.w()).unwrap();
    let flags = bytes[3 * w];
    let nesting_start = read_offset(bytes, 3 * w + 1, self.w()).unwrap();
    let nesting_count = read_offset(bytes, 4 * w + 1, self.w()).unwrap();
    GroupView {
      name: self.string_at(name),
      start,
      end: (end != 0).then_some(end),
      advance_by_character: flags & 0x1 != 0,
      ends_on_end_of_input: flags & 0x2 != 0,
      keep_end_token: flags & 0x4 != 0,
      nesting_start,
      nesting_count,
    }
  }

  pub fn group_nesting(&self, index: u32) -> u32 {
    let loc = self.tables[TBL_GROUP_NESTINGS].expect("group nesting table present");
    read_offset(self.row_bytes(loc, index), 0, self.w()).unwrap()
  }

  pub fn special_name_count(&self) -> u32 {
    self.tables[TBL_SPECIAL_NAMES].map(|l| l.row_count).unwrap_or(0)
  }

  pub fn special_name(&self, index: u32) -> (&str, u8, u32) {
    let loc = self.tables[TBL_SPECIAL_NAMES].expect("special name table present");
    let bytes = self.row_bytes(loc, index);
    let w = self.w() as usize;
    let name = read_offset(bytes, 0, self.w()).unwrap();
    let kind = bytes[w];
    let target = read_offset(bytes, w + 1, self.w()).unwrap();
    (self.string_at(name), kind, target)
  }

  pub fn header(&self) -> GrammarHeaderView {
    let loc = self.tables[TBL_GRAMMAR_HEADER].expect("grammar header row present");
    let bytes = self.row_bytes(loc, 0);
    let w = self.w() as usize;
    GrammarHeaderView {
      start_nonterm: read_offset(bytes, 0, self.w()).unwrap(),
      terminal_count: read_offset(bytes, w, self.w()).unwrap(),
      unparsable: bytes[2 * w] != 0,
      dfa_state_count: read_offset(bytes, 2 * w + 1, self.w()).unwrap(),
      dfa_start: read_offset(bytes, 3 * w + 1, self.w()).unwrap(),
      lalr_state_count: read_offset(bytes, 4 * w + 1, self.w()).unwrap(),
      lalr_start: read_offset(bytes, 5 * w + 1, self.w()).unwrap(),
    }
  }

  /// Decodes the DFA-state-machine row at `index` (0-based among DFA
  /// states; the state-machine table lists all DFA states before any LALR
  /// state, per the writer's layout).
  pub fn dfa_state(&self, index: u32) -> DfaStateView {
    let loc = self.tables[TBL_STATE_MACHINES].expect("state machine table present");
    let bytes = self.row_bytes(loc, index);
    debug_assert_eq!(bytes[0], 0, "expected a DfaState row");
    let blob_offset = read_offset(bytes, 1, self.bw()).unwrap();
    DfaStateView::decode(self.blob_at(blob_offset))
  }

  /// Decodes the LALR-state-machine row. `index` is 0-based among LALR
  /// states; callers add `header().dfa_state_count` to get the absolute
  /// state-machine table row.
  pub fn lalr_state(&self, index: u32) -> LalrStateView {
    let loc = self.tables[TBL_STATE_MACHINES].expect("state machine table present");
    let header = self.header();
    let bytes = self.row_bytes(loc, header.dfa_state_count + index);
    debug_assert_eq!(bytes[0], 1, "expected a LalrState row");
    let blob_offset = read_offset(bytes, 1, self.bw()).unwrap();
    LalrStateView::decode(self.blob_at(blob_offset))
  }
}

#[derive(Clone, Copy, Debug)]
pub struct TokenSymbolView<'a> {
  pub name: &'a str,
  pub special_name: Option<&'a str>,
  pub role: u8,
  pub attrs: u8,
  pub owning_group: Option<u32>,
}

#[derive(Clone, Copy, Debug)]
pub struct NonTermView<'a> {
  pub name: &'a str,
  pub special_name: Option<&'a str>,
  pub first_production: u32,
  pub production_count: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct ProductionView {
  pub head: u32,
  pub precedence_token: Option<u32>,
  pub first_member: u32,
  pub member_count: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct GroupView<'a> {
  pub name: &'a str,
  pub start: u32,
  pub end: Option<u32>,
  pub advance_by_character: bool,
  pub ends_on_end_of_input: bool,
  pub keep_end_token: bool,
  pub nesting_start: u32,
  pub nesting_count: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct GrammarHeaderView {
  pub start_nonterm: u32,
  pub terminal_count: u32,
  pub unparsable: bool,
  pub dfa_state_count: u32,
  pub dfa_start: u32,
  pub lalr_state_count: u32,
  pub lalr_start: u32,
}

#[derive(Clone, Debug)]
pub struct DfaStateView {
  pub edges: Array<(u32, u32, Option<u32>)>,
  pub default: Option<u32>,
  pub accepts: Array<(u32, u32)>,
  pub winner: Option<u32>,
}

impl DfaStateView {
  fn decode(buf: &[u8]) -> Self {
    let mut pos = 0;
    let edge_count = read_u32(buf, &mut pos);
    let mut edges = Array::with_capacity(edge_count as usize);
    for _ in 0..edge_count {
      let lo = read_u32(buf, &mut pos);
      let hi = read_u32(buf, &mut pos);
      let target = read_u32(buf, &mut pos);
      edges.push((lo, hi, (target != 0).then_some(target - 1)));
    }
    let default = read_u32(buf, &mut pos);
    let accept_count = read_u32(buf, &mut pos);
    let mut accepts = Array::with_capacity(accept_count as usize);
    for _ in 0..accept_count {
      let symbol = read_u32(buf, &mut pos);
      let priority = read_u32(buf, &mut pos);
      accepts.push((symbol, priority));
    }
    let winner = read_u32(buf, &mut pos);
    Self { edges, default: (default != 0).then_some(default - 1), accepts, winner: (winner != 0).then_some(winner) }
  }
}

#[derive(Clone, Debug)]
pub struct LalrStateView {
  /// `(lookahead_kind, lookahead_token, action_kind, value)`: kind 0=token
  /// lookahead/1=end-of-input; action kind 0=shift(target state index)/
  /// 1=reduce (production row index)/2=accept (value unused). `value` is
  /// already converted to a 0-based row index, matching every other
  /// accessor on this type (c.f. [DfaStateView::decode]'s `target - 1`).
  pub actions: Array<(u8, u32, u8, u32)>,
  /// `(nonterm handle, target state index)`; `nonterm` stays a raw 1-based
  /// handle since it's only ever compared against [ProductionView::head],
  /// which is stored the same way.
  pub gotos: Array<(u32, u32)>,
}

impl LalrStateView {
  fn decode(buf: &[u8]) -> Self {
    let mut pos = 0;
    let action_count = read_u32(buf, &mut pos);
    let mut actions = Array::with_capacity(action_count as usize);
    for _ in 0..action_count {
      let la_kind = buf[pos];
      pos += 1;
      let la_token = read_u32(buf, &mut pos);
      let action_kind = buf[pos];
      pos += 1;
      let value = read_u32(buf, &mut pos);
      let value = if action_kind == 2 { value } else { value - 1 };
      actions.push((la_kind, la_token, action_kind, value));
    }
    let goto_count = read_u32(buf, &mut pos);
    let mut gotos = Array::with_capacity(goto_count as usize);
    for _ in 0..goto_count {
      let nonterm = read_u32(buf, &mut pos);
      let target = read_u32(buf, &mut pos);
      gotos.push((nonterm, target - 1));
    }
    Self { actions, gotos }
  }
}

fn read_u32(buf: &[u8], pos: &mut usize) -> u32 {
  let v = u32::from_le_bytes(buf[*pos..*pos + 4].try_into().unwrap());
  *pos += 4;
  v
}
