//! Shared constants and primitive codecs for the grammar binary format
//! (§3 Grammar file, §6 External Interfaces).

pub const MAGIC: [u8; 4] = *b"FRKL";
pub const FORMAT_VERSION: u16 = 1;

/// Table indices, in the fixed on-disk order named by §6:
/// "token symbols, groups, group nestings, nonterminals, productions,
/// production members, state machines, special names, and the grammar
/// header row".
pub const TBL_TOKEN_SYMBOLS: usize = 0;
pub const TBL_GROUPS: usize = 1;
pub const TBL_GROUP_NESTINGS: usize = 2;
pub const TBL_NONTERMS: usize = 3;
pub const TBL_PRODUCTIONS: usize = 4;
pub const TBL_PRODUCTION_MEMBERS: usize = 5;
pub const TBL_STATE_MACHINES: usize = 6;
pub const TBL_SPECIAL_NAMES: usize = 7;
pub const TBL_GRAMMAR_HEADER: usize = 8;
pub const TABLE_COUNT: usize = 9;

/// Row sizes depend on the declared heap handle widths (§3 "heap handle
/// widths (2 or 4 bytes) declared in the header so readers can size
/// references"): every field that is a string-heap offset or a table/handle
/// reference scales with `widths.string_offset_bytes`; blob-heap references
/// (used only by the state-machine table) scale with `widths.blob_offset_bytes`.
/// Non-heap fixed-width fields (role bytes, flag bytes) are always 1 byte.
pub fn fixed_row_size(table: usize, widths: HeapWidths) -> u16 {
  let s = widths.string_offset_bytes as u16;
  let b = widths.blob_offset_bytes as u16;
  match table {
    TBL_TOKEN_SYMBOLS => s + s + 1 + 1 + s, // name, special_name, role, attrs, owning_group
    TBL_GROUPS => s + s + s + 1 + s + s,    // name, start, end, flags, nesting_start, nesting_count
    TBL_GROUP_NESTINGS => s,                // inner group handle
    TBL_NONTERMS => s + s + s + s,          // name, special_name, first_production, production_count
    TBL_PRODUCTIONS => s + s + s + s,       // head, precedence_token, first_member, member_count
    TBL_PRODUCTION_MEMBERS => 1 + s,        // kind, handle
    TBL_STATE_MACHINES => 1 + b,            // kind, blob handle
    TBL_SPECIAL_NAMES => s + 1 + s,         // name, target_kind, target
    TBL_GRAMMAR_HEADER => s + s + 1 + s + s + s + s,
    // start_nonterm, terminal_count, unparsable, dfa_state_count, dfa_start,
    // lalr_state_count, lalr_start
    _ => unreachable!("table index out of range"),
  }
}

/// Writes `value` as an ECMA-style compressed length prefix: one byte for
/// values under `0x80`, two for values under `0x4000`, four otherwise (§4.4
/// Writer, §6 "each blob preceded by a compressed length... one, two, or
/// four bytes").
pub fn write_compressed_len(buf: &mut Vec<u8>, value: u32) {
  if value <= 0x7F {
    buf.push(value as u8);
  } else if value <= 0x3FFF {
    let v = 0x8000 | value;
    buf.push((v >> 8) as u8);
    buf.push(v as u8);
  } else {
    let v = 0xC000_0000 | value;
    buf.extend_from_slice(&v.to_be_bytes());
  }
}

/// Reads a compressed length prefix written by [write_compressed_len].
/// Returns `(value, bytes_consumed)`.
pub fn read_compressed_len(data: &[u8]) -> Option<(u32, usize)> {
  let b0 = *data.first()?;
  if b0 & 0x80 == 0 {
    Some((b0 as u32, 1))
  } else if b0 & 0xC0 == 0x80 {
    let b1 = *data.get(1)?;
    Some(((((b0 & 0x3F) as u32) << 8) | b1 as u32, 2))
  } else {
    let bytes: [u8; 4] = data.get(0..4)?.try_into().ok()?;
    Some((u32::from_be_bytes(bytes) & 0x1FFF_FFFF, 4))
  }
}

#[derive(Clone, Copy, Debug)]
pub struct HeapWidths {
  pub string_offset_bytes: u8,
  pub blob_offset_bytes: u8,
}

impl HeapWidths {
  pub fn from_heap_sizes_byte(b: u8) -> Self {
    Self {
      string_offset_bytes: if b & 0x1 != 0 { 2 } else { 4 },
      blob_offset_bytes: if b & 0x2 != 0 { 2 } else { 4 },
    }
  }

  pub fn to_heap_sizes_byte(self) -> u8 {
    let mut b = 0u8;
    if self.string_offset_bytes == 2 {
      b |= 0x1;
    }
    if self.blob_offset_bytes == 2 {
      b |= 0x2;
    }
    b
  }

  pub fn for_heap_len(len: usize) -> u8 {
    if len < u16::MAX as usize {
      2
    } else {
      4
    }
  }
}

pub fn write_offset(buf: &mut Vec<u8>, width: u8, value: u32) {
  if width == 2 {
    buf.extend_from_slice(&(value as u16).to_le_bytes());
  } else {
    buf.extend_from_slice(&value.to_le_bytes());
  }
}

pub fn read_offset(data: &[u8], pos: usize, width: u8) -> Option<u32> {
  if width == 2 {
    Some(u16::from_le_bytes(data.get(pos..pos + 2)?.try_into().ok()?) as u32)
  } else {
    Some(u32::from_le_bytes(data.get(pos..pos + 4)?.try_into().ok()?))
  }
}
