//! Character buffer manager (§4.3.1): an arena-owned character vector with
//! `used_start`/`used_end` indices tracking the live window the tokenizer is
//! still working over.

/// Owns the character arena backing one parsing operation. `used_start` is
/// the first character still needed (the start of the token currently being
/// matched); `used_end` is one past the last character written so far.
#[derive(Debug)]
pub struct CharBuffer {
  data: Vec<char>,
  used_start: usize,
  used_end: usize,
  complete: bool,
}

impl CharBuffer {
  pub fn new() -> Self {
    Self::with_capacity(4096)
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self { data: Vec::with_capacity(capacity), used_start: 0, used_end: 0, complete: false }
  }

  /// Exposes free space past `used_end` sized at least `hint` characters,
  /// growing or sliding the buffer as needed. Returns a mutable slice the
  /// caller fills with newly read characters, to be committed with
  /// [Self::advance].
  pub fn get_span(&mut self, hint: usize) -> &mut [char] {
    let free = self.data.len() - self.used_end;
    if free < hint {
      let tail_if_slid = self.data.len() - (self.used_end - self.used_start);
      if self.used_start > 0 && tail_if_slid >= hint {
        self.slide();
      } else {
        let want = self.used_end + hint.max(self.data.len());
        self.data.resize(want, '\0');
      }
    }
    let end = self.data.len();
    &mut self.data[self.used_end..end]
  }

  /// Slides the live window `[used_start, used_end)` down to offset 0,
  /// reclaiming space before `used_start` without reallocating.
  fn slide(&mut self) {
    if self.used_start == 0 {
      return;
    }
    self.data.copy_within(self.used_start..self.used_end, 0);
    self.used_end -= self.used_start;
    self.used_start = 0;
  }

  /// Commits `n` characters written into the span returned by
  /// [Self::get_span].
  pub fn advance(&mut self, n: usize) {
    self.used_end += n;
    debug_assert!(self.used_end <= self.data.len());
  }

  /// Marks the input as exhausted. No further [Self::get_span]/[Self::advance]
  /// calls are valid after this.
  pub fn complete_input(&mut self) {
    self.complete = true;
  }

  pub fn is_complete(&self) -> bool {
    self.complete
  }

  /// The live window, from the oldest character still needed by the
  /// in-flight token to the last character written.
  pub fn live(&self) -> &[char] {
    &self.data[self.used_start..self.used_end]
  }

  pub fn used_start(&self) -> usize {
    self.used_start
  }

  pub fn used_end(&self) -> usize {
    self.used_end
  }

  /// Shifts `used_start` forward by `total_consumed` characters past the
  /// previous `used_start` (the tokenizer is done needing them), and when
  /// `completed` is set, resets the buffer to an empty, reusable state and
  /// returns it for pooling.
  pub fn update_from_parser(&mut self, total_consumed: usize, completed: bool) {
    self.used_start += total_consumed;
    debug_assert!(self.used_start <= self.used_end);
    if completed {
      self.used_start = 0;
      self.used_end = 0;
    }
  }

  /// Resets the buffer to a pristine, empty state for reuse from a pool.
  pub fn reset(&mut self) {
    self.used_start = 0;
    self.used_end = 0;
    self.complete = false;
  }
}

impl Default for CharBuffer {
  fn default() -> Self {
    Self::new()
  }
}
