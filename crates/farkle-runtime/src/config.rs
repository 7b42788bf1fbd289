//! Run-time configuration, mirroring [farkle_core::BuildConfig]'s
//! chainable-builder shape on the runtime side.

/// Settings controlling how a [crate::api::Parser] allocates and reuses
/// buffer memory for streaming operations.
#[derive(Clone, Copy, Debug)]
pub struct ParseConfig {
  /// Initial capacity requested the first time a streaming parse asks for
  /// buffer space, absent a [crate::pool::BufferPool].
  pub initial_buffer_hint: usize,
}

impl Default for ParseConfig {
  fn default() -> Self {
    Self { initial_buffer_hint: 4096 }
  }
}

impl ParseConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn initial_buffer_hint(mut self, hint: usize) -> Self {
    self.initial_buffer_hint = hint;
    self
  }
}
