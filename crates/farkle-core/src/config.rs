//! Build-time configuration, in the teacher's chainable-builder shape
//! (`radlr_core::ParserConfig`).

/// Settings controlling how the DFA and LALR builders behave when a grammar
/// is ambiguous at the character or token level.
#[derive(Clone, Copy, Debug)]
pub struct BuildConfig {
  /// Hard cap on the number of DFA states the tokenizer builder may create
  /// before failing the build (§4.1 step 6).
  pub max_tokenizer_states: u32,
  /// When two token symbols tie on priority in the same accepting DFA
  /// state, prefer the fixed-length one instead of reporting an
  /// indistinguishable-symbols conflict (§4.1 step 5).
  pub prioritize_fixed_length_symbols: bool,
  /// Default case-sensitivity for regexes that don't override it locally.
  pub case_sensitive_by_default: bool,
  /// Allow the LALR builder to resolve reduce/reduce conflicts through the
  /// operator scope (§4.2); when `false`, reduce/reduce conflicts are always
  /// left unresolved regardless of precedence.
  pub allow_reduce_reduce_resolution: bool,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      max_tokenizer_states: 1 << 16,
      prioritize_fixed_length_symbols: true,
      case_sensitive_by_default: true,
      allow_reduce_reduce_resolution: true,
    }
  }
}

impl BuildConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn max_tokenizer_states(mut self, limit: u32) -> Self {
    self.max_tokenizer_states = limit;
    self
  }

  pub fn prioritize_fixed_length_symbols(mut self, enable: bool) -> Self {
    self.prioritize_fixed_length_symbols = enable;
    self
  }

  pub fn case_sensitive_by_default(mut self, enable: bool) -> Self {
    self.case_sensitive_by_default = enable;
    self
  }

  pub fn allow_reduce_reduce_resolution(mut self, enable: bool) -> Self {
    self.allow_reduce_reduce_resolution = enable;
    self
  }
}

/// A token checked at state-creation loops and each regex visitation (§5
/// Cancellation). The builder fails fast with [crate::error::BuildError::Cancelled]
/// as soon as this returns `true`.
pub trait CancellationToken {
  fn is_cancelled(&self) -> bool;
}

/// The default "never cancel" token, used when a caller has no cancellation
/// source of their own.
#[derive(Clone, Copy, Default)]
pub struct NeverCancel;

impl CancellationToken for NeverCancel {
  fn is_cancelled(&self) -> bool {
    false
  }
}

impl CancellationToken for std::sync::atomic::AtomicBool {
  fn is_cancelled(&self) -> bool {
    self.load(std::sync::atomic::Ordering::Relaxed)
  }
}
