//! The public parser entry points (§6 External Interfaces): `parse`,
//! `parse_streaming`, and the read-only `ParserState` a caller can inspect
//! mid-parse.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use farkle_core::blob::GrammarBlob;

use crate::buffer::CharBuffer;
use crate::config::ParseConfig;
use crate::error::RuntimeError;
use crate::lalr_driver::{DriveOutcome, LalrDriver};
use crate::pool::BufferPool;
use crate::position::{Position, PositionTracker};
use crate::semantic::SemanticProvider;
use crate::tokenizer::{DfaTokenizer, TokenizerInput};

/// Read-only view of a streaming operation's progress (§6 "parser_state:
/// read-only current_position, total_characters_consumed, input_name,
/// opaque key-value store").
pub struct ParserState {
  position: Position,
  total_consumed: u64,
  input_name: Option<String>,
  /// Arbitrary-object slot store (§5 "the parser state dictionary...
  /// belongs to a single operation and is not shared"), keyed by a
  /// well-known string rather than a dedicated opaque-key type — callers
  /// only ever read back a slot they themselves inserted under a name they
  /// chose, so a `&'static str` key is exactly as opaque as they need.
  store: HashMap<&'static str, Box<dyn Any>>,
}

impl ParserState {
  fn new(input_name: Option<String>) -> Self {
    Self { position: Position::START, total_consumed: 0, input_name, store: HashMap::new() }
  }

  pub fn current_position(&self) -> Position {
    self.position
  }

  pub fn total_characters_consumed(&self) -> u64 {
    self.total_consumed
  }

  pub fn input_name(&self) -> Option<&str> {
    self.input_name.as_deref()
  }

  pub fn get<T: 'static>(&self, key: &'static str) -> Option<&T> {
    self.store.get(key).and_then(|b| b.downcast_ref())
  }

  pub fn insert<T: 'static>(&mut self, key: &'static str, value: T) {
    self.store.insert(key, Box::new(value));
  }

  pub fn remove(&mut self, key: &'static str) -> Option<Box<dyn Any>> {
    self.store.remove(key)
  }
}

/// A parser bound to one grammar blob. Immutable and freely shareable
/// across threads (§5); each call to [Parser::parse]/[Parser::begin_streaming]
/// owns its own mutable state.
#[derive(Clone)]
pub struct Parser {
  blob: Arc<GrammarBlob>,
  config: ParseConfig,
  pool: Option<Arc<BufferPool>>,
}

impl Parser {
  pub fn new(blob: Arc<GrammarBlob>) -> Self {
    Self { blob, config: ParseConfig::default(), pool: None }
  }

  pub fn with_config(blob: Arc<GrammarBlob>, config: ParseConfig) -> Self {
    Self { blob, config, pool: None }
  }

  pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
    self.pool = Some(pool);
    self
  }

  pub fn grammar(&self) -> &GrammarBlob {
    &self.blob
  }

  /// Parses a complete, already-available buffer (§6 "parse(span) ->
  /// Result<T, Error>"). Equivalent to opening a streaming operation,
  /// writing the whole input at once, and marking it final.
  pub fn parse<V, E>(&self, input: &str, sem: &dyn SemanticProvider<char, V, E>) -> Result<V, RuntimeError<E>> {
    let mut stream = self.begin_streaming(None);
    let chars: Vec<char> = input.chars().collect();
    if !chars.is_empty() {
      let span = stream.get_buffer(chars.len());
      span[..chars.len()].copy_from_slice(&chars);
      stream.advance(chars.len());
    }
    stream.complete_input();
    match stream.resume(sem) {
      DriveOutcome::Accepted(v) => Ok(v),
      DriveOutcome::Error(e) => Err(e),
      // §4.3.3: "On is_final_block the tokenizer must always return true",
      // so a complete drive over a fully-final buffer always decides.
      DriveOutcome::NeedMoreInput => unreachable!("a final-block parse must always reach a decision"),
    }
  }

  /// Opens a streaming operation (§6 "parse_streaming(context): drives a
  /// state-context that exposes a get_buffer(hint)/advance(n)/
  /// complete_input() interface and yields a result on completion").
  pub fn begin_streaming(&self, input_name: Option<String>) -> StreamingParse<'_> {
    let buffer = match &self.pool {
      Some(pool) => pool.rent(),
      None => CharBuffer::with_capacity(self.config.initial_buffer_hint),
    };
    StreamingParse {
      blob: &self.blob,
      tokenizer: DfaTokenizer::new(Arc::clone(&self.blob)),
      buffer: Some(buffer),
      tracker: PositionTracker::new(),
      pool: self.pool.clone(),
      state: ParserState::new(input_name),
    }
  }

  /// Synchronous convenience wrapper driving the streaming core between
  /// blocking reads, per §5 "asynchronous helpers for reading from I/O
  /// sources are thin wrappers that drive the same synchronous core between
  /// awaits" — here without an async runtime dependency, since nothing in
  /// the grammar (§1 Non-goals) calls for one.
  pub fn parse_reader<R, V, E>(
    &self,
    mut reader: R,
    input_name: Option<String>,
    sem: &dyn SemanticProvider<char, V, E>,
  ) -> std::io::Result<Result<V, RuntimeError<E>>>
  where
    R: std::io::Read,
  {
    let mut stream = self.begin_streaming(input_name);
    let mut read_buf = [0u8; 4096];
    let mut leftover: Vec<u8> = Vec::new();
    loop {
      let n = reader.read(&mut read_buf)?;
      if n == 0 {
        if !leftover.is_empty() {
          // Trailing invalid UTF-8 at end-of-stream: surface as replacement
          // characters rather than silently dropping bytes.
          let text = String::from_utf8_lossy(&leftover).into_owned();
          Self::feed_str(&mut stream, &text);
        }
        stream.complete_input();
        break;
      }
      leftover.extend_from_slice(&read_buf[..n]);
      let valid_len = match std::str::from_utf8(&leftover) {
        Ok(s) => s.len(),
        Err(e) => e.valid_up_to(),
      };
      if valid_len > 0 {
        let text = std::str::from_utf8(&leftover[..valid_len]).unwrap().to_string();
        Self::feed_str(&mut stream, &text);
        leftover.drain(..valid_len);
      }
      match stream.resume(sem) {
        DriveOutcome::NeedMoreInput => continue,
        DriveOutcome::Accepted(v) => return Ok(Ok(v)),
        DriveOutcome::Error(e) => return Ok(Err(e)),
      }
    }
    Ok(match stream.resume(sem) {
      DriveOutcome::Accepted(v) => Ok(v),
      DriveOutcome::Error(e) => Err(e),
      DriveOutcome::NeedMoreInput => unreachable!("a final-block parse must always reach a decision"),
    })
  }

  fn feed_str(stream: &mut StreamingParse<'_>, text: &str) {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
      return;
    }
    let span = stream.get_buffer(chars.len());
    span[..chars.len()].copy_from_slice(&chars);
    stream.advance(chars.len());
  }
}

/// One streaming parse operation's mutable state: the tokenizer, the
/// character buffer, the position tracker, and the caller-visible
/// [ParserState]. Returned by [Parser::begin_streaming].
pub struct StreamingParse<'g> {
  blob: &'g GrammarBlob,
  tokenizer: DfaTokenizer,
  buffer: Option<CharBuffer>,
  tracker: PositionTracker,
  pool: Option<Arc<BufferPool>>,
  state: ParserState,
}

impl<'g> StreamingParse<'g> {
  /// Exposes free space past the buffer's write cursor, at least `hint`
  /// characters long (§4.3.1 `get_span`).
  pub fn get_buffer(&mut self, hint: usize) -> &mut [char] {
    self.buffer.as_mut().expect("buffer taken").get_span(hint)
  }

  /// Commits `n` characters written into the span from [Self::get_buffer].
  pub fn advance(&mut self, n: usize) {
    self.buffer.as_mut().expect("buffer taken").advance(n);
  }

  /// Marks the input exhausted: the next [Self::resume] will force a
  /// decision (token, end-of-input, or error) rather than requesting more.
  pub fn complete_input(&mut self) {
    self.buffer.as_mut().expect("buffer taken").complete_input();
  }

  pub fn state(&self) -> &ParserState {
    &self.state
  }

  /// Drives the LALR parser as far as the currently-available input
  /// allows, updating [ParserState] before returning.
  pub fn resume<V, E>(&mut self, sem: &dyn SemanticProvider<char, V, E>) -> DriveOutcome<V, E> {
    let is_final = self.buffer.as_ref().expect("buffer taken").is_complete();
    let start_consumed = self.buffer.as_ref().expect("buffer taken").used_start();

    let outcome = {
      let buffer = self.buffer.as_mut().expect("buffer taken");
      let mut input = TokenizerInput::new(buffer, &mut self.tracker, is_final);
      let driver = LalrDriver::new(self.blob);
      driver.drive(&mut self.tokenizer, &mut input, sem)
    };

    let end_consumed = self.buffer.as_ref().expect("buffer taken").used_start();
    self.state.total_consumed += (end_consumed - start_consumed) as u64;
    self.state.position = self.tracker.position();
    outcome
  }
}

impl<'g> Drop for StreamingParse<'g> {
  fn drop(&mut self) {
    if let (Some(pool), Some(buffer)) = (&self.pool, self.buffer.take()) {
      pool.release(buffer);
    }
  }
}
