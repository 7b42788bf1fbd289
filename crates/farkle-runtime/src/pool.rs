//! A thread-safe free list of [CharBuffer]s (§5 "buffer memory comes from a
//! pool (rent on open, return on completion or reset); pools are thread-safe").
//!
//! Plain `Mutex<Vec<_>>`, matching the rest of the crate's preference for
//! `std` primitives over a dedicated object-pool dependency.

use std::sync::Mutex;

use crate::buffer::CharBuffer;

pub struct BufferPool {
  free: Mutex<Vec<CharBuffer>>,
  default_capacity: usize,
}

impl BufferPool {
  pub fn new(default_capacity: usize) -> Self {
    Self { free: Mutex::new(Vec::new()), default_capacity }
  }

  /// Takes a buffer from the free list, or allocates a fresh one sized at
  /// `default_capacity` if the pool is empty.
  pub fn rent(&self) -> CharBuffer {
    self
      .free
      .lock()
      .expect("buffer pool mutex poisoned")
      .pop()
      .unwrap_or_else(|| CharBuffer::with_capacity(self.default_capacity))
  }

  /// Resets `buffer` to an empty state and returns it to the free list.
  pub fn release(&self, mut buffer: CharBuffer) {
    buffer.reset();
    self.free.lock().expect("buffer pool mutex poisoned").push(buffer);
  }

  /// Number of buffers currently parked in the free list.
  pub fn len(&self) -> usize {
    self.free.lock().expect("buffer pool mutex poisoned").len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
