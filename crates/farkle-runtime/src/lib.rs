//! The streaming parser runtime: character buffer management, position
//! tracking, the tokenizer (with group-mode lexing and suspension), and the
//! LALR(1) driver that consumes a binary grammar blob (§2 System Overview,
//! component 4).
//!
//! This crate has no grammar-construction concerns; those live in
//! `farkle_core`. A grammar arrives here already built and serialized.

pub mod api;
pub mod buffer;
pub mod config;
pub mod error;
pub mod lalr_driver;
pub mod pool;
pub mod position;
pub mod semantic;
pub mod tokenizer;

pub use api::{Parser, ParserState, StreamingParse};
pub use buffer::CharBuffer;
pub use config::ParseConfig;
pub use error::{ParserApplicationError, RuntimeError};
pub use lalr_driver::{DriveOutcome, LalrDriver};
pub use pool::BufferPool;
pub use position::{Position, PositionTracker};
pub use semantic::{SemanticProvider, SyntaxCheckProvider};
pub use tokenizer::{ChainedTokenizer, DfaTokenizer, TokenOutcome, Tokenizer, TokenizerInput};
