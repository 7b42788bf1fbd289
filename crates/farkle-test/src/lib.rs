//! End-to-end scenarios exercising the full build-then-parse pipeline:
//! grammar construction, DFA/LALR compilation, serialization to a blob, and
//! streaming parse. Mirrors the teacher workspace's `radlr_test_suite`
//! placement (one module per scenario, a shared `utils` helper module).

mod utils;

#[cfg(test)]
mod calculator;

#[cfg(test)]
mod json;

#[cfg(test)]
mod block_comment;

#[cfg(test)]
mod suspending_tokenizer;

#[cfg(test)]
mod precedence;

#[cfg(test)]
mod round_trip;
