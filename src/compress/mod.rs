//! LZMA compression.
//!
//! ## Pipeline
//!
//! ```text
//! Input
//!   ↓
//! ┌──────────────┐
//! │ BinTree      │ ← match candidates, match lengths at rep distances
//! └──────────────┘
//!   ↓
//! ┌──────────────┐
//! │ Optimizer    │ ← cheapest token path over the next ≤ 4096 bytes
//! └──────────────┘
//!   ↓
//! ┌──────────────┐
//! │ Encoder      │ ← emits tokens, updates state and rep distances
//! └──────────────┘
//!   ↓
//! ┌──────────────┐
//! │ RangeEncoder │ ← adaptive binary arithmetic coding
//! └──────────────┘
//!   ↓
//! Raw LZMA stream
//! ```
//!
//! The parser and the coder share one [`ContextModel`](model::ContextModel).
//! Prices for lengths and distances are cached in tables that are rebuilt
//! after a fixed number of coded symbols, so the parser works with prices at
//! most one refresh period stale.

mod encoder;
mod length;
mod literal;
mod model;
mod optimal;

#[cfg(test)]
mod tests;

pub use encoder::{CodeProgress, CodeStatus, Encoder, NoProgress};
