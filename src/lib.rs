//! Streaming tokenizer and event parser for HTML and XML markup.
//!
//! Input arrives as arbitrary text fragments through [`Parser::write`]; the
//! crate emits an ordered stream of syntactic events (text runs, tags,
//! attributes, comments, CDATA sections, processing instructions, decoded
//! character references) through a user [`Handler`]. The [`Tokenizer`] is
//! usable on its own through the [`TokenSink`] trait for lexical-level
//! consumers and diagnostics.
//!
//! Invariants:
//! - Push-driven and strictly synchronous: every event fires on the thread
//!   calling `write`/`end`/`resume`, in source order.
//! - Chunk-equivalence: splitting the input across any number of `write`
//!   calls yields the same event sequence as one call; partial tags,
//!   comments, and character references resume across fragment boundaries.
//! - Backpressure is explicit: a handler returns [`Flow::Pause`] and the
//!   machine suspends at that event boundary until `resume()`.
//! - Lenient by default: malformed input produces a best-effort event
//!   stream. Strict mode surfaces violations as [`ParseError`]s with
//!   1-based line diagnostics instead.

pub mod entities;
pub mod error;
pub mod parser;
pub mod position;
pub mod tokenizer;

pub use error::{ErrorKind, ParseError};
pub use parser::{Handler, Parser, ParserOptions};
pub use tokenizer::{
    Flow, QuoteKind, Span, TokenSink, Tokenizer, TokenizerOptions, TokenizerStats,
};
