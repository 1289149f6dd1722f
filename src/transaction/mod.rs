//! Transaction stream multiplexer.
//!
//! A [`Transaction`] owns one physical stream and multiplexes every
//! request issued through it. Inbound frames are routed by request id to a
//! per-request collector; callers consume either a single frame
//! ([`Transaction::execute`]) or a lazily pulled sequence of batches
//! ([`Transaction::stream`] → [`AnswerStream`]).
//!
//! ```text
//! callers ──execute/stream──► Transaction ──mpsc──► writer task ──► sink
//!    ▲                            │
//!    └──── ResponseQueue ◄── CollectorRegistry ◄── reader task ◄── source
//! ```

pub mod answer_stream;
mod collector;
mod link;
pub mod multiplexer;
mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use answer_stream::AnswerStream;
pub use multiplexer::Transaction;
