//! Streaming codecs for form bodies.
//!
//! Each encoding has three layers: a [`tokio_util::codec::Decoder`] that frames raw bytes
//! into events, a parser that owns the input buffer and forwards the events to a sink
//! trait, and a reader implementing that sink which builds the decoded maps. The parsers
//! accept the body in chunks of any size.

pub mod multipart;
pub mod urlencoded;
