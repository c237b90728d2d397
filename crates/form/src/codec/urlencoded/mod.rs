//! `application/x-www-form-urlencoded` decoding.
//!
//! - [`UrlencodedDecoder`]: frames the body into field name / data / end events
//! - [`UrlencodedParser`]: feeds body chunks to the decoder and forwards events to an [`UrlencodedSink`]
//! - [`UrlencodedReader`]: the sink that decodes fields into a [`FormMap`](crate::FormMap)

mod urlencoded_decoder;
mod urlencoded_parser;
mod urlencoded_reader;

pub use urlencoded_decoder::UrlencodedDecoder;
pub use urlencoded_decoder::UrlencodedItem;
pub use urlencoded_parser::UrlencodedParser;
pub use urlencoded_parser::UrlencodedSink;
pub use urlencoded_reader::UrlencodedReader;
