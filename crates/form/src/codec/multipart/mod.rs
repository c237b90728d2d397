//! `multipart/form-data` decoding.
//!
//! - [`MultipartDecoder`]: frames the body into header, data and boundary events
//! - [`MultipartParser`]: feeds body chunks to the decoder and forwards events to a [`MultipartSink`]
//! - [`MultipartReader`]: the sink that turns parts into fields and [`UploadedFile`](crate::UploadedFile)s

mod multipart_decoder;
mod multipart_parser;
mod multipart_reader;

pub use multipart_decoder::MultipartDecoder;
pub use multipart_decoder::MultipartItem;
pub use multipart_parser::MultipartParser;
pub use multipart_parser::MultipartSink;
pub use multipart_reader::DEFAULT_PART_CONTENT_TYPE;
pub use multipart_reader::MultipartReader;
