//! A streaming decoder for HTML form request bodies
//!
//! This crate turns the body of an HTTP request encoded as `application/x-www-form-urlencoded`
//! or `multipart/form-data` into two ordered, multi-valued maps: text fields and uploaded
//! files. It does no network I/O and parses no HTTP headers other than the
//! `Content-Type` and `Content-Disposition` values needed to decode the body.
//!
//! # Features
//!
//! - Chunk-capable state machines built on [`tokio_util::codec::Decoder`]
//! - RFC 2231 extended and continued header parameters, e.g. `filename*=utf-8''caf%C3%A9.txt`
//! - Text decoding with the declared charset, never silently replacing invalid bytes
//! - Uploads kept in memory up to a threshold, then moved to a temporary file
//! - Async decoding and persisting on tokio's blocking pool
//!
//! # Example
//!
//! ```
//! use micro_form::{FormContent, FormDecoder};
//!
//! let body = b"--XYZ\r\n\
//!     Content-Disposition: form-data; name=\"title\"\r\n\
//!     \r\n\
//!     Hello\r\n\
//!     --XYZ\r\n\
//!     Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n\
//!     Content-Type: text/plain\r\n\
//!     \r\n\
//!     hi\r\n\
//!     --XYZ--\r\n";
//!
//! let content = FormContent::from_header("multipart/form-data; boundary=XYZ");
//! let data = FormDecoder::default().decode(&content, body).unwrap();
//!
//! assert_eq!(data.fields().get("title").map(String::as_str), Some("Hello"));
//!
//! let upload = data.files().get("upload").unwrap();
//! assert_eq!(upload.filename(), "a.txt");
//! assert_eq!(upload.content_type(), "text/plain");
//! assert_eq!(upload.size(), 2);
//! ```
//!
//! # Architecture
//!
//! - [`header`]: `Content-Type` metadata and the parameterised header parser
//! - [`codec`]: the urlencoded and multipart decoders, parsers and readers
//! - [`spool`]: the memory-then-disk storage of uploaded files
//! - [`decoder`]: [`FormDecoder`] and [`parse_body`], choosing a codec by content type
//!
//! # Errors
//!
//! Every fallible operation returns [`FormError`]. A multipart part with a missing or
//! malformed `Content-Disposition` is not an error: it is logged and kept as a field with
//! an empty name.

pub mod charset;
pub mod codec;
pub mod config;
pub mod decoder;
mod error;
mod file;
pub mod header;
mod multimap;
pub mod spool;
mod utils;

pub use charset::Charset;
pub use config::FormConfig;
pub use decoder::{FormData, FormDecoder, parse_body};
pub use error::FormError;
pub use file::UploadedFile;
pub use header::FormContent;
pub use multimap::FormMap;
pub use spool::{Backing, SpooledFile};
pub(crate) use utils::ensure;
