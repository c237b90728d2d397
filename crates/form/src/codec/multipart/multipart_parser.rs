use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::FormError;
use crate::codec::multipart::multipart_decoder::{MultipartDecoder, MultipartItem};

/// Receives the events of a `multipart/form-data` body.
///
/// For every part the sink sees each header line as `on_header_field`, `on_header_value`,
/// `on_header_end`, then `on_headers_finished`, zero or more `on_part_data` chunks and
/// `on_part_end`. `on_end` follows the closing boundary.
pub trait MultipartSink {
    fn on_header_field(&mut self, name: &[u8]);

    fn on_header_value(&mut self, value: &[u8]);

    fn on_header_end(&mut self);

    fn on_headers_finished(&mut self) -> Result<(), FormError>;

    fn on_part_data(&mut self, data: &[u8]) -> Result<(), FormError>;

    fn on_part_end(&mut self) -> Result<(), FormError>;

    fn on_end(&mut self) {}
}

/// Drives a [`MultipartDecoder`] and dispatches its events to a [`MultipartSink`].
#[derive(Debug)]
pub struct MultipartParser {
    decoder: MultipartDecoder,
    buf: BytesMut,
}

impl MultipartParser {
    /// Creates a parser for parts separated by `boundary`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::MissingBoundary`] if `boundary` is empty.
    pub fn new(boundary: &[u8]) -> Result<Self, FormError> {
        Ok(Self { decoder: MultipartDecoder::new(boundary)?, buf: BytesMut::new() })
    }

    /// Sets the maximum size of the header block of a single part.
    #[must_use]
    pub fn max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.decoder = self.decoder.max_header_bytes(max_header_bytes);
        self
    }

    /// Feeds the next chunk of the body.
    pub fn write<S: MultipartSink>(&mut self, data: &[u8], sink: &mut S) -> Result<(), FormError> {
        self.buf.extend_from_slice(data);
        while let Some(item) = self.decoder.decode(&mut self.buf)? {
            dispatch(item, sink)?;
        }
        Ok(())
    }

    /// Signals the end of the body.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidMultipart`] if the closing boundary was never read.
    pub fn finish<S: MultipartSink>(&mut self, sink: &mut S) -> Result<(), FormError> {
        while let Some(item) = self.decoder.decode_eof(&mut self.buf)? {
            dispatch(item, sink)?;
        }
        Ok(())
    }
}

fn dispatch<S: MultipartSink>(item: MultipartItem, sink: &mut S) -> Result<(), FormError> {
    match item {
        MultipartItem::HeaderField(name) => sink.on_header_field(&name),
        MultipartItem::HeaderValue(value) => sink.on_header_value(&value),
        MultipartItem::HeaderEnd => sink.on_header_end(),
        MultipartItem::HeadersFinished => return sink.on_headers_finished(),
        MultipartItem::PartData(data) => return sink.on_part_data(&data),
        MultipartItem::PartEnd => return sink.on_part_end(),
        MultipartItem::End => sink.on_end(),
    }
    Ok(())
}
