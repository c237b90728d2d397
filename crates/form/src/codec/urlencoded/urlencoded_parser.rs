use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::FormError;
use crate::codec::urlencoded::urlencoded_decoder::{UrlencodedDecoder, UrlencodedItem};

/// Receives the field events of an urlencoded body.
///
/// `on_field_name` is called once per field with the whole encoded key, `on_field_data`
/// zero or more times with consecutive chunks of the encoded value.
pub trait UrlencodedSink {
    fn on_field_name(&mut self, name: &[u8]);

    fn on_field_data(&mut self, data: &[u8]);

    fn on_field_end(&mut self) -> Result<(), FormError>;
}

/// Drives an [`UrlencodedDecoder`] and dispatches its events to an [`UrlencodedSink`].
#[derive(Debug, Default)]
pub struct UrlencodedParser {
    decoder: UrlencodedDecoder,
    buf: BytesMut,
}

impl UrlencodedParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next chunk of the body.
    pub fn write<S: UrlencodedSink>(&mut self, data: &[u8], sink: &mut S) -> Result<(), FormError> {
        self.buf.extend_from_slice(data);
        while let Some(item) = self.decoder.decode(&mut self.buf)? {
            dispatch(item, sink)?;
        }
        Ok(())
    }

    /// Signals the end of the body, flushing the last field.
    pub fn finish<S: UrlencodedSink>(&mut self, sink: &mut S) -> Result<(), FormError> {
        while let Some(item) = self.decoder.decode_eof(&mut self.buf)? {
            dispatch(item, sink)?;
        }
        Ok(())
    }
}

fn dispatch<S: UrlencodedSink>(item: UrlencodedItem, sink: &mut S) -> Result<(), FormError> {
    match item {
        UrlencodedItem::FieldName(name) => sink.on_field_name(&name),
        UrlencodedItem::FieldData(data) => sink.on_field_data(&data),
        UrlencodedItem::FieldEnd => return sink.on_field_end(),
    }
    Ok(())
}
