//! Decoder splitting an `application/x-www-form-urlencoded` body into field events.
//!
//! The body is a sequence of `key=value` pieces separated by `&`. Only the first `=` of a
//! piece separates key from value, so values may contain further `=`. Pieces without `=`
//! or with an empty key are skipped.
//!
//! The decoder doesn't percent-decode anything, it only frames the raw bytes. It keeps no
//! reference to its input, so a body may be fed in arbitrary chunks.

use bytes::{Buf, Bytes, BytesMut};
use memchr::{memchr, memchr2};
use tokio_util::codec::Decoder;
use tracing::trace;
use UrlencodedState::*;

use crate::FormError;

/// An event produced by [`UrlencodedDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlencodedItem {
    /// The complete, still encoded, key of a field
    FieldName(Bytes),
    /// A chunk of the still encoded value of the current field
    FieldData(Bytes),
    /// The current field is complete
    FieldEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlencodedState {
    /// Read key bytes until `=` or `&`
    Name,
    /// Read value bytes until `&`
    Value,
    /// Discard an invalid piece until `&`
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlencodedDecoder {
    state: UrlencodedState,
    name: BytesMut,
}

impl Default for UrlencodedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlencodedDecoder {
    pub fn new() -> Self {
        Self { state: Name, name: BytesMut::new() }
    }
}

impl Decoder for UrlencodedDecoder {
    type Item = UrlencodedItem;
    type Error = FormError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.is_empty() {
                return Ok(None);
            }

            match self.state {
                Name => match memchr2(b'=', b'&', src) {
                    Some(index) if src[index] == b'=' => {
                        self.name.extend_from_slice(&src[..index]);
                        src.advance(index + 1);

                        if self.name.is_empty() {
                            trace!("skip urlencoded piece with empty key");
                            self.state = Skip;
                            continue;
                        }

                        self.state = Value;
                        return Ok(Some(UrlencodedItem::FieldName(self.name.split().freeze())));
                    }
                    Some(index) => {
                        trace!(len = self.name.len() + index, "skip urlencoded piece without '='");
                        self.name.clear();
                        src.advance(index + 1);
                    }
                    None => {
                        self.name.extend_from_slice(src);
                        src.clear();
                        return Ok(None);
                    }
                },

                Value => match memchr(b'&', src) {
                    Some(0) => {
                        src.advance(1);
                        self.state = Name;
                        return Ok(Some(UrlencodedItem::FieldEnd));
                    }
                    Some(index) => return Ok(Some(UrlencodedItem::FieldData(src.split_to(index).freeze()))),
                    None => return Ok(Some(UrlencodedItem::FieldData(src.split().freeze()))),
                },

                Skip => match memchr(b'&', src) {
                    Some(index) => {
                        src.advance(index + 1);
                        self.state = Name;
                    }
                    None => {
                        src.clear();
                        return Ok(None);
                    }
                },
            }
        }
    }

    /// Flushes the last field, which isn't followed by `&`.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }

        match self.state {
            Value => {
                self.state = Name;
                Ok(Some(UrlencodedItem::FieldEnd))
            }
            Name | Skip => {
                if !self.name.is_empty() {
                    trace!(len = self.name.len(), "skip trailing urlencoded piece without '='");
                    self.name.clear();
                }
                self.state = Name;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> Vec<UrlencodedItem> {
        let mut decoder = UrlencodedDecoder::new();
        let mut buf = BytesMut::new();
        let mut items = Vec::new();
        for chunk in chunks {
            buf.extend_from_slice(chunk);
            while let Some(item) = decoder.decode(&mut buf).unwrap() {
                items.push(item);
            }
        }
        while let Some(item) = decoder.decode_eof(&mut buf).unwrap() {
            items.push(item);
        }
        items
    }

    fn name(s: &'static str) -> UrlencodedItem {
        UrlencodedItem::FieldName(Bytes::from_static(s.as_bytes()))
    }

    fn data(s: &'static str) -> UrlencodedItem {
        UrlencodedItem::FieldData(Bytes::from_static(s.as_bytes()))
    }

    #[test]
    fn test_basic() {
        let items = decode_all(&[b"name=John&tags=a"]);
        assert_eq!(items, vec![name("name"), data("John"), UrlencodedItem::FieldEnd, name("tags"), data("a"), UrlencodedItem::FieldEnd]);
    }

    #[test]
    fn test_value_keeps_later_equals() {
        let items = decode_all(&[b"expr=a=b"]);
        assert_eq!(items, vec![name("expr"), data("a=b"), UrlencodedItem::FieldEnd]);
    }

    #[test]
    fn test_empty_value() {
        let items = decode_all(&[b"a=&b="]);
        assert_eq!(items, vec![name("a"), UrlencodedItem::FieldEnd, name("b"), UrlencodedItem::FieldEnd]);
    }

    #[test]
    fn test_skips_invalid_pieces() {
        let items = decode_all(&[b"flag&=orphan&&ok=1&tail"]);
        assert_eq!(items, vec![name("ok"), data("1"), UrlencodedItem::FieldEnd]);
    }

    #[test]
    fn test_split_across_chunks() {
        let items = decode_all(&[b"na", b"me=Jo", b"hn&x", b"=1"]);
        assert_eq!(items, vec![name("name"), data("Jo"), data("hn"), UrlencodedItem::FieldEnd, name("x"), data("1"), UrlencodedItem::FieldEnd]);
    }

    #[test]
    fn test_empty_body() {
        assert!(decode_all(&[b""]).is_empty());
    }
}
