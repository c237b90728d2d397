//! Decoder for `multipart/form-data` bodies as described in
//! [RFC 7578](https://www.rfc-editor.org/rfc/rfc7578) and
//! [RFC 2046 Section 5.1](https://www.rfc-editor.org/rfc/rfc2046#section-5.1).
//!
//! A body with boundary `XYZ` looks like:
//!
//! ```text
//! --XYZ\r\n
//! Content-Disposition: form-data; name="title"\r\n
//! \r\n
//! Hello\r\n
//! --XYZ--\r\n
//! ```
//!
//! The decoder turns the body into a flat sequence of [`MultipartItem`]s: a header field,
//! value and end event per header line, a headers-finished event, data chunks and a part
//! end event per part, and a final end event once the closing boundary is read.
//!
//! Part data is emitted as soon as it can't be the start of a delimiter, so the decoder
//! never buffers more than one delimiter's worth of part data and may be fed the body in
//! chunks of any size.

use std::mem;

use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem::Finder;
use memchr::{memchr, memmem, memrchr};
use tokio_util::codec::Decoder;
use tracing::trace;
use MultipartState::*;

use crate::config::DEFAULT_MAX_PART_HEADER_BYTES;
use crate::{FormError, ensure};

/// An event produced by [`MultipartDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartItem {
    /// The name of a part header, e.g. `Content-Disposition`
    HeaderField(Bytes),
    /// The value of the header named by the preceding `HeaderField`
    HeaderValue(Bytes),
    /// The current header line is complete
    HeaderEnd,
    /// All headers of the current part were read, data follows
    HeadersFinished,
    /// A chunk of part data
    PartData(Bytes),
    /// The current part is complete
    PartEnd,
    /// The closing boundary was read
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MultipartState {
    /// Check whether the body opens with the first boundary
    Start,
    /// Discard preamble bytes until the first delimiter
    Preamble,
    /// Read `--` of the closing boundary or move on to the part
    AfterBoundary,
    /// Skip transport padding, then read the CRLF opening a part
    Padding,
    /// Read a header line or the empty line ending the headers
    HeaderField,
    /// Emit the value of the header line just read
    HeaderValue,
    /// Emit the end of the header line just read
    HeaderEnd,
    /// Read part data until the next delimiter
    PartData,
    /// Closing boundary read, discard the epilogue
    End,
}

#[derive(Debug, Clone)]
pub struct MultipartDecoder {
    state: MultipartState,
    /// `CRLF--boundary`
    delimiter: Bytes,
    finder: Finder<'static>,
    header_value: Bytes,
    header_size: usize,
    max_header_bytes: usize,
}

impl MultipartDecoder {
    /// Creates a decoder for parts separated by `boundary`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::MissingBoundary`] if `boundary` is empty.
    pub fn new(boundary: &[u8]) -> Result<Self, FormError> {
        ensure!(!boundary.is_empty(), FormError::MissingBoundary);

        let mut delimiter = BytesMut::with_capacity(boundary.len() + 4);
        delimiter.extend_from_slice(b"\r\n--");
        delimiter.extend_from_slice(boundary);
        let delimiter = delimiter.freeze();
        let finder = Finder::new(&delimiter).into_owned();

        Ok(Self {
            state: Start,
            delimiter,
            finder,
            header_value: Bytes::new(),
            header_size: 0,
            max_header_bytes: DEFAULT_MAX_PART_HEADER_BYTES,
        })
    }

    /// Sets the maximum size of the header block of a single part.
    #[must_use]
    pub fn max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.max_header_bytes = max_header_bytes;
        self
    }

    /// Returns true once the closing boundary was read.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state == End
    }

    /// `--boundary`, the delimiter without its leading CRLF
    fn dash_boundary(&self) -> &[u8] {
        &self.delimiter[2..]
    }
}

impl Decoder for MultipartDecoder {
    type Item = MultipartItem;
    type Error = FormError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                Start => {
                    let dash_boundary = self.dash_boundary();
                    if src.len() < dash_boundary.len() && dash_boundary.starts_with(src) {
                        return Ok(None);
                    }

                    if src.starts_with(dash_boundary) {
                        src.advance(dash_boundary.len());
                        self.state = AfterBoundary;
                    } else {
                        self.state = Preamble;
                    }
                }

                Preamble => match self.finder.find(src) {
                    Some(index) => {
                        trace!(len = index, "discard multipart preamble");
                        src.advance(index + self.delimiter.len());
                        self.state = AfterBoundary;
                    }
                    None => {
                        let keep = self.delimiter.len() - 1;
                        if src.len() > keep {
                            src.advance(src.len() - keep);
                        }
                        return Ok(None);
                    }
                },

                AfterBoundary => {
                    if src.len() < 2 {
                        return Ok(None);
                    }

                    if src.starts_with(b"--") {
                        src.advance(2);
                        self.state = End;
                        trace!("read closing boundary");
                        return Ok(Some(MultipartItem::End));
                    }
                    self.state = Padding;
                }

                Padding => {
                    let padding = src.iter().take_while(|&&b| is_lws(b)).count();
                    src.advance(padding);
                    if src.len() < 2 {
                        return Ok(None);
                    }

                    ensure!(src.starts_with(b"\r\n"), FormError::invalid_multipart("expected CRLF after boundary"));
                    src.advance(2);
                    self.header_size = 0;
                    self.state = HeaderField;
                }

                HeaderField => match memmem::find(src, b"\r\n") {
                    None => {
                        let current_size = self.header_size + src.len();
                        ensure!(current_size <= self.max_header_bytes, FormError::too_large_header(current_size, self.max_header_bytes));
                        return Ok(None);
                    }
                    Some(0) => {
                        src.advance(2);
                        self.state = PartData;
                        return Ok(Some(MultipartItem::HeadersFinished));
                    }
                    Some(index) => {
                        self.header_size += index + 2;
                        ensure!(
                            self.header_size <= self.max_header_bytes,
                            FormError::too_large_header(self.header_size, self.max_header_bytes)
                        );

                        let mut line = src.split_to(index).freeze();
                        src.advance(2);

                        let colon = memchr(b':', &line).ok_or_else(|| FormError::invalid_multipart("part header line without ':'"))?;
                        let name = trim_lws(line.split_to(colon));
                        line.advance(1);

                        self.header_value = trim_lws(line);
                        self.state = HeaderValue;
                        return Ok(Some(MultipartItem::HeaderField(name)));
                    }
                },

                HeaderValue => {
                    self.state = HeaderEnd;
                    return Ok(Some(MultipartItem::HeaderValue(mem::take(&mut self.header_value))));
                }

                HeaderEnd => {
                    self.state = HeaderField;
                    return Ok(Some(MultipartItem::HeaderEnd));
                }

                PartData => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    return match self.finder.find(src) {
                        Some(0) => {
                            src.advance(self.delimiter.len());
                            self.state = AfterBoundary;
                            Ok(Some(MultipartItem::PartEnd))
                        }
                        Some(index) => Ok(Some(MultipartItem::PartData(src.split_to(index).freeze()))),
                        None => {
                            // a delimiter split across chunks starts with the last CR of the tail
                            let tail_start = src.len().saturating_sub(self.delimiter.len() - 1);
                            let emit = memrchr(b'\r', &src[tail_start..]).map_or(src.len(), |offset| tail_start + offset);
                            if emit == 0 {
                                return Ok(None);
                            }
                            Ok(Some(MultipartItem::PartData(src.split_to(emit).freeze())))
                        }
                    };
                }

                End => {
                    if !src.is_empty() {
                        trace!(len = src.len(), "discard multipart epilogue");
                        src.clear();
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Fails unless the closing boundary has been read.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }

        ensure!(self.state == End, FormError::invalid_multipart("body ended before the closing boundary"));
        Ok(None)
    }
}

fn trim_lws(bytes: Bytes) -> Bytes {
    let start = bytes.iter().take_while(|&&b| is_lws(b)).count();
    let end = bytes.len() - bytes[start..].iter().rev().take_while(|&&b| is_lws(b)).count();
    bytes.slice(start..end)
}

#[inline]
fn is_lws(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    /// Joins `indoc` lines with CRLF as required on the wire.
    fn crlf(s: &str) -> Vec<u8> {
        s.replace('\n', "\r\n").into_bytes()
    }

    fn decode_chunks(decoder: &mut MultipartDecoder, chunks: &[&[u8]]) -> Result<Vec<MultipartItem>, FormError> {
        let mut buf = BytesMut::new();
        let mut items = Vec::new();
        for chunk in chunks {
            buf.extend_from_slice(chunk);
            while let Some(item) = decoder.decode(&mut buf)? {
                items.push(item);
            }
        }
        while let Some(item) = decoder.decode_eof(&mut buf)? {
            items.push(item);
        }
        Ok(items)
    }

    /// Merges consecutive data chunks so results don't depend on how input was split.
    fn coalesce(items: Vec<MultipartItem>) -> Vec<MultipartItem> {
        let mut out: Vec<MultipartItem> = Vec::new();
        for item in items {
            match (out.last_mut(), item) {
                (Some(MultipartItem::PartData(prev)), MultipartItem::PartData(next)) => {
                    let mut joined = BytesMut::from(&prev[..]);
                    joined.extend_from_slice(&next);
                    *prev = joined.freeze();
                }
                (_, item) => out.push(item),
            }
        }
        out
    }

    fn bytes(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    fn sample_body() -> Vec<u8> {
        crlf(indoc! {r#"
            --XYZ
            Content-Disposition: form-data; name="title"

            Hello
            --XYZ
            Content-Disposition: form-data; name="upload"; filename="a.txt"
            Content-Type: text/plain

            hi
            --XYZ--
        "#})
    }

    fn sample_items() -> Vec<MultipartItem> {
        vec![
            MultipartItem::HeaderField(bytes("Content-Disposition")),
            MultipartItem::HeaderValue(bytes(r#"form-data; name="title""#)),
            MultipartItem::HeaderEnd,
            MultipartItem::HeadersFinished,
            MultipartItem::PartData(bytes("Hello")),
            MultipartItem::PartEnd,
            MultipartItem::HeaderField(bytes("Content-Disposition")),
            MultipartItem::HeaderValue(bytes(r#"form-data; name="upload"; filename="a.txt""#)),
            MultipartItem::HeaderEnd,
            MultipartItem::HeaderField(bytes("Content-Type")),
            MultipartItem::HeaderValue(bytes("text/plain")),
            MultipartItem::HeaderEnd,
            MultipartItem::HeadersFinished,
            MultipartItem::PartData(bytes("hi")),
            MultipartItem::PartEnd,
            MultipartItem::End,
        ]
    }

    #[test]
    fn test_empty_boundary() {
        assert!(matches!(MultipartDecoder::new(b""), Err(FormError::MissingBoundary)));
    }

    #[test]
    fn test_basic() {
        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
        let items = decode_chunks(&mut decoder, &[&sample_body()]).unwrap();
        assert_eq!(items, sample_items());
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_byte_by_byte() {
        let body = sample_body();
        let chunks: Vec<&[u8]> = body.chunks(1).collect();

        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
        let items = decode_chunks(&mut decoder, &chunks).unwrap();
        assert_eq!(coalesce(items), sample_items());
    }

    #[test]
    fn test_every_split_point() {
        let body = sample_body();
        for split in 0..body.len() {
            let (head, tail) = body.split_at(split);
            let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
            let items = decode_chunks(&mut decoder, &[head, tail]).unwrap();
            assert_eq!(coalesce(items), sample_items(), "split at {split}");
        }
    }

    #[test]
    fn test_data_resembling_boundary() {
        let body = crlf(indoc! {r#"
            --XYZ
            Content-Disposition: form-data; name="text"

            a
            --XY
            x--XYZ
            --XYZ--
        "#});

        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
        let items = coalesce(decode_chunks(&mut decoder, &[&body]).unwrap());
        assert_eq!(items[4], MultipartItem::PartData(bytes("a\r\n--XY\r\nx--XYZ")));
        assert_eq!(items[5], MultipartItem::PartEnd);
    }

    #[test]
    fn test_preamble_and_epilogue() {
        let mut body = b"This is the preamble.\r\n".to_vec();
        body.extend(crlf(indoc! {r#"
            --XYZ
            Content-Disposition: form-data; name="a"

            1
            --XYZ--
            This is the epilogue.
        "#}));

        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
        let items = decode_chunks(&mut decoder, &[&body]).unwrap();
        assert_eq!(items[4], MultipartItem::PartData(bytes("1")));
        assert_eq!(items.last(), Some(&MultipartItem::End));
    }

    #[test]
    fn test_transport_padding() {
        let body = b"--XYZ \t\r\n\r\nvalue\r\n--XYZ--";
        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
        let items = decode_chunks(&mut decoder, &[body]).unwrap();
        assert_eq!(
            items,
            vec![MultipartItem::HeadersFinished, MultipartItem::PartData(bytes("value")), MultipartItem::PartEnd, MultipartItem::End]
        );
    }

    #[test]
    fn test_empty_part() {
        let body = b"--XYZ\r\nContent-Disposition: form-data; name=\"empty\"\r\n\r\n\r\n--XYZ--\r\n";
        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
        let items = decode_chunks(&mut decoder, &[body]).unwrap();
        assert_eq!(items[3], MultipartItem::HeadersFinished);
        assert_eq!(items[4], MultipartItem::PartEnd);
    }

    #[test]
    fn test_only_closing_boundary() {
        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
        let items = decode_chunks(&mut decoder, &[b"--XYZ--\r\n"]).unwrap();
        assert_eq!(items, vec![MultipartItem::End]);
    }

    #[test]
    fn test_missing_closing_boundary() {
        let body = b"--XYZ\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\ntruncated";
        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
        let err = decode_chunks(&mut decoder, &[body]).unwrap_err();
        assert!(matches!(err, FormError::InvalidMultipart { .. }));
    }

    #[test]
    fn test_empty_body() {
        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
        let err = decode_chunks(&mut decoder, &[b""]).unwrap_err();
        assert!(matches!(err, FormError::InvalidMultipart { .. }));
    }

    #[test]
    fn test_header_without_colon() {
        let body = b"--XYZ\r\nContent-Disposition form-data\r\n\r\nx\r\n--XYZ--";
        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
        let err = decode_chunks(&mut decoder, &[body]).unwrap_err();
        assert!(matches!(err, FormError::InvalidMultipart { .. }));
    }

    #[test]
    fn test_garbage_after_boundary() {
        let body = b"--XYZgarbage\r\n\r\nx\r\n--XYZ--";
        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap();
        let err = decode_chunks(&mut decoder, &[body]).unwrap_err();
        assert!(matches!(err, FormError::InvalidMultipart { .. }));
    }

    #[test]
    fn test_too_large_header() {
        let mut body = b"--XYZ\r\nX-Long: ".to_vec();
        body.extend(vec![b'a'; 100]);
        body.extend_from_slice(b"\r\n\r\nx\r\n--XYZ--");

        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap().max_header_bytes(64);
        let err = decode_chunks(&mut decoder, &[&body]).unwrap_err();
        assert!(matches!(err, FormError::TooLargeHeader { max_size: 64, .. }));
    }

    #[test]
    fn test_too_large_header_without_line_end() {
        let mut body = b"--XYZ\r\nX-Long: ".to_vec();
        body.extend(vec![b'a'; 100]);

        let mut decoder = MultipartDecoder::new(b"XYZ").unwrap().max_header_bytes(64);
        let mut buf = BytesMut::from(&body[..]);
        let err = decoder.decode(&mut buf).unwrap_err();
        assert!(matches!(err, FormError::TooLargeHeader { .. }));
    }

    #[test]
    fn test_trim_lws() {
        assert_eq!(trim_lws(bytes(" \tvalue \t")), bytes("value"));
        assert_eq!(trim_lws(bytes("   ")), bytes(""));
        assert_eq!(trim_lws(bytes("")), bytes(""));
    }
}
