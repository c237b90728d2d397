//! Charset resolution and strict text decoding.

use std::borrow::Cow;

use encoding_rs::Encoding;

use crate::FormError;

/// Charset assumed when a request doesn't declare one.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Labels of ISO-8859-1 proper. `encoding_rs` follows the WHATWG table, which maps these
/// to windows-1252 and decodes `0x80..=0x9F` as printable characters.
const LATIN1_LABELS: &[&str] =
    &["iso-8859-1", "iso8859-1", "iso88591", "iso_8859-1", "iso_8859-1:1987", "latin1", "l1", "cp819", "ibm819", "iso-ir-100", "csisolatin1"];

/// A resolved text encoding used to turn decoded bytes into strings.
///
/// Decoding never substitutes replacement characters: bytes that are not
/// valid in the charset produce [`FormError::CharsetDecode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    kind: CharsetKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharsetKind {
    /// every byte maps to the code point of the same value
    Latin1,
    Encoding(&'static Encoding),
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

impl Charset {
    pub fn utf8() -> Self {
        Self { kind: CharsetKind::Encoding(encoding_rs::UTF_8) }
    }

    /// Resolves a charset label such as `utf-8`, `latin1` or `shift_jis`.
    ///
    /// An empty label resolves to UTF-8. ISO-8859-1 labels decode as ISO-8859-1 proper,
    /// so `0x80` becomes U+0080 rather than the windows-1252 `€`. Every other label is
    /// resolved with the WHATWG rules of `encoding_rs`.
    pub fn for_label(label: &str) -> Result<Self, FormError> {
        let label = label.trim();
        if label.is_empty() {
            return Ok(Self::utf8());
        }

        if LATIN1_LABELS.iter().any(|latin1| latin1.eq_ignore_ascii_case(label)) {
            return Ok(Self { kind: CharsetKind::Latin1 });
        }

        Encoding::for_label(label.as_bytes())
            .map(|encoding| Self { kind: CharsetKind::Encoding(encoding) })
            .ok_or_else(|| FormError::unknown_charset(label))
    }

    /// The canonical name of the encoding, e.g. `UTF-8`.
    pub fn name(&self) -> &'static str {
        match self.kind {
            CharsetKind::Latin1 => "ISO-8859-1",
            CharsetKind::Encoding(encoding) => encoding.name(),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String, FormError> {
        match self.kind {
            CharsetKind::Latin1 => Ok(encoding_rs::mem::decode_latin1(bytes).into_owned()),
            CharsetKind::Encoding(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned)
                .ok_or_else(|| FormError::charset_decode(self.name())),
        }
    }
}
