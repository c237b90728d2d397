//! Parser for parameterised header values such as `Content-Disposition` and `Content-Type`.
//!
//! The grammar follows RFC 2183 and RFC 2231:
//!
//! ```text
//! form-data; name="upload"; filename="a.txt"
//! attachment; filename*=utf-8''caf%C3%A9.txt
//! attachment; filename*0="long"; filename*1="-name.txt"
//! ```
//!
//! The input is consumed by a hand written tokenizer, one piece at a time. When a piece
//! can't be parsed the parser stops and returns what it has accumulated so far, so a
//! malformed tail never turns into an error.

use percent_encoding::percent_decode_str;
use tracing::trace;

use crate::charset::Charset;

/// The result of parsing a parameterised header value.
///
/// Parameter names are stored lower-cased and keep the order they first appeared in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsHeader {
    primary: String,
    params: Vec<(String, String)>,
}

impl OptionsHeader {
    /// The value before the first `;`, e.g. `form-data`.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Returns the parameter named `key`, ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    fn set(&mut self, key: &str, value: String) {
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.params.push((key.to_string(), value)),
        }
    }
}

/// Parses `primary; key=value; key2="quoted value"` into its primary token and parameters.
///
/// - quoted values are unescaped (`\"` becomes `"`)
/// - `key*=charset'lang'value` values are percent-decoded, then decoded with `charset`
/// - `key*0=`, `key*1=`, ... are joined in index order
///
/// An extended (`key*=`) value takes precedence over a plain `key=` value.
///
/// ```
/// use micro_form::header::parse_options_header;
///
/// let header = parse_options_header(r#"form-data; name="upload"; filename*=utf-8''caf%C3%A9.txt"#);
/// assert_eq!(header.primary(), "form-data");
/// assert_eq!(header.get("name"), Some("upload"));
/// assert_eq!(header.get("filename"), Some("café.txt"));
/// ```
pub fn parse_options_header(header: &str) -> OptionsHeader {
    let header = header.trim();
    let Some((primary, rest)) = header.split_once(';') else {
        return OptionsHeader { primary: header.to_string(), params: Vec::new() };
    };

    let mut options = OptionsHeader { primary: primary.trim().to_string(), params: Vec::new() };
    let mut extended_keys: Vec<String> = Vec::new();
    let mut segments: Vec<Segment> = Vec::new();
    let mut tokenizer = Tokenizer::new(rest);

    loop {
        tokenizer.skip_whitespace();
        if tokenizer.is_finished() {
            break;
        }

        let Some(piece) = tokenizer.next_piece() else {
            trace!(remaining = tokenizer.remaining(), "stop parsing options header at unparseable piece");
            break;
        };

        let Some(value) = piece.value else {
            continue;
        };

        if let Some(index) = piece.index {
            segments.push(Segment::new(piece.key, index, value));
            continue;
        }

        match value {
            PieceValue::Plain(value) => {
                if !extended_keys.contains(&piece.key) {
                    options.set(&piece.key, value);
                }
            }
            PieceValue::Extended { charset: None, raw } => options.set(&piece.key, raw),
            PieceValue::Extended { charset: Some(charset), raw } => {
                let Some(value) = decode_extended(&charset, &raw) else {
                    trace!(charset, "stop parsing options header at undecodable extended value");
                    break;
                };
                options.set(&piece.key, value);
                extended_keys.push(piece.key);
            }
        }
    }

    join_segments(&mut options, segments);
    options
}

fn decode_extended(charset: &str, raw: &str) -> Option<String> {
    let bytes: Vec<u8> = percent_decode_str(raw).collect();
    Charset::for_label(charset).ok()?.decode(&bytes).ok()
}

/// One `key*N=` piece of a continued parameter.
struct Segment {
    key: String,
    index: u32,
    charset: Option<String>,
    bytes: Vec<u8>,
}

impl Segment {
    fn new(key: String, index: u32, value: PieceValue) -> Self {
        match value {
            PieceValue::Plain(value) => Self { key, index, charset: None, bytes: value.into_bytes() },
            PieceValue::Extended { charset, raw } => Self { key, index, charset, bytes: percent_decode_str(&raw).collect() },
        }
    }
}

fn join_segments(options: &mut OptionsHeader, mut segments: Vec<Segment>) {
    let mut keys: Vec<String> = Vec::new();
    for segment in &segments {
        if !keys.contains(&segment.key) {
            keys.push(segment.key.clone());
        }
    }

    segments.sort_by_key(|segment| segment.index);

    for key in keys {
        let parts: Vec<&Segment> = segments.iter().filter(|segment| segment.key == key).collect();
        let bytes: Vec<u8> = parts.iter().flat_map(|segment| segment.bytes.iter().copied()).collect();

        let decoded = match parts.iter().find_map(|segment| segment.charset.as_deref()) {
            Some(charset) => Charset::for_label(charset).and_then(|charset| charset.decode(&bytes)),
            None => Charset::utf8().decode(&bytes),
        };

        match decoded {
            Ok(value) => {
                let mut joined = options.get(&key).unwrap_or_default().to_string();
                joined.push_str(&value);
                options.set(&key, joined);
            }
            Err(e) => trace!(key, cause = %e, "skip undecodable continued parameter"),
        }
    }
}

struct Piece {
    key: String,
    index: Option<u32>,
    value: Option<PieceValue>,
}

enum PieceValue {
    Plain(String),
    Extended { charset: Option<String>, raw: String },
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn is_finished(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        self.take_while(|b| b.is_ascii_whitespace());
    }

    // every delimiter is ASCII, so stopping on one always lands on a char boundary
    fn take_while<F: Fn(u8) -> bool>(&mut self, predicate: F) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&predicate) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Reads `key[*N][*]=value` followed by an optional `;`.
    fn next_piece(&mut self) -> Option<Piece> {
        self.skip_whitespace();
        // folded header lines are joined with commas
        if self.eat(b',') {
            self.skip_whitespace();
        }

        let key = if self.peek() == Some(b'"') {
            self.quoted()?
        } else {
            let token = self.take_while(is_key_char);
            if token.is_empty() {
                return None;
            }
            token.to_ascii_lowercase()
        };

        let mut index = None;
        if self.peek() == Some(b'*') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            index = Some(self.take_while(|b| b.is_ascii_digit()).parse::<u32>().ok()?);
        }

        self.skip_whitespace();
        let value = if self.eat(b'*') {
            self.skip_whitespace();
            if !self.eat(b'=') {
                return None;
            }
            self.skip_whitespace();
            // only the first segment of a continued parameter declares a charset
            let charset = if matches!(index, None | Some(0)) { self.extended_charset() } else { None };
            Some(PieceValue::Extended { charset, raw: self.value()? })
        } else if self.eat(b'=') {
            self.skip_whitespace();
            Some(PieceValue::Plain(self.value()?))
        } else {
            None
        };

        self.skip_whitespace();
        self.eat(b';');

        Some(Piece { key, index, value })
    }

    /// Consumes the `charset'language'` prefix of an extended value if present.
    fn extended_charset(&mut self) -> Option<String> {
        let (charset, after) = self.remaining().split_once('\'')?;
        let (language, _) = after.split_once('\'')?;
        if charset.is_empty() || !charset.bytes().all(is_charset_char) || !language.bytes().all(is_charset_char) {
            return None;
        }

        self.pos += charset.len() + language.len() + 2;
        Some(charset.to_string())
    }

    fn value(&mut self) -> Option<String> {
        if self.peek() == Some(b'"') {
            return self.quoted();
        }
        Some(self.take_while(|b| b != b';' && b != b',').trim().to_string())
    }

    /// Reads a quoted string, returning `None` if the closing quote is missing.
    fn quoted(&mut self) -> Option<String> {
        self.pos += 1;
        let rest = self.remaining();
        let mut out = String::new();
        let mut chars = rest.char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += offset + 1;
                    return Some(out);
                }
                '\\' => out.push(chars.next()?.1),
                c => out.push(c),
            }
        }
        None
    }
}

fn is_key_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b';' | b',' | b'=' | b'*')
}

fn is_charset_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b';' | b',' | b'"')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(header: &OptionsHeader) -> Vec<(&str, &str)> {
        header.params().collect()
    }

    #[test]
    fn test_empty_header() {
        let header = parse_options_header("");
        assert_eq!(header.primary(), "");
        assert!(header.is_empty());
    }

    #[test]
    fn test_no_params() {
        let header = parse_options_header("form-data");
        assert_eq!(header.primary(), "form-data");
        assert!(header.is_empty());
    }

    #[test]
    fn test_content_disposition() {
        let header = parse_options_header(r#"form-data; name="upload"; filename="a.txt""#);
        assert_eq!(header.primary(), "form-data");
        assert_eq!(params(&header), vec![("name", "upload"), ("filename", "a.txt")]);
    }

    #[test]
    fn test_bare_tokens() {
        let header = parse_options_header("multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxk; charset=utf-8");
        assert_eq!(header.primary(), "multipart/form-data");
        assert_eq!(header.get("boundary"), Some("----WebKitFormBoundary7MA4YWxk"));
        assert_eq!(header.get("charset"), Some("utf-8"));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let header = parse_options_header(r#"form-data; NAME="title""#);
        assert_eq!(params(&header), vec![("name", "title")]);
        assert_eq!(header.get("Name"), Some("title"));
    }

    #[test]
    fn test_quoted_escapes() {
        let header = parse_options_header(r#"form-data; name="say \"hi\""; filename="C:\\dir\\a;b.txt""#);
        assert_eq!(header.get("name"), Some(r#"say "hi""#));
        assert_eq!(header.get("filename"), Some(r"C:\dir\a;b.txt"));
    }

    #[test]
    fn test_extended_value() {
        let header = parse_options_header("attachment; filename*=utf-8''caf%C3%A9.txt");
        assert_eq!(header.get("filename"), Some("café.txt"));
    }

    #[test]
    fn test_extended_value_with_language() {
        let header = parse_options_header("attachment; filename*=iso-8859-1'en'%A3%20rates.txt");
        assert_eq!(header.get("filename"), Some("£ rates.txt"));
    }

    #[test]
    fn test_extended_value_wins_over_plain() {
        let header = parse_options_header(r#"attachment; filename*=utf-8''caf%C3%A9.txt; filename="cafe.txt""#);
        assert_eq!(header.get("filename"), Some("café.txt"));

        let header = parse_options_header(r#"attachment; filename="cafe.txt"; filename*=utf-8''caf%C3%A9.txt"#);
        assert_eq!(header.get("filename"), Some("café.txt"));
        assert_eq!(header.len(), 1);
    }

    #[test]
    fn test_continuations() {
        let header = parse_options_header(r#"attachment; filename*0="long"; filename*1="-name"; filename*2=".txt""#);
        assert_eq!(header.get("filename"), Some("long-name.txt"));
    }

    #[test]
    fn test_continuations_out_of_order() {
        let header = parse_options_header(r#"attachment; filename*1="-name.txt"; filename*0="long""#);
        assert_eq!(header.get("filename"), Some("long-name.txt"));
    }

    #[test]
    fn test_extended_continuations() {
        let header = parse_options_header("attachment; filename*0*=utf-8''caf%C3; filename*1*=%A9.txt");
        assert_eq!(header.get("filename"), Some("café.txt"));
    }

    #[test]
    fn test_stops_at_unparseable_piece() {
        let header = parse_options_header(r#"form-data; name="title"; =oops; filename="a.txt""#);
        assert_eq!(params(&header), vec![("name", "title")]);
    }

    #[test]
    fn test_unterminated_quote_stops() {
        let header = parse_options_header(r#"form-data; name="title"; filename="a.txt"#);
        assert_eq!(params(&header), vec![("name", "title")]);
    }

    #[test]
    fn test_unknown_extended_charset_stops() {
        let header = parse_options_header("attachment; name=a; filename*=bogus''x; size=3");
        assert_eq!(params(&header), vec![("name", "a")]);
    }

    #[test]
    fn test_key_without_value_is_skipped() {
        let header = parse_options_header(r#"form-data; hidden; name="title""#);
        assert_eq!(params(&header), vec![("name", "title")]);
    }

    #[test]
    fn test_comma_separated_pieces() {
        let header = parse_options_header("form-data; name=a,\r\n filename=b.txt");
        assert_eq!(params(&header), vec![("name", "a"), ("filename", "b.txt")]);
    }

    #[test]
    fn test_trailing_semicolon() {
        let header = parse_options_header("form-data; name=title;  ");
        assert_eq!(params(&header), vec![("name", "title")]);
    }

    #[test]
    fn test_later_continuation_has_no_charset_prefix() {
        let header = parse_options_header("attachment; filename*0*=utf-8''caf%C3%A9-; filename*1*=it's'x.txt");
        assert_eq!(header.get("filename"), Some("café-it's'x.txt"));
    }
}
