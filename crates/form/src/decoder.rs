//! Entry points selecting a reader by content type.
//!
//! [`FormDecoder`] decodes a complete body described by a [`FormContent`]. Decoding is
//! synchronous and may block on disk writes when an upload grows past the spool threshold,
//! so async callers should use [`FormDecoder::decode_async`], which runs the decode on
//! tokio's blocking pool.

use bytes::Bytes;
use tracing::debug;

use crate::charset::Charset;
use crate::codec::multipart::{MultipartParser, MultipartReader};
use crate::codec::urlencoded::{UrlencodedParser, UrlencodedReader};
use crate::{FormConfig, FormContent, FormError, FormMap, UploadedFile};

/// The decoded fields and uploaded files of a form body.
#[derive(Debug, Default)]
pub struct FormData {
    fields: FormMap<String>,
    files: FormMap<UploadedFile>,
}

impl FormData {
    pub fn fields(&self) -> &FormMap<String> {
        &self.fields
    }

    pub fn files(&self) -> &FormMap<UploadedFile> {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut FormMap<UploadedFile> {
        &mut self.files
    }

    pub fn into_parts(self) -> (FormMap<String>, FormMap<UploadedFile>) {
        (self.fields, self.files)
    }
}

/// Decodes `application/x-www-form-urlencoded` and `multipart/form-data` bodies.
#[derive(Debug, Clone, Default)]
pub struct FormDecoder {
    config: FormConfig,
}

impl FormDecoder {
    pub fn new(config: FormConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Decodes a complete body.
    ///
    /// # Errors
    ///
    /// - [`FormError::UnsupportedContentType`] for any other content type, callers usually
    ///   fall back to reading the body as text
    /// - [`FormError::MissingBoundary`] for a multipart body without a boundary
    /// - [`FormError::UnknownCharset`] and [`FormError::CharsetDecode`] for text that can't
    ///   be decoded with the declared charset
    /// - [`FormError::InvalidMultipart`] and [`FormError::TooLargeHeader`] for a broken
    ///   multipart body
    pub fn decode(&self, content: &FormContent, body: &[u8]) -> Result<FormData, FormError> {
        if content.is_urlencoded() {
            let charset = Charset::for_label(content.charset())?;
            debug!(len = body.len(), charset = charset.name(), "decode urlencoded body");

            let mut parser = UrlencodedParser::new();
            let mut reader = UrlencodedReader::new(charset);
            parser.write(body, &mut reader)?;
            parser.finish(&mut reader)?;
            return Ok(FormData { fields: reader.into_fields(), files: FormMap::new() });
        }

        if content.is_multipart() {
            let boundary = content.boundary().filter(|boundary| !boundary.is_empty()).ok_or(FormError::MissingBoundary)?;
            let charset = Charset::for_label(content.charset())?;
            debug!(len = body.len(), charset = charset.name(), boundary, "decode multipart body");

            let mut parser = MultipartParser::new(boundary.as_bytes())?.max_header_bytes(self.config.get_max_part_header_bytes());
            let mut reader = MultipartReader::new(charset, self.config.clone());
            parser.write(body, &mut reader)?;
            parser.finish(&mut reader)?;
            let (fields, files) = reader.into_parts();
            return Ok(FormData { fields, files });
        }

        debug!(content_type = content.content_type(), "no form decoder for content type");
        Err(FormError::unsupported_content_type(content.content_type()))
    }

    /// Decodes a complete body on tokio's blocking pool.
    ///
    /// # Errors
    ///
    /// Same as [`FormDecoder::decode`], plus [`FormError::Join`] if the blocking task
    /// panicked or was cancelled.
    pub async fn decode_async(&self, content: FormContent, body: Bytes) -> Result<FormData, FormError> {
        let decoder = self.clone();
        tokio::task::spawn_blocking(move || decoder.decode(&content, &body)).await?
    }
}

/// Decodes `body` with the default [`FormConfig`].
///
/// `content_type` is matched ignoring ASCII case, `boundary` is only used for multipart
/// bodies.
///
/// ```
/// use micro_form::parse_body;
///
/// let data = parse_body("application/x-www-form-urlencoded", "utf-8", None, b"name=John&tags=a&tags=b").unwrap();
/// assert_eq!(data.fields().get("name").map(String::as_str), Some("John"));
/// assert_eq!(data.fields().get_all("tags").count(), 2);
/// ```
pub fn parse_body(content_type: &str, charset: &str, boundary: Option<&str>, body: &[u8]) -> Result<FormData, FormError> {
    let mut content = FormContent::new(content_type).with_charset(charset);
    if let Some(boundary) = boundary {
        content = content.with_boundary(boundary);
    }
    FormDecoder::default().decode(&content, body)
}
