use mime::Mime;

use crate::charset::DEFAULT_CHARSET;
use crate::header::parse_options_header;

/// Body metadata declared by a request: content type, charset and multipart boundary.
///
/// The content type is stored lower-cased without parameters, the charset defaults to
/// `utf-8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormContent {
    content_type: String,
    charset: String,
    boundary: Option<String>,
}

impl FormContent {
    pub fn new<S: AsRef<str>>(content_type: S) -> Self {
        Self { content_type: content_type.as_ref().trim().to_ascii_lowercase(), charset: DEFAULT_CHARSET.to_string(), boundary: None }
    }

    pub fn urlencoded() -> Self {
        Self::new(mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
    }

    pub fn multipart<S: Into<String>>(boundary: S) -> Self {
        Self::new(mime::MULTIPART_FORM_DATA.essence_str()).with_boundary(boundary)
    }

    /// Builds the metadata from a raw `Content-Type` header value.
    ///
    /// ```
    /// use micro_form::FormContent;
    ///
    /// let content = FormContent::from_header("multipart/form-data; boundary=XYZ; charset=iso-8859-1");
    /// assert!(content.is_multipart());
    /// assert_eq!(content.boundary(), Some("XYZ"));
    /// assert_eq!(content.charset(), "iso-8859-1");
    /// ```
    pub fn from_header(value: &str) -> Self {
        // boundaries may legally contain characters that `mime` rejects in unquoted params
        match value.parse::<Mime>() {
            Ok(mime) => {
                let mut content = Self::new(mime.essence_str());
                if let Some(charset) = mime.get_param(mime::CHARSET) {
                    content = content.with_charset(charset.as_str().trim_matches('"'));
                }
                if let Some(boundary) = mime.get_param(mime::BOUNDARY) {
                    content = content.with_boundary(boundary.as_str().trim_matches('"'));
                }
                content
            }
            Err(_) => {
                let options = parse_options_header(value);
                let mut content = Self::new(options.primary());
                if let Some(charset) = options.get("charset") {
                    content = content.with_charset(charset);
                }
                if let Some(boundary) = options.get("boundary") {
                    content = content.with_boundary(boundary);
                }
                content
            }
        }
    }

    /// Sets the charset; a blank value keeps the default.
    #[must_use]
    pub fn with_charset<S: AsRef<str>>(mut self, charset: S) -> Self {
        let charset = charset.as_ref().trim();
        if !charset.is_empty() {
            self.charset = charset.to_string();
        }
        self
    }

    #[must_use]
    pub fn with_boundary<S: Into<String>>(mut self, boundary: S) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    #[inline]
    pub fn is_urlencoded(&self) -> bool {
        self.content_type == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()
    }

    #[inline]
    pub fn is_multipart(&self) -> bool {
        self.content_type == mime::MULTIPART_FORM_DATA.essence_str()
    }
}
