use std::io;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum FormError {
    #[error("multipart/form-data requires a non-empty boundary")]
    MissingBoundary,

    #[error("malformed part header: {reason}")]
    MalformedPartHeader { reason: String },

    #[error("unsupported content type: {content_type}")]
    UnsupportedContentType { content_type: String },

    #[error("unknown charset: {charset}")]
    UnknownCharset { charset: String },

    #[error("bytes are not valid {charset}")]
    CharsetDecode { charset: String },

    #[error("invalid multipart body: {reason}")]
    InvalidMultipart { reason: String },

    #[error("part header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("decode task failed: {source}")]
    Join {
        #[from]
        source: JoinError,
    },
}

impl FormError {
    pub fn malformed_part_header<S: ToString>(str: S) -> Self {
        Self::MalformedPartHeader { reason: str.to_string() }
    }

    pub fn unsupported_content_type<S: ToString>(content_type: S) -> Self {
        Self::UnsupportedContentType { content_type: content_type.to_string() }
    }

    pub fn unknown_charset<S: ToString>(charset: S) -> Self {
        Self::UnknownCharset { charset: charset.to_string() }
    }

    pub fn charset_decode<S: ToString>(charset: S) -> Self {
        Self::CharsetDecode { charset: charset.to_string() }
    }

    pub fn invalid_multipart<S: ToString>(str: S) -> Self {
        Self::InvalidMultipart { reason: str.to_string() }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    /// Returns true if the caller should fall back to treating the body as raw text.
    #[inline]
    pub fn is_unsupported_content_type(&self) -> bool {
        matches!(self, FormError::UnsupportedContentType { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let err: FormError = io::Error::new(io::ErrorKind::PermissionDenied, "temp dir not writable").into();
        assert!(matches!(err, FormError::Io { ref source } if source.kind() == io::ErrorKind::PermissionDenied));
    }
}
