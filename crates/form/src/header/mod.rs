//! Header value parsing needed by the form decoders.
//!
//! - [`parse_options_header`]: splits `Content-Disposition` / `Content-Type` values into
//!   their primary token and parameters, including RFC 2231 extended and continued
//!   parameters
//! - [`FormContent`]: the content type, charset and boundary a request body was declared with

mod content;
mod options;

pub use content::FormContent;
pub use options::OptionsHeader;
pub use options::parse_options_header;
