use std::mem;

use tracing::{trace, warn};

use crate::charset::Charset;
use crate::codec::multipart::multipart_parser::MultipartSink;
use crate::header::parse_options_header;
use crate::spool::SpooledFile;
use crate::{FormConfig, FormError, FormMap, UploadedFile};

/// Content type of a file part that doesn't declare one.
pub const DEFAULT_PART_CONTENT_TYPE: &str = "text/plain";

const CONTENT_DISPOSITION: &str = "content-disposition";
const CONTENT_TYPE: &str = "content-type";

#[derive(Debug)]
enum Part {
    Field { name: String, data: Vec<u8> },
    File(UploadedFile),
}

/// Routes every part of a multipart body to a field or an [`UploadedFile`].
///
/// A part whose `Content-Disposition` carries a `filename` parameter becomes a file, even
/// when its body is empty; any other part becomes a field. File content is written to a
/// [`SpooledFile`] set up from the reader's [`FormConfig`].
#[derive(Debug)]
pub struct MultipartReader {
    charset: Charset,
    config: FormConfig,
    headers: Vec<(String, Vec<u8>)>,
    cur_key: Vec<u8>,
    cur_val: Vec<u8>,
    part: Option<Part>,
    fields: FormMap<String>,
    files: FormMap<UploadedFile>,
}

impl MultipartReader {
    pub fn new(charset: Charset, config: FormConfig) -> Self {
        Self {
            charset,
            config,
            headers: Vec::new(),
            cur_key: Vec::new(),
            cur_val: Vec::new(),
            part: None,
            fields: FormMap::new(),
            files: FormMap::new(),
        }
    }

    pub fn into_parts(self) -> (FormMap<String>, FormMap<UploadedFile>) {
        (self.fields, self.files)
    }

    pub fn into_fields(self) -> FormMap<String> {
        self.fields
    }

    pub fn into_files(self) -> FormMap<UploadedFile> {
        self.files
    }

    fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_slice())
    }

    /// Returns the `name` and optional `filename` of the current part.
    ///
    /// A disposition without `name` yields an empty name.
    fn content_disposition(&self) -> Result<(String, Option<String>), FormError> {
        let raw = self.header(CONTENT_DISPOSITION).ok_or_else(|| FormError::malformed_part_header("missing Content-Disposition"))?;
        let value = self.charset.decode(raw).map_err(|e| FormError::malformed_part_header(format!("Content-Disposition: {e}")))?;

        let options = parse_options_header(&value);
        let name = options.get("name").unwrap_or_else(|| {
            warn!(disposition = %value, "multipart part without name");
            ""
        });
        Ok((name.to_string(), options.get("filename").map(str::to_string)))
    }

    fn content_type(&self) -> Result<String, FormError> {
        let content_type = match self.header(CONTENT_TYPE) {
            Some(raw) => self.charset.decode(raw)?.trim().to_string(),
            None => String::new(),
        };

        if content_type.is_empty() {
            return Ok(DEFAULT_PART_CONTENT_TYPE.to_string());
        }
        Ok(content_type)
    }
}

impl MultipartSink for MultipartReader {
    fn on_header_field(&mut self, name: &[u8]) {
        self.cur_key.extend_from_slice(name);
    }

    fn on_header_value(&mut self, value: &[u8]) {
        self.cur_val.extend_from_slice(value);
    }

    fn on_header_end(&mut self) {
        let key = String::from_utf8_lossy(&self.cur_key).to_ascii_lowercase();
        self.cur_key.clear();
        self.headers.push((key, mem::take(&mut self.cur_val)));
    }

    fn on_headers_finished(&mut self) -> Result<(), FormError> {
        let part = match self.content_disposition() {
            Ok((name, Some(filename))) => {
                let content_type = self.content_type()?;
                trace!(%name, %filename, %content_type, "start multipart file part");
                Part::File(UploadedFile::new(name, filename, content_type, SpooledFile::with_config(&self.config)))
            }
            Ok((name, None)) => {
                trace!(%name, "start multipart field part");
                Part::Field { name, data: Vec::new() }
            }
            Err(e) => {
                warn!(cause = %e, "treat multipart part as a field without name");
                Part::Field { name: String::new(), data: Vec::new() }
            }
        };

        self.part = Some(part);
        Ok(())
    }

    fn on_part_data(&mut self, data: &[u8]) -> Result<(), FormError> {
        match &mut self.part {
            Some(Part::Field { data: buf, .. }) => buf.extend_from_slice(data),
            Some(Part::File(file)) => file.file_mut().write(data)?,
            None => trace!(len = data.len(), "discard multipart data outside of a part"),
        }
        Ok(())
    }

    fn on_part_end(&mut self) -> Result<(), FormError> {
        self.headers.clear();
        self.cur_key.clear();
        self.cur_val.clear();

        match self.part.take() {
            Some(Part::Field { name, data }) => {
                let value = self.charset.decode(&data)?;
                self.fields.add(name, value);
            }
            Some(Part::File(mut file)) => {
                file.file_mut().rewind()?;
                self.files.add(file.name().to_string(), file);
            }
            None => {}
        }
        Ok(())
    }
}
