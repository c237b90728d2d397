use std::mem;

use percent_encoding::percent_decode;

use crate::charset::Charset;
use crate::codec::urlencoded::urlencoded_parser::UrlencodedSink;
use crate::{FormError, FormMap};

/// Collects urlencoded fields into a [`FormMap`].
///
/// Keys and values go through `+` to space substitution, percent-decoding and then
/// charset decoding.
#[derive(Debug)]
pub struct UrlencodedReader {
    charset: Charset,
    fields: FormMap<String>,
    cur_key: Vec<u8>,
    cur_val: Vec<u8>,
}

impl UrlencodedReader {
    pub fn new(charset: Charset) -> Self {
        Self { charset, fields: FormMap::new(), cur_key: Vec::new(), cur_val: Vec::new() }
    }

    pub fn into_fields(self) -> FormMap<String> {
        self.fields
    }
}

impl UrlencodedSink for UrlencodedReader {
    fn on_field_name(&mut self, name: &[u8]) {
        self.cur_key.extend_from_slice(name);
    }

    fn on_field_data(&mut self, data: &[u8]) {
        self.cur_val.extend_from_slice(data);
    }

    fn on_field_end(&mut self) -> Result<(), FormError> {
        let key = mem::take(&mut self.cur_key);
        let value = mem::take(&mut self.cur_val);

        let key = self.charset.decode(&unquote_plus(&key))?;
        let value = self.charset.decode(&unquote_plus(&value))?;
        self.fields.add(key, value);
        Ok(())
    }
}

/// Replaces `+` with a space, then percent-decodes.
fn unquote_plus(data: &[u8]) -> Vec<u8> {
    let replaced: Vec<u8> = data.iter().map(|&b| if b == b'+' { b' ' } else { b }).collect();
    percent_decode(&replaced).collect()
}
