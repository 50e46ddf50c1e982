use std::borrow::Cow;
use std::path::Path;

use encoding_rs::{Encoding, SHIFT_JIS};
use tracing::debug;

use crate::error::TableError;

/// Decodes source bytes: BOM first, then strict UTF-8, then Shift_JIS.
pub fn decode_input(bytes: &[u8]) -> Result<String, TableError> {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        debug!(encoding = encoding.name(), "decoding input by byte order mark");
        return encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_length..])
            .map(Cow::into_owned)
            .ok_or_else(|| {
                TableError::Decode(format!("input is not valid {}", encoding.name()))
            });
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    debug!("input is not UTF-8; trying Shift_JIS");
    SHIFT_JIS
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| TableError::Decode("input is neither UTF-8 nor Shift_JIS".to_string()))
}

pub(crate) fn read_input(path: &Path) -> Result<String, TableError> {
    let bytes = std::fs::read(path)?;
    decode_input(&bytes)
}
