//! Conversion of partner report bytes to the UTF-8 ReportStream expects.

use crate::config::TextEncoding;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Content is not valid {encoding}: {message}")]
pub struct EncodingError {
    pub encoding: TextEncoding,
    pub message: String,
}

pub fn convert_to_utf8(content: Vec<u8>, encoding: TextEncoding) -> Result<Vec<u8>, EncodingError> {
    match encoding {
        // Every ISO-8859-1 byte is the code point of the same value
        TextEncoding::Iso88591 => Ok(content
            .iter()
            .map(|&byte| char::from(byte))
            .collect::<String>()
            .into_bytes()),
        TextEncoding::Utf8 => String::from_utf8(content)
            .map(String::into_bytes)
            .map_err(|e| EncodingError {
                encoding,
                message: e.to_string(),
            }),
    }
}
