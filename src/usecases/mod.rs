//! Application use cases driven by queue messages.

mod encoding;
mod read_and_send;

pub use encoding::{convert_to_utf8, EncodingError};
pub use read_and_send::{ReadAndSend, ReadAndSendError, SendOutcome};
