//! Line terminator handling shared by every backend.

use super::error::{PromptError, Result};

/// Remove one trailing `\n` and then one trailing `\r`.
///
/// The two suffixes are independent, so `"a\r\n"`, `"a\n"` and `"a\r"` all
/// become `"a"`.
pub fn strip_line_ending(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}

/// Turn a raw line (terminator included) into the returned text.
///
/// An empty buffer means end-of-input was hit before any byte arrived.
pub fn finish_line(mut buf: Vec<u8>) -> Result<String> {
    if buf.is_empty() {
        return Err(PromptError::NoInput);
    }
    strip_line_ending(&mut buf);
    String::from_utf8(buf).map_err(|_| PromptError::Encoding)
}
