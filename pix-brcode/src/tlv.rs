//! Tag-length-value fields of the EMV-QRCPS payload
//!
//! Every field is `tag (2 digits) + length (2 decimal digits) + value`, where
//! the length is the byte length of the value. Templates (tags 26 and 62) nest
//! further fields inside their value.

use crate::{Error, Result};

/// Largest value that fits a 2-digit length header
pub const MAX_VALUE_LEN: usize = 99;

/// Append one TLV field to `buf`.
pub fn push_field(buf: &mut String, tag: &str, value: &str) -> Result<()> {
    if tag.len() != 2 || !tag.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPayload(format!("Invalid tag: {:?}", tag)));
    }
    if value.len() > MAX_VALUE_LEN {
        return Err(Error::InvalidPayload(format!(
            "Field {} is {} bytes long (max {})",
            tag,
            value.len(),
            MAX_VALUE_LEN
        )));
    }
    buf.push_str(tag);
    buf.push_str(&format!("{:02}", value.len()));
    buf.push_str(value);
    Ok(())
}

/// Encode a single TLV field.
pub fn field(tag: &str, value: &str) -> Result<String> {
    let mut buf = String::with_capacity(4 + value.len());
    push_field(&mut buf, tag, value)?;
    Ok(buf)
}

/// Longest prefix of `value` holding at most `max_chars` characters.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Longest prefix of `value` that is at most `max_bytes` long and ends on a
/// character boundary.
pub fn truncate_bytes(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// A field borrowed from an encoded payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvField<'a> {
    pub tag: &'a str,
    pub value: &'a str,
}

/// Iterator over the top-level fields of an encoded string
#[derive(Debug, Clone)]
pub struct TlvReader<'a> {
    rest: &'a str,
    failed: bool,
}

impl<'a> TlvReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            rest: input,
            failed: false,
        }
    }

    fn read_field(&mut self) -> Result<TlvField<'a>> {
        let header = self
            .rest
            .get(..4)
            .ok_or_else(|| {
                Error::InvalidPayload(format!("Truncated field header: {:?}", self.rest))
            })?;
        if !header.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPayload(format!(
                "Non-numeric field header: {:?}",
                header
            )));
        }
        let tag = &header[..2];
        let len: usize = header[2..]
            .parse()
            .map_err(|_| Error::InvalidPayload(format!("Invalid length in {:?}", header)))?;
        let value = self.rest.get(4..4 + len).ok_or_else(|| {
            Error::InvalidPayload(format!("Field {} declares {} bytes, input is shorter", tag, len))
        })?;
        self.rest = &self.rest[4 + len..];
        Ok(TlvField { tag, value })
    }
}

impl<'a> Iterator for TlvReader<'a> {
    type Item = Result<TlvField<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.rest.is_empty() {
            return None;
        }
        let field = self.read_field();
        if field.is_err() {
            self.failed = true;
        }
        Some(field)
    }
}

/// Read every field of `input`, failing on the first malformed one.
pub fn read_fields(input: &str) -> Result<Vec<TlvField<'_>>> {
    TlvReader::new(input).collect()
}
