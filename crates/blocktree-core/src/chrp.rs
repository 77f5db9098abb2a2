//! Compact human-readable prefixes (CHRP)
//!
//! A CHRP tags an algorithm choice inline, with no separator after it:
//! - a single non-digit character is the whole tag (`a`, `b`)
//! - a leading ASCII digit `k` declares `k` more characters (`1a`, `3xyz`)
//!
//! Used for hash functions, signature schemes and key material.

/// CHRP error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChrpError {
    #[error("need more characters")]
    Incomplete,
}

/// Length of the tag at the front of `data`
fn tag_len(data: &[u8]) -> Result<usize, ChrpError> {
    let first = *data.first().ok_or(ChrpError::Incomplete)?;
    let len = if first.is_ascii_digit() {
        usize::from(first - b'0') + 1
    } else {
        1
    };
    if data.len() < len {
        return Err(ChrpError::Incomplete);
    }
    Ok(len)
}

/// Read the tag at the front of `data`
pub fn read_chrp(data: &[u8]) -> Result<&[u8], ChrpError> {
    Ok(&data[..tag_len(data)?])
}

/// Split `data` into (tag, rest)
pub fn split_chrp(data: &[u8]) -> Result<(&[u8], &[u8]), ChrpError> {
    Ok(data.split_at(tag_len(data)?))
}

/// Read the tag at the front of a string
///
/// A multi-byte character inside a declared tag counts as incomplete input.
pub fn read_chrp_str(text: &str) -> Result<&str, ChrpError> {
    split_chrp_str(text).map(|(tag, _)| tag)
}

/// Split a string into (tag, rest)
pub fn split_chrp_str(text: &str) -> Result<(&str, &str), ChrpError> {
    let first = text.chars().next().ok_or(ChrpError::Incomplete)?;
    let len = if first.is_ascii_digit() {
        tag_len(text.as_bytes())?
    } else {
        first.len_utf8()
    };
    if !text.is_char_boundary(len) {
        return Err(ChrpError::Incomplete);
    }
    Ok(text.split_at(len))
}

/// Whether `tag` is exactly one self-delimiting CHRP
pub fn is_chrp(tag: &[u8]) -> bool {
    matches!(tag_len(tag), Ok(len) if len == tag.len())
}
