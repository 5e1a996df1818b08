//! DER tag-length-value encoding/decoding
//!
//! Parsing never copies: an [`Element`] is a set of offsets into the buffer it
//! was read from, so nested structures can be walked without allocating a
//! sub-slice per node. Only single byte tags and definite lengths are handled,
//! which covers every structure found in SPKI, PKCS#8, PKCS#1 and SEC1 keys.
//!
//! See: <https://www.itu.int/rec/T-REC-X.690>

use crate::{Asn1Error, Result, oid::encode_oid};

// ****************************************************************************
// Tags
// ****************************************************************************
pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;
/// `[0]` context specific, constructed
pub const TAG_CONTEXT_0: u8 = 0xa0;
/// `[1]` context specific, constructed
pub const TAG_CONTEXT_1: u8 = 0xa1;
/// `[1]` context specific, primitive (RFC 5958 `[1] IMPLICIT BIT STRING`)
pub const TAG_CONTEXT_1_PRIMITIVE: u8 = 0x81;

/// Position of one parsed TLV node within an immutable buffer
///
/// `value_end - value_start == length` and `end <= buffer.len()` always hold
/// for elements returned by [`read_element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub tag: u8,
    pub length: usize,
    pub header_length: usize,
    pub start: usize,
    pub value_start: usize,
    pub value_end: usize,
    pub end: usize,
}

impl Element {
    /// Value bytes of this element
    ///
    /// `buffer` must be the buffer the element was read from.
    pub fn value<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[self.value_start..self.value_end]
    }

    /// Complete encoding of this element, header included
    pub fn raw<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[self.start..self.end]
    }

    /// Fails with `InvalidDer` unless the element carries `tag`
    pub fn expect_tag(&self, tag: u8, what: &str) -> Result<()> {
        if self.tag == tag {
            Ok(())
        } else {
            Err(Asn1Error::InvalidDer(format!(
                "expected {what} (tag 0x{tag:02x}) at offset {}, found tag 0x{:02x}",
                self.start, self.tag
            )))
        }
    }
}

/// Reads one TLV header at `offset`
pub fn read_element(buffer: &[u8], offset: usize) -> Result<Element> {
    let Some(&tag) = buffer.get(offset) else {
        return Err(Asn1Error::InvalidDer(format!(
            "missing tag at offset {offset}"
        )));
    };
    let Some(&first) = buffer.get(offset + 1) else {
        return Err(Asn1Error::InvalidDer(format!(
            "missing length at offset {}",
            offset + 1
        )));
    };

    let (length, header_length) = if first < 0x80 {
        (first as usize, 2)
    } else {
        let count = (first & 0x7f) as usize;
        if count == 0 {
            return Err(Asn1Error::InvalidDer(format!(
                "indefinite length at offset {offset} is not allowed in DER"
            )));
        }
        if count > size_of::<usize>() {
            return Err(Asn1Error::InvalidDer(format!(
                "length of {count} bytes at offset {offset} is too large"
            )));
        }
        let length_start = offset + 2;
        let Some(length_bytes) = buffer.get(length_start..length_start + count) else {
            return Err(Asn1Error::InvalidDer(format!(
                "long form length at offset {offset} claims {count} length bytes, only {} remain",
                buffer.len().saturating_sub(length_start)
            )));
        };
        let length = length_bytes
            .iter()
            .fold(0usize, |acc, byte| (acc << 8) | *byte as usize);
        (length, 2 + count)
    };

    let value_start = offset + header_length;
    let value_end = value_start
        .checked_add(length)
        .filter(|end| *end <= buffer.len())
        .ok_or_else(|| {
            Asn1Error::InvalidDer(format!(
                "element at offset {offset} claims {length} bytes, only {} remain",
                buffer.len().saturating_sub(value_start)
            ))
        })?;

    Ok(Element {
        tag,
        length,
        header_length,
        start: offset,
        value_start,
        value_end,
        end: value_end,
    })
}

/// Reads the children of a constructed element
///
/// The children must tile `[value_start, value_end)` of the parent exactly.
pub fn read_children(buffer: &[u8], parent: &Element) -> Result<Vec<Element>> {
    let mut children = Vec::new();
    let mut offset = parent.value_start;

    while offset < parent.value_end {
        let child = read_element(buffer, offset)?;
        if child.end > parent.value_end {
            return Err(Asn1Error::InvalidDer(format!(
                "element at offset {offset} ends at {}, past the end of its parent at {}",
                child.end, parent.value_end
            )));
        }
        offset = child.end;
        children.push(child);
    }

    Ok(children)
}

/// Reads the outermost SEQUENCE of a DER document and its children
///
/// Trailing bytes after the SEQUENCE are rejected.
pub fn read_root(buffer: &[u8]) -> Result<(Element, Vec<Element>)> {
    let root = read_element(buffer, 0)?;
    root.expect_tag(TAG_SEQUENCE, "SEQUENCE")?;
    if root.end != buffer.len() {
        return Err(Asn1Error::InvalidDer(format!(
            "{} trailing bytes after the outer SEQUENCE",
            buffer.len() - root.end
        )));
    }
    let children = read_children(buffer, &root)?;
    Ok((root, children))
}

/// Reads a non-negative INTEGER that fits in a `u64` (version numbers)
pub fn read_unsigned(buffer: &[u8], element: &Element) -> Result<u64> {
    element.expect_tag(TAG_INTEGER, "INTEGER")?;
    let value = element.value(buffer);
    let Some(first) = value.first() else {
        return Err(Asn1Error::InvalidDer(format!(
            "empty INTEGER at offset {}",
            element.start
        )));
    };
    if first & 0x80 != 0 {
        return Err(Asn1Error::InvalidDer(format!(
            "negative INTEGER at offset {}",
            element.start
        )));
    }
    let significant = value
        .iter()
        .position(|byte| *byte != 0)
        .map_or(&value[value.len()..], |index| &value[index..]);
    if significant.len() > size_of::<u64>() {
        return Err(Asn1Error::InvalidDer(format!(
            "INTEGER at offset {} does not fit in 64 bits",
            element.start
        )));
    }
    Ok(significant
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | *byte as u64))
}

/// Strips the leading "unused bits" byte of a BIT STRING value
///
/// Key material is always a whole number of bytes, so a non-zero unused bits
/// count is rejected.
pub fn bit_string_payload(value: &[u8]) -> Result<&[u8]> {
    match value.split_first() {
        Some((0, payload)) => Ok(payload),
        Some((unused, _)) => Err(Asn1Error::InvalidDer(format!(
            "BIT STRING with {unused} unused bits"
        ))),
        None => Err(Asn1Error::InvalidDer("empty BIT STRING".into())),
    }
}

/// Encodes a length in short form below 128, minimal long form otherwise
pub fn encode_length(length: usize) -> Vec<u8> {
    if length < 0x80 {
        return vec![length as u8];
    }

    let bytes = length.to_be_bytes();
    let skip = bytes.iter().take_while(|byte| **byte == 0).count();
    let significant = &bytes[skip..];

    let mut encoded = Vec::with_capacity(1 + significant.len());
    encoded.push(0x80 | significant.len() as u8);
    encoded.extend_from_slice(significant);
    encoded
}

/// Encodes `value` under an arbitrary single byte tag
pub fn encode_tag(tag: u8, value: &[u8]) -> Vec<u8> {
    let length = encode_length(value.len());
    let mut encoded = Vec::with_capacity(1 + length.len() + value.len());
    encoded.push(tag);
    encoded.extend(length);
    encoded.extend_from_slice(value);
    encoded
}

/// Encodes a SEQUENCE from already encoded elements
pub fn encode_sequence(items: &[&[u8]]) -> Vec<u8> {
    encode_tag(TAG_SEQUENCE, &items.concat())
}

pub fn encode_octet_string(value: &[u8]) -> Vec<u8> {
    encode_tag(TAG_OCTET_STRING, value)
}

/// Encodes a BIT STRING with zero unused bits
pub fn encode_bit_string(value: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(1 + value.len());
    content.push(0);
    content.extend_from_slice(value);
    encode_tag(TAG_BIT_STRING, &content)
}

/// Encodes a non-negative INTEGER in minimal two's complement form
///
/// Zero is a single `0x00` content byte. A leading `0x00` is added when the
/// top bit of the first significant byte is set.
pub fn encode_integer(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes
        .iter()
        .take_while(|byte| **byte == 0)
        .count()
        .min(bytes.len() - 1);

    let mut content = Vec::with_capacity(1 + bytes.len() - skip);
    if bytes[skip] & 0x80 != 0 {
        content.push(0);
    }
    content.extend_from_slice(&bytes[skip..]);
    encode_tag(TAG_INTEGER, &content)
}

pub fn encode_null() -> Vec<u8> {
    vec![TAG_NULL, 0x00]
}

/// Encodes a dotted OID as a complete OBJECT IDENTIFIER element
pub fn encode_oid_element(dotted: &str) -> Result<Vec<u8>> {
    Ok(encode_tag(TAG_OID, &encode_oid(dotted)?))
}
