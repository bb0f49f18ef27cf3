//! Narrow protobuf wire helpers for custom option recovery
//!
//! This is not a general codec. It covers what is needed to read custom
//! options out of an options blob the descriptor mirror kept as raw bytes:
//! varints, wire tags, length-delimited payloads, and splitting a blob into
//! `(tag bytes, payload bytes)` entries.

use rpcgen_common::{GeneratorError, Result};

/// Longest legal varint encoding of a u64
pub const MAX_VARINT_BYTES: usize = 10;

/// Longest legal tag encoding (29-bit field number + 3-bit wire type)
pub const MAX_TAG_BYTES: usize = 5;

/// Largest field number protobuf allows
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Protobuf wire type, stored in the low three bits of a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl WireType {
    /// Interpret the low three bits of a tag
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(GeneratorError::Decode(format!("Invalid wire type {}", other))),
        }
    }
}

/// A field the descriptor reader did not recognize
///
/// `payload` holds the encoded value exactly as it follows the tag on the
/// wire; for length-delimited fields that includes the length prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    pub tag: Vec<u8>,
    pub payload: Vec<u8>,
}

impl UnknownField {
    /// Decode the field number and wire type carried by this entry's tag
    pub fn decode_tag(&self) -> Result<(u32, WireType)> {
        decode_tag(&self.tag)
    }
}

/// Append the varint encoding of `value` to `buf`
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Decode a varint from the start of `bytes`
///
/// Returns the value and the number of bytes consumed. Each byte carries
/// seven bits, least-significant group first; a set top bit means another
/// byte follows.
pub fn decode_varint(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate().take(MAX_VARINT_BYTES) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    if bytes.len() >= MAX_VARINT_BYTES {
        Err(GeneratorError::Decode("Varint is longer than 10 bytes".to_string()))
    } else {
        Err(GeneratorError::Decode(format!(
            "Truncated varint after {} bytes",
            bytes.len()
        )))
    }
}

/// Encode a wire tag for `field_number` and `wire_type`
pub fn encode_tag(field_number: u32, wire_type: WireType) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_TAG_BYTES);
    encode_varint((u64::from(field_number) << 3) | wire_type as u64, &mut buf);
    buf
}

/// Decode a complete tag into its field number and wire type
///
/// The tag must be exactly one varint: trailing bytes, a missing final
/// byte, or field number zero are decode errors.
pub fn decode_tag(tag: &[u8]) -> Result<(u32, WireType)> {
    if tag.is_empty() {
        return Err(GeneratorError::Decode("Empty field tag".to_string()));
    }
    if tag.len() > MAX_TAG_BYTES {
        return Err(GeneratorError::Decode(format!(
            "Field tag is {} bytes long",
            tag.len()
        )));
    }

    let (value, consumed) = decode_varint(tag)?;
    if consumed != tag.len() {
        return Err(GeneratorError::Decode(format!(
            "Field tag has {} trailing bytes",
            tag.len() - consumed
        )));
    }

    let wire_type = WireType::from_bits((value & 0x7) as u8)?;
    let field_number = value >> 3;
    if field_number == 0 || field_number > u64::from(MAX_FIELD_NUMBER) {
        return Err(GeneratorError::Decode(format!(
            "Field number {} is out of range",
            field_number
        )));
    }

    Ok((field_number as u32, wire_type))
}

/// Strip the length prefix from a length-delimited payload
///
/// The payload must hold exactly the number of bytes its prefix declares.
pub fn decode_length_delimited(payload: &[u8]) -> Result<&[u8]> {
    let (length, prefix) = decode_varint(payload)?;
    let body = &payload[prefix..];
    if body.len() as u64 != length {
        return Err(GeneratorError::Decode(format!(
            "Length-delimited payload declares {} bytes but carries {}",
            length,
            body.len()
        )));
    }
    Ok(body)
}

/// Split an encoded message into its fields, in wire order
///
/// Group-encoded fields are not supported and abort the split.
pub fn split_fields(bytes: &[u8]) -> Result<Vec<UnknownField>> {
    let mut fields = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let (_, tag_len) = decode_varint(&bytes[pos..])?;
        let tag = &bytes[pos..pos + tag_len];
        let (_, wire_type) = decode_tag(tag)?;
        pos += tag_len;

        let rest = &bytes[pos..];
        let payload_len = match wire_type {
            WireType::Varint => decode_varint(rest)?.1,
            WireType::Fixed64 => 8,
            WireType::Fixed32 => 4,
            WireType::LengthDelimited => {
                let (length, prefix) = decode_varint(rest)?;
                let length = usize::try_from(length).map_err(|_| {
                    GeneratorError::Decode(format!("Length {} does not fit in memory", length))
                })?;
                prefix.checked_add(length).ok_or_else(|| {
                    GeneratorError::Decode(format!("Length {} overflows", length))
                })?
            }
            WireType::StartGroup | WireType::EndGroup => {
                return Err(GeneratorError::Decode(
                    "Group-encoded option fields are not supported".to_string(),
                ))
            }
        };

        if payload_len > rest.len() {
            return Err(GeneratorError::Decode(format!(
                "Field payload needs {} bytes but only {} remain",
                payload_len,
                rest.len()
            )));
        }

        fields.push(UnknownField {
            tag: tag.to_vec(),
            payload: rest[..payload_len].to_vec(),
        });
        pos += payload_len;
    }

    Ok(fields)
}
