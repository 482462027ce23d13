// SMGP Codec - Separates wire encoding from the typed message models
//
// Every frame is a 12-byte big-endian header followed by a body whose layout is
// selected by the command code. Bodies are described declaratively in
// `schema` and evaluated field by field through `field`, so the typed models in
// `datatypes` never touch byte offsets themselves.

pub mod content;
pub mod field;
pub mod schema;

pub use field::{Fields, Value};
pub use schema::{FieldKind, FieldSpec, Width};

use crate::datatypes::CommandId;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Maximum accepted `PacketLength`. SMGP frames are small; anything larger
/// is treated as a corrupt stream rather than buffered.
pub const MAX_PACKET_SIZE: u32 = 65536; // 64KB

/// SMGP frame header (12 bytes, common to all frames)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub packet_length: u32,
    pub request_id: u32,
    pub sequence_id: u32,
}

impl Header {
    pub const SIZE: usize = 12;

    /// Decode a header from the first 12 bytes of `buf`.
    ///
    /// Only the byte count is checked here; `PacketLength` plausibility is
    /// checked separately by [`Header::validate`] so callers can peek a
    /// header before the full frame has arrived.
    pub fn decode(mut buf: &[u8]) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        Ok(Header {
            packet_length: buf.get_u32(),
            request_id: buf.get_u32(),
            sequence_id: buf.get_u32(),
        })
    }

    /// Encode the header to the buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.packet_length);
        buf.put_u32(self.request_id);
        buf.put_u32(self.sequence_id);
    }

    /// Reject packet lengths that cannot describe a real frame.
    pub fn validate(&self, max_packet_size: u32) -> Result<(), CodecError> {
        if self.packet_length < Self::SIZE as u32 || self.packet_length > max_packet_size {
            return Err(CodecError::InvalidPacketLength {
                length: self.packet_length,
                min: Self::SIZE as u32,
                max: max_packet_size,
            });
        }
        Ok(())
    }

    /// The command code, if it is one this crate knows.
    pub fn command(&self) -> Result<CommandId, CodecError> {
        CommandId::try_from(self.request_id)
            .map_err(|_| CodecError::UnknownCommand(self.request_id))
    }

    /// Length of the body that follows the header.
    pub fn body_len(&self) -> usize {
        (self.packet_length as usize).saturating_sub(Self::SIZE)
    }
}

/// Errors produced while encoding or decoding SMGP frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Incomplete frame: not enough data")]
    Incomplete,

    #[error("Invalid packet length: {length} (must be {min}-{max})")]
    InvalidPacketLength { length: u32, min: u32, max: u32 },

    #[error("Unknown command id: 0x{0:08x}")]
    UnknownCommand(u32),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} must hold {expected}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Value {value} does not fit field {field} ({width} bytes)")]
    ValueOutOfRange {
        field: &'static str,
        value: u64,
        width: usize,
    },

    #[error("Field {field} needs {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("Unsupported width {width} for field {field}")]
    InvalidWidth { field: &'static str, width: usize },

    #[error("Invalid value {value} for field {field}")]
    InvalidValue { field: &'static str, value: u32 },
}

/// Assemble a complete frame. `PacketLength` is always recomputed from the
/// body, never taken from the caller.
pub fn encode_frame(request_id: u32, sequence_id: u32, body: &[u8]) -> Bytes {
    let header = Header {
        packet_length: (Header::SIZE + body.len()) as u32,
        request_id,
        sequence_id,
    };

    let mut buf = BytesMut::with_capacity(Header::SIZE + body.len());
    header.encode(&mut buf);
    buf.put_slice(body);
    buf.freeze()
}

/// Encode a body using the schema registered for `command`.
///
/// Commands without a schema are header-only and encode to an empty body.
pub fn encode_body(command: CommandId, fields: &Fields) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::new();
    if let Some(spec) = schema::for_command(command) {
        schema::encode_fields(spec, fields, &mut buf)?;
    }
    Ok(buf.freeze())
}

/// Decode a body using the schema registered for `command`.
pub fn decode_body(command: CommandId, body: &Bytes) -> Result<Fields, CodecError> {
    match schema::for_command(command) {
        Some(spec) => schema::decode_fields(spec, body),
        None => Ok(Fields::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = Header {
            packet_length: 0x0000_00A5,
            request_id: 0x8000_0002,
            sequence_id: 0xFFFF_FFFF,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), Header::SIZE);
        assert_eq!(Header::decode(&buf).unwrap(), header);
    }

    #[test]
    fn test_header_is_big_endian() {
        let bytes = encode_frame(0x0000_0004, 7, &[]);
        assert_eq!(
            bytes.as_ref(),
            &[0, 0, 0, 12, 0, 0, 0, 4, 0, 0, 0, 7]
        );
    }

    #[test]
    fn test_header_decode_needs_twelve_bytes() {
        assert_eq!(Header::decode(&[0u8; 11]), Err(CodecError::Incomplete));
    }

    #[test]
    fn test_validate_rejects_implausible_lengths() {
        let mut header = Header {
            packet_length: 5,
            request_id: 1,
            sequence_id: 1,
        };
        assert!(matches!(
            header.validate(MAX_PACKET_SIZE),
            Err(CodecError::InvalidPacketLength { length: 5, .. })
        ));

        header.packet_length = u32::MAX;
        assert!(header.validate(MAX_PACKET_SIZE).is_err());

        header.packet_length = 12;
        assert!(header.validate(MAX_PACKET_SIZE).is_ok());
    }

    #[test]
    fn test_encode_frame_sets_packet_length() {
        let frame = encode_frame(0x8000_0002, 42, b"0123456789\0\0\0\0");
        let header = Header::decode(&frame).unwrap();
        assert_eq!(header.packet_length, 26);
        assert_eq!(header.sequence_id, 42);
        assert_eq!(header.command(), Ok(CommandId::SubmitResp));
    }

    #[test]
    fn test_header_only_commands_have_empty_bodies() {
        let body = encode_body(CommandId::ActiveTest, &Fields::new()).unwrap();
        assert!(body.is_empty());
        assert!(decode_body(CommandId::ExitResp, &Bytes::new()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_command_is_reported() {
        let header = Header {
            packet_length: 12,
            request_id: 0x0000_0042,
            sequence_id: 1,
        };
        assert_eq!(header.command(), Err(CodecError::UnknownCommand(0x42)));
    }
}
