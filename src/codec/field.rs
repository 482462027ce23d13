// ABOUTME: Field value model and single-field wire codec for schema-driven SMGP bodies
// ABOUTME: Writes unsigned integers big-endian, ASCII NUL padded and raw bytes verbatim

use super::CodecError;
use super::schema::{FieldKind, FieldSpec};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;

/// Decoded or to-be-encoded value of one body field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(u32),
    Str(String),
    Bytes(Bytes),
}

impl Value {
    pub fn as_int(&self) -> Option<u32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Byte view of string and byte values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Str(s) => Some(s.as_bytes()),
            Value::Bytes(b) => Some(b),
            Value::Int(_) => None,
        }
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Int(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b.into())
    }
}

/// Named field values of one frame body, keyed by protocol field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    values: BTreeMap<&'static str, Value>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &'static str, value: impl Into<Value>) {
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    /// Overlay `other` on top of these fields; values in `other` win.
    pub fn merge(&mut self, other: Fields) {
        self.values.extend(other.values);
    }

    fn require(&self, name: &'static str) -> Result<&Value, CodecError> {
        self.values.get(name).ok_or(CodecError::MissingField(name))
    }

    pub fn int(&self, name: &'static str) -> Result<u32, CodecError> {
        self.require(name)?.as_int().ok_or(CodecError::FieldType {
            field: name,
            expected: "unsigned integer",
        })
    }

    pub fn byte(&self, name: &'static str) -> Result<u8, CodecError> {
        let value = self.int(name)?;
        u8::try_from(value).map_err(|_| CodecError::ValueOutOfRange {
            field: name,
            value: value.into(),
            width: 1,
        })
    }

    /// Like [`Fields::byte`], but an absent field is `None` instead of an error.
    pub fn opt_byte(&self, name: &'static str) -> Result<Option<u8>, CodecError> {
        if self.contains(name) {
            self.byte(name).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn string(&self, name: &'static str) -> Result<String, CodecError> {
        match self.require(name)? {
            Value::Str(s) => Ok(s.clone()),
            Value::Bytes(b) => Ok(String::from_utf8_lossy(b).into_owned()),
            Value::Int(_) => Err(CodecError::FieldType {
                field: name,
                expected: "string",
            }),
        }
    }

    pub fn bytes(&self, name: &'static str) -> Result<Bytes, CodecError> {
        match self.require(name)? {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Str(s) => Ok(Bytes::copy_from_slice(s.as_bytes())),
            Value::Int(_) => Err(CodecError::FieldType {
                field: name,
                expected: "bytes",
            }),
        }
    }
}

/// Write one field at its resolved width. A missing value encodes as zeros.
pub(crate) fn encode_field(
    buf: &mut BytesMut,
    spec: &FieldSpec,
    width: usize,
    value: Option<&Value>,
) -> Result<(), CodecError> {
    match spec.kind {
        FieldKind::Unsigned => {
            if !(1..=4).contains(&width) {
                return Err(CodecError::InvalidWidth {
                    field: spec.name,
                    width,
                });
            }
            let number = match value {
                None => 0,
                Some(Value::Int(n)) => u64::from(*n),
                Some(_) => {
                    return Err(CodecError::FieldType {
                        field: spec.name,
                        expected: "unsigned integer",
                    });
                }
            };
            if number >> (8 * width) != 0 {
                return Err(CodecError::ValueOutOfRange {
                    field: spec.name,
                    value: number,
                    width,
                });
            }
            buf.put_uint(number, width);
        }
        FieldKind::Ascii | FieldKind::Raw => {
            let bytes = match value {
                None => &[][..],
                Some(value) => value.as_bytes().ok_or(CodecError::FieldType {
                    field: spec.name,
                    expected: "string or bytes",
                })?,
            };
            let len = bytes.len().min(width);
            buf.put_slice(&bytes[..len]);
            buf.put_bytes(0, width - len);
        }
    }
    Ok(())
}

/// Read one field of `width` bytes starting at `offset`.
pub(crate) fn decode_field(
    body: &Bytes,
    offset: usize,
    spec: &FieldSpec,
    width: usize,
) -> Result<Value, CodecError> {
    let remaining = body.len().saturating_sub(offset);
    if remaining < width {
        return Err(CodecError::Truncated {
            field: spec.name,
            needed: width,
            remaining,
        });
    }

    let raw = body.slice(offset..offset + width);
    let value = match spec.kind {
        FieldKind::Unsigned => {
            if !(1..=4).contains(&width) {
                return Err(CodecError::InvalidWidth {
                    field: spec.name,
                    width,
                });
            }
            let mut cursor = &raw[..];
            Value::Int(cursor.get_uint(width) as u32)
        }
        FieldKind::Ascii => {
            let end = raw.iter().rposition(|b| *b != 0).map_or(0, |last| last + 1);
            Value::Str(String::from_utf8_lossy(&raw[..end]).into_owned())
        }
        FieldKind::Raw => Value::Bytes(raw),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::schema::Width;

    const U1: FieldSpec = FieldSpec {
        name: "MsgType",
        kind: FieldKind::Unsigned,
        width: Width::Fixed(1),
    };
    const U4: FieldSpec = FieldSpec {
        name: "Status",
        kind: FieldKind::Unsigned,
        width: Width::Fixed(4),
    };
    const A6: FieldSpec = FieldSpec {
        name: "FeeCode",
        kind: FieldKind::Ascii,
        width: Width::Fixed(6),
    };

    #[test]
    fn test_unsigned_big_endian() {
        let mut buf = BytesMut::new();
        encode_field(&mut buf, &U4, 4, Some(&Value::Int(0x0102_0304))).unwrap();
        encode_field(&mut buf, &U1, 1, Some(&Value::Int(0xAB))).unwrap();
        assert_eq!(buf.as_ref(), &[1, 2, 3, 4, 0xAB]);

        let body = buf.freeze();
        assert_eq!(decode_field(&body, 0, &U4, 4).unwrap(), Value::Int(0x0102_0304));
        assert_eq!(decode_field(&body, 4, &U1, 1).unwrap(), Value::Int(0xAB));
    }

    #[test]
    fn test_unsigned_out_of_range() {
        let mut buf = BytesMut::new();
        let err = encode_field(&mut buf, &U1, 1, Some(&Value::Int(256))).unwrap_err();
        assert!(matches!(err, CodecError::ValueOutOfRange { field: "MsgType", value: 256, width: 1 }));
    }

    #[test]
    fn test_ascii_is_nul_padded_and_truncated() {
        let mut buf = BytesMut::new();
        encode_field(&mut buf, &A6, 6, Some(&Value::from("100"))).unwrap();
        assert_eq!(buf.as_ref(), b"100\0\0\0");

        let mut buf = BytesMut::new();
        encode_field(&mut buf, &A6, 6, Some(&Value::from("12345678"))).unwrap();
        assert_eq!(buf.as_ref(), b"123456");
    }

    #[test]
    fn test_ascii_strips_only_trailing_nuls() {
        let body = Bytes::from_static(b"a\0b\0\0\0");
        assert_eq!(decode_field(&body, 0, &A6, 6).unwrap(), Value::from("a\0b"));
    }

    #[test]
    fn test_missing_value_encodes_zeros() {
        let mut buf = BytesMut::new();
        encode_field(&mut buf, &U4, 4, None).unwrap();
        encode_field(&mut buf, &A6, 6, None).unwrap();
        assert_eq!(buf.as_ref(), &[0u8; 10]);
    }

    #[test]
    fn test_type_mismatch() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            encode_field(&mut buf, &U4, 4, Some(&Value::from("x"))),
            Err(CodecError::FieldType { field: "Status", .. })
        ));
        assert!(matches!(
            encode_field(&mut buf, &A6, 6, Some(&Value::Int(1))),
            Err(CodecError::FieldType { field: "FeeCode", .. })
        ));
    }

    #[test]
    fn test_fields_accessors() {
        let mut fields = Fields::new()
            .with("MsgID", "0000000001")
            .with("Status", 0u32)
            .with("PkTotal", 300u32);

        assert_eq!(fields.string("MsgID").unwrap(), "0000000001");
        assert_eq!(fields.int("Status").unwrap(), 0);
        assert!(matches!(fields.byte("PkTotal"), Err(CodecError::ValueOutOfRange { .. })));
        assert_eq!(fields.opt_byte("TP_pid").unwrap(), None);
        assert_eq!(fields.int("Missing"), Err(CodecError::MissingField("Missing")));

        fields.merge(Fields::new().with("Status", 21u32).with("DestTermID", "133"));
        assert_eq!(fields.int("Status").unwrap(), 21);
        assert_eq!(fields.len(), 4);
    }
}
