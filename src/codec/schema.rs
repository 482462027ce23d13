// ABOUTME: Static registry mapping SMGP commands to ordered body field layouts
// ABOUTME: Evaluates layouts in a single pass, resolving derived widths from earlier fields

use super::CodecError;
use super::field::{Fields, Value, decode_field, encode_field};
use crate::datatypes::CommandId;
use bytes::{Bytes, BytesMut};

/// Wire representation of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Big-endian unsigned integer of 1 to 4 bytes.
    Unsigned,
    /// Left-justified string, NUL padded; longer values are silently truncated.
    Ascii,
    /// Bytes copied verbatim, zero padded or truncated to the width.
    Raw,
}

/// Byte width of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Fixed(usize),
    /// Width equals the integer value of a field declared earlier in the same schema.
    LengthOf(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub width: Width,
}

const fn uint(name: &'static str, width: usize) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Unsigned,
        width: Width::Fixed(width),
    }
}

const fn ascii(name: &'static str, width: usize) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Ascii,
        width: Width::Fixed(width),
    }
}

const fn raw(name: &'static str, width: Width) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Raw,
        width,
    }
}

pub static LOGIN: &[FieldSpec] = &[
    ascii("ClientID", 8),
    raw("AuthenticatorClient", Width::Fixed(16)),
    uint("LoginMode", 1),
    uint("TimeStamp", 4),
    uint("ClientVersion", 1),
];

pub static LOGIN_RESP: &[FieldSpec] = &[
    uint("Status", 4),
    raw("AuthenticatorServer", Width::Fixed(16)),
    uint("ServerVersion", 1),
];

pub static SUBMIT: &[FieldSpec] = &[
    uint("MsgType", 1),
    uint("NeedReport", 1),
    uint("Priority", 1),
    ascii("ServiceID", 10),
    ascii("FeeType", 2),
    ascii("FeeCode", 6),
    ascii("FixedFee", 6),
    uint("MsgFormat", 1),
    ascii("ValidTime", 17),
    ascii("AtTime", 17),
    ascii("SrcTermID", 21),
    ascii("ChargeTermID", 21),
    uint("DestTermIDCount", 1),
    ascii("DestTermID", 21),
    uint("MsgLength", 1),
    raw("MsgContent", Width::LengthOf("MsgLength")),
    ascii("Reserve", 8),
    uint("TP_pid", 1),
    uint("TP_udhi", 1),
    uint("PkTotal", 1),
    uint("PkNumber", 1),
];

pub static SUBMIT_RESP: &[FieldSpec] = &[ascii("MsgID", 10), uint("Status", 4)];

pub static DELIVER: &[FieldSpec] = &[
    ascii("MsgID", 10),
    uint("IsReport", 1),
    uint("MsgFormat", 1),
    ascii("RecvTime", 14),
    ascii("SrcTermID", 21),
    ascii("DestTermID", 21),
    uint("MsgLength", 1),
    raw("MsgContent", Width::LengthOf("MsgLength")),
    ascii("Reserve", 8),
];

pub static DELIVER_RESP: &[FieldSpec] = &[ascii("MsgID", 10), uint("Status", 4)];

/// Layout of a status report carried inside a Deliver's MsgContent when
/// `IsReport == 1`. It has no command code of its own.
pub static DELIVER_REPORT_CONTENT: &[FieldSpec] = &[
    ascii("MsgID", 10),
    ascii("sub", 3),
    ascii("Dlvrd", 3),
    ascii("Submit_date", 10),
    ascii("done_date", 10),
    ascii("Err", 3),
    ascii("Txt", 20),
];

/// Body layout for a command; `None` means the command is header-only.
pub fn for_command(command: CommandId) -> Option<&'static [FieldSpec]> {
    match command {
        CommandId::Login => Some(LOGIN),
        CommandId::LoginResp => Some(LOGIN_RESP),
        CommandId::Submit => Some(SUBMIT),
        CommandId::SubmitResp => Some(SUBMIT_RESP),
        CommandId::Deliver => Some(DELIVER),
        CommandId::DeliverResp => Some(DELIVER_RESP),
        _ => None,
    }
}

fn resolve_width(spec: &FieldSpec, resolved: &Fields) -> Result<usize, CodecError> {
    match spec.width {
        Width::Fixed(width) => Ok(width),
        Width::LengthOf(source) => match resolved.get(source) {
            Some(Value::Int(length)) => Ok(*length as usize),
            Some(_) => Err(CodecError::FieldType {
                field: source,
                expected: "unsigned integer",
            }),
            None => Err(CodecError::MissingField(source)),
        },
    }
}

/// Encode `fields` following `schema`. Fields absent from the map are
/// written as zeros so trailing optional fields keep the frame shape.
pub fn encode_fields(
    schema: &[FieldSpec],
    fields: &Fields,
    buf: &mut BytesMut,
) -> Result<(), CodecError> {
    let mut resolved = Fields::new();
    for spec in schema {
        let width = resolve_width(spec, &resolved)?;
        let value = fields.get(spec.name);
        encode_field(buf, spec, width, value)?;

        if spec.kind == FieldKind::Unsigned {
            let number = value.and_then(Value::as_int).unwrap_or(0);
            resolved.insert(spec.name, Value::Int(number));
        }
    }
    Ok(())
}

/// Decode `body` following `schema`.
///
/// Decoding stops without error when the body is exhausted on a field
/// boundary; fields after that point are simply absent from the result.
/// A zero-width field at the end of the body is still recorded.
pub fn decode_fields(schema: &[FieldSpec], body: &Bytes) -> Result<Fields, CodecError> {
    let mut fields = Fields::new();
    let mut offset = 0;

    for spec in schema {
        let width = resolve_width(spec, &fields)?;
        if width > 0 && offset >= body.len() {
            break;
        }
        let value = decode_field(body, offset, spec, width)?;
        offset += width;
        fields.insert(spec.name, value);
    }

    Ok(fields)
}
