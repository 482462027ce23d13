// ABOUTME: Text codecs for SMGP MsgContent selected by the MsgFormat field
// ABOUTME: Handles GB18030, big-endian UCS-2 with concatenation headers, and ASCII payloads

use bytes::Bytes;
use encoding_rs::{GB18030, UTF_16BE};

/// `MsgFormat` values understood by the content codecs.
pub mod msg_format {
    pub const ASCII: u8 = 0;
    pub const WRITE_CARD: u8 = 3;
    pub const BINARY: u8 = 4;
    pub const UCS2: u8 = 8;
    pub const GB: u8 = 15;
}

/// Concatenated-SMS user data header: `05 00 03 ref total seq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Udh {
    pub reference: u8,
    pub total: u8,
    pub sequence: u8,
}

impl Udh {
    pub const LEN: usize = 6;
    const MARKER: [u8; 3] = [0x05, 0x00, 0x03];

    /// Parse a header at the start of `content`, if one is present.
    pub fn parse(content: &[u8]) -> Option<Udh> {
        if content.len() < Self::LEN || content[..3] != Self::MARKER {
            return None;
        }
        Some(Udh {
            reference: content[3],
            total: content[4],
            sequence: content[5],
        })
    }

    pub fn to_bytes(self) -> [u8; Self::LEN] {
        [0x05, 0x00, 0x03, self.reference, self.total, self.sequence]
    }
}

/// MsgContent interpreted as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub text: String,
    /// Present when the content was one part of a concatenated message.
    pub udh: Option<Udh>,
}

/// Encode text as big-endian UCS-2, the wire byte order for MsgFormat 8.
pub fn encode_ucs2(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

pub fn decode_ucs2(bytes: &[u8]) -> String {
    UTF_16BE.decode_without_bom_handling(bytes).0.into_owned()
}

/// Decode MsgContent according to `msg_format`.
///
/// Only UCS-2 content is inspected for a concatenation header.
pub fn decode_text(msg_format: u8, content: &[u8]) -> Text {
    match msg_format {
        msg_format::UCS2 => {
            let udh = Udh::parse(content);
            let payload = if udh.is_some() { &content[Udh::LEN..] } else { content };
            Text {
                text: decode_ucs2(payload),
                udh,
            }
        }
        msg_format::GB => Text {
            text: GB18030.decode_without_bom_handling(content).0.into_owned(),
            udh: None,
        },
        msg_format::ASCII => Text {
            text: content.iter().map(|b| char::from(b & 0x7F)).collect(),
            udh: None,
        },
        _ => Text {
            text: String::from_utf8_lossy(content).into_owned(),
            udh: None,
        },
    }
}

/// Encode text for `msg_format`, prefixing `udh` when given.
pub fn encode_text(msg_format: u8, text: &str, udh: Option<Udh>) -> Bytes {
    let mut out = Vec::new();
    if let Some(udh) = udh {
        out.extend_from_slice(&udh.to_bytes());
    }
    match msg_format {
        msg_format::UCS2 => out.extend(encode_ucs2(text)),
        msg_format::GB => out.extend_from_slice(&GB18030.encode(text).0),
        _ => out.extend_from_slice(text.as_bytes()),
    }
    out.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ucs2_is_big_endian() {
        assert_eq!(encode_ucs2("A中"), vec![0x00, 0x41, 0x4E, 0x2D]);
        assert_eq!(decode_ucs2(&[0x00, 0x41, 0x4E, 0x2D]), "A中");
    }

    #[test]
    fn test_udh_is_stripped_before_ucs2_decoding() {
        let mut content = vec![0x05, 0x00, 0x03, 0x2A, 0x02, 0x01];
        content.extend(encode_ucs2("你好"));

        let text = decode_text(msg_format::UCS2, &content);
        assert_eq!(text.text, "你好");
        assert_eq!(
            text.udh,
            Some(Udh {
                reference: 0x2A,
                total: 2,
                sequence: 1
            })
        );
    }

    #[test]
    fn test_ucs2_without_udh() {
        let text = decode_text(msg_format::UCS2, &encode_ucs2("hello"));
        assert_eq!(text.text, "hello");
        assert_eq!(text.udh, None);
    }

    #[test]
    fn test_gb18030_round_trip() {
        let bytes = encode_text(msg_format::GB, "短信测试 ok", None);
        // Each CJK character is two bytes in GB18030.
        assert_eq!(bytes.len(), 4 * 2 + 3);
        assert_eq!(decode_text(msg_format::GB, &bytes).text, "短信测试 ok");
    }

    #[test]
    fn test_ascii_clears_high_bit() {
        assert_eq!(decode_text(msg_format::ASCII, &[0x48, 0xE9]).text, "Hi");
    }

    #[test]
    fn test_raw_formats_pass_through() {
        assert_eq!(decode_text(msg_format::BINARY, b"abc").text, "abc");
        assert_eq!(decode_text(msg_format::WRITE_CARD, b"xyz").text, "xyz");
    }

    #[test]
    fn test_encode_text_with_udh() {
        let udh = Udh {
            reference: 1,
            total: 3,
            sequence: 2,
        };
        let bytes = encode_text(msg_format::UCS2, "a", Some(udh));
        assert_eq!(bytes.as_ref(), &[5, 0, 3, 1, 3, 2, 0, 0x61]);
        assert_eq!(Udh::parse(&bytes), Some(udh));
    }
}
