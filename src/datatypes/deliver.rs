use crate::codec::content::{self, Text, msg_format};
use crate::codec::schema::{self, DELIVER_REPORT_CONTENT};
use crate::codec::{CodecError, Fields};
use bytes::{Bytes, BytesMut};

/// Status report carried in a Deliver with `IsReport == 1`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliverReport {
    /// Id of the submitted message this report is about.
    pub msg_id: String,
    pub sub: String,
    pub dlvrd: String,
    pub submit_date: String,
    pub done_date: String,
    pub err: String,
    pub txt: String,
}

impl From<&DeliverReport> for Fields {
    fn from(report: &DeliverReport) -> Self {
        Fields::new()
            .with("MsgID", report.msg_id.as_str())
            .with("sub", report.sub.as_str())
            .with("Dlvrd", report.dlvrd.as_str())
            .with("Submit_date", report.submit_date.as_str())
            .with("done_date", report.done_date.as_str())
            .with("Err", report.err.as_str())
            .with("Txt", report.txt.as_str())
    }
}

impl TryFrom<&Fields> for DeliverReport {
    type Error = CodecError;

    fn try_from(fields: &Fields) -> Result<Self, Self::Error> {
        Ok(DeliverReport {
            msg_id: fields.string("MsgID")?,
            sub: fields.string("sub")?,
            dlvrd: fields.string("Dlvrd")?,
            submit_date: fields.string("Submit_date")?,
            done_date: fields.string("done_date")?,
            err: fields.string("Err")?,
            txt: fields.string("Txt")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliverContent {
    /// Mobile-originated text.
    Text(Text),
    /// Delivery status report for an earlier Submit.
    Report(DeliverReport),
}

/// Deliver request pushed by the gateway: either a mobile-originated
/// message or a status report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deliver {
    pub msg_id: String,
    pub msg_format: u8,
    /// `YYYYMMDDHHmmss`
    pub recv_time: String,
    pub src_term_id: String,
    pub dest_term_id: String,
    pub content: DeliverContent,
    pub reserve: String,
}

impl Deliver {
    /// A mobile-originated GB18030 text message received now.
    pub fn text(
        msg_id: impl Into<String>,
        src_term_id: impl Into<String>,
        dest_term_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            msg_id: msg_id.into(),
            msg_format: msg_format::GB,
            recv_time: recv_time_now(),
            src_term_id: src_term_id.into(),
            dest_term_id: dest_term_id.into(),
            content: DeliverContent::Text(Text {
                text: text.into(),
                udh: None,
            }),
            reserve: String::new(),
        }
    }

    /// A status report received now.
    pub fn report(
        msg_id: impl Into<String>,
        src_term_id: impl Into<String>,
        dest_term_id: impl Into<String>,
        report: DeliverReport,
    ) -> Self {
        Self {
            msg_id: msg_id.into(),
            msg_format: msg_format::ASCII,
            recv_time: recv_time_now(),
            src_term_id: src_term_id.into(),
            dest_term_id: dest_term_id.into(),
            content: DeliverContent::Report(report),
            reserve: String::new(),
        }
    }

    pub fn is_report(&self) -> bool {
        matches!(self.content, DeliverContent::Report(_))
    }

    fn content_bytes(&self) -> Result<Bytes, CodecError> {
        match &self.content {
            DeliverContent::Text(text) => {
                Ok(content::encode_text(self.msg_format, &text.text, text.udh))
            }
            DeliverContent::Report(report) => {
                let mut buf = BytesMut::new();
                schema::encode_fields(DELIVER_REPORT_CONTENT, &Fields::from(report), &mut buf)?;
                Ok(buf.freeze())
            }
        }
    }
}

fn recv_time_now() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

impl TryFrom<&Deliver> for Fields {
    type Error = CodecError;

    fn try_from(deliver: &Deliver) -> Result<Self, Self::Error> {
        let content = deliver.content_bytes()?;
        Ok(Fields::new()
            .with("MsgID", deliver.msg_id.as_str())
            .with("IsReport", u8::from(deliver.is_report()))
            .with("MsgFormat", deliver.msg_format)
            .with("RecvTime", deliver.recv_time.as_str())
            .with("SrcTermID", deliver.src_term_id.as_str())
            .with("DestTermID", deliver.dest_term_id.as_str())
            .with("MsgLength", content.len() as u32)
            .with("MsgContent", content)
            .with("Reserve", deliver.reserve.as_str()))
    }
}

impl TryFrom<&Fields> for Deliver {
    type Error = CodecError;

    fn try_from(fields: &Fields) -> Result<Self, Self::Error> {
        let msg_format = fields.byte("MsgFormat")?;
        let raw = fields.bytes("MsgContent")?;
        let content = if fields.byte("IsReport")? == 1 {
            let report = schema::decode_fields(DELIVER_REPORT_CONTENT, &raw)?;
            DeliverContent::Report(DeliverReport::try_from(&report)?)
        } else {
            DeliverContent::Text(content::decode_text(msg_format, &raw))
        };

        Ok(Deliver {
            msg_id: fields.string("MsgID")?,
            msg_format,
            recv_time: fields.string("RecvTime")?,
            src_term_id: fields.string("SrcTermID")?,
            dest_term_id: fields.string("DestTermID")?,
            content,
            // Some gateways omit the trailing reserve bytes.
            reserve: fields.string("Reserve").unwrap_or_default(),
        })
    }
}

/// Acknowledgement for a Deliver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliverResp {
    pub msg_id: String,
    pub status: u32,
}

impl From<&DeliverResp> for Fields {
    fn from(resp: &DeliverResp) -> Self {
        Fields::new()
            .with("MsgID", resp.msg_id.as_str())
            .with("Status", resp.status)
    }
}

impl TryFrom<&Fields> for DeliverResp {
    type Error = CodecError;

    fn try_from(fields: &Fields) -> Result<Self, Self::Error> {
        Ok(DeliverResp {
            msg_id: fields.string("MsgID")?,
            status: fields.int("Status")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::content::Udh;

    fn report() -> DeliverReport {
        DeliverReport {
            msg_id: "1018123456".to_string(),
            sub: "001".to_string(),
            dlvrd: "001".to_string(),
            submit_date: "2410181200".to_string(),
            done_date: "2410181201".to_string(),
            err: "000".to_string(),
            txt: "DELIVRD".to_string(),
        }
    }

    #[test]
    fn test_report_content_is_nested_schema() {
        let deliver = Deliver::report("0000000001", "13311112222", "10690001", report());
        let fields = Fields::try_from(&deliver).unwrap();
        assert_eq!(fields.int("IsReport").unwrap(), 1);
        assert_eq!(fields.int("MsgLength").unwrap(), 59);

        let decoded = Deliver::try_from(&fields).unwrap();
        assert_eq!(decoded.content, DeliverContent::Report(report()));
        assert!(decoded.is_report());
    }

    #[test]
    fn test_text_content_round_trip() {
        let deliver = Deliver::text("0000000002", "13311112222", "10690001", "上行短信");
        let fields = Fields::try_from(&deliver).unwrap();
        assert_eq!(fields.int("MsgLength").unwrap(), 8);
        assert_eq!(Deliver::try_from(&fields).unwrap(), deliver);
    }

    #[test]
    fn test_ucs2_segment_keeps_udh() {
        let mut deliver = Deliver::text("1", "133", "106", "part");
        deliver.msg_format = msg_format::UCS2;
        deliver.content = DeliverContent::Text(Text {
            text: "part".to_string(),
            udh: Some(Udh {
                reference: 9,
                total: 2,
                sequence: 2,
            }),
        });
        let fields = Fields::try_from(&deliver).unwrap();
        assert_eq!(fields.int("MsgLength").unwrap(), 6 + 8);
        assert_eq!(Deliver::try_from(&fields).unwrap(), deliver);
    }

    #[test]
    fn test_empty_text_without_reserve_decodes() {
        let deliver = Deliver::text("0000000003", "13311112222", "10690001", "");
        let fields = Fields::try_from(&deliver).unwrap();
        let mut buf = BytesMut::new();
        schema::encode_fields(schema::DELIVER, &fields, &mut buf).unwrap();

        let body = buf.freeze();
        let trimmed = body.slice(..body.len() - 8);
        let decoded = Deliver::try_from(&schema::decode_fields(schema::DELIVER, &trimmed).unwrap())
            .unwrap();
        assert_eq!(decoded.src_term_id, "13311112222");
        assert_eq!(decoded.content, DeliverContent::Text(Text {
            text: String::new(),
            udh: None,
        }));
        assert_eq!(decoded.reserve, "");
    }

    #[test]
    fn test_short_report_is_rejected() {
        let fields = Fields::new()
            .with("MsgID", "1")
            .with("IsReport", 1u8)
            .with("MsgFormat", 0u8)
            .with("RecvTime", "")
            .with("SrcTermID", "")
            .with("DestTermID", "")
            .with("MsgLength", 12u8)
            .with("MsgContent", Bytes::from_static(b"0123456789ab"));
        assert!(matches!(
            Deliver::try_from(&fields),
            Err(CodecError::Truncated { field: "sub", .. })
        ));
    }
}
