use crate::codec::content::{self, Text, msg_format};
use crate::codec::{CodecError, Fields};
use bytes::Bytes;

/// Mobile-terminated message.
pub const MSG_TYPE_MT: u8 = 6;

/// Submit request carrying one short message (or one part of a long one).
///
/// `Default` produces the body the gateway expects for an ordinary
/// mobile-terminated message with a delivery report requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submit {
    pub msg_type: u8,
    pub need_report: u8,
    pub priority: u8,
    pub service_id: String,
    pub fee_type: String,
    pub fee_code: String,
    pub fixed_fee: String,
    pub msg_format: u8,
    pub valid_time: String,
    pub at_time: String,
    pub src_term_id: String,
    pub charge_term_id: String,
    pub dest_term_id_count: u8,
    pub dest_term_id: String,
    /// Encoded content; `MsgLength` is derived from its length.
    pub msg_content: Bytes,
    pub reserve: String,
    pub tp_pid: Option<u8>,
    pub tp_udhi: Option<u8>,
    pub pk_total: Option<u8>,
    pub pk_number: Option<u8>,
}

impl Default for Submit {
    fn default() -> Self {
        Self {
            msg_type: MSG_TYPE_MT,
            need_report: 1,
            priority: 3,
            service_id: String::new(),
            fee_type: "00".to_string(),
            fee_code: "000000".to_string(),
            fixed_fee: "000000".to_string(),
            msg_format: msg_format::GB,
            valid_time: String::new(),
            at_time: String::new(),
            src_term_id: String::new(),
            charge_term_id: String::new(),
            dest_term_id_count: 1,
            dest_term_id: String::new(),
            msg_content: Bytes::new(),
            reserve: String::new(),
            tp_pid: None,
            tp_udhi: None,
            pk_total: None,
            pk_number: None,
        }
    }
}

impl Submit {
    pub fn new(
        service_id: impl Into<String>,
        src_term_id: impl Into<String>,
        dest_term_id: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            src_term_id: src_term_id.into(),
            dest_term_id: dest_term_id.into(),
            ..Default::default()
        }
    }

    /// Single-part content, GB18030 encoded.
    pub fn with_text(mut self, text: &str) -> Self {
        self.msg_format = msg_format::GB;
        self.msg_content = content::encode_text(msg_format::GB, text, None);
        self.tp_pid = Some(0);
        self.tp_udhi = Some(0);
        self.pk_total = Some(1);
        self.pk_number = Some(1);
        self
    }

    /// One part of a concatenated message. `payload` already starts with its UDH.
    pub fn with_segment(mut self, payload: Bytes, total: u8, number: u8) -> Self {
        self.msg_format = msg_format::UCS2;
        self.msg_content = payload;
        self.tp_pid = Some(0);
        self.tp_udhi = Some(1);
        self.pk_total = Some(total);
        self.pk_number = Some(number);
        self
    }

    pub fn msg_length(&self) -> usize {
        self.msg_content.len()
    }

    /// Content decoded according to `msg_format`.
    pub fn text(&self) -> Text {
        content::decode_text(self.msg_format, &self.msg_content)
    }
}

impl From<&Submit> for Fields {
    fn from(submit: &Submit) -> Self {
        let mut fields = Fields::new()
            .with("MsgType", submit.msg_type)
            .with("NeedReport", submit.need_report)
            .with("Priority", submit.priority)
            .with("ServiceID", submit.service_id.as_str())
            .with("FeeType", submit.fee_type.as_str())
            .with("FeeCode", submit.fee_code.as_str())
            .with("FixedFee", submit.fixed_fee.as_str())
            .with("MsgFormat", submit.msg_format)
            .with("ValidTime", submit.valid_time.as_str())
            .with("AtTime", submit.at_time.as_str())
            .with("SrcTermID", submit.src_term_id.as_str())
            .with("ChargeTermID", submit.charge_term_id.as_str())
            .with("DestTermIDCount", submit.dest_term_id_count)
            .with("DestTermID", submit.dest_term_id.as_str())
            // Out-of-range lengths are rejected by the field codec.
            .with("MsgLength", submit.msg_content.len() as u32)
            .with("MsgContent", submit.msg_content.clone())
            .with("Reserve", submit.reserve.as_str());

        let optional = [
            ("TP_pid", submit.tp_pid),
            ("TP_udhi", submit.tp_udhi),
            ("PkTotal", submit.pk_total),
            ("PkNumber", submit.pk_number),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                fields.insert(name, value);
            }
        }
        fields
    }
}

impl TryFrom<&Fields> for Submit {
    type Error = CodecError;

    fn try_from(fields: &Fields) -> Result<Self, Self::Error> {
        Ok(Submit {
            msg_type: fields.byte("MsgType")?,
            need_report: fields.byte("NeedReport")?,
            priority: fields.byte("Priority")?,
            service_id: fields.string("ServiceID")?,
            fee_type: fields.string("FeeType")?,
            fee_code: fields.string("FeeCode")?,
            fixed_fee: fields.string("FixedFee")?,
            msg_format: fields.byte("MsgFormat")?,
            valid_time: fields.string("ValidTime")?,
            at_time: fields.string("AtTime")?,
            src_term_id: fields.string("SrcTermID")?,
            charge_term_id: fields.string("ChargeTermID")?,
            dest_term_id_count: fields.byte("DestTermIDCount")?,
            dest_term_id: fields.string("DestTermID")?,
            msg_content: fields.bytes("MsgContent")?,
            reserve: fields.string("Reserve")?,
            tp_pid: fields.opt_byte("TP_pid")?,
            tp_udhi: fields.opt_byte("TP_udhi")?,
            pk_total: fields.opt_byte("PkTotal")?,
            pk_number: fields.opt_byte("PkNumber")?,
        })
    }
}

/// Submit response carrying the gateway-assigned message id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitResp {
    pub msg_id: String,
    pub status: u32,
}

impl SubmitResp {
    pub fn new(msg_id: impl Into<String>, status: u32) -> Self {
        Self {
            msg_id: msg_id.into(),
            status,
        }
    }
}

impl From<&SubmitResp> for Fields {
    fn from(resp: &SubmitResp) -> Self {
        Fields::new()
            .with("MsgID", resp.msg_id.as_str())
            .with("Status", resp.status)
    }
}

impl TryFrom<&Fields> for SubmitResp {
    type Error = CodecError;

    fn try_from(fields: &Fields) -> Result<Self, Self::Error> {
        Ok(SubmitResp {
            msg_id: fields.string("MsgID")?,
            status: fields.int("Status")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_body() {
        let submit = Submit::new("smgpservice", "10690001", "13311112222");
        assert_eq!(submit.msg_type, 6);
        assert_eq!(submit.need_report, 1);
        assert_eq!(submit.priority, 3);
        assert_eq!(submit.fee_type, "00");
        assert_eq!(submit.fee_code, "000000");
        assert_eq!(submit.dest_term_id_count, 1);
        assert_eq!(submit.msg_format, msg_format::GB);
    }

    #[test]
    fn test_with_text_sets_length_and_single_part() {
        let submit = Submit::new("svc", "106", "133").with_text("hello");
        assert_eq!(submit.msg_length(), 5);
        assert_eq!(submit.text().text, "hello");
        assert_eq!(submit.pk_total, Some(1));
        assert_eq!(submit.tp_udhi, Some(0));

        let fields = Fields::from(&submit);
        assert_eq!(fields.int("MsgLength").unwrap(), 5);
    }

    #[test]
    fn test_fields_round_trip_keeps_absent_tail() {
        let submit = Submit {
            msg_content: Bytes::from_static(b"hi"),
            ..Submit::new("svc", "106", "133")
        };
        let fields = Fields::from(&submit);
        assert!(!fields.contains("PkTotal"));
        assert_eq!(Submit::try_from(&fields).unwrap(), submit);
    }

    #[test]
    fn test_submit_resp_fields() {
        let resp = SubmitResp::new("1018123456", 0);
        let fields = Fields::from(&resp);
        assert_eq!(SubmitResp::try_from(&fields).unwrap(), resp);
    }
}
