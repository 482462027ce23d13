use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// SMGP command codes carried in the `RequestID` header field.
///
/// Every response code is its request code with the high bit set.
#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandId {
    Login = 0x0000_0001,
    LoginResp = 0x8000_0001,
    Submit = 0x0000_0002,
    SubmitResp = 0x8000_0002,
    Deliver = 0x0000_0003,
    DeliverResp = 0x8000_0003,
    ActiveTest = 0x0000_0004,
    ActiveTestResp = 0x8000_0004,
    Forward = 0x0000_0005,
    ForwardResp = 0x8000_0005,
    Exit = 0x0000_0006,
    ExitResp = 0x8000_0006,
    Query = 0x0000_0007,
    QueryResp = 0x8000_0007,
    QueryTeRoute = 0x0000_0008,
    QueryTeRouteResp = 0x8000_0008,
}

impl CommandId {
    /// Bit set on every response code.
    pub const RESPONSE_MASK: u32 = 0x8000_0000;

    pub fn is_response(self) -> bool {
        u32::from(self) & Self::RESPONSE_MASK != 0
    }

    /// The response code answering this request, or `None` for responses.
    pub fn response(self) -> Option<CommandId> {
        if self.is_response() {
            return None;
        }
        CommandId::try_from(u32::from(self) | Self::RESPONSE_MASK).ok()
    }

    /// Protocol name of the command, as used in logs and error reasons.
    pub fn name(self) -> &'static str {
        match self {
            CommandId::Login => "Login",
            CommandId::LoginResp => "Login_Resp",
            CommandId::Submit => "Submit",
            CommandId::SubmitResp => "Submit_Resp",
            CommandId::Deliver => "Deliver",
            CommandId::DeliverResp => "Deliver_Resp",
            CommandId::ActiveTest => "Active_Test",
            CommandId::ActiveTestResp => "Active_Test_Resp",
            CommandId::Forward => "Forward",
            CommandId::ForwardResp => "Forward_Resp",
            CommandId::Exit => "Exit",
            CommandId::ExitResp => "Exit_Resp",
            CommandId::Query => "Query",
            CommandId::QueryResp => "Query_Resp",
            CommandId::QueryTeRoute => "Query_TE_Route",
            CommandId::QueryTeRouteResp => "Query_TE_Route_Resp",
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
