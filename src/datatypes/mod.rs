mod command_id;
mod command_status;
mod deliver;
mod login;
mod submit;

pub use command_id::CommandId;
pub use command_status::{
    CommandStatus, STATUS_AUTH_FAILED, STATUS_INVALID_COMMAND, STATUS_INVALID_MESSAGE, STATUS_OK,
    STATUS_SYSTEM_BUSY, describe_status, status_reason,
};
pub use deliver::{Deliver, DeliverContent, DeliverReport, DeliverResp};
pub use login::{Login, LoginMode, LoginResp};
pub use submit::{MSG_TYPE_MT, Submit, SubmitResp};
