// ABOUTME: Callbacks through which an SMGP server delegates login, submit and deliver-ack decisions
// ABOUTME: Implementations are shared by every connection the server accepts

use crate::codec::Header;
use crate::datatypes::{DeliverResp, Login, LoginResp, Submit, SubmitResp};
use crate::error::SmgpError;
use tracing::warn;

/// Application side of an SMGP server.
///
/// Methods run on the connection's session task and should return quickly.
/// [`crate::auth::answer_login`] builds a complete Login_Resp from a shared
/// secret for the common case.
///
/// # Example
///
/// ```rust
/// use smgp::auth;
/// use smgp::codec::Header;
/// use smgp::datatypes::{Login, LoginResp, Submit, SubmitResp};
/// use smgp::server::ServerHandler;
///
/// struct Gateway;
///
/// impl ServerHandler for Gateway {
///     fn on_login(&self, _: &Header, login: &Login) -> LoginResp {
///         auth::answer_login(login, "secret", 0x30)
///     }
///
///     fn on_submit(&self, _: &Header, submit: &Submit) -> SubmitResp {
///         println!("to {}: {}", submit.dest_term_id, submit.text().text);
///         // An empty MsgID is filled in by the server.
///         SubmitResp::new("", 0)
///     }
/// }
/// ```
pub trait ServerHandler: Send + Sync + 'static {
    /// Decide a Login. A nonzero `status` closes the connection after the
    /// response is written.
    fn on_login(&self, header: &Header, login: &Login) -> LoginResp;

    /// Accept or reject a Submit. Leave `msg_id` empty to have the server
    /// generate one.
    fn on_submit(&self, header: &Header, submit: &Submit) -> SubmitResp;

    /// A client acknowledged a Deliver pushed with
    /// [`crate::server::ServerHandle::deliver`].
    fn on_deliver_resp(&self, _header: &Header, _resp: &DeliverResp) {}

    fn on_error(&self, error: &SmgpError) {
        warn!(error = %error, "SMGP server error");
    }
}
