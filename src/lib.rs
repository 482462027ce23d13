//! SMGP (Short Message Gateway Protocol) client and server over Tokio.
//!
//! The crate is layered the same way on both sides of a connection:
//!
//! * [`codec`] turns header and body bytes into field maps, driven by a
//!   per-command schema.
//! * [`frame`] adds typed messages and the stream [`frame::Reassembler`]
//!   that cuts complete frames out of a TCP byte stream.
//! * [`connection`] moves frames over a socket.
//! * [`client`] and [`server`] run the session state machines: login,
//!   heartbeat, submit correlation with retry, deliver acknowledgement and
//!   exit.
//!
//! # Examples
//!
//! ## Sending a message
//!
//! ```rust,no_run
//! use smgp::client::{ClientConfig, ConnectionState, SmgpClient};
//!
//! #[tokio::main]
//! async fn main() -> smgp::SmgpResult<()> {
//!     let config = ClientConfig::new("127.0.0.1", 7890, "10001", "secret")
//!         .service_id("smgpservice")
//!         .src_id("10690001");
//!
//!     let mut client = SmgpClient::new(config);
//!     client.on_timeout(|destination, _| eprintln!("no answer for {destination}"));
//!
//!     let handle = client.start();
//!     handle.wait_for_state(ConnectionState::Ready).await?;
//!     let sequence_ids = handle.send_sms("13311112222", "hello", Some("01")).await?;
//!     println!("submitted as {sequence_ids:?}");
//!
//!     handle.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Running a gateway
//!
//! ```rust,no_run
//! use smgp::auth;
//! use smgp::codec::Header;
//! use smgp::datatypes::{Deliver, Login, LoginResp, Submit, SubmitResp};
//! use smgp::server::{ServerConfig, ServerHandler, SmgpServer};
//!
//! struct Gateway;
//!
//! impl ServerHandler for Gateway {
//!     fn on_login(&self, _: &Header, login: &Login) -> LoginResp {
//!         auth::answer_login(login, "secret", 0x30)
//!     }
//!
//!     fn on_submit(&self, _: &Header, _: &Submit) -> SubmitResp {
//!         SubmitResp::new("", 0)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> smgp::SmgpResult<()> {
//!     let server = SmgpServer::new(ServerConfig::default(), Gateway).start().await?;
//!     let reply = Deliver::text("", "13311112222", "10690001", "hi");
//!     server.deliver(reply).await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod error;
pub mod frame;
mod macros;
pub mod segment;
pub mod server;


pub use client::{ClientConfig, ClientHandle, ConnectionState, SmgpClient};
pub use codec::{CodecError, Header};
pub use error::{SmgpError, SmgpResult};
pub use frame::{Frame, Message};
pub use server::{ServerConfig, ServerHandle, ServerHandler, SmgpServer};
