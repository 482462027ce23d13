// ABOUTME: Connection and session settings for the SMGP client
// ABOUTME: Required gateway credentials plus timing defaults for heartbeat, retry and timeouts

use crate::datatypes::LoginMode;
use crate::macros::config_setters;
use crate::segment::DEFAULT_SEGMENT_LIMIT;
use std::time::Duration;

/// Protocol version announced in Login (3.0).
pub const DEFAULT_CLIENT_VERSION: u8 = 0x30;

/// Settings for one client session.
///
/// `new` takes the values every gateway requires; everything else has a
/// default that matches common gateway expectations and can be overridden
/// with the chained setters.
///
/// # Example
///
/// ```rust
/// use smgp::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("127.0.0.1", 7890, "10001", "secret")
///     .sp_id("10001")
///     .service_id("smgpservice")
///     .src_id("10690001")
///     .heartbeat_interval(Duration::from_secs(30));
///
/// assert_eq!(config.heartbeat_max_attempts, 3);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Account id sent as `ClientID` in Login.
    pub client_id: String,
    /// Shared secret used for the login digest.
    pub secret: String,
    /// Enterprise code assigned by the operator. No SMGP body carries it;
    /// the session reports it in its login log line.
    pub sp_id: String,
    /// `ServiceID` placed in every Submit.
    pub service_id: String,
    /// Access number; `SrcTermID` is this plus any extend code.
    pub src_id: String,
    pub client_version: u8,
    pub login_mode: LoginMode,

    /// Interval between Active_Test probes, and the delay before reconnecting
    /// after a transport error (default: 120 seconds).
    pub heartbeat_interval: Duration,

    /// Unanswered Active_Test probes tolerated before the session exits
    /// (default: 3).
    pub heartbeat_max_attempts: u32,

    /// Upper bound on connecting and on waiting for Login_Resp or Exit_Resp
    /// (default: 30 seconds).
    pub timeout: Duration,

    /// Age at which an unanswered Submit is resent; also the sweep period
    /// (default: 60 seconds).
    pub retry_interval: Duration,

    /// Resends of an unanswered Submit before it is reported as timed out
    /// (default: 3).
    pub submit_max_retries: u32,

    /// Characters per message before long-message segmentation (default: 70).
    pub segment_limit: usize,
}

impl ClientConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        client_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            secret: secret.into(),
            sp_id: String::new(),
            service_id: String::new(),
            src_id: String::new(),
            client_version: DEFAULT_CLIENT_VERSION,
            login_mode: LoginMode::Transmit,
            heartbeat_interval: Duration::from_secs(120),
            heartbeat_max_attempts: 3,
            timeout: Duration::from_secs(30),
            retry_interval: Duration::from_secs(60),
            submit_max_retries: 3,
            segment_limit: DEFAULT_SEGMENT_LIMIT,
        }
    }

    config_setters! {
        sp_id: String,
        service_id: String,
        src_id: String,
    }

    config_setters! {
        client_version: u8,
        login_mode: LoginMode,
        heartbeat_interval: Duration,
        heartbeat_max_attempts: u32,
        timeout: Duration,
        retry_interval: Duration,
        submit_max_retries: u32,
        segment_limit: usize,
    }

    /// `host:port` of the gateway.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
