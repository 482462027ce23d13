use crate::codec::{CodecError, Fields};
use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Direction of traffic requested by a Login.
#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LoginMode {
    /// Send short messages only.
    Send = 0,
    /// Receive short messages only.
    Receive = 1,
    /// Send and receive.
    #[default]
    Transmit = 2,
}

/// Login request, sent first on every client connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Login {
    pub client_id: String,
    /// 16-byte MD5 digest, see [`crate::auth`].
    pub authenticator: Bytes,
    pub login_mode: LoginMode,
    /// `MMDDHHmmss` read as a decimal integer.
    pub timestamp: u32,
    pub client_version: u8,
}

impl From<&Login> for Fields {
    fn from(login: &Login) -> Self {
        Fields::new()
            .with("ClientID", login.client_id.as_str())
            .with("AuthenticatorClient", login.authenticator.clone())
            .with("LoginMode", u8::from(login.login_mode))
            .with("TimeStamp", login.timestamp)
            .with("ClientVersion", login.client_version)
    }
}

impl TryFrom<&Fields> for Login {
    type Error = CodecError;

    fn try_from(fields: &Fields) -> Result<Self, Self::Error> {
        let mode = fields.byte("LoginMode")?;
        Ok(Login {
            client_id: fields.string("ClientID")?,
            authenticator: fields.bytes("AuthenticatorClient")?,
            login_mode: LoginMode::try_from(mode).map_err(|_| CodecError::InvalidValue {
                field: "LoginMode",
                value: mode.into(),
            })?,
            timestamp: fields.int("TimeStamp")?,
            client_version: fields.byte("ClientVersion")?,
        })
    }
}

/// Login response. `status == 0` means the client is authenticated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginResp {
    pub status: u32,
    pub authenticator: Bytes,
    pub server_version: u8,
}

impl From<&LoginResp> for Fields {
    fn from(resp: &LoginResp) -> Self {
        Fields::new()
            .with("Status", resp.status)
            .with("AuthenticatorServer", resp.authenticator.clone())
            .with("ServerVersion", resp.server_version)
    }
}

impl TryFrom<&Fields> for LoginResp {
    type Error = CodecError;

    fn try_from(fields: &Fields) -> Result<Self, Self::Error> {
        Ok(LoginResp {
            status: fields.int("Status")?,
            authenticator: fields.bytes("AuthenticatorServer")?,
            server_version: fields.byte("ServerVersion")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_fields_round_trip() {
        let login = Login {
            client_id: "10001".to_string(),
            authenticator: Bytes::from_static(&[7u8; 16]),
            login_mode: LoginMode::Transmit,
            timestamp: 1_018_123_456,
            client_version: 0x30,
        };
        let fields = Fields::from(&login);
        assert_eq!(fields.int("LoginMode").unwrap(), 2);
        assert_eq!(Login::try_from(&fields).unwrap(), login);
    }

    #[test]
    fn test_unknown_login_mode_rejected() {
        let fields = Fields::from(&Login {
            client_id: "1".to_string(),
            authenticator: Bytes::new(),
            login_mode: LoginMode::Send,
            timestamp: 0,
            client_version: 0x30,
        })
        .with("LoginMode", 9u8);
        assert_eq!(
            Login::try_from(&fields),
            Err(CodecError::InvalidValue {
                field: "LoginMode",
                value: 9
            })
        );
    }
}
