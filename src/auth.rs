// ABOUTME: Login digest computation and verification for SMGP authentication
// ABOUTME: MD5 over client id, seven zero bytes, shared secret and the MMDDHHmmss timestamp

use crate::datatypes::{Login, LoginResp, STATUS_AUTH_FAILED, STATUS_OK};
use bytes::Bytes;
use md5::{Digest, Md5};

/// Byte length of both authenticator fields.
pub const DIGEST_LEN: usize = 16;

/// Current local time as `MMDDHHmmss`, the timestamp format Login uses.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%m%d%H%M%S").to_string()
}

/// Render a Login `TimeStamp` back to its ten-digit string form.
///
/// The wire carries the timestamp as an integer, so a leading zero in the
/// month is lost and must be restored before hashing.
pub fn timestamp_string(timestamp: u32) -> String {
    format!("{timestamp:010}")
}

/// `AuthenticatorClient` for a Login.
pub fn client_digest(client_id: &str, secret: &str, timestamp: &str) -> [u8; DIGEST_LEN] {
    let mut hasher = Md5::new();
    hasher.update(client_id.as_bytes());
    hasher.update([0u8; 7]);
    hasher.update(secret.as_bytes());
    hasher.update(timestamp.as_bytes());
    finish(hasher)
}

/// `AuthenticatorServer` for a Login_Resp: MD5 over the 4-byte status, the
/// client's authenticator and the shared secret.
pub fn server_digest(status: u32, client_authenticator: &[u8], secret: &str) -> [u8; DIGEST_LEN] {
    let mut hasher = Md5::new();
    hasher.update(status.to_be_bytes());
    hasher.update(client_authenticator);
    hasher.update(secret.as_bytes());
    finish(hasher)
}

/// Check a received Login against the secret shared with its client.
pub fn verify_login(login: &Login, secret: &str) -> bool {
    let expected = client_digest(
        &login.client_id,
        secret,
        &timestamp_string(login.timestamp),
    );
    login.authenticator[..] == expected[..]
}

/// Build the Login_Resp a gateway sends for `login`: `Status` 0 when the
/// digest matches `secret`, 21 otherwise, with `AuthenticatorServer` signed
/// over that status.
pub fn answer_login(login: &Login, secret: &str, server_version: u8) -> LoginResp {
    let status = if verify_login(login, secret) {
        STATUS_OK
    } else {
        STATUS_AUTH_FAILED
    };
    LoginResp {
        status,
        authenticator: Bytes::copy_from_slice(&server_digest(status, &login.authenticator, secret)),
        server_version,
    }
}

fn finish(hasher: Md5) -> [u8; DIGEST_LEN] {
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::LoginMode;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_client_digest_golden_value() {
        let digest = client_digest("1", "TEST", "0101000000");
        assert_eq!(hex(&digest), "34c848aa880c8cd8e9b32040ab3c5373");
    }

    #[test]
    fn test_timestamp_keeps_leading_zero() {
        assert_eq!(timestamp_string(101_000_000), "0101000000");
        assert_eq!(timestamp_string(1_231_235_959), "1231235959");
        assert_eq!(timestamp_now().len(), 10);
    }

    #[test]
    fn test_verify_login() {
        let login = Login {
            client_id: "1".to_string(),
            authenticator: Bytes::copy_from_slice(&client_digest("1", "TEST", "0101000000")),
            login_mode: LoginMode::Transmit,
            timestamp: 101_000_000,
            client_version: 0x30,
        };
        assert!(verify_login(&login, "TEST"));
        assert!(!verify_login(&login, "WRONG"));
    }

    #[test]
    fn test_server_digest_depends_on_status() {
        let client = client_digest("1", "TEST", "0101000000");
        let ok = server_digest(0, &client, "TEST");
        assert_eq!(ok, server_digest(0, &client, "TEST"));
        assert_ne!(ok, server_digest(21, &client, "TEST"));
    }

    #[test]
    fn test_answer_login() {
        let mut login = Login {
            client_id: "1".to_string(),
            authenticator: Bytes::copy_from_slice(&client_digest("1", "TEST", "0101000000")),
            login_mode: LoginMode::Send,
            timestamp: 101_000_000,
            client_version: 0x30,
        };
        let resp = answer_login(&login, "TEST", 0x30);
        assert_eq!(resp.status, 0);
        assert_eq!(resp.authenticator.len(), DIGEST_LEN);
        assert_eq!(&resp.authenticator[..], &server_digest(0, &login.authenticator, "TEST")[..]);

        login.timestamp = 101_000_001;
        assert_eq!(answer_login(&login, "TEST", 0x30).status, 21);
    }
}
