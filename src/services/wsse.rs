use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use sha1::{Digest, Sha1};

pub const HEADER_NAME: &str = "X-WSSE";

const NONCE_LEN: usize = 20;

/// Username + shared secret for the WSSE `UsernameToken` scheme.
#[derive(Clone)]
pub struct WsseCredentials {
    username: String,
    secret: String,
}

impl WsseCredentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// A fresh header value with a new nonce and the current time.
    pub fn header(&self) -> String {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce[..]);
        self.header_with(&nonce, Utc::now())
    }

    /// PasswordDigest = Base64(SHA1(nonce ++ created ++ secret)).
    pub fn header_with(&self, nonce: &[u8], now: DateTime<Utc>) -> String {
        let created = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut hasher = Sha1::new();
        hasher.update(nonce);
        hasher.update(created.as_bytes());
        hasher.update(self.secret.as_bytes());
        let digest = STANDARD.encode(hasher.finalize());

        format!(
            r#"UsernameToken Username="{}", PasswordDigest="{}", Nonce="{}", Created="{}""#,
            self.username,
            digest,
            STANDARD.encode(nonce),
            created
        )
    }
}

impl std::fmt::Debug for WsseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsseCredentials")
            .field("username", &self.username)
            .field("secret", &"***")
            .finish()
    }
}
