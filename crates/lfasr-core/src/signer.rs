//! Request signing for the lfasr API.
//!
//! Every call carries `app_id`, `ts` and `signa`, where
//! `signa = base64(HMAC-SHA1(secret_key, hex(md5(app_id + ts))))` and `ts` is Unix seconds.

use std::fmt;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;

use crate::config::Credentials;
use crate::error::{LfasrError, Result};

type HmacSha1 = Hmac<Sha1>;

/// Authentication fields for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub signa: String,
    pub ts: String,
}

/// Stateless signer over shared, read-only credentials.
#[derive(Clone)]
pub struct RequestSigner {
    credentials: Arc<Credentials>,
    keyed: HmacSha1,
}

impl RequestSigner {
    /// Keys the HMAC once; a key the MAC cannot accept is a configuration error.
    pub fn new(credentials: Arc<Credentials>) -> Result<Self> {
        let keyed = HmacSha1::new_from_slice(credentials.secret_key().as_bytes())
            .map_err(|e| LfasrError::Configuration(format!("unusable secret key: {e}")))?;
        Ok(Self { credentials, keyed })
    }

    pub fn app_id(&self) -> &str {
        self.credentials.app_id()
    }

    /// Sign with the current wall clock. Call once per request.
    pub fn sign(&self) -> Signature {
        self.sign_at(chrono::Utc::now().timestamp())
    }

    /// Deterministic signature for a given Unix timestamp.
    pub fn sign_at(&self, timestamp: i64) -> Signature {
        let ts = timestamp.to_string();

        let mut md5 = Md5::new();
        md5.update(self.credentials.app_id().as_bytes());
        md5.update(ts.as_bytes());
        let base_string = hex_lower(&md5.finalize());

        let mut mac = self.keyed.clone();
        mac.update(base_string.as_bytes());
        let signa = STANDARD.encode(mac.finalize().into_bytes());

        Signature { signa, ts }
    }

    /// `app_id`, `signa` and `ts` form fields, ready to extend with endpoint fields.
    pub fn auth_fields(&self) -> Vec<(&'static str, String)> {
        let signature = self.sign();
        vec![
            ("app_id", self.app_id().to_string()),
            ("signa", signature.signa),
            ("ts", signature.ts),
        ]
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
