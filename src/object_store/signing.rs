use base64::Engine;
use ring::hmac;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SignatureError {
    #[error("Download link has expired")]
    Expired,
    #[error("Download link signature is invalid")]
    Invalid,
}

/// HMAC-SHA256 signer for the download links the local backend hands out.
/// A link is `{base_url}/objects/{key}?expires={unix}&signature={sig}`.
#[derive(Clone)]
pub struct UrlSigner {
    base_url: String,
    key: hmac::Key,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(base_url: &str, secret: &[u8]) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        }
    }

    fn message(object_key: &str, expires: i64) -> String {
        format!("{object_key}\n{expires}")
    }

    pub fn sign(&self, object_key: &str, expires: i64) -> String {
        let tag = hmac::sign(&self.key, Self::message(object_key, expires).as_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(tag.as_ref())
    }

    /// Build a link for `object_key` that stops working at unix time `expires`.
    pub fn url(&self, object_key: &str, expires: i64) -> String {
        format!(
            "{}/objects/{}?expires={}&signature={}",
            self.base_url,
            object_key,
            expires,
            self.sign(object_key, expires)
        )
    }

    /// Check a presented link at unix time `now`.
    pub fn verify(
        &self,
        object_key: &str,
        expires: i64,
        signature: &str,
        now: i64,
    ) -> Result<(), SignatureError> {
        let tag = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SignatureError::Invalid)?;
        hmac::verify(
            &self.key,
            Self::message(object_key, expires).as_bytes(),
            &tag,
        )
        .map_err(|_| SignatureError::Invalid)?;

        if now >= expires {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }
}
