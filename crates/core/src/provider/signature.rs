//! Webhook signature verification (HMAC-SHA512, hex encoded).

use hmac::{Hmac, Mac};
use sha2::Sha512;

use super::error::ProviderError;

type HmacSha512 = Hmac<Sha512>;

/// Verifies provider webhook signatures with the shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    keyed: HmacSha512,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[hidden]")
            .finish()
    }
}

impl WebhookVerifier {
    /// Creates a verifier keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` if the secret is empty.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, ProviderError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(ProviderError::Configuration(
                "webhook secret is empty".to_string(),
            ));
        }
        let keyed = HmacSha512::new_from_slice(secret)
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Ok(Self { keyed })
    }

    fn mac(&self) -> HmacSha512 {
        self.keyed.clone()
    }

    /// Hex signature for `payload`.
    #[must_use]
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of `signature` against `payload`.
    ///
    /// Accepts upper- or lower-case hex; anything that is not valid hex fails.
    #[must_use]
    pub fn verify(&self, signature: &str, payload: &[u8]) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }
}
