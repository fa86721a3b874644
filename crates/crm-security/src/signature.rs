//! Payment gateway webhook signatures (HMAC-SHA256)

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid signature key")]
    InvalidKey,
    #[error("Malformed signature")]
    Malformed,
    #[error("Signature mismatch")]
    Mismatch,
    #[error("Timestamp outside tolerance window")]
    StaleTimestamp,
}

#[derive(Debug, Clone)]
pub struct WebhookSigner {
    secret: String,
    timestamp_tolerance: i64,
}

impl WebhookSigner {
    pub fn new(secret: String, timestamp_tolerance: i64) -> Self {
        Self {
            secret,
            timestamp_tolerance,
        }
    }

    fn mac(&self, timestamp: i64, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignatureError::InvalidKey)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// Hex HMAC over `"{timestamp}.{body}"`.
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
        Ok(hex::encode(self.mac(timestamp, body)?.finalize().into_bytes()))
    }

    pub fn verify(
        &self,
        timestamp: i64,
        body: &[u8],
        signature: &str,
        now: i64,
    ) -> Result<(), SignatureError> {
        if (now - timestamp).abs() > self.timestamp_tolerance {
            return Err(SignatureError::StaleTimestamp);
        }
        let expected = hex::decode(signature.trim()).map_err(|_| SignatureError::Malformed)?;
        self.mac(timestamp, body)?
            .verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = WebhookSigner::new("whsec".to_string(), 300);
        let body = br#"{"invoice_number":"INV-1","status":"paid"}"#;
        let signature = signer.sign(1_000, body).unwrap();
        assert_eq!(signer.verify(1_000, body, &signature, 1_100), Ok(()));
    }

    #[test]
    fn test_rejects_tampered_body() {
        let signer = WebhookSigner::new("whsec".to_string(), 300);
        let signature = signer.sign(1_000, b"original").unwrap();
        assert_eq!(
            signer.verify(1_000, b"tampered", &signature, 1_000),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_rejects_stale_timestamp() {
        let signer = WebhookSigner::new("whsec".to_string(), 300);
        let signature = signer.sign(1_000, b"body").unwrap();
        assert_eq!(
            signer.verify(1_000, b"body", &signature, 2_000),
            Err(SignatureError::StaleTimestamp)
        );
    }

    #[test]
    fn test_rejects_non_hex_signature() {
        let signer = WebhookSigner::new("whsec".to_string(), 300);
        assert_eq!(
            signer.verify(1_000, b"body", "zz-not-hex", 1_000),
            Err(SignatureError::Malformed)
        );
    }
}
