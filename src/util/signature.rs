//! Detached PGP signature checking is a capability that may be absent: the
//! resolver talks to a `SignatureVerifier`, and when no backend is wired in
//! the null verifier answers `Skipped` for everything.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVerdict {
    Valid,
    InvalidSignature,
    KeyNotFound,
    /// The backend exists but could not run (e.g. no key servers reachable).
    Unavailable,
    /// No verification was attempted.
    Skipped,
}

#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn verify(
        &self,
        data: &[u8],
        detached_signature: &[u8],
        key_servers: &[String],
    ) -> SignatureVerdict;

    /// False when this verifier never checks anything; the resolver then
    /// behaves as if signature checking were disabled.
    fn is_enabled(&self) -> bool {
        true
    }
}

pub struct NullSignatureVerifier;

#[async_trait]
impl SignatureVerifier for NullSignatureVerifier {
    async fn verify(
        &self,
        _data: &[u8],
        _detached_signature: &[u8],
        _key_servers: &[String],
    ) -> SignatureVerdict {
        SignatureVerdict::Skipped
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
