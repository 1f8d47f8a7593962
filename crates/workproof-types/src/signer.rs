use super::error::Result;

/// Signing oracle. Supplies the miner address and signs proof hashes.
pub trait Signer: Send + Sync {
    /// Stable address string identifying the key holder.
    fn address(&self) -> &str;

    /// Sign an arbitrary message, returning the signature as lowercase hex.
    fn sign(&self, message: &[u8]) -> Result<String>;
}
