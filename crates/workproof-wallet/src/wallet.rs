use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

use workproof_types::{Result, Signer, WorkproofError};

/// Bytes of SHA-256(public key) kept in the address.
const ADDRESS_BYTES: usize = 12;

/// On-disk wallet layout.
#[derive(Serialize, Deserialize)]
struct WalletFile {
    name: String,
    address: String,
    public_key: String,
    private_key: String,
    created_at: DateTime<Utc>,
}

/// Named ed25519 key pair whose address identifies a miner.
pub struct Wallet {
    name: String,
    address: String,
    signing_key: SigningKey,
    created_at: DateTime<Utc>,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Hex of the first 12 bytes of SHA-256 over the public key.
pub fn address_of(key: &VerifyingKey) -> String {
    hex::encode(&Sha256::digest(key.as_bytes())[..ADDRESS_BYTES])
}

fn validate_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(WorkproofError::Config(format!("invalid wallet name: {name:?}")))
    }
}

fn wallet_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

impl Wallet {
    /// Generate a fresh key pair from OS randomness.
    pub fn create(name: &str) -> Result<Self> {
        validate_name(name)?;
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Ok(Self::from_secret(name, secret))
    }

    fn from_secret(name: &str, secret: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&secret);
        Self {
            name: name.to_string(),
            address: address_of(&signing_key.verifying_key()),
            signing_key,
            created_at: Utc::now(),
        }
    }

    /// Whether a wallet file named `name` is present in `dir`.
    pub fn exists(dir: &Path, name: &str) -> bool {
        wallet_path(dir, name).exists()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().as_bytes())
    }

    /// Write `<dir>/<name>.json`, owner-readable only on Unix.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let file = WalletFile {
            name: self.name.clone(),
            address: self.address.clone(),
            public_key: self.public_key_hex(),
            private_key: hex::encode(self.signing_key.to_bytes()),
            created_at: self.created_at,
        };
        let content = serde_json::to_string_pretty(&file)?;
        let path = wallet_path(dir, &self.name);
        write_private(&path, content.as_bytes())?;
        tracing::info!(wallet = %self.name, address = %self.address, "Wallet saved");
        Ok(path)
    }

    /// Load a wallet by name. The stored address must match the key.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        validate_name(name)?;
        let content = std::fs::read_to_string(wallet_path(dir, name))?;
        let file: WalletFile = serde_json::from_str(&content)?;

        let secret: [u8; 32] = hex::decode(&file.private_key)
            .map_err(|e| WorkproofError::Signing(format!("bad private key hex: {e}")))?
            .try_into()
            .map_err(|_| WorkproofError::Signing("private key must be 32 bytes".into()))?;

        let mut wallet = Self::from_secret(&file.name, secret);
        wallet.created_at = file.created_at;
        if wallet.address != file.address {
            return Err(WorkproofError::Signing(format!(
                "wallet {name} address does not match its key"
            )));
        }
        Ok(wallet)
    }

    /// All loadable wallets in `dir`, sorted by name. Unreadable files are skipped.
    pub fn list(dir: &Path) -> Result<Vec<Self>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut wallets = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match Self::load(dir, name) {
                Ok(wallet) => wallets.push(wallet),
                Err(e) => tracing::warn!(path = %path.display(), "Skipping wallet: {}", e),
            }
        }
        wallets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(wallets)
    }
}

impl Signer for Wallet {
    fn address(&self) -> &str {
        &self.address
    }

    fn sign(&self, message: &[u8]) -> Result<String> {
        Ok(hex::encode(self.signing_key.sign(message).to_bytes()))
    }
}

/// Verify a hex signature against a hex public key.
pub fn verify_signature(public_key_hex: &str, message: &[u8], signature_hex: &str) -> Result<bool> {
    let key_bytes: [u8; 32] = hex::decode(public_key_hex)
        .map_err(|e| WorkproofError::Signing(format!("bad public key hex: {e}")))?
        .try_into()
        .map_err(|_| WorkproofError::Signing("public key must be 32 bytes".into()))?;
    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| WorkproofError::Signing(format!("invalid public key: {e}")))?;

    let sig_bytes: [u8; 64] = hex::decode(signature_hex)
        .map_err(|e| WorkproofError::Signing(format!("bad signature hex: {e}")))?
        .try_into()
        .map_err(|_| WorkproofError::Signing("signature must be 64 bytes".into()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    Ok(key.verify(message, &signature).is_ok())
}

#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(content)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    std::fs::write(path, content)?;
    Ok(())
}
