//! The `sha512` KDF: `K = SHA512(shared_x ∥ box_nonce)[:cipher_key_len]`.
//!
//! The full 64-byte SHA-512 digest is truncated, never expanded - if a
//! future cipher suite needed more than 64 bytes of key material this
//! KDF could not supply it, but none of the three registered suites do.

use sha2::{Digest, Sha512};

use crate::crypto::secret::{SharedSecret, SymmetricKey};
use crate::{Error, Result};

/// The only registered KDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kdf {
    Sha512,
}

impl Kdf {
    pub fn name(&self) -> &'static str {
        match self {
            Kdf::Sha512 => "sha512",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "sha512" => Ok(Kdf::Sha512),
            other => Err(Error::UnsupportedKdf(other.to_string())),
        }
    }

    /// Derive a symmetric key of `key_len` bytes from the ECDH shared
    /// X-coordinate and the Box's nonce field.
    pub fn derive(&self, shared: &SharedSecret, nonce: &[u8], key_len: usize) -> SymmetricKey {
        match self {
            Kdf::Sha512 => {
                let mut hasher = Sha512::new();
                hasher.update(shared.as_bytes());
                hasher.update(nonce);
                let digest = hasher.finalize();
                SymmetricKey::new(digest[..key_len].to_vec())
            }
        }
    }
}
