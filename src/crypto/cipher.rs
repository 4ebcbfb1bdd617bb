//! The three registered AEAD cipher suites: `chacha20-poly1305`,
//! `aes256-gcm`, `aes256-ccm`. Only AEAD constructions are registered -
//! there is no variant through which a non-AEAD cipher could be named.

use aes_gcm::Aes256Gcm;
use ccm::aead::{Aead, KeyInit, Payload};
use ccm::consts::{U12, U16};
use ccm::Ccm;
use chacha20poly1305::ChaCha20Poly1305;

use crate::crypto::secret::{Plaintext, SymmetricKey};
use crate::{Error, Result};

type Aes256Ccm = Ccm<aes::Aes256, U16, U12>;

/// An authenticated symmetric cipher identified by its wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSuite {
    ChaCha20Poly1305,
    Aes256Gcm,
    Aes256Ccm,
}

impl CipherSuite {
    pub fn name(&self) -> &'static str {
        match self {
            CipherSuite::ChaCha20Poly1305 => "chacha20-poly1305",
            CipherSuite::Aes256Gcm => "aes256-gcm",
            CipherSuite::Aes256Ccm => "aes256-ccm",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "chacha20-poly1305" => Ok(CipherSuite::ChaCha20Poly1305),
            "aes256-gcm" => Ok(CipherSuite::Aes256Gcm),
            "aes256-ccm" => Ok(CipherSuite::Aes256Ccm),
            other => Err(Error::UnsupportedCipher(other.to_string())),
        }
    }

    /// All three suites use a 32-byte key.
    pub fn key_len(&self) -> usize {
        32
    }

    /// The cipher's own nonce length, distinct from the Box-level
    /// `nonce` field that feeds the KDF.
    pub fn nonce_len(&self) -> usize {
        12
    }

    pub fn tag_len(&self) -> usize {
        16
    }

    /// Always `true` - every registered suite is AEAD. Kept as a method
    /// (rather than asserted once at a call site) so validation code
    /// reads the same way regardless of how the suite set grows.
    pub fn is_aead(&self) -> bool {
        true
    }
}

/// Build the effective IV: the caller-chosen bytes, or an all-zero IV of
/// the cipher's required length if `iv` is empty. A non-empty IV whose
/// length doesn't match the cipher's required nonce length is rejected
/// here rather than handed to the underlying AEAD crate, whose
/// `GenericArray` conversion panics on a length mismatch instead of
/// returning an error - this can otherwise be reached from an
/// unvalidated `string8` read off the wire.
fn effective_iv(suite: CipherSuite, iv: &[u8]) -> Result<Vec<u8>> {
    if iv.is_empty() {
        Ok(vec![0u8; suite.nonce_len()])
    } else if iv.len() == suite.nonce_len() {
        Ok(iv.to_vec())
    } else {
        Err(Error::AuthFail)
    }
}

/// Seal `plaintext` with `aad = ∅`, returning `ciphertext ∥ tag`.
pub fn seal(
    suite: CipherSuite,
    key: &SymmetricKey,
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let iv = effective_iv(suite, iv)?;
    let payload = Payload {
        msg: plaintext,
        aad: &[],
    };
    match suite {
        CipherSuite::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
                .map_err(|_| Error::UnsupportedCipher(suite.name().to_string()))?;
            cipher
                .encrypt(iv.as_slice().into(), payload)
                .map_err(|_| Error::AuthFail)
        }
        CipherSuite::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|_| Error::UnsupportedCipher(suite.name().to_string()))?;
            cipher
                .encrypt(iv.as_slice().into(), payload)
                .map_err(|_| Error::AuthFail)
        }
        CipherSuite::Aes256Ccm => {
            let cipher = Aes256Ccm::new_from_slice(key.as_bytes())
                .map_err(|_| Error::UnsupportedCipher(suite.name().to_string()))?;
            cipher
                .encrypt(iv.as_slice().into(), payload)
                .map_err(|_| Error::AuthFail)
        }
    }
}

/// Open `ciphertext_and_tag` with `aad = ∅`. Authentication failure maps
/// to [`Error::AuthFail`] and never returns partial plaintext.
pub fn open(
    suite: CipherSuite,
    key: &SymmetricKey,
    iv: &[u8],
    ciphertext_and_tag: &[u8],
) -> Result<Plaintext> {
    if ciphertext_and_tag.len() < suite.tag_len() {
        return Err(Error::AuthFail);
    }
    let iv = effective_iv(suite, iv)?;
    let payload = Payload {
        msg: ciphertext_and_tag,
        aad: &[],
    };
    let plaintext = match suite {
        CipherSuite::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
                .map_err(|_| Error::UnsupportedCipher(suite.name().to_string()))?;
            cipher.decrypt(iv.as_slice().into(), payload).map_err(|_| Error::AuthFail)?
        }
        CipherSuite::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|_| Error::UnsupportedCipher(suite.name().to_string()))?;
            cipher.decrypt(iv.as_slice().into(), payload).map_err(|_| Error::AuthFail)?
        }
        CipherSuite::Aes256Ccm => {
            let cipher = Aes256Ccm::new_from_slice(key.as_bytes())
                .map_err(|_| Error::UnsupportedCipher(suite.name().to_string()))?;
            cipher.decrypt(iv.as_slice().into(), payload).map_err(|_| Error::AuthFail)?
        }
    };
    Ok(Plaintext::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key32() -> SymmetricKey {
        SymmetricKey::new(vec![0x42u8; 32])
    }

    #[test]
    fn round_trips_for_every_suite() {
        for suite in [
            CipherSuite::ChaCha20Poly1305,
            CipherSuite::Aes256Gcm,
            CipherSuite::Aes256Ccm,
        ] {
            let ct = seal(suite, &key32(), &[], b"hello").unwrap();
            let pt = open(suite, &key32(), &[], &ct).unwrap();
            assert_eq!(pt.as_bytes(), b"hello");
        }
    }

    #[test]
    fn tamper_is_rejected() {
        let mut ct = seal(CipherSuite::Aes256Gcm, &key32(), &[], b"hello").unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0x01;
        assert!(matches!(
            open(CipherSuite::Aes256Gcm, &key32(), &[], &ct),
            Err(Error::AuthFail)
        ));
    }

    #[test]
    fn empty_iv_means_all_zero() {
        let explicit_zero = vec![0u8; CipherSuite::ChaCha20Poly1305.nonce_len()];
        let a = seal(CipherSuite::ChaCha20Poly1305, &key32(), &[], b"x").unwrap();
        let b = seal(CipherSuite::ChaCha20Poly1305, &key32(), &explicit_zero, b"x").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_cipher_name_is_rejected() {
        assert!(CipherSuite::from_name("aes128-gcm").is_err());
    }

    #[test]
    fn wrong_length_iv_is_an_error_not_a_panic() {
        let short = vec![0u8; 5];
        assert!(matches!(
            seal(CipherSuite::Aes256Gcm, &key32(), &short, b"x"),
            Err(Error::AuthFail)
        ));
        let long = vec![0u8; 64];
        assert!(matches!(
            open(CipherSuite::Aes256Gcm, &key32(), &long, &[0u8; 32]),
            Err(Error::AuthFail)
        ));
    }
}
