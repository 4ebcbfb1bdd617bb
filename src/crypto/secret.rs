//! Zeroize-on-drop wrappers for the secret byte buffers that flow through
//! seal/unseal: ECDH shared secrets, derived symmetric keys, intermediate
//! recovery keys, and Shamir shares. None of these types implement
//! [`std::fmt::Debug`] with their contents, so an accidental `{:?}` in a
//! log statement cannot leak key material.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// The X-coordinate output of an ECDH computation, before it has been run
/// through the KDF.
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        SharedSecret(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A symmetric key derived by the KDF, sized to the cipher suite's key
/// length.
#[derive(ZeroizeOnDrop)]
pub struct SymmetricKey(Vec<u8>);

impl SymmetricKey {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        SymmetricKey(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A 32-byte intermediate or final key (the Ebox intermediate key `IK`,
/// an `IK ⊕ cfg_nonce` mask, or a reconstructed final key).
#[derive(Clone, ZeroizeOnDrop)]
pub struct Key32([u8; 32]);

impl Key32 {
    pub fn new(bytes: [u8; 32]) -> Self {
        Key32(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn xor(&self, mask: &[u8; 32]) -> Key32 {
        let mut out = [0u8; 32];
        for i in 0..32 {
            out[i] = self.0[i] ^ mask[i];
        }
        Key32(out)
    }
}

/// A plaintext buffer recovered by an AEAD open, zeroized on drop so a
/// caller that drops it without copying it elsewhere doesn't leave it
/// sitting in freed memory.
#[derive(ZeroizeOnDrop)]
pub struct Plaintext(Vec<u8>);

impl Plaintext {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Plaintext(bytes)
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Expand a `cfg_nonce` (or any byte string) to exactly 32 bytes by
/// right-padding with zeros, per the XOR-mask convention this crate
/// adopts for the Ebox per-config nonce (see `DESIGN.md`).
pub fn expand_to_32(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let n = bytes.len().min(32);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Zeroize a `Vec<u8>` in place without consuming it - used for cleanup
/// on error/cancellation paths that don't already route through one of
/// the wrapper types above.
pub fn wipe(bytes: &mut Vec<u8>) {
    bytes.zeroize();
}
