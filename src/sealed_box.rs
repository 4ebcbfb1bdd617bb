//! The `SealedBox` primitive (spec component C3): anonymous sealed-box
//! encryption of a payload to an EC public key via ephemeral ECDH + AEAD.
//!
//! A `SealedBox` carries everything needed to decrypt it except the
//! recipient's private key: the cipher/KDF names, the ephemeral public
//! key used for ECDH, the nonce that salted the KDF, and the
//! ciphertext+tag. Unsealing only needs an oracle capable of computing
//! `ECDH(recipient_priv, ephemeral_pub)` - in production that oracle is
//! a PIV hardware token; in tests it is a plain in-memory private key.

use std::io::{Read, Write};

use crate::codec;
use crate::crypto::cipher::{self, CipherSuite};
use crate::crypto::curve::{self, Curve, EcPrivateKey, EcPublicKey};
use crate::crypto::kdf::Kdf;
use crate::crypto::rng;
use crate::crypto::secret::{Plaintext, SharedSecret};
use crate::{Error, Result};

const MAGIC: [u8; 2] = [0xB0, 0xC5];
const VERSION: u8 = 2;

/// The PIV GUID + key-slot reference carried when `guid_slot_valid = 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidSlot {
    pub guid: Vec<u8>,
    pub slot: u8,
}

/// A sealed box.
#[derive(Debug, Clone)]
pub struct SealedBox {
    pub guid_slot: Option<GuidSlot>,
    pub cipher: CipherSuite,
    pub kdf: Kdf,
    pub nonce: Vec<u8>,
    pub curve: Curve,
    pub recipient_pubkey: Vec<u8>,
    pub ephemeral_pubkey: Vec<u8>,
    pub iv: Vec<u8>,
    pub ciphertext_and_tag: Vec<u8>,
}

impl SealedBox {
    /// Seal `plaintext` to `recipient_pub`, reusing the caller-supplied
    /// `ephemeral_priv` for the ECDH rather than generating a fresh one.
    /// [`crate::ebox::Ebox`] uses this to share one ephemeral keypair per
    /// curve across many boxes; [`Self::seal_fresh`] is the standalone
    /// convenience that generates its own.
    pub fn seal(
        recipient_pub: &EcPublicKey,
        ephemeral_priv: &EcPrivateKey,
        plaintext: &[u8],
        cipher: CipherSuite,
        guid_slot: Option<GuidSlot>,
        nonce: Option<Vec<u8>>,
        iv: Vec<u8>,
    ) -> Result<SealedBox> {
        if recipient_pub.curve() != ephemeral_priv.curve() {
            return Err(Error::UnsupportedCurve(
                "ephemeral key and recipient key are on different curves".to_string(),
            ));
        }

        let nonce = match nonce {
            Some(n) if n.len() >= 16 => n,
            Some(_) => return Err(Error::NonceTooShort),
            None => {
                let mut n = vec![0u8; 16];
                rng::fill(&mut n)?;
                n
            }
        };

        let shared = curve::ecdh(ephemeral_priv, recipient_pub)?;
        let key = Kdf::Sha512.derive(&shared, &nonce, cipher.key_len());
        let ciphertext_and_tag = cipher::seal(cipher, &key, &iv, plaintext)?;

        tracing::debug!(
            curve = recipient_pub.curve().name(),
            cipher = cipher.name(),
            "sealed a box"
        );

        Ok(SealedBox {
            guid_slot,
            cipher,
            kdf: Kdf::Sha512,
            nonce,
            curve: recipient_pub.curve(),
            recipient_pubkey: recipient_pub.to_compressed(),
            ephemeral_pubkey: ephemeral_priv.public_key().to_compressed(),
            iv,
            ciphertext_and_tag,
        })
    }

    /// Seal `plaintext` to `recipient_pub`, generating and then
    /// discarding a fresh ephemeral keypair.
    pub fn seal_fresh(
        recipient_pub: &EcPublicKey,
        plaintext: &[u8],
        cipher: CipherSuite,
        guid_slot: Option<GuidSlot>,
    ) -> Result<SealedBox> {
        let ephemeral = EcPrivateKey::generate(recipient_pub.curve());
        Self::seal(recipient_pub, &ephemeral, plaintext, cipher, guid_slot, None, Vec::new())
    }

    /// Unseal using an ECDH oracle: a closure taking this box's
    /// ephemeral public key and returning `ECDH(recipient_priv, ·)`. A
    /// hardware token exposes exactly this shape of operation.
    pub fn unseal(&self, oracle: impl FnOnce(&EcPublicKey) -> Result<SharedSecret>) -> Result<Plaintext> {
        if !self.cipher.is_aead() {
            return Err(Error::NonAeadCipher);
        }
        let ephemeral_pub = EcPublicKey::from_sec1_bytes(self.curve, &self.ephemeral_pubkey)?;
        let shared = oracle(&ephemeral_pub)?;
        let key = self.kdf.derive(&shared, &self.nonce, self.cipher.key_len());
        let plaintext = cipher::open(self.cipher, &key, &self.iv, &self.ciphertext_and_tag)?;
        tracing::debug!(curve = self.curve.name(), "unsealed a box");
        Ok(plaintext)
    }

    /// Unseal with the recipient's private scalar held directly in
    /// memory - the software stand-in for a hardware token used in
    /// tests.
    pub fn unseal_with_privkey(&self, recipient_priv: &EcPrivateKey) -> Result<Plaintext> {
        self.unseal(|ephemeral_pub| curve::ecdh(recipient_priv, ephemeral_pub))
    }

    pub fn serialize<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&MAGIC)?;
        codec::write_u8(w, VERSION)?;
        match &self.guid_slot {
            Some(gs) => {
                codec::write_u8(w, 1)?;
                codec::write_string8(w, &gs.guid)?;
                codec::write_u8(w, gs.slot)?;
            }
            None => {
                codec::write_u8(w, 0)?;
                codec::write_string8(w, &[])?;
                codec::write_u8(w, 0)?;
            }
        }
        codec::write_cstring8(w, self.cipher.name())?;
        codec::write_cstring8(w, self.kdf.name())?;
        codec::write_string8(w, &self.nonce)?;
        codec::write_cstring8(w, self.curve.name())?;
        codec::write_eckey8(w, &self.recipient_pubkey)?;
        codec::write_eckey8(w, &self.ephemeral_pubkey)?;
        codec::write_string8(w, &self.iv)?;
        codec::write_string(w, &self.ciphertext_and_tag)?;
        Ok(())
    }

    pub fn parse<R: Read>(r: &mut R) -> Result<SealedBox> {
        let mut magic = [0u8; 2];
        r.read_exact(&mut magic).map_err(|_| Error::Truncated)?;
        if magic != MAGIC {
            return Err(Error::BadMagic);
        }
        let version = codec::read_u8(r)?;
        if version != VERSION {
            return Err(Error::BadVersion(version));
        }
        let guid_slot_valid = codec::read_u8(r)?;
        let guid = codec::read_string8(r)?;
        let slot = codec::read_u8(r)?;
        let guid_slot = match guid_slot_valid {
            0 => None,
            _ => Some(GuidSlot { guid, slot }),
        };

        let cipher = CipherSuite::from_name(&codec::read_cstring8(r)?)?;
        let kdf = Kdf::from_name(&codec::read_cstring8(r)?)?;
        let nonce = codec::read_string8(r)?;
        let curve = Curve::from_name(&codec::read_cstring8(r)?)?;
        let recipient_pubkey = codec::read_eckey8(r)?;
        let ephemeral_pubkey = codec::read_eckey8(r)?;
        let iv = codec::read_string8(r)?;
        let ciphertext_and_tag = codec::read_string(r)?;

        // Validate both points decode and are on-curve, and are not the
        // identity element (structurally impossible to encode through
        // `eckey8` anyway, but checked explicitly for clarity).
        EcPublicKey::from_sec1_bytes(curve, &recipient_pubkey)?;
        EcPublicKey::from_sec1_bytes(curve, &ephemeral_pubkey)?;

        if ciphertext_and_tag.len() < cipher.tag_len() {
            return Err(Error::AuthFail);
        }

        Ok(SealedBox {
            guid_slot,
            cipher,
            kdf,
            nonce,
            curve,
            recipient_pubkey,
            ephemeral_pubkey,
            iv,
            ciphertext_and_tag,
        })
    }
}
