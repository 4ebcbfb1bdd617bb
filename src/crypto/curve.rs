//! NIST P-256/P-384/P-521 curve support: naming, ephemeral keypair
//! generation, point encode/decode, and ECDH.
//!
//! Each curve is backed by its own RustCrypto crate (`p256`/`p384`/`p521`);
//! there is no shared generic plumbing between them because the three
//! crates are independent and this crate only ever needs three concrete
//! instantiations, not an arbitrary-curve abstraction.

use elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;

use crate::crypto::secret::SharedSecret;
use crate::{Error, Result};

/// One of the three EC curves this crate supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    NistP256,
    NistP384,
    NistP521,
}

impl Curve {
    /// The canonical wire name (`cstring`/`cstring8` value).
    pub fn name(&self) -> &'static str {
        match self {
            Curve::NistP256 => "nistp256",
            Curve::NistP384 => "nistp384",
            Curve::NistP521 => "nistp521",
        }
    }

    /// Parse a canonical curve name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "nistp256" => Ok(Curve::NistP256),
            "nistp384" => Ok(Curve::NistP384),
            "nistp521" => Ok(Curve::NistP521),
            other => Err(Error::UnsupportedCurve(other.to_string())),
        }
    }

    /// The coordinate byte length (32/48/66), i.e. the length the ECDH
    /// X-coordinate is left-padded to.
    pub fn coord_len(&self) -> usize {
        match self {
            Curve::NistP256 => 32,
            Curve::NistP384 => 48,
            Curve::NistP521 => 66,
        }
    }
}

/// An EC private key on one of the three supported curves. Each inner
/// `SecretKey` type already zeroizes its scalar on drop.
pub enum EcPrivateKey {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

impl EcPrivateKey {
    /// Generate a fresh keypair's private half on `curve` using the OS
    /// CSPRNG.
    pub fn generate(curve: Curve) -> Self {
        match curve {
            Curve::NistP256 => EcPrivateKey::P256(p256::SecretKey::random(&mut OsRng)),
            Curve::NistP384 => EcPrivateKey::P384(p384::SecretKey::random(&mut OsRng)),
            Curve::NistP521 => EcPrivateKey::P521(p521::SecretKey::random(&mut OsRng)),
        }
    }

    /// Load a private scalar from raw big-endian bytes (used when a
    /// caller supplies a fixed ephemeral private key, e.g. for test
    /// vectors).
    pub fn from_bytes(curve: Curve, bytes: &[u8]) -> Result<Self> {
        Ok(match curve {
            Curve::NistP256 => {
                EcPrivateKey::P256(p256::SecretKey::from_slice(bytes).map_err(|_| Error::BadPoint)?)
            }
            Curve::NistP384 => {
                EcPrivateKey::P384(p384::SecretKey::from_slice(bytes).map_err(|_| Error::BadPoint)?)
            }
            Curve::NistP521 => {
                EcPrivateKey::P521(p521::SecretKey::from_slice(bytes).map_err(|_| Error::BadPoint)?)
            }
        })
    }

    pub fn curve(&self) -> Curve {
        match self {
            EcPrivateKey::P256(_) => Curve::NistP256,
            EcPrivateKey::P384(_) => Curve::NistP384,
            EcPrivateKey::P521(_) => Curve::NistP521,
        }
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> EcPublicKey {
        match self {
            EcPrivateKey::P256(sk) => EcPublicKey::P256(sk.public_key()),
            EcPrivateKey::P384(sk) => EcPublicKey::P384(sk.public_key()),
            EcPrivateKey::P521(sk) => EcPublicKey::P521(sk.public_key()),
        }
    }
}

/// An EC public key on one of the three supported curves.
#[derive(Clone)]
pub enum EcPublicKey {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
}

impl EcPublicKey {
    /// Decode a SEC1-encoded point (compressed or uncompressed; the
    /// encoding is self-describing via its leading byte). Returns
    /// [`Error::BadPoint`] if the bytes do not describe a point on
    /// `curve`, including the point at infinity.
    pub fn from_sec1_bytes(curve: Curve, bytes: &[u8]) -> Result<Self> {
        Ok(match curve {
            Curve::NistP256 => {
                EcPublicKey::P256(p256::PublicKey::from_sec1_bytes(bytes).map_err(|_| Error::BadPoint)?)
            }
            Curve::NistP384 => {
                EcPublicKey::P384(p384::PublicKey::from_sec1_bytes(bytes).map_err(|_| Error::BadPoint)?)
            }
            Curve::NistP521 => {
                EcPublicKey::P521(p521::PublicKey::from_sec1_bytes(bytes).map_err(|_| Error::BadPoint)?)
            }
        })
    }

    pub fn curve(&self) -> Curve {
        match self {
            EcPublicKey::P256(_) => Curve::NistP256,
            EcPublicKey::P384(_) => Curve::NistP384,
            EcPublicKey::P521(_) => Curve::NistP521,
        }
    }

    /// SEC1 compressed encoding (leading `0x02`/`0x03`) - the `eckey8`
    /// wire representation.
    pub fn to_compressed(&self) -> Vec<u8> {
        match self {
            EcPublicKey::P256(pk) => pk.to_encoded_point(true).as_bytes().to_vec(),
            EcPublicKey::P384(pk) => pk.to_encoded_point(true).as_bytes().to_vec(),
            EcPublicKey::P521(pk) => pk.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    /// SEC1 uncompressed encoding (leading `0x04`) - the `eckey` wire
    /// representation.
    pub fn to_uncompressed(&self) -> Vec<u8> {
        match self {
            EcPublicKey::P256(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
            EcPublicKey::P384(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
            EcPublicKey::P521(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
        }
    }
}

/// Compute `ECDH(priv, pub)`, returning the X-coordinate left-padded to
/// the curve's coordinate length (the RustCrypto `SharedSecret` type
/// already returns a fixed-length `FieldBytes`, so no extra padding is
/// needed). Fails with [`Error::UnsupportedCurve`] if the two keys are
/// on different curves.
pub fn ecdh(private: &EcPrivateKey, public: &EcPublicKey) -> Result<SharedSecret> {
    let bytes = match (private, public) {
        (EcPrivateKey::P256(sk), EcPublicKey::P256(pk)) => {
            p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                .raw_secret_bytes()
                .to_vec()
        }
        (EcPrivateKey::P384(sk), EcPublicKey::P384(pk)) => {
            p384::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                .raw_secret_bytes()
                .to_vec()
        }
        (EcPrivateKey::P521(sk), EcPublicKey::P521(pk)) => {
            p521::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                .raw_secret_bytes()
                .to_vec()
        }
        _ => {
            return Err(Error::UnsupportedCurve(
                "private and public keys are on different curves".to_string(),
            ));
        }
    };
    Ok(SharedSecret::new(bytes))
}
