//! Cryptographic primitives: ECDH on NIST P-256/P-384/P-521, the
//! `sha512` KDF, the three registered AEAD cipher suites, GF(2^8) Shamir
//! sharing, and the zeroize-on-drop wrappers that carry secret material
//! between them.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`curve`]  | Curve naming, keypair generation, point encode/decode, ECDH |
//! | [`cipher`] | AEAD seal/open for `chacha20-poly1305` / `aes256-gcm` / `aes256-ccm` |
//! | [`kdf`]    | `sha512` key derivation |
//! | [`shamir`] | GF(2^8) secret splitting and combining |
//! | [`secret`] | Zeroize-on-drop wrappers for shared secrets, keys, and plaintext |
//! | [`rng`]    | Fallible OS CSPRNG access |

pub mod cipher;
pub mod curve;
pub mod kdf;
pub mod rng;
pub mod secret;
pub mod shamir;
