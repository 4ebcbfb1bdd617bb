//! **boxcrypt** - byte-exact sealed-box and threshold-recovery containers
//! for symmetric key material.
//!
//! # Layers
//! | Module | Purpose |
//! |--------|---------|
//! | [`codec`]   | Length-prefixed primitive (de)serialization over a byte cursor |
//! | [`crypto`]  | ECDH on NIST P-256/P-384/P-521, AEAD ciphers, SHA-512 KDF, GF(2^8) Shamir sharing |
//! | [`sealed_box`] | [`sealed_box::SealedBox`] - anonymous sealed-box encryption to an EC public key |
//! | [`ebox`]    | [`ebox::Ebox`] - primary-or-threshold-recovery container built from multiple boxes |
//! | [`challenge`] | Replay-resistant challenge/response protocol for remote recovery tokens (feature `challenge`) |
//!
//! Everything outside this crate - hardware token drivers, CLI parsing,
//! file I/O, transport of challenge/response text - is a collaborator, not
//! a dependency. This crate only ever sees bytes in and bytes out.

pub mod codec;
pub mod crypto;
pub mod ebox;
pub mod error;
pub mod sealed_box;

#[cfg(feature = "challenge")]
pub mod challenge;

#[cfg(feature = "challenge")]
pub mod words;

pub use error::{Error, Result};
