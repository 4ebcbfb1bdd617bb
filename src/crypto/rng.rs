//! OS CSPRNG access with explicit failure handling.
//!
//! `rand`'s `RngCore::fill_bytes` is infallible and panics internally if
//! the OS source fails; every call site that needs random bytes goes
//! through [`fill`] instead, which surfaces that failure as
//! [`crate::Error::Rand`] rather than letting it panic.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::{Error, Result};

/// Fill `buf` with CSPRNG output.
pub fn fill(buf: &mut [u8]) -> Result<()> {
    OsRng.try_fill_bytes(buf).map_err(|_| Error::Rand)
}
