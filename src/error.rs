//! Library-wide error and result types.

use std::io;

/// Result alias used throughout boxcrypt.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type. None of these variants
/// distinguish *why* an authentication check failed - `AuthFail` and
/// `BadShares` carry no inner state, so a caller can never observe more
/// than "this didn't work".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The stream ended before all expected bytes could be read.
    #[error("truncated: expected more bytes than were available")]
    Truncated,
    /// A `cstring`/`cstring8` was missing its terminator or had an embedded NUL.
    #[error("malformed c-string field")]
    BadCstring,
    /// An encoded EC point was not on the curve, or had a bad leading byte.
    #[error("bad elliptic curve point encoding")]
    BadPoint,
    /// A `string8` field was asked to carry more than 255 bytes, which
    /// cannot fit in its one-byte length prefix.
    #[error("string8 length overflow")]
    LengthOverflow,
    /// A container's magic bytes did not match the expected value.
    #[error("bad magic value")]
    BadMagic,
    /// A container's version field is not one this crate understands.
    #[error("unsupported version: {0}")]
    BadVersion(u8),
    /// The named cipher suite is not one of the registered AEAD ciphers.
    #[error("unsupported cipher: {0}")]
    UnsupportedCipher(String),
    /// The named curve is not one of nistp256/nistp384/nistp521.
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),
    /// The named KDF is not `sha512`.
    #[error("unsupported kdf: {0}")]
    UnsupportedKdf(String),
    /// A cipher suite was requested that is not an AEAD construction.
    #[error("cipher is not AEAD")]
    NonAeadCipher,
    /// AEAD authentication failed. Never carries a reason - see the
    /// type-level note above.
    #[error("authentication failed")]
    AuthFail,
    /// Shamir-combined shares did not reconstruct a valid recovery key.
    #[error("shares did not combine to a valid key")]
    BadShares,
    /// Fewer than the configuration's threshold shares were supplied.
    #[error("insufficient shares: have {have}, need {need}")]
    InsufficientShares { have: u8, need: u8 },
    /// A Box nonce shorter than 16 bytes appeared where the container
    /// format requires the stricter Ebox-context minimum.
    #[error("nonce shorter than 16 bytes")]
    NonceTooShort,
    /// A required tag was absent from a part/challenge/response payload.
    #[error("missing required tag: {0}")]
    MissingRequiredTag(&'static str),
    /// A non-OPTIONAL part tag was not recognized.
    #[error("unknown tag: {0:#04x}")]
    UnknownTag(u8),
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The system CSPRNG failed to produce randomness.
    #[error("random number generation failed")]
    Rand,
}
