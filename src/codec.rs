//! Length-prefixed wire primitives shared by [`crate::sealed_box`],
//! [`crate::ebox`] and [`crate::challenge`].
//!
//! Every multi-byte integer on the wire is big-endian. Each `read_*`
//! function reads exactly the bytes it promises or returns
//! [`Error::Truncated`] - there is no partial-read ambiguity. Each
//! `write_*` function is the exact inverse of its `read_*` counterpart,
//! so `write(read(bytes)) == bytes` for any well-formed input.

use std::io::{Read, Write};

use crate::{Error, Result};

/// Read one byte.
#[inline]
pub fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b).map_err(|_| Error::Truncated)?;
    Ok(b[0])
}

/// Write one byte.
#[inline]
pub fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<()> {
    Ok(w.write_all(&[v])?)
}

/// Read a big-endian `u32`.
#[inline]
pub fn read_u32be<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b).map_err(|_| Error::Truncated)?;
    Ok(u32::from_be_bytes(b))
}

/// Write a big-endian `u32`.
#[inline]
pub fn write_u32be<W: Write>(w: &mut W, v: u32) -> Result<()> {
    Ok(w.write_all(&v.to_be_bytes())?)
}

/// Read a big-endian `u64`.
#[inline]
pub fn read_u64be<R: Read>(r: &mut R) -> Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b).map_err(|_| Error::Truncated)?;
    Ok(u64::from_be_bytes(b))
}

/// Write a big-endian `u64`.
#[inline]
pub fn write_u64be<W: Write>(w: &mut W, v: u64) -> Result<()> {
    Ok(w.write_all(&v.to_be_bytes())?)
}

/// Read exactly `len` bytes into a `Vec`.
#[inline]
fn read_bytes<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut b = vec![0u8; len];
    r.read_exact(&mut b).map_err(|_| Error::Truncated)?;
    Ok(b)
}

/// Read a `u32be`-length-prefixed byte string.
pub fn read_string<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = read_u32be(r)? as usize;
    read_bytes(r, len)
}

/// Write a `u32be`-length-prefixed byte string.
pub fn write_string<W: Write>(w: &mut W, bytes: &[u8]) -> Result<()> {
    write_u32be(w, bytes.len() as u32)?;
    Ok(w.write_all(bytes)?)
}

/// Read a `u8`-length-prefixed byte string.
pub fn read_string8<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = read_u8(r)? as usize;
    read_bytes(r, len)
}

/// Write a `u8`-length-prefixed byte string. A `string8` can only ever
/// hold 255 bytes on the wire; a caller (e.g. an embedded field built up
/// from untrusted or over-long input) that hands in more than that gets
/// [`Error::LengthOverflow`] rather than a panic.
pub fn write_string8<W: Write>(w: &mut W, bytes: &[u8]) -> Result<()> {
    if bytes.len() > u8::MAX as usize {
        return Err(Error::LengthOverflow);
    }
    write_u8(w, bytes.len() as u8)?;
    Ok(w.write_all(bytes)?)
}

fn validate_cstring(bytes: &[u8]) -> Result<&[u8]> {
    match bytes.split_last() {
        Some((0, rest)) if !rest.contains(&0) => Ok(rest),
        _ => Err(Error::BadCstring),
    }
}

/// Read a `cstring`: a `string` whose content ends in exactly one
/// trailing `0x00` and contains no other `0x00`. The terminator is
/// counted in the length but not returned.
pub fn read_cstring<R: Read>(r: &mut R) -> Result<String> {
    let bytes = read_string(r)?;
    let value = validate_cstring(&bytes)?;
    String::from_utf8(value.to_vec()).map_err(|_| Error::BadCstring)
}

/// Write a `cstring`.
pub fn write_cstring<W: Write>(w: &mut W, value: &str) -> Result<()> {
    let mut bytes = Vec::with_capacity(value.len() + 1);
    bytes.extend_from_slice(value.as_bytes());
    bytes.push(0);
    write_string(w, &bytes)
}

/// Read a `cstring8`.
pub fn read_cstring8<R: Read>(r: &mut R) -> Result<String> {
    let bytes = read_string8(r)?;
    let value = validate_cstring(&bytes)?;
    String::from_utf8(value.to_vec()).map_err(|_| Error::BadCstring)
}

/// Write a `cstring8`.
pub fn write_cstring8<W: Write>(w: &mut W, value: &str) -> Result<()> {
    let mut bytes = Vec::with_capacity(value.len() + 1);
    bytes.extend_from_slice(value.as_bytes());
    bytes.push(0);
    write_string8(w, &bytes)
}

/// A big-endian two's-complement integer with a mandatory sign byte,
/// matching the OpenSSH `mpint` convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigNum(Vec<u8>);

impl BigNum {
    /// Build a `BigNum` from an unsigned big-endian magnitude, prefixing
    /// a `0x00` sign byte if the high bit of the first byte would
    /// otherwise make the value read as negative.
    pub fn from_unsigned_be(magnitude: &[u8]) -> Self {
        let mut bytes: Vec<u8> = magnitude
            .iter()
            .copied()
            .skip_while(|&b| b == 0)
            .collect();
        if bytes.first().is_some_and(|&b| b & 0x80 != 0) {
            bytes.insert(0, 0);
        } else if bytes.is_empty() {
            bytes.push(0);
        }
        BigNum(bytes)
    }

    /// The raw two's-complement encoding, including the sign byte.
    pub fn as_encoded_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Read a `bignum`.
pub fn read_bignum<R: Read>(r: &mut R) -> Result<BigNum> {
    Ok(BigNum(read_string(r)?))
}

/// Write a `bignum`.
pub fn write_bignum<W: Write>(w: &mut W, v: &BigNum) -> Result<()> {
    write_string(w, &v.0)
}

/// Read a `bignum8`.
pub fn read_bignum8<R: Read>(r: &mut R) -> Result<BigNum> {
    Ok(BigNum(read_string8(r)?))
}

/// Write a `bignum8`.
pub fn write_bignum8<W: Write>(w: &mut W, v: &BigNum) -> Result<()> {
    write_string8(w, &v.0)
}

/// Read an `eckey`: a `string` containing a SEC1 uncompressed point
/// (leading byte `0x04`). Only the leading-byte convention is checked
/// here; on-curve validation happens when the bytes are decoded into a
/// curve-specific point in [`crate::crypto::curve`].
pub fn read_eckey<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let bytes = read_string(r)?;
    if bytes.first() != Some(&0x04) {
        return Err(Error::BadPoint);
    }
    Ok(bytes)
}

/// Write an `eckey`.
pub fn write_eckey<W: Write>(w: &mut W, point: &[u8]) -> Result<()> {
    debug_assert_eq!(point.first(), Some(&0x04));
    write_string(w, point)
}

/// Read an `eckey8`: a `string8` containing a SEC1 compressed point
/// (leading byte `0x02` or `0x03`).
pub fn read_eckey8<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let bytes = read_string8(r)?;
    match bytes.first() {
        Some(0x02) | Some(0x03) => Ok(bytes),
        _ => Err(Error::BadPoint),
    }
}

/// Write an `eckey8`.
pub fn write_eckey8<W: Write>(w: &mut W, point: &[u8]) -> Result<()> {
    debug_assert!(matches!(point.first(), Some(0x02) | Some(0x03)));
    write_string8(w, point)
}

/// An opaque SSH-style public-key blob: a `string` whose content begins
/// with its own inner algorithm-name `string`. `PUBKEY`/`CAK` parts
/// carry these when the key is not an EC curve this crate decodes
/// natively (e.g. an RSA Card Authentication Key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshPublicKey(Vec<u8>);

impl SshPublicKey {
    /// Wrap a pre-encoded SSH public-key blob (the full inner content,
    /// algorithm-name prefix included).
    pub fn from_blob(blob: Vec<u8>) -> Self {
        SshPublicKey(blob)
    }

    /// The algorithm name prefix, if the blob is well-formed enough to
    /// contain one.
    pub fn algorithm_name(&self) -> Option<&str> {
        let mut cursor = std::io::Cursor::new(&self.0);
        let name = read_string(&mut cursor).ok()?;
        std::str::from_utf8(&name).ok()
    }

    /// The raw blob bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Read a `key`: an opaque SSH public-key blob.
pub fn read_key<R: Read>(r: &mut R) -> Result<SshPublicKey> {
    Ok(SshPublicKey(read_string(r)?))
}

/// Write a `key`.
pub fn write_key<W: Write>(w: &mut W, key: &SshPublicKey) -> Result<()> {
    write_string(w, &key.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn string_round_trips() {
        let mut buf = Vec::new();
        write_string(&mut buf, b"hello world").unwrap();
        let mut cur = Cursor::new(buf);
        assert_eq!(read_string(&mut cur).unwrap(), b"hello world");
    }

    #[test]
    fn string8_round_trips() {
        let mut buf = Vec::new();
        write_string8(&mut buf, b"abc").unwrap();
        assert_eq!(buf, vec![3, b'a', b'b', b'c']);
    }

    #[test]
    fn string8_overflow_is_an_error_not_a_panic() {
        let mut buf = Vec::new();
        let too_long = vec![0u8; 256];
        assert!(matches!(
            write_string8(&mut buf, &too_long),
            Err(Error::LengthOverflow)
        ));
    }

    #[test]
    fn cstring_round_trips() {
        let mut buf = Vec::new();
        write_cstring8(&mut buf, "chacha20-poly1305").unwrap();
        let mut cur = Cursor::new(buf);
        assert_eq!(read_cstring8(&mut cur).unwrap(), "chacha20-poly1305");
    }

    #[test]
    fn cstring_rejects_embedded_nul() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 3).unwrap();
        buf.extend_from_slice(b"a\0b");
        let mut cur = Cursor::new(buf);
        assert!(matches!(read_cstring8(&mut cur), Err(Error::BadCstring)));
    }

    #[test]
    fn cstring_rejects_missing_terminator() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 3).unwrap();
        buf.extend_from_slice(b"abc");
        let mut cur = Cursor::new(buf);
        assert!(matches!(read_cstring8(&mut cur), Err(Error::BadCstring)));
    }

    #[test]
    fn truncated_read_is_an_error() {
        let mut cur = Cursor::new(vec![0u8; 2]);
        assert!(matches!(read_u32be(&mut cur), Err(Error::Truncated)));
    }

    #[test]
    fn bignum_adds_sign_byte_for_high_bit() {
        let n = BigNum::from_unsigned_be(&[0x80, 0x01]);
        assert_eq!(n.as_encoded_bytes(), &[0x00, 0x80, 0x01]);
    }

    #[test]
    fn bignum_strips_leading_zeros_below_sign_boundary() {
        let n = BigNum::from_unsigned_be(&[0x00, 0x00, 0x01]);
        assert_eq!(n.as_encoded_bytes(), &[0x01]);
    }

    #[test]
    fn eckey_rejects_bad_leading_byte() {
        let mut buf = Vec::new();
        write_string(&mut buf, &[0x05, 0, 0]).unwrap();
        let mut cur = Cursor::new(buf);
        assert!(matches!(read_eckey(&mut cur), Err(Error::BadPoint)));
    }

    #[test]
    fn eckey8_accepts_either_compressed_prefix() {
        for prefix in [0x02u8, 0x03] {
            let mut buf = Vec::new();
            write_eckey8(&mut buf, &[prefix; 33]).unwrap();
            let mut cur = Cursor::new(buf);
            assert_eq!(read_eckey8(&mut cur).unwrap()[0], prefix);
        }
    }
}
