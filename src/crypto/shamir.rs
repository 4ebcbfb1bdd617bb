//! GF(2^8) Shamir secret sharing over 32-byte secrets.
//!
//! Each of the secret's 32 bytes is shared independently: a random
//! degree-`(N-1)` polynomial is built per byte with that byte as the
//! constant term, then evaluated at `x = 1..=M` to produce `M` shares.
//! Reconstruction is Lagrange interpolation at `x = 0`, done
//! byte-by-byte in the same way.
//!
//! Arithmetic uses the same GF(2^8) reduction polynomial as AES
//! (`x^8+x^4+x^3+x+1`, `0x11B`) - any fixed irreducible polynomial works
//! for Shamir sharing, and reusing AES's is a common convention (e.g.
//! HashiCorp Vault's Shamir implementation does the same).

use rand::RngCore;

use crate::crypto::secret::Key32;
use crate::{Error, Result};

/// One share of a 32-byte secret: a 1-byte x-coordinate and a 32-byte
/// y-value. The 33-byte encoding is exactly this struct's field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub x: u8,
    pub y: [u8; 32],
}

impl Share {
    pub fn to_bytes(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out[0] = self.x;
        out[1..].copy_from_slice(&self.y);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 33 {
            return Err(Error::BadShares);
        }
        let mut y = [0u8; 32];
        y.copy_from_slice(&bytes[1..]);
        Ok(Share { x: bytes[0], y })
    }
}

fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    for _ in 0..8 {
        if b & 1 != 0 {
            product ^= a;
        }
        let carry = a & 0x80 != 0;
        a <<= 1;
        if carry {
            a ^= 0x1B;
        }
        b >>= 1;
    }
    product
}

fn gf_pow(base: u8, mut exp: u8) -> u8 {
    let mut result = 1u8;
    let mut base = base;
    while exp > 0 {
        if exp & 1 == 1 {
            result = gf_mul(result, base);
        }
        base = gf_mul(base, base);
        exp >>= 1;
    }
    result
}

/// Multiplicative inverse via `a^254 = a^-1` (the multiplicative group
/// has order 255).
fn gf_inv(a: u8) -> u8 {
    debug_assert!(a != 0, "zero has no multiplicative inverse in GF(2^8)");
    gf_pow(a, 254)
}

fn gf_div(a: u8, b: u8) -> u8 {
    gf_mul(a, gf_inv(b))
}

fn eval_poly(coeffs: &[u8], x: u8) -> u8 {
    coeffs
        .iter()
        .rev()
        .fold(0u8, |acc, &c| gf_mul(acc, x) ^ c)
}

/// Split `secret` into `parts` shares, any `threshold` of which
/// reconstruct it.
pub fn split(secret: &[u8; 32], threshold: u8, parts: u8, rng: &mut impl RngCore) -> Result<Vec<Share>> {
    assert!(threshold >= 1 && threshold <= parts, "1 <= threshold <= parts");

    let mut coeffs = vec![[0u8; 32]; threshold as usize];
    for (i, byte) in secret.iter().enumerate() {
        coeffs[0][i] = *byte;
    }
    for degree in coeffs.iter_mut().skip(1) {
        rng.try_fill_bytes(degree).map_err(|_| Error::Rand)?;
    }

    Ok((1..=parts)
        .map(|x| {
            let mut y = [0u8; 32];
            for i in 0..32 {
                let per_byte_coeffs: Vec<u8> = coeffs.iter().map(|c| c[i]).collect();
                y[i] = eval_poly(&per_byte_coeffs, x);
            }
            Share { x, y }
        })
        .collect())
}

/// Reconstruct the secret from `shares` via Lagrange interpolation at
/// `x = 0`. The caller is responsible for supplying at least
/// `threshold` distinct-x shares from the same configuration; this
/// function interpolates through whatever it is given; supplying fewer
/// than the original threshold, or shares from an unrelated
/// configuration, silently reconstructs the wrong 32 bytes rather than
/// raising an error here - callers detect that downstream, by the
/// recovery AEAD failing to open (see [`crate::ebox`]).
pub fn combine(shares: &[Share]) -> Result<Key32> {
    if shares.is_empty() {
        return Err(Error::InsufficientShares { have: 0, need: 1 });
    }
    for (i, a) in shares.iter().enumerate() {
        for b in &shares[i + 1..] {
            if a.x == b.x {
                return Err(Error::BadShares);
            }
        }
    }

    let mut secret = [0u8; 32];
    for byte_idx in 0..32 {
        let mut acc = 0u8;
        for (j, share_j) in shares.iter().enumerate() {
            let mut basis = 1u8;
            for (k, share_k) in shares.iter().enumerate() {
                if j == k {
                    continue;
                }
                // L_j(0) = product over k != j of x_k / (x_j XOR x_k);
                // subtraction is XOR in characteristic 2.
                basis = gf_mul(basis, gf_div(share_k.x, share_j.x ^ share_k.x));
            }
            acc ^= gf_mul(share_j.y[byte_idx], basis);
        }
        secret[byte_idx] = acc;
    }
    Ok(Key32::new(secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn split_then_combine_with_exact_threshold() {
        let secret = [0xABu8; 32];
        let shares = split(&secret, 2, 3, &mut OsRng).unwrap();
        let reconstructed = combine(&shares[0..2]).unwrap();
        assert_eq!(reconstructed.as_bytes(), &secret);
    }

    #[test]
    fn any_threshold_subset_reconstructs_the_same_secret() {
        let secret = [0x11u8; 32];
        let shares = split(&secret, 3, 5, &mut OsRng).unwrap();
        let subsets = [
            vec![shares[0].clone(), shares[1].clone(), shares[2].clone()],
            vec![shares[1].clone(), shares[3].clone(), shares[4].clone()],
            vec![shares[0].clone(), shares[2].clone(), shares[4].clone()],
        ];
        for subset in subsets {
            assert_eq!(combine(&subset).unwrap().as_bytes(), &secret);
        }
    }

    #[test]
    fn one_fewer_than_threshold_does_not_reconstruct() {
        let secret = [0x77u8; 32];
        let shares = split(&secret, 3, 4, &mut OsRng).unwrap();
        let short = combine(&shares[0..2]).unwrap();
        assert_ne!(short.as_bytes(), &secret);
    }

    #[test]
    fn duplicate_x_coordinates_are_rejected() {
        let share = Share { x: 1, y: [0u8; 32] };
        assert!(matches!(
            combine(&[share.clone(), share]),
            Err(Error::BadShares)
        ));
    }

    #[test]
    fn share_bytes_round_trip() {
        let share = Share { x: 7, y: [0x99; 32] };
        let bytes = share.to_bytes();
        assert_eq!(bytes.len(), 33);
        assert_eq!(Share::from_bytes(&bytes).unwrap(), share);
    }
}
