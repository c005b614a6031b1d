//! # Shamir Secret Sharing over GF(2^8)
//!
//! Each byte of the secret is the constant term of its own random polynomial
//! of degree `threshold - 1`. Share `x` (1-based) holds every polynomial
//! evaluated at `x`. Field arithmetic uses the AES reduction polynomial
//! `x^8 + x^4 + x^3 + x + 1`.

use crate::CryptoError;
use rand::RngCore;

/// One share: an x-coordinate and the evaluations for every secret byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    /// Evaluation point, never zero.
    pub x: u8,
    /// Polynomial values at `x`, one per secret byte.
    pub y: Vec<u8>,
}

/// Threshold for `total` participants: `floor(2 * total / 3)`, at least 1.
pub fn threshold_for(total: usize) -> usize {
    (total * 2 / 3).max(1)
}

/// Split `secret` into `total` shares using the thread RNG.
pub fn split(secret: &[u8], threshold: usize, total: usize) -> Result<Vec<Share>, CryptoError> {
    split_with_rng(secret, threshold, total, &mut rand::thread_rng())
}

/// Split `secret` into `total` shares, any `threshold` of which recover it.
pub fn split_with_rng<R: RngCore + ?Sized>(
    secret: &[u8],
    threshold: usize,
    total: usize,
    rng: &mut R,
) -> Result<Vec<Share>, CryptoError> {
    if threshold == 0 || threshold > total || total > 255 {
        return Err(CryptoError::InvalidThreshold { threshold, total });
    }

    let mut shares: Vec<Share> = (1..=total)
        .map(|x| Share {
            x: x as u8,
            y: Vec::with_capacity(secret.len()),
        })
        .collect();

    let mut coefficients = vec![0u8; threshold];
    for &byte in secret {
        coefficients[0] = byte;
        rng.fill_bytes(&mut coefficients[1..]);
        for share in shares.iter_mut() {
            share.y.push(evaluate(&coefficients, share.x));
        }
    }
    coefficients.iter_mut().for_each(|c| *c = 0);

    Ok(shares)
}

/// Recover the secret from at least `threshold` shares.
///
/// Only the first `threshold` shares are interpolated.
pub fn reconstruct(shares: &[Share], threshold: usize) -> Result<Vec<u8>, CryptoError> {
    if threshold == 0 {
        return Err(CryptoError::InvalidThreshold {
            threshold,
            total: shares.len(),
        });
    }
    if shares.len() < threshold {
        return Err(CryptoError::InsufficientShares {
            got: shares.len(),
            need: threshold,
        });
    }

    let used = &shares[..threshold];
    let len = used[0].y.len();
    for (i, share) in used.iter().enumerate() {
        if share.x == 0 {
            return Err(CryptoError::MalformedShares("zero x-coordinate".into()));
        }
        if share.y.len() != len {
            return Err(CryptoError::MalformedShares("length mismatch".into()));
        }
        if used[..i].iter().any(|other| other.x == share.x) {
            return Err(CryptoError::MalformedShares(format!(
                "duplicate x-coordinate {}",
                share.x
            )));
        }
    }

    // Lagrange basis at zero: l_i = prod_{j != i} x_j / (x_j - x_i)
    let basis: Vec<u8> = used
        .iter()
        .enumerate()
        .map(|(i, share_i)| {
            used.iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .fold(1u8, |acc, (_, share_j)| {
                    gf_mul(acc, gf_div(share_j.x, share_j.x ^ share_i.x))
                })
        })
        .collect();

    let secret = (0..len)
        .map(|k| {
            used.iter()
                .zip(&basis)
                .fold(0u8, |acc, (share, l)| acc ^ gf_mul(share.y[k], *l))
        })
        .collect();

    Ok(secret)
}

fn evaluate(coefficients: &[u8], x: u8) -> u8 {
    // Horner
    coefficients
        .iter()
        .rev()
        .fold(0u8, |acc, &c| gf_mul(acc, x) ^ c)
}

fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        let carry = a & 0x80;
        a <<= 1;
        if carry != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    product
}

fn gf_inv(a: u8) -> u8 {
    // a^254 == a^-1 in GF(2^8); callers never pass zero.
    let mut result = 1u8;
    let mut base = a;
    let mut exp = 254u8;
    while exp != 0 {
        if exp & 1 != 0 {
            result = gf_mul(result, base);
        }
        base = gf_mul(base, base);
        exp >>= 1;
    }
    result
}

fn gf_div(a: u8, b: u8) -> u8 {
    gf_mul(a, gf_inv(b))
}
