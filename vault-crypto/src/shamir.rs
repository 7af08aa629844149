//! C4: Shamir Secret Sharing over GF(2^128), chunked into 16-byte PKCS7
//! blocks (`spec.md` §4.4). The finite-field arithmetic, chunking and
//! share-index convention mirror `Crypto.Protocol.SecretSharing.Shamir` as
//! used by `split_bytestring_as_shamir_shares`/`reconstruct_secret_from_samir_shares`
//! in the container library this format was distilled from: share indices
//! start at 1, and a share's field element is the plain big-endian integer
//! encoding of its 16 bytes (pycryptodome's non-`ssss` mode).

use crate::error::ValidationError;
use rand_core::RngCore;

const BLOCK_LEN: usize = 16;
/// x^128 + x^7 + x^2 + x + 1, as used by AES-GCM's GF(2^128) and reused here.
const REDUCTION_POLY: u128 = 0x87;

/// One element of GF(2^128), represented as the big-endian integer encoding
/// of its 16 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Gf128(u128);

impl Gf128 {
    fn from_bytes(bytes: &[u8; BLOCK_LEN]) -> Self {
        Gf128(u128::from_be_bytes(*bytes))
    }

    fn to_bytes(self) -> [u8; BLOCK_LEN] {
        self.0.to_be_bytes()
    }

    fn zero() -> Self {
        Gf128(0)
    }

    fn from_index(idx: u8) -> Self {
        Gf128(idx as u128)
    }

    /// Field addition is XOR in characteristic 2; also serves as subtraction.
    fn add(self, other: Self) -> Self {
        Gf128(self.0 ^ other.0)
    }

    /// Carry-less multiplication reduced modulo the AES GF(2^128) polynomial.
    fn mul(self, other: Self) -> Self {
        let (mut f1, mut f2) = (self.0, other.0);
        let top_bit: u128 = 1 << 127;
        let mut product: u128 = 0;
        for _ in 0..128 {
            if f2 & 1 != 0 {
                product ^= f1;
            }
            let overflow = f1 & top_bit != 0;
            f1 <<= 1;
            if overflow {
                f1 ^= REDUCTION_POLY;
            }
            f2 >>= 1;
        }
        Gf128(product)
    }

    /// Multiplicative inverse via Fermat: a^(2^128 - 2) = a^-1 for a != 0.
    fn inverse(self) -> Self {
        let mut result = Gf128(1);
        let mut base = self;
        let mut exponent: u128 = u128::MAX - 1; // 2^128 - 2
        while exponent > 0 {
            if exponent & 1 != 0 {
                result = result.mul(base);
            }
            base = base.mul(base);
            exponent >>= 1;
        }
        result
    }
}

fn pkcs7_pad(data: &[u8], block_len: usize) -> Vec<u8> {
    let pad_len = block_len - (data.len() % block_len);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.extend(std::iter::repeat(pad_len as u8).take(pad_len));
    padded
}

fn pkcs7_unpad(data: &[u8]) -> Result<Vec<u8>, ValidationError> {
    let pad_len = *data
        .last()
        .ok_or_else(|| ValidationError("cannot unpad empty data".into()))? as usize;
    if pad_len == 0 || pad_len > data.len() || pad_len > BLOCK_LEN {
        return Err(ValidationError("invalid PKCS7 padding".into()));
    }
    if !data[data.len() - pad_len..].iter().all(|&b| b as usize == pad_len) {
        return Err(ValidationError("invalid PKCS7 padding".into()));
    }
    Ok(data[..data.len() - pad_len].to_vec())
}

/// Split one 16-byte block into `shares_count` shares, `threshold_count` of
/// which reconstruct it.
fn split_block(
    block: &[u8; BLOCK_LEN],
    shares_count: u8,
    threshold_count: u8,
    rng: &mut impl rand_core::RngCore,
) -> Vec<(u8, [u8; BLOCK_LEN])> {
    let mut coeffs = Vec::with_capacity(threshold_count as usize);
    coeffs.push(Gf128::from_bytes(block));
    for _ in 1..threshold_count {
        let mut random_block = [0u8; BLOCK_LEN];
        rng.fill_bytes(&mut random_block);
        coeffs.push(Gf128::from_bytes(&random_block));
    }

    (1..=shares_count)
        .map(|x| {
            let x_elem = Gf128::from_index(x);
            let mut y = Gf128::zero();
            for coeff in coeffs.iter().rev() {
                y = y.mul(x_elem).add(*coeff);
            }
            (x, y.to_bytes())
        })
        .collect()
}

/// Lagrange-interpolate at x=0 to recombine one 16-byte block from >= threshold shares.
fn combine_block(shares: &[(u8, [u8; BLOCK_LEN])]) -> [u8; BLOCK_LEN] {
    let mut result = Gf128::zero();
    for (i, &(x_i, y_i)) in shares.iter().enumerate() {
        let y_i = Gf128::from_bytes(&y_i);
        let mut numerator = Gf128(1);
        let mut denominator = Gf128(1);
        for (j, &(x_j, _)) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator = numerator.mul(Gf128::from_index(x_j));
            denominator = denominator.mul(Gf128::from_index(x_i).add(Gf128::from_index(x_j)));
        }
        let lagrange_coeff = numerator.mul(denominator.inverse());
        result = result.add(y_i.mul(lagrange_coeff));
    }
    result.to_bytes()
}

/// Split `secret` (PKCS7-padded to a multiple of 16 bytes) into
/// `shares_count` full shares, `threshold_count` of which are required to
/// reconstruct it. Returns `(share_index, share_bytes)` pairs; indices start
/// at 1 (`spec.md` §4.4).
pub fn split_secret(
    secret: &[u8],
    shares_count: u8,
    threshold_count: u8,
) -> Result<Vec<(u8, Vec<u8>)>, ValidationError> {
    if threshold_count == 0 || shares_count == 0 || threshold_count > shares_count {
        return Err(ValidationError(format!(
            "threshold_count ({threshold_count}) must be in 1..=shares_count ({shares_count})"
        )));
    }

    let padded = pkcs7_pad(secret, BLOCK_LEN);
    let mut rng = rand_core::OsRng;

    let mut full_shares: Vec<Vec<u8>> = vec![Vec::new(); shares_count as usize];
    for chunk in padded.chunks(BLOCK_LEN) {
        let block: [u8; BLOCK_LEN] = chunk
            .try_into()
            .expect("padded secret is a multiple of the block length");
        let chunk_shares = split_block(&block, shares_count, threshold_count, &mut rng);
        for (share_bytes, (idx, block_share)) in full_shares.iter_mut().zip(chunk_shares) {
            debug_assert_eq!(idx as usize, share_bytes.len() / BLOCK_LEN + 1);
            share_bytes.extend_from_slice(&block_share);
        }
    }

    Ok(full_shares
        .into_iter()
        .enumerate()
        .map(|(i, bytes)| (i as u8 + 1, bytes))
        .collect())
}

/// Reconstruct the original secret from at least `threshold_count` full
/// shares produced by [`split_secret`].
pub fn reconstruct_secret(shares: &[(u8, Vec<u8>)]) -> Result<Vec<u8>, ValidationError> {
    if shares.is_empty() {
        return Err(ValidationError("no shares provided".into()));
    }
    let mut seen = std::collections::HashSet::new();
    for (idx, _) in shares {
        if !seen.insert(*idx) {
            return Err(ValidationError(format!("duplicate share index {idx}")));
        }
    }

    let block_count = shares[0].1.len() / BLOCK_LEN;
    if shares.iter().any(|(_, bytes)| bytes.len() != block_count * BLOCK_LEN) {
        return Err(ValidationError("shares have inconsistent lengths".into()));
    }

    let mut padded = Vec::with_capacity(block_count * BLOCK_LEN);
    for chunk_idx in 0..block_count {
        let chunk_shares: Vec<(u8, [u8; BLOCK_LEN])> = shares
            .iter()
            .map(|(idx, bytes)| {
                let start = chunk_idx * BLOCK_LEN;
                let block: [u8; BLOCK_LEN] = bytes[start..start + BLOCK_LEN]
                    .try_into()
                    .expect("slice is exactly one block");
                (*idx, block)
            })
            .collect();
        padded.extend_from_slice(&combine_block(&chunk_shares));
    }

    pkcs7_unpad(&padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_reconstruct_round_trips() {
        let secret = b"a twelve-byte-secret that is definitely longer than one block".to_vec();
        let shares = split_secret(&secret, 5, 3).unwrap();
        let subset = vec![shares[0].clone(), shares[2].clone(), shares[4].clone()];
        let reconstructed = reconstruct_secret(&subset).unwrap();
        assert_eq!(reconstructed, secret);
    }

    #[test]
    fn reconstruction_rejects_duplicate_indices() {
        let secret = b"short".to_vec();
        let shares = split_secret(&secret, 3, 2).unwrap();
        let dup = vec![shares[0].clone(), shares[0].clone()];
        assert!(reconstruct_secret(&dup).is_err());
    }

    #[test]
    fn exact_block_length_secret_still_gets_a_full_pad_block() {
        let secret = vec![0x42u8; BLOCK_LEN];
        let shares = split_secret(&secret, 3, 2).unwrap();
        assert_eq!(shares[0].1.len(), BLOCK_LEN * 2);
    }
}
