//! Length normalisation of ciphertexts.
//!
//! Ciphertext bit lengths vary with the random auxiliary modulus, so they are
//! left-padded with zeros to a common width before being concatenated into a
//! single stream for statistical randomness testing.

use num_traits::Zero;

use crate::types::Ciphertext;

/// Largest bit length among `ciphertexts`
pub fn max_bit_length(ciphertexts: &[Ciphertext]) -> u64 {
    ciphertexts
        .iter()
        .map(Ciphertext::bit_length)
        .max()
        .unwrap_or(0)
}

/// Concatenate all ciphertexts as ASCII `'0'`/`'1'` characters, each padded to
/// the width of the longest one
pub fn to_ascii_bits(ciphertexts: &[Ciphertext]) -> String {
    let width = max_bit_length(ciphertexts) as usize;
    let mut out = String::with_capacity(width * ciphertexts.len());

    for ciphertext in ciphertexts {
        if ciphertext.value().is_zero() {
            out.extend(std::iter::repeat('0').take(width));
        } else {
            let bits = ciphertext.value().to_str_radix(2);
            out.extend(std::iter::repeat('0').take(width - bits.len()));
            out.push_str(&bits);
        }
    }

    out
}

/// Concatenate all ciphertexts as big-endian bytes, each padded to the byte
/// width of the longest one
pub fn to_padded_bytes(ciphertexts: &[Ciphertext]) -> Vec<u8> {
    let width = max_bit_length(ciphertexts).div_ceil(8) as usize;
    let mut out = Vec::with_capacity(width * ciphertexts.len());

    for ciphertext in ciphertexts {
        if ciphertext.value().is_zero() {
            out.extend(std::iter::repeat(0u8).take(width));
        } else {
            let bytes = ciphertext.value().to_bytes_be();
            out.extend(std::iter::repeat(0u8).take(width - bytes.len()));
            out.extend_from_slice(&bytes);
        }
    }

    out
}
