//! # Primitive Codec
//!
//! Hex/byte/string conversion, 32-byte field padding, and secure random
//! generation. This is the foundation every other module builds on: all
//! byte values crossing the ledger boundary are lowercase `0x`-prefixed
//! hex strings of fixed length (32 bytes ⇒ 64 hex chars, addresses ⇒
//! 20 bytes ⇒ 40 hex chars).
//!
//! ## Contract
//!
//! - Hex functions are case-insensitive on input, lowercase on output,
//!   and always `0x`-prefixed in textual form.
//! - [`pad_to_32`] / [`unpad_32`] are exact inverses for any input of
//!   0–32 bytes with no trailing zero byte. Trailing real zero bytes in
//!   the original data are indistinguishable from padding — a documented
//!   limitation of the on-chain format, not a bug.
//! - Random generation uses the OS CSPRNG ([`rand::rngs::OsRng`]); there
//!   is no shared mutable RNG state.

use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use crate::crypto::hash::keccak256;
use crate::error::{Error, Result};

/// Size of an on-chain field element in bytes
pub const FIELD_SIZE: usize = 32;

/// Size of an on-chain address in bytes
pub const ADDRESS_SIZE: usize = 20;

/// Check whether a string is a well-formed `0x`-prefixed hex byte string
///
/// Requires an even number of hex digits (hex always encodes whole
/// bytes here). `"0x"` alone is the valid encoding of zero bytes.
pub fn is_hex(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(body) => body.len() % 2 == 0 && body.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// Check whether a string is a valid 20-byte address
///
/// Accepts all-lowercase and all-uppercase forms as non-checksummed
/// addresses. Mixed-case forms must carry a valid EIP-55 checksum: each
/// alphabetic hex digit is uppercase exactly when the corresponding
/// nibble of `keccak256(lowercase_hex)` is ≥ 8.
pub fn is_address(s: &str) -> bool {
    let body = match s.strip_prefix("0x") {
        Some(body) => body,
        None => return false,
    };
    if body.len() != ADDRESS_SIZE * 2 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }

    let any_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    let any_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    if !any_upper || !any_lower {
        // Uniform case carries no checksum.
        return true;
    }

    let hash = keccak256(body.to_ascii_lowercase().as_bytes());
    body.bytes().enumerate().all(|(i, c)| {
        if !c.is_ascii_alphabetic() {
            return true;
        }
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if nibble >= 8 {
            c.is_ascii_uppercase()
        } else {
            c.is_ascii_lowercase()
        }
    })
}

/// Decode a hex string (with or without `0x` prefix) into bytes
///
/// ## Errors
///
/// Returns [`Error::InvalidEncoding`] for odd-length or non-hex input.
pub fn to_bytes(s: &str) -> Result<Vec<u8>> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(body).map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {}", e)))
}

/// Encode bytes as a lowercase `0x`-prefixed hex string
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Encode a UTF-8 string as raw bytes
pub fn str_to_bytes(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

/// Decode raw bytes back into a UTF-8 string
///
/// Round-trip lossless with [`str_to_bytes`] for any valid UTF-8 input.
///
/// ## Errors
///
/// Returns [`Error::InvalidEncoding`] for invalid UTF-8.
pub fn bytes_to_str(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::InvalidEncoding(format!("Invalid UTF-8: {}", e)))
}

/// Right-pad bytes with zeros to exactly 32 bytes
///
/// ## Errors
///
/// Returns [`Error::InvalidEncoding`] if the input is longer than 32 bytes.
pub fn pad_to_32(bytes: &[u8]) -> Result<[u8; FIELD_SIZE]> {
    if bytes.len() > FIELD_SIZE {
        return Err(Error::InvalidEncoding(format!(
            "Cannot pad {} bytes into a 32-byte field",
            bytes.len()
        )));
    }
    let mut padded = [0u8; FIELD_SIZE];
    padded[..bytes.len()].copy_from_slice(bytes);
    Ok(padded)
}

/// Strip trailing zero bytes from a 32-byte field
///
/// Returns an empty sequence for an all-zero field. Trailing zero bytes
/// that were part of the original data are stripped along with the
/// padding — callers whose data may legitimately end in `0x00` must carry
/// an explicit length out of band.
pub fn unpad_32(bytes: &[u8; FIELD_SIZE]) -> Vec<u8> {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    bytes[..end].to_vec()
}

/// Generate `n` cryptographically secure random bytes
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; n];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate a random string of `len` characters drawn from `alphabet`
///
/// ## Errors
///
/// Returns [`Error::InvalidEncoding`] if the alphabet is empty.
pub fn random_string(len: usize, alphabet: &str) -> Result<String> {
    let chars: Vec<char> = alphabet.chars().collect();
    if chars.is_empty() {
        return Err(Error::InvalidEncoding("Empty alphabet".into()));
    }
    Ok((0..len)
        .map(|_| chars[OsRng.gen_range(0..chars.len())])
        .collect())
}

// ============================================================================
// SERDE HELPERS
// ============================================================================

/// Serde helper for fixed-size byte arrays as `0x`-prefixed hex
pub mod hex_array {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a byte array as lowercase `0x`-prefixed hex
    pub fn serialize<S, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    /// Deserialize a byte array from hex (optional `0x` prefix)
    pub fn deserialize<'de, D, const N: usize>(
        deserializer: D,
    ) -> std::result::Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let body = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(body).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected {} bytes", N)))
    }
}

/// Serde helper for variable-length byte sequences as `0x`-prefixed hex
pub mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as lowercase `0x`-prefixed hex
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    /// Deserialize bytes from hex (optional `0x` prefix)
    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let body = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(body).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================
