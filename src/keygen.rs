//! Key generation
//!
//! Maps an integer index to a short key by positional base-62 encoding.
//! Keys grow by one character each time the index passes a power of 62.
//! The mapping is deterministic but says nothing about uniqueness in a
//! store; callers must still check the key is free before using it.

/// Digits, then lowercase, then uppercase
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: usize = ALPHABET.len();

/// Encode `index` as a key: `0 -> "0"`, `61 -> "Z"`, `62 -> "10"`
pub fn gen_key(mut index: usize) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(ALPHABET[index % BASE] as char);
        index /= BASE;
        if index == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}
