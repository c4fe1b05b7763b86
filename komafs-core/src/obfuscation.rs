//! Per-word XOR obfuscation.
//!
//! Stored bytes are XORed word by word (32-bit, little-endian) with a key
//! equal to the stored byte count. Applying the same key twice restores the
//! input, so the transform is its own inverse. This is a classroom gimmick,
//! not encryption.

/// Trailer appended after every obfuscated write.
pub const TRAILER: &[u8] = "cauda obrigatória\n".as_bytes();

const WORD: usize = 4;

/// Key for a stored payload of `size` bytes.
pub fn key_for(size: usize) -> u32 {
    size as u32
}

/// Number of bytes covered by the words overlapping `[0, size)`, capped at `limit`.
pub fn covered_len(size: usize, limit: usize) -> usize {
    size.div_ceil(WORD).saturating_mul(WORD).min(limit)
}

/// XOR every 32-bit word of `bytes` with `key`.
///
/// A trailing partial word is XORed with the matching low bytes of the key.
pub fn xor_words(bytes: &mut [u8], key: u32) {
    let key_bytes = key.to_le_bytes();
    for chunk in bytes.chunks_mut(WORD) {
        for (b, k) in chunk.iter_mut().zip(key_bytes.iter()) {
            *b ^= k;
        }
    }
}

/// Decode the first `size` stored bytes into a fresh buffer, leaving `stored` untouched.
pub fn decode_copy(stored: &[u8], size: usize) -> Vec<u8> {
    let covered = covered_len(size, stored.len());
    let mut scratch = stored[..covered].to_vec();
    xor_words(&mut scratch, key_for(size));
    scratch.truncate(size.min(covered));
    scratch
}
