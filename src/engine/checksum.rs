//! CRC32 checksums for commit log records (IEEE polynomial).

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_detects_bit_flip() {
        let mut data = b"cs101.Name".to_vec();
        let original = compute_checksum(&data);
        data[3] ^= 0x01;
        assert_ne!(original, compute_checksum(&data));
    }
}
