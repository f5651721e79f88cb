use crc32fast::Hasher;

/// CRC-32 of `data` (IEEE polynomial, initial/final complement), the
/// value rrespacker stores in every chunk record.
///
/// Pure function, safe to call concurrently from any number of callers.
pub fn compute_crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
