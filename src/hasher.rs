//! Hasher facade: the engine treats a hasher as an opaque fixed-length
//! digest producer. This module supplies the non-pluggable convenience
//! implementations explicitly allowed by scope (a null hasher and the two
//! blake3-backed truncations); MD5/SHA256 are external collaborators and
//! are not implemented here, consistent with an engine that accepts any
//! `Hasher` impl at its boundary.

/// Digest lengths this engine supports. `0` means "no hash stored", used
/// for the index sidecar where body hashes are not needed.
pub const VALID_DIGEST_LENGTHS: [usize; 4] = [0, 4, 8, 32];

/// An opaque, fixed-length digest producer. Identity is the algorithm name,
/// used verbatim in sidecar headers.
pub trait Hasher {
    fn digest_len(&self) -> usize;
    fn name(&self) -> &'static str;
    fn hash(&self, data: &[u8]) -> Vec<u8>;
}

/// The zero-length hasher: always produces an empty digest. Used by the
/// index sidecar, whose records carry no body hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHasher;

impl Hasher for NullHasher {
    fn digest_len(&self) -> usize {
        0
    }
    fn name(&self) -> &'static str {
        "none"
    }
    fn hash(&self, _data: &[u8]) -> Vec<u8> {
        Vec::new()
    }
}

/// Full 32-byte BLAKE3 digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Full;

impl Hasher for Blake3Full {
    fn digest_len(&self) -> usize {
        32
    }
    fn name(&self) -> &'static str {
        "blake3-32"
    }
    fn hash(&self, data: &[u8]) -> Vec<u8> {
        blake3::hash(data).as_bytes().to_vec()
    }
}

/// BLAKE3 truncated to the first `N` bytes, for callers who want a cheaper
/// per-block fingerprint than the full digest (the hash only needs to be
/// good enough to detect corruption; ECC does the actual repair work).
#[derive(Debug, Clone, Copy)]
pub struct Blake3Truncated<const N: usize>;

impl<const N: usize> Default for Blake3Truncated<N> {
    fn default() -> Self {
        Blake3Truncated
    }
}

impl<const N: usize> Hasher for Blake3Truncated<N> {
    fn digest_len(&self) -> usize {
        N
    }
    fn name(&self) -> &'static str {
        match N {
            4 => "blake3-4",
            8 => "blake3-8",
            _ => "blake3-n",
        }
    }
    fn hash(&self, data: &[u8]) -> Vec<u8> {
        blake3::hash(data).as_bytes()[..N].to_vec()
    }
}

pub type Blake3Four = Blake3Truncated<4>;
pub type Blake3Eight = Blake3Truncated<8>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_hasher_is_empty() {
        assert!(NullHasher.hash(b"anything").is_empty());
    }

    #[test]
    fn truncated_is_prefix_of_full() {
        let data = b"some block of bytes";
        let full = Blake3Full.hash(data);
        let truncated = Blake3Four::default().hash(data);
        assert_eq!(&full[..4], &truncated[..]);
    }

    #[test]
    fn digest_lengths_are_fixed() {
        assert_eq!(Blake3Full.digest_len(), 32);
        assert_eq!(Blake3Four::default().digest_len(), 4);
        assert_eq!(NullHasher.digest_len(), 0);
    }
}
