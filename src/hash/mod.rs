//! Content-hash methods and the Tiger-Tree engine.
//!
//! ADC negotiates the content-hash method as a protocol feature; the
//! registry here maps feature names to digest implementations. `TIGR` is
//! the canonical entry. The `tiger` crate already emits digests in the
//! DC network convention (little-endian within each 8-byte word), so its
//! output is used as-is.

pub mod merkle;
pub mod tth;

use std::fmt;

use digest::Digest;
use tiger::Tiger;

use adc_types::core::FeatureName;

/// A negotiable content-hash method.
pub struct HashMethod {
    /// The feature name announced in `SUP`, e.g. `TIGR`.
    pub name: FeatureName,
    /// Digest size in bytes.
    pub size: usize,
    digest: fn(&[&[u8]]) -> Vec<u8>,
}

impl HashMethod {
    /// Digests the concatenation of `chunks`.
    pub fn digest(&self, chunks: &[&[u8]]) -> Vec<u8> {
        (self.digest)(chunks)
    }
}

impl fmt::Debug for HashMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HashMethod")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish()
    }
}

fn tiger_digest(chunks: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Tiger::new();

    for chunk in chunks {
        hasher.update(chunk);
    }

    hasher.finalize().to_vec()
}

/// The Tiger hash, 24-byte digests.
pub static TIGER: HashMethod = HashMethod {
    name: FeatureName::from_static(b"TIGR"),
    size: 24,
    digest: tiger_digest,
};

static REGISTRY: &[&HashMethod] = &[&TIGER];

/// Looks a hash method up by its feature name.
pub fn lookup(name: FeatureName) -> Option<&'static HashMethod> {
    REGISTRY.iter().find(|method| method.name == name).copied()
}

/// Every registered hash method, in announcement order.
pub fn methods() -> impl Iterator<Item = &'static HashMethod> {
    REGISTRY.iter().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        let method = lookup(FeatureName::from_static(b"TIGR")).unwrap();

        assert_eq!("TIGR", method.name.as_str());
        assert_eq!(24, method.size);
        assert!(lookup(FeatureName::from_static(b"SHA2")).is_none());
    }

    #[test]
    fn test_tiger_test_vectors() {
        // Reference vectors from the Tiger homepage, byte-string form.
        let tests: &[(&[u8], &str)] = &[
            (
                b"",
                "3293ac630c13f0245f92bbb1766e16167a4e58492dde73f3",
            ),
            (
                b"abc",
                "2aab1484e8c158f2bfb8c5ff41b57a525129131c957b5f93",
            ),
            (
                b"Tiger",
                "dd00230799f5009fec6debc838bb6a27df2b9d6f110c7937",
            ),
        ];

        for (input, expected) in tests {
            let got = TIGER.digest(&[input]);
            let hex: String = got.iter().map(|byte| format!("{byte:02x}")).collect();

            assert_eq!(*expected, hex);
        }
    }

    #[test]
    fn test_multi_chunk_digest_matches_concatenation() {
        assert_eq!(TIGER.digest(&[b"Ti", b"ger"]), TIGER.digest(&[b"Tiger"]));
    }
}
