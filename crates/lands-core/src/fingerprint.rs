//! Content fingerprinting for diagnostics
//!
//! The manifest hash is owned by the remote authority and only ever compared.
//! A local fingerprint is computed solely to describe what was loaded.

use crate::region::Region;

/// Pluggable fingerprint over a region set
pub trait Fingerprint: Send + Sync {
    fn fingerprint(&self, regions: &[Region]) -> String;
}

/// BLAKE3 over a length-delimited encoding of every region field
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Fingerprint;

impl Fingerprint for Blake3Fingerprint {
    fn fingerprint(&self, regions: &[Region]) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(regions.len() as u64).to_le_bytes());

        for region in regions {
            for field in [
                &region.id,
                &region.name,
                &region.description,
                &region.owner,
                &region.contact,
                &region.world,
            ] {
                hasher.update(&(field.len() as u64).to_le_bytes());
                hasher.update(field.as_bytes());
            }
            hasher.update(&(region.chunks.len() as u64).to_le_bytes());
            for key in &region.chunks {
                hasher.update(&key.raw().to_le_bytes());
            }
        }

        hex::encode(hasher.finalize().as_bytes())
    }
}

impl<F> Fingerprint for F
where
    F: Fn(&[Region]) -> String + Send + Sync,
{
    fn fingerprint(&self, regions: &[Region]) -> String {
        self(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_is_stable_and_sensitive() {
        let a = vec![Region::new("a", "A", "o", "w").with_tiles([(0, 0)])];
        let mut b = a.clone();
        b[0].name = "B".to_string();

        let fp = Blake3Fingerprint;
        assert_eq!(fp.fingerprint(&a), fp.fingerprint(&a.clone()));
        assert_ne!(fp.fingerprint(&a), fp.fingerprint(&b));
        assert_eq!(fp.fingerprint(&a).len(), 64);
    }

    #[test]
    fn test_field_boundaries_matter() {
        let fp = Blake3Fingerprint;
        let a = vec![Region::new("ab", "c", "o", "w")];
        let b = vec![Region::new("a", "bc", "o", "w")];
        assert_ne!(fp.fingerprint(&a), fp.fingerprint(&b));
    }

    #[test]
    fn test_closure_fingerprint() {
        let count = |regions: &[Region]| regions.len().to_string();
        assert_eq!(count.fingerprint(&[]), "0");
    }
}
