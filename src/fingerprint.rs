//! Content hash of the RAR metadata in an SRR.
//!
//! Volumes are sorted by lower-case file name before hashing, so two SRRs
//! describing the same RAR set hash equally whatever order their volumes
//! were stored in and whatever stored files they carry.

use std::fmt;
use std::str::FromStr;

use sha1::{Digest, Sha1};
use sha2::Sha256;
use thiserror::Error;

use crate::inventory::RarVolume;

/// Digest used for [`content_hash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported hash algorithm: {0}")]
pub struct UnknownHashAlgorithm(pub String);

impl FromStr for HashAlgorithm {
    type Err = UnknownHashAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(UnknownHashAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "sha1"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// RAR header bytes of one volume, clamped to `data`.
pub(crate) fn metadata_bytes<'a>(data: &'a [u8], volume: &RarVolume) -> &'a [u8] {
    let end = volume.metadata_end.min(data.len());
    let start = volume.metadata_rar_start.min(end);
    &data[start..end]
}

/// Lower-case hex digest over the RAR headers of all volumes.
pub fn content_hash(data: &[u8], volumes: &[RarVolume], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha1 => digest_volumes::<Sha1>(data, volumes),
        HashAlgorithm::Sha256 => digest_volumes::<Sha256>(data, volumes),
    }
}

fn digest_volumes<D: Digest>(data: &[u8], volumes: &[RarVolume]) -> String {
    let mut sorted: Vec<&RarVolume> = volumes.iter().collect();
    sorted.sort_by_cached_key(|volume| (volume.key(), volume.name.clone()));

    let mut hasher = D::new();
    for volume in sorted {
        hasher.update(metadata_bytes(data, volume));
    }
    hex::encode(hasher.finalize())
}

/// SHA-1 of each volume's RAR headers, as `(hash, volume name)` in
/// discovery order.
pub fn volume_hashes(data: &[u8], volumes: &[RarVolume]) -> Vec<(String, String)> {
    volumes
        .iter()
        .map(|volume| {
            let hash = hex::encode(Sha1::digest(metadata_bytes(data, volume)));
            (hash, volume.name.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{release_srr, PackedFile, SrrBuilder};
    use crate::walker::{parse, ParseOptions};

    fn hash(data: &[u8], algorithm: HashAlgorithm) -> String {
        let inventory = parse(data, &ParseOptions::default()).unwrap();
        content_hash(data, &inventory.volumes, algorithm)
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("SHA1".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha1));
        assert_eq!("sha-256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha256));
        assert!("md5".parse::<HashAlgorithm>().is_err());
        assert_eq!(HashAlgorithm::default().to_string(), "sha1");
    }

    #[test]
    fn test_empty_set_hashes_empty_input() {
        let data = SrrBuilder::new("x").build();
        assert_eq!(
            hash(&data, HashAlgorithm::Sha1),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(
            hash(&data, HashAlgorithm::Sha256),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_ignores_stored_files() {
        let with_files = release_srr();
        let inventory = parse(&with_files, &ParseOptions::default()).unwrap();
        let stripped = crate::mutation::delete(&with_files, &inventory, "rel.nfo").unwrap();

        assert_eq!(
            hash(&with_files, HashAlgorithm::Sha1),
            hash(&stripped, HashAlgorithm::Sha1)
        );
    }

    #[test]
    fn test_hash_ignores_volume_order() {
        let a = |crc| vec![PackedFile::new("f.bin", 8, 4).crc(crc).build()];
        let forward = SrrBuilder::new("x")
            .volume("set.rar", 0, &a(1))
            .volume("set.r00", 0, &a(2))
            .build();
        let backward = SrrBuilder::new("other app")
            .volume("SET.R00", 0, &a(2))
            .volume("set.rar", 0, &a(1))
            .build();

        assert_eq!(
            hash(&forward, HashAlgorithm::Sha256),
            hash(&backward, HashAlgorithm::Sha256)
        );
    }

    #[test]
    fn test_volume_hashes() {
        let data = release_srr();
        let inventory = parse(&data, &ParseOptions::default()).unwrap();
        let hashes = volume_hashes(&data, &inventory.volumes);

        assert_eq!(hashes.len(), 3);
        assert_eq!(hashes[0].1, "rel.rar");
        // different CRCs in the packed-file headers
        assert_ne!(hashes[0].0, hashes[1].0);
        assert_eq!(hashes[0].0.len(), 40);
    }
}
