//! Reader and editor for SRR files.
//!
//! An SRR file keeps the RAR headers of a release with the packed data left
//! out, next to small stored files such as NFOs, SFVs and sample
//! verification (SRS) files. This crate walks SRR files into an
//! [`Inventory`], edits their stored files in place, hashes the RAR metadata
//! and compares two SRR files.
//!
//! Supports the RAR 1.5-4.x block layout that SRR files are built on.
//!
//! ## Features
//! - Best-effort walking: anomalies become warnings, not errors
//! - Stored file insert, delete, rename and reorder with atomic rewrites
//! - Advisory file locking for concurrent readers and writers
//! - Pluggable sample readers for comparing SRS files
//!
//! ```rust,ignore
//! use srr_stream::{HashAlgorithm, SrrFile};
//!
//! let srr = SrrFile::new("release.srr");
//! for file in &srr.inventory()?.stored_files {
//!     println!("{} ({} bytes)", file.name, file.size);
//! }
//! println!("{}", srr.hash(HashAlgorithm::Sha1)?);
//! ```

mod checksum_list;
mod compare;
mod crc32;
pub mod error;
mod file_media;
mod fingerprint;
pub mod formats;
mod inventory;
mod mutation;
pub mod parsing;
pub mod sample;
mod srr_file;
mod volume_name;
mod walker;

#[cfg(test)]
mod testing;

pub use checksum_list::ChecksumDirectory;
pub use compare::{
    compare as compare_images, ComparisonResult, FileKind, MatchedPair, RarComparison,
    RarDifferences, Side, SrrImage,
};
pub use error::{Result, SrrError};
pub use fingerprint::{content_hash, volume_hashes, HashAlgorithm, UnknownHashAlgorithm};
pub use inventory::{
    ArchivedFile, Inventory, OsoHashEntry, RarVolume, RecoveryKind, RecoveryRecord, StoredFile,
    UNKNOWN_CRC,
};
pub use mutation::{
    add_oso_hash, delete, extract, insert, remove_oso_hash, rename, reorder, split_volume_set,
};
pub use parsing::{create_srr_header_block, create_stored_file_header};
pub use sample::{MarkerSampleReader, SampleInfo, SampleReader};
pub use srr_file::{compare, compare_with, SrrFile};
pub use volume_name::{basename_volume, check_file_name};
pub use walker::{parse, ParseOptions};
