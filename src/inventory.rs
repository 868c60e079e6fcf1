//! Result of walking an SRR file.
//!
//! An [`Inventory`] is rebuilt from the bytes on every read and never
//! edited in place; mutations rewrite the file and walk it again.

use crate::checksum_list::ChecksumDirectory;
use crate::formats::DosDateTime;
use crate::parsing::{basename, OsoHashHeader};

/// CRC of a volume that no checksum list mentions.
pub const UNKNOWN_CRC: &str = "UNKNOWN!";

/// File embedded in the SRR (NFO, SFV, SRS sample data, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Path with forward slashes.
    pub name: String,
    /// Start of the stored file block.
    pub block_offset: usize,
    pub payload_offset: usize,
    pub size: u64,
    /// Upper-case hex CRC32 of the payload; empty when not computed.
    pub crc: String,
    /// Volume set an SFV belongs to; `None` for other files.
    pub basename_volume: Option<String>,
}

impl StoredFile {
    /// End of the payload, which is also the end of the block.
    pub fn payload_end(&self) -> usize {
        self.payload_offset.saturating_add(self.size as usize)
    }
}

/// One RAR volume described by the SRR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarVolume {
    /// Name as stored, possibly with a path.
    pub name: String,
    /// Reconstructed size of the original volume.
    pub size: u64,
    /// CRC from a stored SFV, or [`UNKNOWN_CRC`].
    pub crc: String,
    /// Offset of the SRR block introducing the volume.
    pub metadata_start: usize,
    /// Offset of the first copied RAR header.
    pub metadata_rar_start: usize,
    /// End of the last block belonging to the volume.
    pub metadata_end: usize,
    pub basename_volume: String,
}

impl RarVolume {
    /// Lookup key: lower-case name without the path.
    pub fn key(&self) -> String {
        volume_key(&self.name)
    }
}

pub(crate) fn volume_key(name: &str) -> String {
    basename(name).to_lowercase()
}

/// A file packed inside the RAR set, possibly spanning several volumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedFile {
    pub name: String,
    pub timestamp: DosDateTime,
    pub compression_method: u8,
    /// Unpacked size as declared by the first header seen.
    pub declared_size: u64,
    /// Best known unpacked size after reconciling all headers.
    pub size: u64,
    /// Upper-case hex CRC32 from the last header seen.
    pub crc: String,
    pub encrypted: bool,
    /// Headers of this file disagree about its size.
    pub custom_packer: bool,
    /// A later real-size header no longer replaces `size`.
    pub(crate) size_trusted: bool,
}

/// Kind of recovery record, named the way RAR names it on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryKind {
    /// Old style `0x78` blocks.
    Legacy,
    /// `RR` new-style subblocks.
    Modern,
}

impl RecoveryKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Legacy => "Protect!",
            Self::Modern => "Protect+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryRecord {
    pub kind: RecoveryKind,
    /// Sum of the payload sizes of every recovery block.
    pub total_size: u64,
}

/// OpenSubtitles.org hash entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsoHashEntry {
    pub block_offset: usize,
    pub name: String,
    pub file_size: u64,
    pub hash: u64,
    /// The block as found in the file.
    pub raw: Vec<u8>,
}

impl OsoHashEntry {
    pub(crate) fn new(header: OsoHashHeader, block_offset: usize) -> Self {
        Self {
            block_offset,
            name: header.name,
            file_size: header.file_size,
            hash: header.hash,
            raw: header.raw,
        }
    }

    /// Raw block bytes for [`SrrFile::add_oso_hash`](crate::SrrFile::add_oso_hash).
    pub fn build_block(name: &str, file_size: u64, hash: u64) -> Vec<u8> {
        OsoHashHeader::build_block(name, file_size, hash)
    }

    /// Hash as the 16 digit hex string OpenSubtitles.org shows.
    pub fn hash_hex(&self) -> String {
        format!("{:016x}", self.hash)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub srr_size: u64,
    /// Creating application; `None` without an SRR header block.
    pub app_name: Option<String>,
    /// Stored files in file order. Duplicate names are kept.
    pub stored_files: Vec<StoredFile>,
    /// Volumes in discovery order.
    pub volumes: Vec<RarVolume>,
    pub archived_files: Vec<ArchivedFile>,
    pub oso_hashes: Vec<OsoHashEntry>,
    pub recovery: Option<RecoveryRecord>,
    /// SFV entries that did not match any volume (subtitles, samples).
    pub checksums: ChecksumDirectory,
    pub warnings: Vec<String>,
    /// At least one archived file is not stored.
    pub compressed: bool,
    /// Archived files or headers are password protected.
    pub encrypted: bool,
}

impl Inventory {
    /// First stored file with exactly this name.
    pub fn stored_file(&self, name: &str) -> Option<&StoredFile> {
        self.stored_files.iter().find(|file| file.name == name)
    }

    pub fn stored_file_names(&self) -> impl Iterator<Item = &str> {
        self.stored_files.iter().map(|file| file.name.as_str())
    }

    pub fn has_duplicate_stored_files(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        !self.stored_files.iter().all(|file| seen.insert(&file.name))
    }

    /// Volume by name, ignoring case and path.
    pub fn volume(&self, name: &str) -> Option<&RarVolume> {
        let key = volume_key(name);
        self.volumes.iter().find(|volume| volume.key() == key)
    }

    pub fn archived_file(&self, name: &str) -> Option<&ArchivedFile> {
        self.archived_files.iter().find(|file| file.name == name)
    }

    /// Size of all volumes together.
    pub fn total_volume_size(&self) -> u64 {
        self.volumes.iter().map(|volume| volume.size).sum()
    }
}
