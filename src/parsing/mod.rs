//! SRR and RAR 1.5-4.x block parsing.
//!
//! An SRR file is a flat sequence of blocks sharing the RAR 1.5 block header
//! layout. SRR-specific block types (0x69-0x71) wrap the plain RAR headers
//! (0x72-0x7B) that were copied from each volume with their payload removed.

mod cursor;

pub mod block;
pub mod file_header;
pub mod srr_header;
pub mod unicode_name;

pub use block::{BlockHeader, Warnings};
pub use cursor::ByteCursor;
pub use file_header::{PackedFileHeader, PackedFileHeaderParser};
pub use srr_header::{
    create_srr_header_block, create_stored_file_header, OsoHashHeader, RarVolumeMarker,
    StoredFileHeader,
};
pub use unicode_name::decode_unicode_name;

/// Block type codes the walker dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// SRR header with the creating application name.
    SrrHeader,
    /// SRR stored file (payload follows the header).
    SrrStoredFile,
    /// SRR OpenSubtitles.org hash entry.
    SrrOsoHash,
    /// SRR padding inside a RAR volume.
    SrrRarPadding,
    /// SRR marker: the RAR headers of a new volume follow.
    SrrRarFile,
    RarMarker,
    RarVolumeHeader,
    RarPackedFile,
    OldComment,
    OldAuthenticity,
    OldSubblock,
    OldRecovery,
    OldAuthenticity2,
    NewSubblock,
    ArchiveEnd,
    Unknown(u8),
}

impl BlockType {
    pub fn code(self) -> u8 {
        match self {
            Self::SrrHeader => 0x69,
            Self::SrrStoredFile => 0x6A,
            Self::SrrOsoHash => 0x6B,
            Self::SrrRarPadding => 0x6C,
            Self::SrrRarFile => 0x71,
            Self::RarMarker => 0x72,
            Self::RarVolumeHeader => 0x73,
            Self::RarPackedFile => 0x74,
            Self::OldComment => 0x75,
            Self::OldAuthenticity => 0x76,
            Self::OldSubblock => 0x77,
            Self::OldRecovery => 0x78,
            Self::OldAuthenticity2 => 0x79,
            Self::NewSubblock => 0x7A,
            Self::ArchiveEnd => 0x7B,
            Self::Unknown(code) => code,
        }
    }

    /// Human readable name used in warnings.
    pub fn name(self) -> &'static str {
        match self {
            Self::SrrHeader => "SRR VolumeHeader",
            Self::SrrStoredFile => "SRR Stored File",
            Self::SrrOsoHash => "SRR OSO Hash",
            Self::SrrRarPadding => "SRR RAR Padding",
            Self::SrrRarFile => "SRR RAR subblock",
            Self::RarMarker => "RAR Marker",
            Self::RarVolumeHeader => "Archive Header",
            Self::RarPackedFile => "File",
            Self::OldComment => "Old style - Comment",
            Self::OldAuthenticity => "Old style - Extra info (authenticity information)",
            Self::OldSubblock => "Old style - Subblock",
            Self::OldRecovery => "Old style - Recovery record",
            Self::OldAuthenticity2 => "Old style - Archive authenticity",
            Self::NewSubblock => "New-format subblock",
            Self::ArchiveEnd => "Archive end",
            Self::Unknown(_) => "Unknown block",
        }
    }
}

impl From<u8> for BlockType {
    fn from(code: u8) -> Self {
        match code {
            0x69 => Self::SrrHeader,
            0x6A => Self::SrrStoredFile,
            0x6B => Self::SrrOsoHash,
            0x6C => Self::SrrRarPadding,
            0x71 => Self::SrrRarFile,
            0x72 => Self::RarMarker,
            0x73 => Self::RarVolumeHeader,
            0x74 => Self::RarPackedFile,
            0x75 => Self::OldComment,
            0x76 => Self::OldAuthenticity,
            0x77 => Self::OldSubblock,
            0x78 => Self::OldRecovery,
            0x79 => Self::OldAuthenticity2,
            0x7A => Self::NewSubblock,
            0x7B => Self::ArchiveEnd,
            other => Self::Unknown(other),
        }
    }
}

/// Header flag bits. Meaning depends on the block type.
pub mod flags {
    /// Any block: a 32-bit ADD_SIZE field follows the 7 byte header.
    pub const LONG_BLOCK: u16 = 0x8000;

    /// SRR header: the application name field is present.
    pub const SRR_APP_NAME: u16 = 0x0001;
    /// SRR RAR marker: recovery record payloads were stripped.
    pub const SRR_RECOVERY_REMOVED: u16 = 0x0001;

    /// RAR archive header (MHD_*).
    pub const MHD_VOLUME: u16 = 0x0001;
    pub const MHD_NEWNUMBERING: u16 = 0x0010;
    pub const MHD_PASSWORD: u16 = 0x0080;
    pub const MHD_FIRSTVOLUME: u16 = 0x0100;

    /// RAR file header (LHD_*).
    pub const LHD_SPLIT_BEFORE: u16 = 0x0001;
    pub const LHD_SPLIT_AFTER: u16 = 0x0002;
    pub const LHD_PASSWORD: u16 = 0x0004;
    pub const LHD_LARGE: u16 = 0x0100;
    pub const LHD_UNICODE: u16 = 0x0200;
}

/// Final path component, for either separator.
pub(crate) fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Last four characters lower-cased, e.g. `".sfv"`.
pub(crate) fn extension4(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    let start = lower
        .char_indices()
        .rev()
        .nth(3)
        .map(|(i, _)| i)
        .unwrap_or(0);
    lower[start..].to_string()
}
