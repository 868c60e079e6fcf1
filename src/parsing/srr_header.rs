//! Bodies of the SRR-specific blocks, and builders for the ones we write.
//!
//! All SRR blocks store `0xTTTT` (twice the type) as their header CRC, so
//! the builders never compute a checksum.

use super::{flags, BlockHeader, ByteCursor, Warnings};

/// Application name field of the SRR header block. Empty when the block
/// does not carry one.
pub fn read_app_name(cursor: &mut ByteCursor<'_>, block: &BlockHeader) -> String {
    let name = if block.has_flag(flags::SRR_APP_NAME) {
        cursor.read_name().unwrap_or_default()
    } else {
        String::new()
    };
    block.skip_header(cursor);
    name
}

/// SRR stored file block: path name, then the payload of `add_size` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFileHeader {
    pub name: String,
    /// Where the payload begins: the end of the header as declared by its
    /// size field, which is right after the name in well-formed files.
    pub payload_offset: usize,
}

impl StoredFileHeader {
    /// Fixed part of the header: generic fields, ADD_SIZE and name length.
    pub const FIXED_SIZE: usize = 13;

    pub fn read(
        cursor: &mut ByteCursor<'_>,
        block: &BlockHeader,
        warnings: &mut Warnings,
    ) -> Self {
        let name = match cursor.read_u16_le() {
            Some(0) | None => {
                warnings.push("Stored file with no name detected!");
                String::new()
            }
            Some(len) => cursor
                .read_bytes(usize::from(len))
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default(),
        };
        Self {
            name,
            payload_offset: block.header_end(),
        }
    }
}

/// SRR RAR marker block: the RAR headers of one volume follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarVolumeMarker {
    pub name: String,
    /// The recovery record payloads of this volume were not kept.
    pub recovery_removed: bool,
}

impl RarVolumeMarker {
    pub fn read(
        cursor: &mut ByteCursor<'_>,
        block: &BlockHeader,
        warnings: &mut Warnings,
    ) -> Self {
        let name = match cursor.read_u16_le() {
            Some(0) | None => {
                warnings.push("RAR file with no name detected!");
                String::new()
            }
            Some(len) => cursor
                .read_bytes(usize::from(len))
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default(),
        };
        block.skip_header(cursor);
        Self {
            name,
            recovery_removed: block.has_flag(flags::SRR_RECOVERY_REMOVED),
        }
    }
}

/// SRR OSO hash block: size, OpenSubtitles.org hash and name of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsoHashHeader {
    pub file_size: u64,
    pub hash: u64,
    pub name: String,
    /// The complete block, byte for byte.
    pub raw: Vec<u8>,
}

impl OsoHashHeader {
    pub fn read(cursor: &mut ByteCursor<'_>, block: &BlockHeader) -> Self {
        let file_size = cursor.read_u64_le().unwrap_or(0);
        let hash = cursor.read_u64_le().unwrap_or(0);
        let name = cursor.read_name().unwrap_or_default();
        let raw = cursor
            .slice_clamped(block.start_offset, block.header_end())
            .to_vec();
        block.skip_header(cursor);
        Self {
            file_size,
            hash,
            name,
            raw,
        }
    }

    /// Build a complete OSO hash block.
    pub fn build_block(name: &str, file_size: u64, hash: u64) -> Vec<u8> {
        let head_size = 5 + 2 + 8 + 8 + 2 + name.len();
        let mut block = Vec::with_capacity(head_size);
        block.extend_from_slice(&[0x6B, 0x6B, 0x6B, 0x00, 0x00]);
        block.extend_from_slice(&(head_size as u16).to_le_bytes());
        block.extend_from_slice(&file_size.to_le_bytes());
        block.extend_from_slice(&hash.to_le_bytes());
        block.extend_from_slice(&(name.len() as u16).to_le_bytes());
        block.extend_from_slice(name.as_bytes());
        block
    }
}

/// Build an SRR header block naming the creating application.
pub fn create_srr_header_block(app_name: &str) -> Vec<u8> {
    let mut block = Vec::with_capacity(9 + app_name.len());
    block.extend_from_slice(&[0x69, 0x69, 0x69]);
    block.extend_from_slice(&flags::SRR_APP_NAME.to_le_bytes());
    block.extend_from_slice(&((7 + 2 + app_name.len()) as u16).to_le_bytes());
    block.extend_from_slice(&(app_name.len() as u16).to_le_bytes());
    block.extend_from_slice(app_name.as_bytes());
    block
}

/// Build the header of a stored file block; the payload must follow it.
pub fn create_stored_file_header(name: &str, payload_size: u32) -> Vec<u8> {
    let head_size = StoredFileHeader::FIXED_SIZE + name.len();
    let mut header = Vec::with_capacity(head_size);
    header.extend_from_slice(&[0x6A, 0x6A, 0x6A]);
    header.extend_from_slice(&flags::LONG_BLOCK.to_le_bytes());
    header.extend_from_slice(&(head_size as u16).to_le_bytes());
    header.extend_from_slice(&payload_size.to_le_bytes());
    header.extend_from_slice(&(name.len() as u16).to_le_bytes());
    header.extend_from_slice(name.as_bytes());
    header
}
