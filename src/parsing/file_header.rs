//! Packed-file header parser.
//!
//! Each file in a RAR volume has a file header describing the file's name,
//! size, compression method, etc. New-style subblocks (recovery record,
//! authenticity, comments) reuse the same layout with the subblock kind in
//! the name field.

use super::{flags, unicode_name::decode_unicode_name, BlockHeader, ByteCursor};
use crate::formats::DosDateTime;

/// Compression method byte meaning "stored" (no compression).
pub const METHOD_STORE: u8 = 0x30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFileHeader {
    /// Payload size in this volume (the block's ADD_SIZE plus high part).
    pub packed_size: u64,
    /// Declared unpacked size, 64-bit when `LHD_LARGE` is set.
    pub unpacked_size: u64,
    pub host_os: u8,
    pub file_crc: u32,
    pub timestamp: DosDateTime,
    pub version: u8,
    pub method: u8,
    pub name_size: u16,
    pub attributes: u32,
    pub name: String,
    /// Split flags: the file started in an earlier volume / goes on in the next.
    pub continues_from_previous: bool,
    pub continues_in_next: bool,
    pub is_encrypted: bool,
    pub has_high_size: bool,
    pub has_unicode_name: bool,
}

pub struct PackedFileHeaderParser;

impl PackedFileHeaderParser {
    /// Parse the body of a file or new-style subblock header.
    ///
    /// The cursor must sit right after the generic header fields. On return it
    /// points at the end of the header (salt and extended time are skipped).
    pub fn parse(cursor: &mut ByteCursor<'_>, block: &BlockHeader) -> Option<PackedFileHeader> {
        let low_unpacked = cursor.read_u32_le()?;
        let host_os = cursor.read_u8()?;
        let file_crc = cursor.read_u32_le()?;
        let timestamp = DosDateTime::from_dos(cursor.read_u32_le()?);
        let version = cursor.read_u8()?;
        let method = cursor.read_u8()?;
        let name_size = cursor.read_u16_le()?;
        let attributes = cursor.read_u32_le()?;

        let has_high_size = block.has_flag(flags::LHD_LARGE);
        let has_unicode_name = block.has_flag(flags::LHD_UNICODE);

        let mut packed_size = u64::from(block.add_size);
        let mut unpacked_size = u64::from(low_unpacked);
        if has_high_size {
            let high_packed = cursor.read_u32_le()?;
            let high_unpacked = cursor.read_u32_le()?;
            packed_size |= u64::from(high_packed) << 32;
            unpacked_size |= u64::from(high_unpacked) << 32;
        }

        let name_field = cursor.read_bytes(usize::from(name_size))?;
        let name = if has_unicode_name {
            decode_unicode_name(name_field)
        } else {
            String::from_utf8_lossy(name_field).into_owned()
        };

        block.skip_header(cursor);

        Some(PackedFileHeader {
            packed_size,
            unpacked_size,
            host_os,
            file_crc,
            timestamp,
            version,
            method,
            name_size,
            attributes,
            name,
            continues_from_previous: block.has_flag(flags::LHD_SPLIT_BEFORE),
            continues_in_next: block.has_flag(flags::LHD_SPLIT_AFTER),
            is_encrypted: block.has_flag(flags::LHD_PASSWORD),
            has_high_size,
            has_unicode_name,
        })
    }
}
