//! Generic block header shared by SRR and RAR 1.5-4.x blocks.
//!
//! ```text
//! u16 header_crc | u8 type | u16 flags | u16 head_size | [u32 add_size]
//! ```
//!
//! `add_size` is present when [`LONG_BLOCK`](super::flags::LONG_BLOCK) is
//! set, and always for packed-file and new-style subblock headers.

use super::{flags, BlockType, ByteCursor};
use crate::crc32::header_crc16;

/// Checksum values written by tools that never compute a real header CRC
/// (twice the block type).
const PLACEHOLDER_CRCS: [u16; 5] = [0x6969, 0x6A6A, 0x6B6B, 0x6C6C, 0x7171];

/// Ordered list of non-fatal anomalies found while reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warnings {
    messages: Vec<String>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.messages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub header_crc: u16,
    pub block_type: BlockType,
    pub flags: u16,
    pub head_size: u16,
    pub add_size: u32,
    pub start_offset: usize,
}

impl BlockHeader {
    pub const BASE_SIZE: usize = 7;

    /// Read the header at the cursor.
    ///
    /// On success the cursor sits right after the fixed (and, if present,
    /// extended) header fields. Returns `None` without moving the cursor
    /// when the data ends inside those fields.
    pub fn read(
        cursor: &mut ByteCursor<'_>,
        warnings: &mut Warnings,
        verify_crc: bool,
    ) -> Option<Self> {
        let start_offset = cursor.position();
        let header = Self::read_fields(cursor, warnings);
        let Some(header) = header else {
            cursor.seek(start_offset);
            return None;
        };

        if verify_crc && !header.crc_exempt() {
            let crc_data = cursor.slice_clamped(
                start_offset + 2,
                start_offset + usize::from(header.head_size).max(2),
            );
            if header_crc16(crc_data) != header.header_crc {
                warnings.push(format!(
                    "ERROR: Invalid block header CRC found: header is corrupt. ({}, {})",
                    header.block_type.name(),
                    start_offset
                ));
            }
        }

        Some(header)
    }

    /// Read a header at `offset` without validation or diagnostics.
    pub fn peek(data: &[u8], offset: usize) -> Option<Self> {
        let mut cursor = ByteCursor::new(data);
        cursor.seek(offset);
        Self::read_fields(&mut cursor, &mut Warnings::new())
    }

    fn read_fields(cursor: &mut ByteCursor<'_>, warnings: &mut Warnings) -> Option<Self> {
        let start_offset = cursor.position();
        let header_crc = cursor.read_u16_le()?;
        let block_type = BlockType::from(cursor.read_u8()?);
        let flags = cursor.read_u16_le()?;
        let head_size = cursor.read_u16_le()?;

        let has_long_flag = flags & flags::LONG_BLOCK != 0;
        let always_long = matches!(
            block_type,
            BlockType::RarPackedFile | BlockType::NewSubblock
        );
        let add_size = if has_long_flag || always_long {
            if !has_long_flag {
                warnings.push(format!(
                    "LONG_BLOCK flag (0x8000) not set for RAR {} block (0x{:02X}).",
                    block_type.name(),
                    block_type.code()
                ));
            }
            cursor.read_u32_le()?
        } else {
            0
        };

        Some(Self {
            header_crc,
            block_type,
            flags,
            head_size,
            add_size,
            start_offset,
        })
    }

    fn crc_exempt(&self) -> bool {
        self.block_type == BlockType::RarMarker || PLACEHOLDER_CRCS.contains(&self.header_crc)
    }

    pub fn has_flag(&self, mask: u16) -> bool {
        self.flags & mask != 0
    }

    /// Header plus payload size.
    pub fn full_size(&self) -> u64 {
        u64::from(self.head_size) + u64::from(self.add_size)
    }

    pub fn header_end(&self) -> usize {
        self.start_offset + usize::from(self.head_size)
    }

    pub fn block_end(&self) -> usize {
        self.header_end().saturating_add(self.add_size as usize)
    }

    /// Move the cursor to the end of the header; a payload may follow.
    pub fn skip_header(&self, cursor: &mut ByteCursor<'_>) {
        cursor.seek(self.header_end());
    }

    /// Move the cursor to the next block.
    pub fn skip_block(&self, cursor: &mut ByteCursor<'_>) {
        cursor.seek(self.block_end());
    }
}
