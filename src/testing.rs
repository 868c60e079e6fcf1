//! Builders for synthetic SRR images used across unit tests.

use crate::crc32::header_crc16;
use crate::parsing::{create_srr_header_block, create_stored_file_header, flags, OsoHashHeader};

/// A block with a 7 byte base header followed by `body`. The header CRC is
/// computed unless overridden.
pub fn block_with_crc(block_type: u8, block_flags: u16, body: &[u8], crc: Option<u16>) -> Vec<u8> {
    let head_size = (7 + body.len()) as u16;
    let mut fields = vec![block_type];
    fields.extend_from_slice(&block_flags.to_le_bytes());
    fields.extend_from_slice(&head_size.to_le_bytes());
    fields.extend_from_slice(body);

    let crc = crc.unwrap_or_else(|| header_crc16(&fields));
    let mut block = crc.to_le_bytes().to_vec();
    block.extend(fields);
    block
}

pub fn rar_end_block() -> Vec<u8> {
    block_with_crc(0x7B, 0x4000, &[], None)
}

pub fn rar_marker_block() -> Vec<u8> {
    vec![0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x00]
}

pub fn volume_header_block(volume_flags: u16) -> Vec<u8> {
    block_with_crc(0x73, volume_flags, &[0u8; 6], None)
}

/// SRR RAR marker (0x71) introducing the headers of one volume.
pub fn srr_rar_file_block(name: &str, marker_flags: u16) -> Vec<u8> {
    let mut body = (name.len() as u16).to_le_bytes().to_vec();
    body.extend_from_slice(name.as_bytes());
    block_with_crc(0x71, marker_flags, &body, Some(0x7171))
}

/// Old-style recovery record header without its payload.
pub fn old_recovery_block(payload_size: u32) -> Vec<u8> {
    let mut body = payload_size.to_le_bytes().to_vec();
    body.extend_from_slice(b"Protect!");
    block_with_crc(0x78, flags::LONG_BLOCK, &body, None)
}

/// Packed-file (or new-style subblock) header, header bytes only.
pub struct PackedFile {
    block_type: u8,
    name: Vec<u8>,
    unpacked_size: u64,
    packed_size: u64,
    crc: u32,
    method: u8,
    extra_flags: u16,
}

impl PackedFile {
    pub fn new(name: &str, unpacked_size: u64, packed_size: u64) -> Self {
        Self {
            block_type: 0x74,
            name: name.as_bytes().to_vec(),
            unpacked_size,
            packed_size,
            crc: 0,
            method: 0x30,
            extra_flags: 0,
        }
    }

    /// New-style subblock such as `RR` (recovery record) or `CMT`.
    pub fn subblock(name: &str, packed_size: u64) -> Self {
        Self {
            block_type: 0x7A,
            ..Self::new(name, packed_size, packed_size)
        }
    }

    pub fn crc(mut self, crc: u32) -> Self {
        self.crc = crc;
        self
    }

    pub fn method(mut self, method: u8) -> Self {
        self.method = method;
        self
    }

    pub fn flags(mut self, extra: u16) -> Self {
        self.extra_flags |= extra;
        self
    }

    /// Use `field` verbatim as the name and set `LHD_UNICODE`.
    pub fn raw_unicode_name(mut self, field: &[u8]) -> Self {
        self.name = field.to_vec();
        self.extra_flags |= flags::LHD_UNICODE;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let large = self.unpacked_size > u64::from(u32::MAX) || self.packed_size > u64::from(u32::MAX);
        let mut block_flags = flags::LONG_BLOCK | self.extra_flags;
        if large {
            block_flags |= flags::LHD_LARGE;
        }

        let mut body = Vec::new();
        body.extend_from_slice(&(self.packed_size as u32).to_le_bytes());
        body.extend_from_slice(&(self.unpacked_size as u32).to_le_bytes());
        body.push(2); // Win32
        body.extend_from_slice(&self.crc.to_le_bytes());
        body.extend_from_slice(&0x3AFB_6D6Fu32.to_le_bytes());
        body.push(29);
        body.push(self.method);
        body.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        body.extend_from_slice(&0x20u32.to_le_bytes());
        if large {
            body.extend_from_slice(&((self.packed_size >> 32) as u32).to_le_bytes());
            body.extend_from_slice(&((self.unpacked_size >> 32) as u32).to_le_bytes());
        }
        body.extend_from_slice(&self.name);
        block_with_crc(self.block_type, block_flags, &body, None)
    }
}

/// Whole SRR image assembled block by block.
#[derive(Default)]
pub struct SrrBuilder {
    bytes: Vec<u8>,
}

impl SrrBuilder {
    pub fn new(app_name: &str) -> Self {
        Self {
            bytes: create_srr_header_block(app_name),
        }
    }

    pub fn stored(mut self, name: &str, payload: &[u8]) -> Self {
        self.bytes
            .extend(create_stored_file_header(name, payload.len() as u32));
        self.bytes.extend_from_slice(payload);
        self
    }

    pub fn oso(mut self, name: &str, file_size: u64, hash: u64) -> Self {
        self.bytes
            .extend(OsoHashHeader::build_block(name, file_size, hash));
        self
    }

    /// One RAR volume: SRR marker, RAR marker, volume header, `blocks`, end.
    pub fn volume(self, name: &str, volume_flags: u16, blocks: &[Vec<u8>]) -> Self {
        self.volume_with_marker(name, 0, volume_flags, blocks)
    }

    pub fn volume_with_marker(
        mut self,
        name: &str,
        marker_flags: u16,
        volume_flags: u16,
        blocks: &[Vec<u8>],
    ) -> Self {
        self.bytes.extend(srr_rar_file_block(name, marker_flags));
        self.bytes.extend(rar_marker_block());
        self.bytes.extend(volume_header_block(volume_flags));
        for block in blocks {
            self.bytes.extend_from_slice(block);
        }
        self.bytes.extend(rar_end_block());
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// A three volume release with an SFV covering the volumes, an NFO and a
/// single stored 30 byte file spanning all volumes.
pub fn release_srr() -> Vec<u8> {
    let sfv = b"; generated\r\nrel.rar 1234abcd\r\nrel.r00 00000BAD\r\nrel.r01 CAFEBABE\r\n";
    let file = |crc| PackedFile::new("video.mkv", 30, 10).crc(crc).build();
    SrrBuilder::new("ReScene test")
        .stored("rel.sfv", sfv)
        .stored("rel.nfo", b"release notes\r\n")
        .volume("rel.rar", flags::MHD_VOLUME | flags::MHD_FIRSTVOLUME, &[file(0x1111_1111)])
        .volume("rel.r00", flags::MHD_VOLUME, &[file(0x2222_2222)])
        .volume("rel.r01", flags::MHD_VOLUME, &[file(0x3333_3333)])
        .build()
}
