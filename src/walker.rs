//! Block-by-block walk over an SRR image.
//!
//! The walker reads one block header at a time, dispatches on its type and
//! accumulates an [`Inventory`]. RAR headers copied into the SRR belong to
//! the volume opened by the most recent SRR RAR marker; their full sizes
//! (header plus the payload that was left out) add up to the size of the
//! original volume.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::checksum_list::ChecksumDirectory;
use crate::crc32::{crc32, crc32_hex};
use crate::error::{Result, SrrError};
use crate::inventory::{
    volume_key, ArchivedFile, Inventory, OsoHashEntry, RarVolume, RecoveryKind, RecoveryRecord,
    StoredFile, UNKNOWN_CRC,
};
use crate::parsing::file_header::METHOD_STORE;
use crate::parsing::srr_header::read_app_name;
use crate::parsing::{
    extension4, flags, BlockHeader, BlockType, ByteCursor, OsoHashHeader, PackedFileHeader,
    PackedFileHeaderParser, RarVolumeMarker, StoredFileHeader, Warnings,
};
use crate::volume_name::basename_volume;

/// Unpacked size written by RELOADED, HI2U and 0x0007 packers.
const SIZE_UNKNOWN_64: u64 = u64::MAX;
/// Unpacked size written by QCF; equal to -1 read as a 32-bit value.
const SIZE_UNKNOWN_32: u64 = 0xFFFF_FFFF;

/// Options for reading an SRR file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Recompute header CRCs and warn on mismatches.
    pub verify_header_crc: bool,
    /// Compute the CRC32 of every stored file.
    pub compute_stored_crc: bool,
    /// Also emit every warning through `tracing`.
    pub log_warnings: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            verify_header_crc: true,
            compute_stored_crc: true,
            log_warnings: false,
        }
    }
}

/// Walk `data` and build its inventory.
///
/// Fails only when a block of unknown type shows up outside of any RAR
/// volume: such data is not an SRR file. Everything else is reported as a
/// warning on the returned inventory.
pub fn parse(data: &[u8], options: &ParseOptions) -> Result<Inventory> {
    let mut walker = Walker::new(data, options);
    walker.run()?;
    Ok(walker.finish())
}

struct Walker<'a> {
    cursor: ByteCursor<'a>,
    options: &'a ParseOptions,
    warnings: Warnings,
    inventory: Inventory,
    checksums: ChecksumDirectory,
    volume_index: HashMap<String, usize>,
    archived_index: HashMap<String, usize>,
    current_volume: Option<usize>,
    recovery_removed: bool,
    custom_packer: bool,
}

impl<'a> Walker<'a> {
    fn new(data: &'a [u8], options: &'a ParseOptions) -> Self {
        Self {
            cursor: ByteCursor::new(data),
            options,
            warnings: Warnings::new(),
            inventory: Inventory {
                srr_size: data.len() as u64,
                ..Inventory::default()
            },
            checksums: ChecksumDirectory::new(),
            volume_index: HashMap::new(),
            archived_index: HashMap::new(),
            current_volume: None,
            recovery_removed: false,
            custom_packer: false,
        }
    }

    fn run(&mut self) -> Result<()> {
        while !self.cursor.is_at_end() {
            let start = self.cursor.position();
            let Some(block) =
                BlockHeader::read(&mut self.cursor, &mut self.warnings, self.options.verify_header_crc)
            else {
                self.warnings
                    .push(format!("Truncated block header at offset {start}."));
                break;
            };
            trace!(
                offset = start,
                block_type = block.block_type.name(),
                head_size = block.head_size,
                add_size = block.add_size,
                "block"
            );

            let counts_for_volume = self.dispatch(&block)?;

            if let Some(index) = self.current_volume {
                let volume = &mut self.inventory.volumes[index];
                if counts_for_volume {
                    volume.size += block.full_size();
                }
                volume.metadata_end = self.cursor.position();
            }

            if self.cursor.position() <= start {
                break;
            }
        }
        Ok(())
    }

    /// Handle one block. Returns whether its full size belongs to the
    /// current volume.
    fn dispatch(&mut self, block: &BlockHeader) -> Result<bool> {
        match block.block_type {
            BlockType::SrrHeader => {
                if self.inventory.app_name.is_some() {
                    self.warnings
                        .push("Application name found in the middle of the SRR.");
                }
                self.inventory.app_name = Some(read_app_name(&mut self.cursor, block));
            }
            BlockType::SrrOsoHash => {
                let oso = OsoHashHeader::read(&mut self.cursor, block);
                self.inventory
                    .oso_hashes
                    .push(OsoHashEntry::new(oso, block.start_offset));
                self.reset_volume_tracking();
            }
            BlockType::SrrRarPadding => {
                if let Some(index) = self.current_volume {
                    let volume = &mut self.inventory.volumes[index];
                    volume.size = volume.size.saturating_sub(u64::from(block.head_size));
                }
                block.skip_block(&mut self.cursor);
            }
            BlockType::SrrStoredFile => {
                self.stored_file(block);
                self.reset_volume_tracking();
            }
            BlockType::SrrRarFile => {
                self.reset_volume_tracking();
                self.rar_file_marker(block);
                return Ok(false);
            }
            BlockType::RarPackedFile => {
                match PackedFileHeaderParser::parse(&mut self.cursor, block) {
                    Some(header) => self.packed_file(&header),
                    None => block.skip_header(&mut self.cursor),
                }
            }
            BlockType::OldRecovery => {
                self.add_recovery(RecoveryKind::Legacy, block);
                if self.recovery_removed {
                    block.skip_header(&mut self.cursor);
                } else {
                    block.skip_block(&mut self.cursor);
                }
            }
            BlockType::NewSubblock => {
                let header = PackedFileHeaderParser::parse(&mut self.cursor, block);
                if header.is_some_and(|h| h.name == "RR") {
                    self.add_recovery(RecoveryKind::Modern, block);
                    if self.recovery_removed {
                        block.skip_header(&mut self.cursor);
                    } else {
                        block.skip_block(&mut self.cursor);
                    }
                } else {
                    block.skip_block(&mut self.cursor);
                }
            }
            BlockType::RarVolumeHeader => {
                self.volume_header(block);
                block.skip_block(&mut self.cursor);
            }
            BlockType::RarMarker
            | BlockType::ArchiveEnd
            | BlockType::OldComment
            | BlockType::OldAuthenticity
            | BlockType::OldSubblock
            | BlockType::OldAuthenticity2 => block.skip_block(&mut self.cursor),
            BlockType::Unknown(_) => {
                block.skip_block(&mut self.cursor);
                match self.current_volume_name() {
                    Some(name) if !name.is_empty() => {
                        let message = format!("Unknown RAR block found in {name}");
                        self.warnings.push(message);
                    }
                    _ => {
                        return Err(SrrError::NotSrr {
                            offset: block.start_offset as u64,
                        })
                    }
                }
            }
        }
        Ok(true)
    }

    /// Stored files and OSO hashes end the current volume.
    fn reset_volume_tracking(&mut self) {
        self.current_volume = None;
    }

    fn current_volume_name(&self) -> Option<&str> {
        self.current_volume
            .map(|index| self.inventory.volumes[index].name.as_str())
    }

    fn stored_file(&mut self, block: &BlockHeader) {
        let header = StoredFileHeader::read(&mut self.cursor, block, &mut self.warnings);
        let name = header.name;
        let size = u64::from(block.add_size);
        let payload = self.cursor.slice_clamped(
            header.payload_offset,
            header.payload_offset.saturating_add(block.add_size as usize),
        );

        if self.inventory.stored_file(&name).is_some() {
            self.warnings.push(format!("Duplicate file detected! {name}"));
        }
        if name.contains('\\') {
            self.warnings.push(format!("Backslash detected! {name}"));
        }
        if size == 0 && !name.contains('/') {
            self.warnings.push(format!("Empty file detected! {name}"));
        }

        let mut basename = None;
        if extension4(&name) == ".sfv" {
            self.checksums.merge(ChecksumDirectory::parse(payload));
            basename = Some(basename_volume(&name, false));
        }

        let crc = if self.options.compute_stored_crc {
            crc32_hex(crc32(payload))
        } else {
            String::new()
        };

        self.inventory.stored_files.push(StoredFile {
            name,
            block_offset: block.start_offset,
            payload_offset: header.payload_offset,
            size,
            crc,
            basename_volume: basename,
        });
        block.skip_block(&mut self.cursor);
    }

    fn rar_file_marker(&mut self, block: &BlockHeader) {
        let marker = RarVolumeMarker::read(&mut self.cursor, block, &mut self.warnings);
        self.recovery_removed = marker.recovery_removed;

        let key = volume_key(&marker.name);
        let index = match self.volume_index.get(&key) {
            Some(&index) => index,
            None => {
                self.inventory.volumes.push(RarVolume {
                    name: marker.name,
                    size: 0,
                    crc: UNKNOWN_CRC.to_string(),
                    metadata_start: block.start_offset,
                    metadata_rar_start: self.cursor.position(),
                    metadata_end: self.cursor.position(),
                    basename_volume: String::new(),
                });
                let index = self.inventory.volumes.len() - 1;
                self.volume_index.insert(key, index);
                index
            }
        };
        self.current_volume = Some(index);
    }

    fn packed_file(&mut self, header: &PackedFileHeader) {
        let declared = header.unpacked_size;
        let sentinel = declared == SIZE_UNKNOWN_64 || declared == SIZE_UNKNOWN_32;

        let index = match self.archived_index.get(&header.name) {
            Some(&index) => {
                let file = &mut self.inventory.archived_files[index];
                if file.declared_size != declared {
                    file.custom_packer = true;
                    self.custom_packer = true;
                }
                index
            }
            None => {
                if declared == SIZE_UNKNOWN_64 {
                    self.warnings
                        .push("RELOADED/HI2U/0x0007 custom RAR packer detected.");
                } else if declared == SIZE_UNKNOWN_32 {
                    self.warnings.push("Crappy QCF RAR packer detected.");
                }
                self.inventory.archived_files.push(ArchivedFile {
                    name: header.name.clone(),
                    timestamp: header.timestamp,
                    compression_method: header.method,
                    declared_size: declared,
                    size: if sentinel { 0 } else { declared },
                    crc: String::new(),
                    encrypted: false,
                    custom_packer: false,
                    size_trusted: declared != SIZE_UNKNOWN_64,
                });
                let index = self.inventory.archived_files.len() - 1;
                self.archived_index.insert(header.name.clone(), index);
                index
            }
        };

        let file = &mut self.inventory.archived_files[index];
        if file.compression_method != METHOD_STORE {
            self.inventory.compressed = true;
        }

        // Unknown sizes add up from the stored payloads. After a 64-bit
        // sentinel the first real size (the last volume) wins; QCF sums are
        // only replaced while still empty.
        let compressed = self.inventory.compressed;
        match declared {
            SIZE_UNKNOWN_64 => {
                if !file.size_trusted && !compressed {
                    file.size = file.size.saturating_add(header.packed_size);
                }
            }
            SIZE_UNKNOWN_32 => {
                if !compressed {
                    file.size = file.size.saturating_add(header.packed_size);
                }
                if file.size == 0 {
                    file.size = declared;
                }
            }
            _ => {
                if !file.size_trusted || file.size == 0 {
                    file.size = declared;
                    file.size_trusted = true;
                }
            }
        }

        file.crc = crc32_hex(header.file_crc);
        if header.is_encrypted {
            file.encrypted = true;
            self.inventory.encrypted = true;
        }
    }

    fn add_recovery(&mut self, kind: RecoveryKind, block: &BlockHeader) {
        let record = self.inventory.recovery.get_or_insert(RecoveryRecord {
            kind,
            total_size: 0,
        });
        record.total_size += u64::from(block.add_size);
    }

    fn volume_header(&mut self, block: &BlockHeader) {
        let Some(index) = self.current_volume else {
            return;
        };
        let volume = &mut self.inventory.volumes[index];

        let ext = extension4(&volume.name);
        if block.has_flag(flags::MHD_FIRSTVOLUME) && ext != ".rar" && ext != ".001" {
            self.warnings
                .push(format!("MHD_FIRSTVOLUME flag set for {}.", volume.name));
        }
        let new_numbering =
            block.has_flag(flags::MHD_NEWNUMBERING) && block.has_flag(flags::MHD_VOLUME);
        volume.basename_volume = basename_volume(&volume.name, new_numbering);

        if block.has_flag(flags::MHD_PASSWORD) {
            self.inventory.encrypted = true;
        }
    }

    fn finish(mut self) -> Inventory {
        let mut remaining = ChecksumDirectory {
            files: Default::default(),
            comments: std::mem::take(&mut self.checksums.comments),
        };
        for (name, crc) in std::mem::take(&mut self.checksums.files) {
            match self.volume_index.get(&name.to_lowercase()) {
                Some(&index) => self.inventory.volumes[index].crc = crc.to_uppercase(),
                None => {
                    remaining.files.insert(name, crc);
                }
            }
        }
        self.inventory.checksums = remaining;

        if self.custom_packer {
            self.warnings.push("Custom RAR packer detected.");
        }

        if self.options.log_warnings {
            for message in self.warnings.iter() {
                warn!("{message}");
            }
        }
        self.inventory.warnings = self.warnings.into_vec();

        debug!(
            srr_size = self.inventory.srr_size,
            stored_files = self.inventory.stored_files.len(),
            volumes = self.inventory.volumes.len(),
            archived_files = self.inventory.archived_files.len(),
            warnings = self.inventory.warnings.len(),
            "walked SRR"
        );
        self.inventory
    }
}
