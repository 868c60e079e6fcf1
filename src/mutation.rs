//! Byte-exact edits of an SRR image.
//!
//! Every function takes the current bytes plus their freshly walked
//! inventory and returns the complete new image. Nothing outside the
//! touched block ranges changes.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Result, SrrError};
use crate::inventory::{Inventory, StoredFile};
use crate::parsing::{
    create_srr_header_block, create_stored_file_header, BlockHeader, BlockType, ByteCursor,
    OsoHashHeader, Warnings,
};
use crate::volume_name::check_file_name;

/// Where new stored files go: right after the SRR header block.
fn insert_offset(data: &[u8]) -> Result<usize> {
    match BlockHeader::peek(data, 0) {
        Some(block) if block.block_type == BlockType::SrrHeader => {
            Ok(block.block_end().min(data.len()))
        }
        _ => Err(SrrError::MissingSrrHeader),
    }
}

/// Validate a new stored file name against the inventory.
fn check_new_name(inventory: &Inventory, name: &str) -> Result<()> {
    if !check_file_name(name) || name.len() > usize::from(u16::MAX) {
        return Err(SrrError::IllegalName(name.to_string()));
    }
    if inventory.stored_file(name).is_some() {
        return Err(SrrError::NameExists(name.to_string()));
    }
    Ok(())
}

fn find_stored<'a>(inventory: &'a Inventory, name: &str) -> Result<&'a StoredFile> {
    inventory
        .stored_file(name)
        .ok_or_else(|| SrrError::NameNotFound(name.to_string()))
}

fn stored_block(data: &[u8], file: &StoredFile) -> Result<BlockHeader> {
    BlockHeader::peek(data, file.block_offset)
        .ok_or_else(|| SrrError::NameNotFound(file.name.clone()))
}

/// Payload of the first stored file called `name`.
pub fn extract(data: &[u8], inventory: &Inventory, name: &str) -> Result<Vec<u8>> {
    let file = find_stored(inventory, name)?;
    let end = file.payload_end().min(data.len());
    let start = file.payload_offset.min(end);
    Ok(data[start..end].to_vec())
}

/// Add a stored file directly after the SRR header block.
pub fn insert(data: &[u8], inventory: &Inventory, name: &str, payload: &[u8]) -> Result<Vec<u8>> {
    check_new_name(inventory, name)?;
    let size = u32::try_from(payload.len()).map_err(|_| SrrError::SizeMismatch {
        expected: u64::from(u32::MAX),
        actual: payload.len() as u64,
    })?;
    let offset = insert_offset(data)?;

    let header = create_stored_file_header(name, size);
    let mut out = Vec::with_capacity(data.len() + header.len() + payload.len());
    out.extend_from_slice(&data[..offset]);
    out.extend_from_slice(&header);
    out.extend_from_slice(payload);
    out.extend_from_slice(&data[offset..]);
    debug!(name, offset, size, "inserted stored file");
    Ok(out)
}

/// Remove the whole block of the first stored file called `name`.
pub fn delete(data: &[u8], inventory: &Inventory, name: &str) -> Result<Vec<u8>> {
    let file = find_stored(inventory, name)?;
    let block = stored_block(data, file)?;
    let start = file.block_offset;
    let end = start.saturating_add(block.full_size() as usize).min(data.len());

    let mut out = Vec::with_capacity(data.len() - (end - start));
    out.extend_from_slice(&data[..start]);
    out.extend_from_slice(&data[end..]);
    debug!(name, start, end, "deleted stored file");
    Ok(out)
}

/// Give a stored file a new name; its payload bytes are kept as they are.
pub fn rename(data: &[u8], inventory: &Inventory, old: &str, new: &str) -> Result<Vec<u8>> {
    let file = find_stored(inventory, old)?;
    check_new_name(inventory, new)?;
    let block = stored_block(data, file)?;

    let header = create_stored_file_header(new, block.add_size);
    let rest = block.header_end().min(data.len());
    let mut out = Vec::with_capacity(data.len() + header.len());
    out.extend_from_slice(&data[..file.block_offset]);
    out.extend_from_slice(&header);
    out.extend_from_slice(&data[rest..]);
    debug!(old, new, "renamed stored file");
    Ok(out)
}

/// Rewrite the stored files in the given order.
///
/// `order` must name every stored file exactly once. The stored files must
/// form one contiguous run of blocks; otherwise the result would differ in
/// size and [`SrrError::SizeMismatch`] is returned.
pub fn reorder<S: AsRef<str>>(data: &[u8], inventory: &Inventory, order: &[S]) -> Result<Vec<u8>> {
    let files = &inventory.stored_files;
    if order.len() != files.len() {
        return Err(SrrError::ReorderMismatch(format!(
            "{} names given for {} stored files",
            order.len(),
            files.len()
        )));
    }
    if inventory.has_duplicate_stored_files() {
        return Err(SrrError::ReorderMismatch(
            "the SRR file contains duplicate stored file names".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for name in order {
        let name = name.as_ref();
        if !seen.insert(name) {
            return Err(SrrError::ReorderMismatch(format!("{name} is listed twice")));
        }
        if inventory.stored_file(name).is_none() {
            return Err(SrrError::ReorderMismatch(format!("{name} is not stored")));
        }
    }

    let (Some(before), Some(after)) = (
        files.iter().map(|f| f.block_offset).min(),
        files.iter().map(|f| f.payload_end()).max(),
    ) else {
        return Ok(data.to_vec());
    };
    let after = after.min(data.len());

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..before]);
    for name in order {
        let file = find_stored(inventory, name.as_ref())?;
        let end = file.payload_end().min(data.len());
        out.extend_from_slice(&data[file.block_offset.min(end)..end]);
    }
    out.extend_from_slice(&data[after..]);

    if out.len() != data.len() {
        return Err(SrrError::SizeMismatch {
            expected: data.len() as u64,
            actual: out.len() as u64,
        });
    }
    debug!(files = order.len(), before, after, "reordered stored files");
    Ok(out)
}

/// Check that `raw` is a single well-formed OSO hash block with a usable
/// name.
fn check_oso_block(raw: &[u8]) -> Result<OsoHashHeader> {
    let mut cursor = ByteCursor::new(raw);
    let block = BlockHeader::read(&mut cursor, &mut Warnings::new(), false)
        .filter(|b| b.block_type == BlockType::SrrOsoHash && usize::from(b.head_size) == raw.len())
        .ok_or_else(|| SrrError::IllegalName(String::new()))?;
    let header = OsoHashHeader::read(&mut cursor, &block);
    if !check_file_name(&header.name) || header.name.contains('/') {
        return Err(SrrError::IllegalName(header.name));
    }
    Ok(header)
}

/// Append an OSO hash block unless an identical one exists.
pub fn add_oso_hash(data: &[u8], inventory: &Inventory, raw: &[u8]) -> Result<Vec<u8>> {
    let header = check_oso_block(raw)?;
    if inventory.oso_hashes.iter().any(|oso| oso.raw == raw) {
        return Err(SrrError::DuplicateOsoHash);
    }
    let mut out = Vec::with_capacity(data.len() + raw.len());
    out.extend_from_slice(data);
    out.extend_from_slice(raw);
    debug!(name = %header.name, "added OSO hash");
    Ok(out)
}

/// Remove the first OSO hash block identical to `raw`.
pub fn remove_oso_hash(data: &[u8], inventory: &Inventory, raw: &[u8]) -> Result<Vec<u8>> {
    let entry = inventory
        .oso_hashes
        .iter()
        .find(|oso| oso.raw == raw)
        .ok_or(SrrError::OsoHashNotFound)?;
    let start = entry.block_offset;
    let end = (start + entry.raw.len()).min(data.len());

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..start]);
    out.extend_from_slice(&data[end..]);
    debug!(name = %entry.name, "removed OSO hash");
    Ok(out)
}

/// A new SRR holding only one volume set: its SFVs and RAR metadata.
///
/// Volumes and SFVs are matched on their basename-volume, ignoring case.
pub fn split_volume_set(
    data: &[u8],
    inventory: &Inventory,
    basename_volume: &str,
    app_name: &str,
) -> Vec<u8> {
    let wanted = basename_volume.to_lowercase();
    let mut out = create_srr_header_block(app_name);

    for file in &inventory.stored_files {
        if file
            .basename_volume
            .as_ref()
            .is_some_and(|stem| stem.to_lowercase() == wanted)
        {
            let end = file.payload_end().min(data.len());
            out.extend_from_slice(&data[file.block_offset.min(end)..end]);
        }
    }
    for volume in &inventory.volumes {
        if volume.basename_volume.to_lowercase() == wanted {
            let end = volume.metadata_end.min(data.len());
            out.extend_from_slice(&data[volume.metadata_start.min(end)..end]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{release_srr, SrrBuilder};
    use crate::walker::{parse, ParseOptions};

    fn walk(data: &[u8]) -> Inventory {
        parse(data, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_insert_then_delete_restores_bytes() {
        let data = release_srr();
        let inventory = walk(&data);
        let inserted = insert(&data, &inventory, "Proof/proof.jpg", b"\xFF\xD8jpeg").unwrap();

        let after = walk(&inserted);
        assert_eq!(after.stored_files[0].name, "Proof/proof.jpg");
        assert_eq!(extract(&inserted, &after, "Proof/proof.jpg").unwrap(), b"\xFF\xD8jpeg");
        assert_eq!(after.volumes.len(), 3);

        let restored = delete(&inserted, &after, "Proof/proof.jpg").unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_insert_rejects_bad_names() {
        let data = release_srr();
        let inventory = walk(&data);

        let err = insert(&data, &inventory, "rel.nfo", b"x").unwrap_err();
        assert!(matches!(err, SrrError::NameExists(name) if name == "rel.nfo"));
        let err = insert(&data, &inventory, "a//b", b"x").unwrap_err();
        assert!(matches!(err, SrrError::IllegalName(_)));
    }

    #[test]
    fn test_insert_needs_srr_header() {
        let data = SrrBuilder::default().stored("a.txt", b"a").build();
        let inventory = walk(&data);
        assert!(matches!(
            insert(&data, &inventory, "b.txt", b"b"),
            Err(SrrError::MissingSrrHeader)
        ));
    }

    #[test]
    fn test_rename_round_trip() {
        let data = release_srr();
        let inventory = walk(&data);

        let renamed = rename(&data, &inventory, "rel.nfo", "Info/release-notes.nfo").unwrap();
        let after = walk(&renamed);
        assert!(after.stored_file("rel.nfo").is_none());
        assert_eq!(
            extract(&renamed, &after, "Info/release-notes.nfo").unwrap(),
            b"release notes\r\n"
        );

        let back = rename(&renamed, &after, "Info/release-notes.nfo", "rel.nfo").unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_rename_errors() {
        let data = release_srr();
        let inventory = walk(&data);
        assert!(matches!(
            rename(&data, &inventory, "missing.nfo", "x.nfo"),
            Err(SrrError::NameNotFound(_))
        ));
        assert!(matches!(
            rename(&data, &inventory, "rel.nfo", "rel.sfv"),
            Err(SrrError::NameExists(_))
        ));
        assert!(matches!(
            rename(&data, &inventory, "rel.nfo", " rel.nfo"),
            Err(SrrError::IllegalName(_))
        ));
    }

    #[test]
    fn test_reorder_keeps_size_and_payloads() {
        let data = SrrBuilder::new("x")
            .stored("a.txt", b"first")
            .stored("b/b.txt", b"second file")
            .stored("c.txt", b"")
            .volume("r.rar", 0, &[])
            .build();
        let inventory = walk(&data);

        let reordered = reorder(&data, &inventory, &["c.txt", "a.txt", "b/b.txt"]).unwrap();
        assert_eq!(reordered.len(), data.len());

        let after = walk(&reordered);
        let names: Vec<_> = after.stored_file_names().collect();
        assert_eq!(names, ["c.txt", "a.txt", "b/b.txt"]);
        for file in &inventory.stored_files {
            assert_eq!(
                extract(&reordered, &after, &file.name).unwrap(),
                extract(&data, &inventory, &file.name).unwrap()
            );
        }
        assert_eq!(after.volumes, inventory.volumes);
    }

    #[test]
    fn test_reorder_rejects_mismatches() {
        let data = release_srr();
        let inventory = walk(&data);

        for order in [&["rel.nfo"][..], &["rel.nfo", "rel.nfo"], &["rel.nfo", "x.sfv"]] {
            assert!(matches!(
                reorder(&data, &inventory, order),
                Err(SrrError::ReorderMismatch(_))
            ));
        }

        let dup = SrrBuilder::new("x").stored("a", b"1").stored("a", b"2").build();
        let dup_inventory = walk(&dup);
        assert!(matches!(
            reorder(&dup, &dup_inventory, &["a", "a"]),
            Err(SrrError::ReorderMismatch(_))
        ));
    }

    #[test]
    fn test_reorder_non_contiguous_is_size_mismatch() {
        let data = SrrBuilder::new("x")
            .stored("a.txt", b"a")
            .volume("r.rar", 0, &[])
            .stored("b.txt", b"b")
            .build();
        let inventory = walk(&data);
        assert!(matches!(
            reorder(&data, &inventory, &["b.txt", "a.txt"]),
            Err(SrrError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_oso_add_and_remove() {
        let data = release_srr();
        let inventory = walk(&data);
        let raw = OsoHashHeader::build_block("video.mkv", 30, 0x1234_5678_9ABC_DEF0);

        let added = add_oso_hash(&data, &inventory, &raw).unwrap();
        let after = walk(&added);
        assert_eq!(after.oso_hashes.len(), 1);
        assert!(matches!(
            add_oso_hash(&added, &after, &raw),
            Err(SrrError::DuplicateOsoHash)
        ));

        let removed = remove_oso_hash(&added, &after, &raw).unwrap();
        assert_eq!(removed, data);
        assert!(matches!(
            remove_oso_hash(&data, &inventory, &raw),
            Err(SrrError::OsoHashNotFound)
        ));

        let bad = OsoHashHeader::build_block("dir/video.mkv", 30, 1);
        assert!(matches!(
            add_oso_hash(&data, &inventory, &bad),
            Err(SrrError::IllegalName(_))
        ));
    }

    #[test]
    fn test_split_volume_set() {
        let data = SrrBuilder::new("x")
            .stored("one.sfv", b"one.rar 11111111")
            .stored("two.sfv", b"two.rar 22222222")
            .stored("notes.nfo", b"nfo")
            .volume("one.rar", 0, &[])
            .volume("two.rar", 0, &[])
            .build();
        let inventory = walk(&data);

        let subset = split_volume_set(&data, &inventory, "TWO", "partial");
        let part = walk(&subset);
        assert_eq!(part.app_name.as_deref(), Some("partial"));
        let names: Vec<_> = part.stored_file_names().collect();
        assert_eq!(names, ["two.sfv"]);
        assert_eq!(part.volumes.len(), 1);
        assert_eq!(part.volumes[0].name, "two.rar");
        assert_eq!(part.volumes[0].crc, "22222222");
    }
}
