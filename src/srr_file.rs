//! SRR files on disk.
//!
//! Queries read the file under a shared lock. Mutations take an exclusive
//! lock, walk the current content, splice and replace the file before the
//! lock is released.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::compare::{self as engine, ComparisonResult, SrrImage};
use crate::error::Result;
use crate::file_media::{LockMode, LockedFile};
use crate::fingerprint::{content_hash, HashAlgorithm};
use crate::inventory::Inventory;
use crate::mutation;
use crate::sample::{MarkerSampleReader, SampleReader};
use crate::walker::{parse, ParseOptions};

/// Handle to an SRR file.
#[derive(Debug, Clone)]
pub struct SrrFile {
    path: PathBuf,
    options: ParseOptions,
}

impl SrrFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Content and inventory, read under a shared lock.
    fn load(&self) -> Result<(Vec<u8>, Inventory)> {
        let mut file = LockedFile::open(&self.path, LockMode::Shared)?;
        let data = file.read_all()?;
        let inventory = parse(&data, &self.options)?;
        Ok((data, inventory))
    }

    pub fn inventory(&self) -> Result<Inventory> {
        self.load().map(|(_, inventory)| inventory)
    }

    /// Payload of the first stored file called `name`.
    pub fn extract(&self, name: &str) -> Result<Vec<u8>> {
        let (data, inventory) = self.load()?;
        mutation::extract(&data, &inventory, name)
    }

    /// Hex digest of the RAR metadata; see [`content_hash`].
    pub fn hash(&self, algorithm: HashAlgorithm) -> Result<String> {
        let (data, inventory) = self.load()?;
        Ok(content_hash(&data, &inventory.volumes, algorithm))
    }

    /// A new SRR image holding one volume set of this file.
    pub fn split_volume_set(&self, basename_volume: &str, app_name: &str) -> Result<Vec<u8>> {
        let (data, inventory) = self.load()?;
        Ok(mutation::split_volume_set(&data, &inventory, basename_volume, app_name))
    }

    /// Rewrite the file with the output of `splice` under an exclusive lock.
    ///
    /// The file is left untouched when `splice` fails.
    fn modify<F>(&self, operation: &str, splice: F) -> Result<()>
    where
        F: FnOnce(&[u8], &Inventory) -> Result<Vec<u8>>,
    {
        let mut file = LockedFile::open(&self.path, LockMode::Exclusive)?;
        let data = file.read_all()?;
        let inventory = parse(&data, &self.options)?;
        let out = splice(&data, &inventory)?;
        debug!(operation, before = data.len(), after = out.len(), "spliced");
        file.replace_contents(&out)?;
        info!(path = %self.path.display(), operation, "updated SRR file");
        Ok(())
    }

    /// Store `payload` as `name` right after the SRR header block.
    pub fn insert(&self, name: &str, payload: &[u8]) -> Result<()> {
        self.modify("insert", |data, inventory| {
            mutation::insert(data, inventory, name, payload)
        })
    }

    /// Store a file from disk under `name`.
    pub fn insert_from_path(&self, source: impl AsRef<Path>, name: &str) -> Result<()> {
        let payload = std::fs::read(source)?;
        self.insert(name, &payload)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        self.modify("delete", |data, inventory| {
            mutation::delete(data, inventory, name)
        })
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        self.modify("rename", |data, inventory| {
            mutation::rename(data, inventory, old, new)
        })
    }

    /// Put the stored files in the order given by `order`, which must list
    /// every stored file exactly once.
    pub fn reorder<S: AsRef<str>>(&self, order: &[S]) -> Result<()> {
        self.modify("reorder", |data, inventory| {
            mutation::reorder(data, inventory, order)
        })
    }

    pub fn add_oso_hash(&self, raw: &[u8]) -> Result<()> {
        self.modify("add_oso_hash", |data, inventory| {
            mutation::add_oso_hash(data, inventory, raw)
        })
    }

    pub fn remove_oso_hash(&self, raw: &[u8]) -> Result<()> {
        self.modify("remove_oso_hash", |data, inventory| {
            mutation::remove_oso_hash(data, inventory, raw)
        })
    }
}

/// Compare two SRR files, decoding samples with [`MarkerSampleReader`].
pub fn compare(one: &SrrFile, two: &SrrFile) -> Result<ComparisonResult> {
    compare_with(one, two, &MarkerSampleReader)
}

/// Compare two SRR files with a custom sample reader.
///
/// Each file is read under its own shared lock.
pub fn compare_with(
    one: &SrrFile,
    two: &SrrFile,
    reader: &dyn SampleReader,
) -> Result<ComparisonResult> {
    let (data_one, inventory_one) = one.load()?;
    let (data_two, inventory_two) = two.load()?;
    Ok(engine::compare(
        SrrImage::new(&data_one, &inventory_one),
        SrrImage::new(&data_two, &inventory_two),
        reader,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SrrError;
    use crate::inventory::OsoHashEntry;
    use crate::testing::release_srr;
    use tempfile::TempDir;

    fn release_file() -> (TempDir, SrrFile) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rel.srr");
        std::fs::write(&path, release_srr()).unwrap();
        (dir, SrrFile::new(path))
    }

    #[test]
    fn test_insert_then_delete_restores_file() {
        let (_dir, srr) = release_file();
        let before = std::fs::read(srr.path()).unwrap();

        srr.insert("Proof/proof.jpg", b"\xFF\xD8 jpeg").unwrap();
        assert_eq!(srr.extract("Proof/proof.jpg").unwrap(), b"\xFF\xD8 jpeg");
        assert_eq!(srr.inventory().unwrap().stored_files.len(), 3);

        srr.delete("Proof/proof.jpg").unwrap();
        assert_eq!(std::fs::read(srr.path()).unwrap(), before);
    }

    #[test]
    fn test_failed_mutation_leaves_file_alone() {
        let (_dir, srr) = release_file();
        let before = std::fs::read(srr.path()).unwrap();

        assert!(matches!(srr.rename("rel.nfo", "rel.sfv"), Err(SrrError::NameExists(_))));
        assert!(matches!(srr.delete("missing.txt"), Err(SrrError::NameNotFound(_))));
        assert!(matches!(srr.insert("/abs.txt", b"x"), Err(SrrError::IllegalName(_))));
        assert_eq!(std::fs::read(srr.path()).unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn test_concurrent_writers_keep_both_edits() {
        let (_dir, srr) = release_file();

        let mut held = LockedFile::open(srr.path(), LockMode::Exclusive).unwrap();
        let other = srr.clone();
        let waiting = std::thread::spawn(move || other.insert("b.txt", b"b"));
        // give the second writer time to open the file and block on the lock
        std::thread::sleep(std::time::Duration::from_millis(100));

        let data = held.read_all().unwrap();
        let inventory = parse(&data, srr.options()).unwrap();
        let out = mutation::insert(&data, &inventory, "a.txt", b"a").unwrap();
        held.replace_contents(&out).unwrap();
        drop(held);

        waiting.join().unwrap().unwrap();
        let inventory = srr.inventory().unwrap();
        assert!(inventory.stored_file("a.txt").is_some());
        assert!(inventory.stored_file("b.txt").is_some());
        assert_eq!(inventory.stored_files.len(), 4);
    }

    #[test]
    fn test_rename_and_reorder() {
        let (_dir, srr) = release_file();
        srr.rename("rel.nfo", "info/rel.nfo").unwrap();
        srr.reorder(&["info/rel.nfo", "rel.sfv"]).unwrap();

        let names: Vec<String> = srr
            .inventory()
            .unwrap()
            .stored_file_names()
            .map(str::to_string)
            .collect();
        assert_eq!(names, ["info/rel.nfo", "rel.sfv"]);
        assert_eq!(srr.extract("info/rel.nfo").unwrap(), b"release notes\r\n");
    }

    #[test]
    fn test_hash_unchanged_by_stored_files() {
        let (_dir, srr) = release_file();
        let before = srr.hash(HashAlgorithm::Sha256).unwrap();
        srr.insert("extra.txt", b"text").unwrap();
        assert_eq!(srr.hash(HashAlgorithm::Sha256).unwrap(), before);
    }

    #[test]
    fn test_oso_hash_add_remove() {
        let (_dir, srr) = release_file();
        let before = std::fs::read(srr.path()).unwrap();
        let block = OsoHashEntry::build_block("video.mkv", 30, 0x0123_4567_89AB_CDEF);

        srr.add_oso_hash(&block).unwrap();
        assert!(matches!(srr.add_oso_hash(&block), Err(SrrError::DuplicateOsoHash)));
        assert_eq!(srr.inventory().unwrap().oso_hashes.len(), 1);

        srr.remove_oso_hash(&block).unwrap();
        assert_eq!(std::fs::read(srr.path()).unwrap(), before);
    }

    #[test]
    fn test_compare_file_with_itself() {
        let (_dir, srr) = release_file();
        let result = compare(&srr, &srr).unwrap();

        assert!(result.rar.same_names);
        assert_eq!(result.rar.matched.len(), 3);
        assert_eq!(result.same.len(), 2);
        assert!(result.same_name.is_empty());
        assert!(result.unique_one.is_empty() && result.unique_two.is_empty());
    }

    #[test]
    fn test_split_volume_set() {
        let (dir, srr) = release_file();
        let split = srr.split_volume_set("rel", "splitter").unwrap();
        let path = dir.path().join("split.srr");
        std::fs::write(&path, split).unwrap();

        let inventory = SrrFile::new(path).inventory().unwrap();
        assert_eq!(inventory.app_name.as_deref(), Some("splitter"));
        assert_eq!(inventory.volumes.len(), 3);
        assert_eq!(inventory.stored_files.len(), 1);
        assert_eq!(inventory.stored_files[0].name, "rel.sfv");
    }

    #[test]
    fn test_not_an_srr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.srr");
        // a RAR volume with payload starts with blocks the walker cannot place
        std::fs::write(&path, [0u8, 0, 0, 0, 0, 7, 0]).unwrap();
        let srr = SrrFile::new(path);
        assert!(matches!(srr.inventory(), Err(SrrError::NotSrr { .. })));
        assert!(matches!(srr.insert("a.txt", b"a"), Err(SrrError::NotSrr { .. })));
    }
}
