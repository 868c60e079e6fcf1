//! Comparison of two SRR files.
//!
//! RAR metadata is compared per volume through SHA-1 hashes of the copied
//! headers. Stored files are classified once each, in this order:
//!
//! | Kind | Same content when | Preferred side |
//! |------|-------------------|----------------|
//! | `.nfo` | text equal ignoring line endings and trailing whitespace | larger file |
//! | `.sfv` | same `name -> crc` entries | more comments, then longer name |
//! | `.srs` | same sample name, CRC and match offset | non-zero match offset, then longer name |
//! | other | same CRC32 | none |
//!
//! Files that only share a name end up in `same_name`.

use std::collections::{BTreeMap, HashSet};

use sha1::{Digest, Sha1};

use crate::checksum_list::ChecksumDirectory;
use crate::crc32::crc32;
use crate::fingerprint::{content_hash, volume_hashes, HashAlgorithm};
use crate::inventory::{Inventory, StoredFile};
use crate::parsing::extension4;
use crate::sample::{SampleInfo, SampleReader};

/// One SRR: its bytes and their inventory.
#[derive(Debug, Clone, Copy)]
pub struct SrrImage<'a> {
    pub data: &'a [u8],
    pub inventory: &'a Inventory,
}

impl<'a> SrrImage<'a> {
    pub fn new(data: &'a [u8], inventory: &'a Inventory) -> Self {
        Self { data, inventory }
    }

    fn payload(&self, file: &StoredFile) -> &'a [u8] {
        let end = file.payload_end().min(self.data.len());
        &self.data[file.payload_offset.min(end)..end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    One,
    Two,
}

impl Side {
    fn first_if(one_wins: bool) -> Self {
        if one_wins {
            Self::One
        } else {
            Self::Two
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Nfo,
    Sfv,
    Srs,
    Other,
}

impl FileKind {
    fn of(name: &str) -> Self {
        match extension4(name).as_str() {
            ".nfo" => Self::Nfo,
            ".sfv" => Self::Sfv,
            ".srs" => Self::Srs,
            _ => Self::Other,
        }
    }
}

/// Two stored files paired up by the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub one: String,
    pub two: String,
    pub kind: FileKind,
    /// Copy to keep when both are acceptable.
    pub preferred: Option<Side>,
    /// Line counts of two NFOs.
    pub lines: Option<(usize, usize)>,
}

/// RAR volumes present on one side only, and naming preferences for
/// volumes present on both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RarDifferences {
    pub unique_one: Vec<String>,
    pub unique_two: Vec<String>,
    /// Names from the first SRR to prefer for identical volumes.
    pub names_one: Vec<String>,
    pub names_two: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarComparison {
    /// The RAR sets rebuild to the same data.
    pub same_data: bool,
    /// ... and every volume has the same name on both sides.
    pub same_names: bool,
    /// Volume names `(one, two)` with identical headers.
    pub matched: Vec<(String, String)>,
    /// Present unless `same_names`.
    pub differences: Option<RarDifferences>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonResult {
    pub rar: RarComparison,
    pub same: Vec<MatchedPair>,
    pub same_name: Vec<MatchedPair>,
    pub unique_one: Vec<String>,
    pub unique_two: Vec<String>,
}

/// Compare two walked SRR files.
pub fn compare(one: SrrImage<'_>, two: SrrImage<'_>, reader: &dyn SampleReader) -> ComparisonResult {
    let rar = compare_rar(one, two);

    let files_one = unique_by_name(one.inventory);
    let files_two = unique_by_name(two.inventory);
    let mut matcher = Matcher::default();

    let nfo_one = entries(one, &files_one, FileKind::Nfo, NfoInfo::new);
    let nfo_two = entries(two, &files_two, FileKind::Nfo, NfoInfo::new);
    for (o, on) in &nfo_one {
        for (t, tn) in &nfo_two {
            let lines = Some((on.lines, tn.lines));
            if on.hash == tn.hash {
                matcher.same(o, t, FileKind::Nfo, Some(Side::first_if(o.size > t.size)), lines);
            } else if o.name == t.name {
                matcher.same_name(o, t, FileKind::Nfo, Some(Side::first_if(o.size > t.size)), lines);
            }
        }
    }

    let sfv_one = entries(one, &files_one, FileKind::Sfv, ChecksumDirectory::parse);
    let sfv_two = entries(two, &files_two, FileKind::Sfv, ChecksumDirectory::parse);
    for (o, os) in &sfv_one {
        for (t, ts) in &sfv_two {
            if os.files == ts.files {
                let preferred = match os.comments.len().cmp(&ts.comments.len()) {
                    std::cmp::Ordering::Greater => Side::One,
                    std::cmp::Ordering::Less => Side::Two,
                    std::cmp::Ordering::Equal => Side::first_if(o.name.len() > t.name.len()),
                };
                matcher.same(o, t, FileKind::Sfv, Some(preferred), None);
            } else if o.name == t.name {
                matcher.same_name(o, t, FileKind::Sfv, Some(Side::first_if(o.size > t.size)), None);
            }
        }
    }

    let srs_one = entries(one, &files_one, FileKind::Srs, |data| reader.read_sample(data));
    let srs_two = entries(two, &files_two, FileKind::Srs, |data| reader.read_sample(data));
    for (o, os) in &srs_one {
        for (t, ts) in &srs_two {
            let (Some(os), Some(ts)) = (os, ts) else {
                continue;
            };
            if os.file.name != ts.file.name || os.file.crc32 != ts.file.crc32 {
                continue;
            }
            if same_offset(os, ts) {
                matcher.same(o, t, FileKind::Srs, None, None);
            } else {
                let preferred = if os.match_offset(1).unwrap_or(0) != 0 {
                    Side::One
                } else if ts.match_offset(1).unwrap_or(0) != 0 {
                    Side::Two
                } else {
                    Side::first_if(o.name.len() > t.name.len())
                };
                matcher.same_name(o, t, FileKind::Srs, Some(preferred), None);
            }
        }
    }

    let other_one = entries(one, &files_one, FileKind::Other, crc32);
    let other_two = entries(two, &files_two, FileKind::Other, crc32);
    for (o, oc) in &other_one {
        for (t, tc) in &other_two {
            if oc == tc {
                matcher.same(o, t, FileKind::Other, None, None);
            } else if o.name == t.name {
                matcher.same_name(o, t, FileKind::Other, None, None);
            }
        }
    }

    ComparisonResult {
        rar,
        unique_one: unmatched(&files_one, &matcher.one_names),
        unique_two: unmatched(&files_two, &matcher.two_names),
        same: matcher.same,
        same_name: matcher.same_name,
    }
}

fn same_offset(one: &SampleInfo, two: &SampleInfo) -> bool {
    one.match_offset(1) == two.match_offset(1)
}

/// Stored files, first occurrence of each name only.
fn unique_by_name(inventory: &Inventory) -> Vec<&StoredFile> {
    let mut seen = HashSet::new();
    inventory
        .stored_files
        .iter()
        .filter(|file| seen.insert(file.name.as_str()))
        .collect()
}

/// Files of one kind with information derived from their payload.
fn entries<'f, T>(
    image: SrrImage<'_>,
    files: &[&'f StoredFile],
    kind: FileKind,
    derive: impl Fn(&[u8]) -> T,
) -> Vec<(&'f StoredFile, T)> {
    files
        .iter()
        .filter(|file| FileKind::of(&file.name) == kind)
        .map(|&file| (file, derive(image.payload(file))))
        .collect()
}

struct NfoInfo {
    hash: String,
    lines: usize,
}

impl NfoInfo {
    /// Hash ignoring line endings and trailing whitespace.
    fn new(data: &[u8]) -> Self {
        let stripped: Vec<u8> = data
            .iter()
            .copied()
            .filter(|&b| b != b'\r' && b != b'\n')
            .collect();
        let end = stripped
            .iter()
            .rposition(|b| !matches!(b, b' ' | b'\t' | b'\0' | b'\x0B'))
            .map_or(0, |i| i + 1);
        Self {
            hash: hex::encode(Sha1::digest(&stripped[..end])),
            lines: data.iter().filter(|&&b| b == b'\n').count() + 1,
        }
    }
}

#[derive(Default)]
struct Matcher {
    same: Vec<MatchedPair>,
    same_name: Vec<MatchedPair>,
    one_names: HashSet<String>,
    two_names: HashSet<String>,
}

impl Matcher {
    fn pair(
        &mut self,
        one: &StoredFile,
        two: &StoredFile,
        kind: FileKind,
        preferred: Option<Side>,
        lines: Option<(usize, usize)>,
    ) -> MatchedPair {
        self.one_names.insert(one.name.clone());
        self.two_names.insert(two.name.clone());
        MatchedPair {
            one: one.name.clone(),
            two: two.name.clone(),
            kind,
            preferred,
            lines,
        }
    }

    fn same(
        &mut self,
        one: &StoredFile,
        two: &StoredFile,
        kind: FileKind,
        preferred: Option<Side>,
        lines: Option<(usize, usize)>,
    ) {
        let pair = self.pair(one, two, kind, preferred, lines);
        self.same.push(pair);
    }

    fn same_name(
        &mut self,
        one: &StoredFile,
        two: &StoredFile,
        kind: FileKind,
        preferred: Option<Side>,
        lines: Option<(usize, usize)>,
    ) {
        let pair = self.pair(one, two, kind, preferred, lines);
        self.same_name.push(pair);
    }
}

fn unmatched(files: &[&StoredFile], matched: &HashSet<String>) -> Vec<String> {
    files
        .iter()
        .filter(|file| !matched.contains(&file.name))
        .map(|file| file.name.clone())
        .collect()
}

fn compare_rar(one: SrrImage<'_>, two: SrrImage<'_>) -> RarComparison {
    let same_data = content_hash(one.data, &one.inventory.volumes, HashAlgorithm::Sha1)
        == content_hash(two.data, &two.inventory.volumes, HashAlgorithm::Sha1);

    // hash -> name; a repeated hash keeps the last name
    let hashes_one: BTreeMap<String, String> =
        volume_hashes(one.data, &one.inventory.volumes).into_iter().collect();
    let hashes_two: BTreeMap<String, String> =
        volume_hashes(two.data, &two.inventory.volumes).into_iter().collect();

    let matched = hashes_one
        .iter()
        .filter_map(|(hash, name)| Some((name.clone(), hashes_two.get(hash)?.clone())))
        .collect();

    // entries whose name does not occur on the other side
    let names_not_in = |hashes: &BTreeMap<String, String>, other: &BTreeMap<String, String>| {
        let other_names: HashSet<&String> = other.values().collect();
        hashes
            .iter()
            .filter(|(_, name)| !other_names.contains(name))
            .map(|(hash, name)| (hash.clone(), name.clone()))
            .collect::<BTreeMap<_, _>>()
    };
    let left = names_not_in(&hashes_one, &hashes_two);
    let right = names_not_in(&hashes_two, &hashes_one);

    let same_names = same_data && left.is_empty() && right.is_empty();
    let differences = (!same_names).then(|| {
        let unique = |hashes: &BTreeMap<String, String>, other: &BTreeMap<String, String>| {
            hashes
                .iter()
                .filter(|(hash, _)| !other.contains_key(*hash))
                .map(|(_, name)| name.clone())
                .collect()
        };
        let mut differences = RarDifferences {
            unique_one: unique(&hashes_one, &hashes_two),
            unique_two: unique(&hashes_two, &hashes_one),
            ..RarDifferences::default()
        };
        // same headers under different names: the longer name usually has a path
        for (hash, l) in &left {
            if let Some(r) = right.get(hash) {
                if l.len() > r.len() {
                    differences.names_one.push(l.clone());
                } else {
                    differences.names_two.push(r.clone());
                }
            }
        }
        differences
    });

    RarComparison {
        same_data,
        same_names,
        matched,
        differences,
    }
}
