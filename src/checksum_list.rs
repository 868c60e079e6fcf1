//! SFV checksum lists.
//!
//! ```text
//! ; comment
//! release.r00 1A2B3C4D
//! "quoted name.mp3" 9757ce72
//! ```

use std::collections::BTreeMap;

/// Characters stripped around each line.
const LINE_TRIM: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B'];

/// Parsed SFV content: `name -> CRC` plus comment lines in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumDirectory {
    pub files: BTreeMap<String, String>,
    pub comments: Vec<String>,
}

impl ChecksumDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse SFV text. Lines starting with `;` or shorter than ten
    /// characters are comments; every other line is `name crc`.
    pub fn parse(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let mut directory = Self::new();

        for line in text.split("\r\n").flat_map(|l| l.split(['\n', '\r'])) {
            let line = line.trim_matches(LINE_TRIM);
            if line.is_empty() {
                continue;
            }
            if line.starts_with(';') || line.len() < 10 {
                directory.comments.push(line.to_string());
                continue;
            }
            let Some(space) = line.rfind(' ') else {
                directory.comments.push(line.to_string());
                continue;
            };

            let mut name = line[..space].trim_end_matches(LINE_TRIM);
            if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
                name = &name[1..name.len() - 1];
            }
            let crc: String = line[space + 1..].chars().take(8).collect();
            let crc = crc.trim_end_matches(LINE_TRIM);
            directory
                .files
                .insert(name.to_string(), format!("{crc:0>8}"));
        }
        directory
    }

    /// Add the entries of `other`; later names overwrite earlier ones.
    pub fn merge(&mut self, other: ChecksumDirectory) {
        self.files.extend(other.files);
        self.comments.extend(other.comments);
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.comments.is_empty()
    }
}
