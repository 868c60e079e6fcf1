//! Volume set naming and stored file name rules.

use crate::parsing::basename;

/// Volume-set stem of a RAR or SFV file name.
///
/// The path and the numbering suffix (`.rar`, `.001`, `.r00`..`.z99`,
/// `.sfv`) are stripped; `new_numbering` additionally recognizes
/// `.partNN.rar`. The shortest stem wins, so `a.part1.rar` with new-style
/// numbering yields `a`. Names without a known suffix are returned whole.
pub fn basename_volume(path: &str, new_numbering: bool) -> String {
    let file_name = basename(path);
    let lower = file_name.to_ascii_lowercase();

    for (index, _) in lower.match_indices('.') {
        let suffix = &lower[index..];
        if is_volume_suffix(suffix) || (new_numbering && is_part_suffix(suffix)) {
            return file_name[..index].to_string();
        }
    }
    file_name.to_string()
}

/// `.rar`, `.sfv`, three digits, or `r`-`z` plus two digits.
fn is_volume_suffix(suffix: &str) -> bool {
    let bytes = suffix.as_bytes();
    if suffix == ".rar" || suffix == ".sfv" {
        return true;
    }
    if bytes.len() != 4 {
        return false;
    }
    let digits = |range: &[u8]| range.iter().all(u8::is_ascii_digit);
    digits(&bytes[1..]) || ((b'r'..=b'z').contains(&bytes[1]) && digits(&bytes[2..]))
}

/// `.part` followed by one or more digits and `.rar`.
fn is_part_suffix(suffix: &str) -> bool {
    suffix
        .strip_prefix(".part")
        .and_then(|rest| rest.strip_suffix(".rar"))
        .is_some_and(|number| !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()))
}

/// Whether `path` may be used as a stored file name.
///
/// Rejected: Windows-reserved characters (`\ : * ? " < > |`), `//`, a
/// leading or trailing `/`, the empty string, and a leading or trailing
/// space.
pub fn check_file_name(path: &str) -> bool {
    const RESERVED: &[char] = &['\\', ':', '*', '?', '"', '<', '>', '|'];

    !(path.is_empty()
        || path.contains(RESERVED)
        || path.contains("//")
        || path.starts_with('/')
        || path.ends_with('/')
        || path.starts_with(' ')
        || path.ends_with(' '))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename_volume() {
        assert_eq!(
            basename_volume(
                "i.didnt.know.i.was.pregnant.s04e02.hdtv.xvid-crimson.part01.rar",
                true
            ),
            "i.didnt.know.i.was.pregnant.s04e02.hdtv.xvid-crimson"
        );
        assert_eq!(
            basename_volume("pfa-dw.s05e18.teotw.part02.rar", false),
            "pfa-dw.s05e18.teotw.part02"
        );
        assert_eq!(
            basename_volume("pfa-dw.s05e18.teotw.part02.r00", false),
            "pfa-dw.s05e18.teotw.part02"
        );
    }

    #[test]
    fn test_basename_volume_other_suffixes() {
        assert_eq!(basename_volume("Subs/rel-subs.SFV", false), "rel-subs");
        assert_eq!(basename_volume("rel.001", false), "rel");
        assert_eq!(basename_volume("rel.S12", false), "rel");
        assert_eq!(basename_volume("rel.q00", false), "rel.q00");
        assert_eq!(basename_volume("rel.mkv", true), "rel.mkv");
    }

    #[test]
    fn test_file_name_check() {
        assert!(check_file_name("ok.ext"));
        assert!(check_file_name("Sample/ok.srs"));

        let rejected = [
            "dir\\file.ext",
            "dir/file:file.ext",
            "dir/file*.ext",
            "dir/file?.ext",
            "dir/file\".ext",
            "dir/file<.ext",
            "dir/file>.ext",
            "dir/file|.ext",
            "dir//file.ext",
            "/dir/file.ext",
            "",
            "something\\",
            "something/",
            " dir/file.ext",
            "dir/file.ext ",
        ];
        for name in rejected {
            assert!(!check_file_name(name), "{name:?} should be rejected");
        }
    }
}
