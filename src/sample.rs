//! Records of embedded sample-verification (SRS) files.
//!
//! Every SRS container stores one file record and one record per track,
//! however it wraps them. Decoding the container is the job of a
//! [`SampleReader`]; [`MarkerSampleReader`] handles the layouts where the
//! records sit behind plain four byte markers.

use std::collections::BTreeMap;

use crate::formats::{id3_tag_len, SampleFormat};
use crate::parsing::ByteCursor;

/// The sampled media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub flags: u16,
    /// Tool that created the sample.
    pub app_name: String,
    /// Name of the sample file the SRS was made from.
    pub name: String,
    pub file_size: u64,
    /// Lower-case hex CRC32 of the sample file.
    pub crc32: String,
}

impl FileRecord {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut cursor = ByteCursor::new(data);
        let flags = cursor.read_u16_le()?;
        let app_name = cursor.read_name()?;
        let name = cursor.read_name()?;
        let file_size = cursor.read_u64_le()?;
        let crc32 = cursor.read_u32_le()?;
        Some(Self {
            flags,
            app_name,
            name,
            file_size,
            crc32: format!("{crc32:08x}"),
        })
    }
}

/// Audio fingerprint stored by MP3/FLAC samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFingerprint {
    pub duration: u32,
    pub data: Vec<u8>,
}

impl AudioFingerprint {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut cursor = ByteCursor::new(data);
        let duration = cursor.read_u32_le()?;
        let len = cursor.read_u32_le()? as usize;
        let data = cursor.slice_clamped(8, 8 + len).to_vec();
        Some(Self { duration, data })
    }
}

/// One track of the sampled file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub flags: u16,
    pub track_number: u32,
    pub data_size: u64,
    /// Where the sample was found in the main file; usually zero.
    pub match_offset: u64,
    pub signature_size: u16,
    pub fingerprint: Option<AudioFingerprint>,
}

impl TrackRecord {
    const BIG_FILE: u16 = 0x4;
    const BIG_TRACK_NUMBER: u16 = 0x8;

    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut cursor = ByteCursor::new(data);
        let flags = cursor.read_u16_le()?;
        let track_number = if flags & Self::BIG_TRACK_NUMBER != 0 {
            cursor.read_u32_le()?
        } else {
            u32::from(cursor.read_u16_le()?)
        };
        let data_size = if flags & Self::BIG_FILE != 0 {
            cursor.read_u64_le()?
        } else {
            u64::from(cursor.read_u32_le()?)
        };
        let match_offset = cursor.read_u64_le()?;
        let signature_size = cursor.read_u16_le()?;
        Some(Self {
            flags,
            track_number,
            data_size,
            match_offset,
            signature_size,
            fingerprint: None,
        })
    }
}

/// Decoded records of one SRS file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleInfo {
    pub format: SampleFormat,
    pub file: FileRecord,
    /// Tracks by track number.
    pub tracks: BTreeMap<u32, TrackRecord>,
}

impl SampleInfo {
    pub fn match_offset(&self, track: u32) -> Option<u64> {
        self.tracks.get(&track).map(|t| t.match_offset)
    }
}

/// Decodes the records of an SRS file.
pub trait SampleReader {
    /// `None` when the format is not handled or the data is damaged.
    fn read_sample(&self, data: &[u8]) -> Option<SampleInfo>;
}

/// Reader for stream (`STRM`) and MP3 samples.
///
/// AVI, MKV, MP4, WMV and FLAC samples need a container parser and are
/// left to other [`SampleReader`] implementations.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerSampleReader;

const SRSF: &[u8; 4] = b"SRSF";
const SRST: &[u8; 4] = b"SRST";
const SRSP: &[u8; 4] = b"SRSP";

impl SampleReader for MarkerSampleReader {
    fn read_sample(&self, data: &[u8]) -> Option<SampleInfo> {
        let format = SampleFormat::sniff(data);
        let (file, tracks) = match format {
            SampleFormat::Stream => read_stream(data),
            SampleFormat::Mp3 => read_mp3(data),
            _ => return None,
        };
        Some(SampleInfo {
            format,
            file: file?,
            tracks,
        })
    }
}

type Records = (Option<FileRecord>, BTreeMap<u32, TrackRecord>);

/// Body of a marker block: `marker u32 size`, where size counts the 8
/// byte block header.
fn block_body(data: &[u8], at: usize) -> Option<&[u8]> {
    let mut cursor = ByteCursor::new(data);
    cursor.seek(at + 4);
    let size = cursor.read_u32_le()? as usize;
    let end = at.checked_add(size)?;
    Some(cursor.slice_clamped(at + 8, end))
}

fn read_stream(data: &[u8]) -> Records {
    let mut file = None;
    let mut tracks = BTreeMap::new();
    let mut pos = 0usize;

    while pos + 8 <= data.len() {
        let marker = &data[pos..pos + 4];
        let size = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]);
        let body = block_body(data, pos).unwrap_or_default();
        if marker == SRSF {
            file = FileRecord::parse(body);
        } else if marker == SRST {
            if let Some(track) = TrackRecord::parse(body) {
                tracks.insert(track.track_number, track);
            }
        }
        if size < 8 {
            break;
        }
        pos += size as usize;
    }
    (file, tracks)
}

fn find(data: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| i + from)
}

fn read_mp3(data: &[u8]) -> Records {
    let mut data = data;
    // the tag could contain the marker strings
    if data.starts_with(SampleFormat::ID3) {
        let tag_len = id3_tag_len(data).unwrap_or(0);
        if tag_len > data.len() {
            // damaged first tag: use the next one
            if let Some(next) = find(data, SampleFormat::ID3, 10) {
                let next_len = id3_tag_len(&data[next..]).unwrap_or(0);
                data = data.get(next + 10 + next_len..).unwrap_or_default();
            }
        } else {
            data = data.get(10 + tag_len..).unwrap_or_default();
        }
    }

    let mut file = None;
    let mut tracks = BTreeMap::new();
    let f = find(data, SRSF, 0);
    let t = find(data, SRST, f.unwrap_or(0));
    let p = find(data, SRSP, t.unwrap_or(0));

    if let Some(body) = f.and_then(|at| block_body(data, at)) {
        file = FileRecord::parse(body);
    }
    if let Some(track) = t.and_then(|at| block_body(data, at)).and_then(TrackRecord::parse) {
        tracks.insert(track.track_number, track);
    }
    if let Some(fingerprint) = p.and_then(|at| block_body(data, at)).and_then(AudioFingerprint::parse) {
        if let Some(track) = tracks.get_mut(&1) {
            track.fingerprint = Some(fingerprint);
        }
    }
    (file, tracks)
}
