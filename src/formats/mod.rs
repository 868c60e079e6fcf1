//! Format detection and small fixed encodings.
//!
//! Zero dependencies.

/// Container format of an embedded sample-verification file, chosen by
/// sniffing its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// EBML (Matroska)
    Mkv,
    /// RIFF (AVI)
    Avi,
    /// ISO base media (MOV/MP4), recognised by `ftyp` at offset 4
    Mp4,
    /// ASF (WMV)
    Wmv,
    Flac,
    Mp3,
    /// Marker-delimited stream samples (VOB, basic M2TS)
    Stream,
    Unknown,
}

impl SampleFormat {
    pub const EBML: &[u8; 4] = b"\x1a\x45\xdf\xa3";
    pub const RIFF: &[u8; 4] = b"RIFF";
    pub const ASF: &[u8; 4] = b"\x30\x26\xb2\x75";
    pub const FLAC: &[u8; 4] = b"fLaC";
    pub const SRSF: &[u8; 4] = b"SRSF";
    pub const STRM: &[u8; 4] = b"STRM";
    pub const FTYP: &[u8; 4] = b"ftyp";
    pub const ID3: &[u8; 3] = b"ID3";

    pub fn sniff(data: &[u8]) -> Self {
        let Some(magic) = data.get(..4) else {
            return Self::Unknown;
        };
        match magic {
            m if m == Self::EBML => Self::Mkv,
            m if m == Self::RIFF => Self::Avi,
            m if m == Self::ASF => Self::Wmv,
            m if m == Self::FLAC => Self::Flac,
            m if m == Self::SRSF => Self::Mp3,
            m if m == Self::STRM => Self::Stream,
            _ if data.get(4..8) == Some(Self::FTYP.as_slice()) => Self::Mp4,
            m if m.starts_with(Self::ID3) => {
                // an ID3 tag can precede both FLAC and MP3 samples
                let after_tag = id3_tag_len(data).map(|len| 10 + len);
                match after_tag.and_then(|at| data.get(at..at + 4)) {
                    Some(next) if next == Self::FLAC => Self::Flac,
                    _ => Self::Mp3,
                }
            }
            _ => Self::Unknown,
        }
    }
}

/// Size of the ID3v2 tag body (excluding its 10 byte header).
///
/// The four size bytes at offset 6 hold 7 bits each.
pub fn id3_tag_len(data: &[u8]) -> Option<usize> {
    let bytes = data.get(6..10)?;
    Some(
        bytes
            .iter()
            .fold(0usize, |acc, &b| (acc << 7) + usize::from(b)),
    )
}

/// MS-DOS packed date and time as stored in RAR file headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DosDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DosDateTime {
    pub fn from_dos(dos_time: u32) -> Self {
        Self {
            second: ((dos_time & 0x1f) * 2) as u8,
            minute: ((dos_time >> 5) & 0x3f) as u8,
            hour: ((dos_time >> 11) & 0x1f) as u8,
            day: ((dos_time >> 16) & 0x1f) as u8,
            month: ((dos_time >> 21) & 0x0f) as u8,
            year: ((dos_time >> 25) & 0x7f) as u16 + 1980,
        }
    }

    /// Seconds since the Unix epoch, treating the stamp as UTC.
    pub fn unix_seconds(&self) -> i64 {
        let year = i64::from(self.year);
        let is_leap = |y: i64| y % 4 == 0 && (y % 100 != 0 || y % 400 == 0);

        let mut days: i64 = (1970..year).map(|y| if is_leap(y) { 366 } else { 365 }).sum();
        let month_days = [
            31,
            if is_leap(year) { 29 } else { 28 },
            31,
            30,
            31,
            30,
            31,
            31,
            30,
            31,
            30,
            31,
        ];
        let months_before = usize::from(self.month.clamp(1, 12) - 1);
        days += month_days[..months_before].iter().sum::<i64>();
        days += i64::from(self.day.max(1)) - 1;

        days * 86400
            + i64::from(self.hour) * 3600
            + i64::from(self.minute) * 60
            + i64::from(self.second)
    }
}

impl std::fmt::Display for DosDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
