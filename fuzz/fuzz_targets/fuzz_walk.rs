#![no_main]
use libfuzzer_sys::fuzz_target;
use srr_stream::parsing::{BlockHeader, ByteCursor, Warnings};
use srr_stream::{parse, HashAlgorithm, ParseOptions};

fuzz_target!(|data: &[u8]| {
    // Fuzz a single block header
    let mut cursor = ByteCursor::new(data);
    let mut warnings = Warnings::default();
    let _ = BlockHeader::read(&mut cursor, &mut warnings, true);

    // Fuzz the whole walk, then hash what it found
    if let Ok(inventory) = parse(data, &ParseOptions::default()) {
        let _ = srr_stream::content_hash(data, &inventory.volumes, HashAlgorithm::Sha1);
    }
});
