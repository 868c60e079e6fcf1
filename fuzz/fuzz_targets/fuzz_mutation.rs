#![no_main]
use libfuzzer_sys::fuzz_target;
use srr_stream::{delete, insert, parse, ParseOptions};

fuzz_target!(|data: &[u8]| {
    let Ok(inventory) = parse(data, &ParseOptions::default()) else {
        return;
    };

    // Insert followed by delete must give back the input
    let Ok(inserted) = insert(data, &inventory, "fuzz/inserted.bin", b"payload") else {
        return;
    };
    let Ok(inventory) = parse(&inserted, &ParseOptions::default()) else {
        panic!("inserted image no longer walks");
    };
    if let Ok(restored) = delete(&inserted, &inventory, "fuzz/inserted.bin") {
        assert_eq!(restored, data);
    }
});
