//! Fuzz target: `FrameAssembler`
//!
//! Treats the input as a sequence of GATT writes (the first byte picks
//! the framing mode, each following byte-run up to a 0xFF marker is one
//! write) and asserts that the assembler never panics and never grows
//! past its limit plus one write.
//!
//! cargo fuzz run fuzz_frame_assembler

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensornode::config::FramingMode;
use sensornode::protocol::framing::FrameAssembler;

const MAX_LEN: usize = 512;

fuzz_target!(|data: &[u8]| {
    let Some((&mode, rest)) = data.split_first() else {
        return;
    };
    let mode = if mode & 1 == 0 {
        FramingMode::Braces
    } else {
        FramingMode::LengthPrefixed
    };
    let mut assembler = FrameAssembler::new(mode, MAX_LEN);

    for write in rest.split(|&b| b == 0xFF) {
        let _ = assembler.feed(write);
        while let Ok(Some(_)) = assembler.next_message() {}
        assert!(
            assembler.pending_len() <= MAX_LEN + write.len(),
            "assembler kept {} bytes",
            assembler.pending_len()
        );
    }

    // A cleared assembler accepts a well-formed command again.
    assembler.clear();
    if mode == FramingMode::Braces {
        assert!(matches!(
            assembler.feed(br#"{"command":"update"}"#),
            Ok(Some(_))
        ));
    }
});
