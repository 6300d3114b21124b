#![no_main]

use asrun::abc::{DecodeOptions, Decoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Accept any version so the fuzzer gets past the header
    let decoder = Decoder::new(DecodeOptions {
        expected_major_version: None,
        verbose: false,
    });

    // Decode should return Ok or Err, never panic
    if let Ok(graph) = decoder.decode(data) {
        for index in 0..graph.constant_pool.multiname_count() {
            let _ = graph.multiname_display(index as u32);
        }
        for script in &graph.scripts {
            let _ = graph.method_name(script.init);
        }
    }
});
