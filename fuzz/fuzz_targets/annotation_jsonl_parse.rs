//! Fuzz target for JSON-lines corpus parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run annotation_jsonl_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use labelprep::annotation::io_jsonl::from_jsonl_slice;

fuzz_target!(|data: &[u8]| {
    // Corpora are large, but 10MB is plenty to reach every branch.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_jsonl_slice(data);
});
