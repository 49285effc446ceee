//! Fuzz target for single label lines, including the image reference rewrite.
//!
//! Run with:
//!   cargo +nightly fuzz run label_line_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use labelprep::aggregate::fuzz_rewrite_label_line;

fuzz_target!(|data: &[u8]| {
    let _ = fuzz_rewrite_label_line(data);
});
