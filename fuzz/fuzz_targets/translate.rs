//! Fuzz target for the Extended-JSON translator.
//!
//! Feeds arbitrary text to every translation entry point.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_translate
//! ```

#![no_main]

use coto_query::extjson::{parse_plain_document, parse_timestamp, translate, translate_pipeline};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Translation must never panic, only return errors.
        if let Ok(value) = translate(input) {
            let _ = value.to_json();
        }
        let _ = translate_pipeline(input);
        let _ = parse_plain_document("sort", input);
        let _ = parse_timestamp(input);
    }
});
