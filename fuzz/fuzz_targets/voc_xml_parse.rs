//! Fuzz target for the VOC annotation parser.
//!
//! Arbitrary bytes must come back as a parsed annotation or an error,
//! never a panic.

#![no_main]

use annoprep::annotation::from_annotation_xml_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(parsed) = from_annotation_xml_slice(data) {
        let _ = annoprep::annotation::annotation_to_records(&parsed);
    }
});
