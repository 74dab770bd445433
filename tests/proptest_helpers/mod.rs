#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A set of distinct image numbers, unsorted, with at least one entry.
pub fn arb_image_numbers(max_files: usize, max_number: u64) -> BoxedStrategy<Vec<u64>> {
    proptest::collection::btree_set(0u64..=max_number, 1..=max_files)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
        .boxed()
}

/// Short lists drawn from a small alphabet so intersections are common.
pub fn arb_small_list(max_len: usize) -> BoxedStrategy<Vec<u8>> {
    proptest::collection::vec(0u8..16, 0..=max_len).boxed()
}

pub fn file_names(numbers: &[u64], extension: &str) -> Vec<String> {
    numbers
        .iter()
        .map(|n| format!("{n}.{extension}"))
        .collect()
}
