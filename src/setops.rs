//! Set algebra over plain collections.
//!
//! Both helpers treat their inputs as sets: duplicates collapse and the
//! output keeps the order in which elements first appear in `a`.

use std::collections::HashSet;
use std::hash::Hash;

/// Elements present in both `a` and `b`.
pub fn intersection<T>(a: &[T], b: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let in_b: HashSet<&T> = b.iter().collect();
    retain_unique(a, |item| in_b.contains(item))
}

/// Elements of `a` that are absent from `b`.
pub fn complement<T>(a: &[T], b: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let in_b: HashSet<&T> = b.iter().collect();
    retain_unique(a, |item| !in_b.contains(item))
}

fn retain_unique<T, F>(items: &[T], keep: F) -> Vec<T>
where
    T: Eq + Hash + Clone,
    F: Fn(&T) -> bool,
{
    let mut seen: HashSet<&T> = HashSet::with_capacity(items.len());
    items
        .iter()
        .filter(|item| keep(*item) && seen.insert(*item))
        .cloned()
        .collect()
}
