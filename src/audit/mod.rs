//! Read-only dataset audits.
//!
//! - [`find_overlabeled`]: VOC annotation files with more than one object.
//! - [`find_rotated`]: Label Studio tasks whose box carries a rotation.

mod overlabel;
mod rotated;

pub use overlabel::{find_overlabeled, OverlabelReport};
pub use rotated::{find_rotated, rotated_from_json_str, RotatedQuery, RotatedReport};
