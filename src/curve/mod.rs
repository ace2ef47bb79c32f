//! Animation curves.
//!
//! - [`CurveKey`] - `(path, array index, optional tag)` channel identity
//! - [`AnimationCurve`] - Keyframes of one scalar channel
//! - [`CurveMap`] - All channels of one exported object

mod curve;
mod key;

use std::collections::BTreeMap;

pub use curve::{is_flat_line, AnimationCurve, KeyPoint};
pub use key::{CurveKey, CurveKind};

/// Channels of one object, bones flattened in through their path prefix.
pub type CurveMap = BTreeMap<CurveKey, AnimationCurve>;
