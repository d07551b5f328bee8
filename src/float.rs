use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FromPrimitive};

/// Marker trait for the floating-point types the solvers run on (`f32`, `f64`).
///
/// Bundles the numeric and formatting traits needed throughout optitrace.
/// `Send + Sync` lets a host move a whole run onto a worker thread.
pub trait Float: NumFloat + FromPrimitive + Copy + Send + Sync + Default + Debug + Display + 'static {
    /// Convert an `f64` literal into `Self`.
    ///
    /// Every `f64` is representable (possibly rounded) in `f32`, so this only
    /// yields NaN for exotic implementors.
    fn constant(v: f64) -> Self {
        Self::from_f64(v).unwrap_or_else(Self::nan)
    }
}

impl Float for f32 {}
impl Float for f64 {}
