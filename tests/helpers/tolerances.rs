//! Tolerance constants for model and signal tests.
//!
//! Different operations require different precision levels.

/// Floating point rounding errors (copies, exact zero losses).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Tensor arithmetic tolerance (reductions, exp/log chains).
pub const DSP_EPSILON: f32 = 1e-4;

/// Loose tolerance for values that pass through several stages.
pub const PERCEPTUAL_EPSILON: f32 = 0.001;
