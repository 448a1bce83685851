// Arbitrary-precision helpers used by seed derivation

pub mod isqrt;

pub use isqrt::{is_floor_sqrt, isqrt};
