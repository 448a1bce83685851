//! Seed derivation: format versions, clocks and the per-version math.

pub mod clock;
pub mod derive;
pub mod version;

pub use clock::{date_sum, timestamp_digits, Clock, FixedClock, SystemClock};
pub use derive::{
    derive_base_seed, derive_payload_seed, derive_seed_with, generator_seed, path_number,
};
pub use version::FormatVersion;
