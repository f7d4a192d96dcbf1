//! MasterForge Core
//!
//! Shared types for the mastering engine:
//! - Interleaved f64 audio buffers
//! - Mastering settings wire shape, bounds and AI patch merging
//! - Analysis result snapshots
//! - Track and mastering session records
//! - Error taxonomy shared by every stage

pub mod analysis;
pub mod buffer;
pub mod error;
pub mod settings;
pub mod track;

pub use analysis::*;
pub use buffer::AudioBuffer;
pub use error::*;
pub use settings::*;
pub use track::*;

/// Convert linear amplitude to dBFS (with a tiny floor so silence stays finite)
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    20.0 * (linear + 1e-10).log10()
}

/// Convert dB to linear amplitude
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}
