//! # MasterForge Real-Time Preview
//!
//! Live audition of mastering settings before an offline render:
//! - Same nine-stage order and canonical 10-band EQ as the offline pipeline
//! - Controller/processor split over an `rtrb` SPSC command ring
//! - Smoothed gain, frequency and Q changes (never instantaneous)
//! - Bypass/resume as a topology change, not a mute
//! - Passthrough fallback when the playback context is unusable

pub mod config;
pub mod context;
pub mod graph;
pub mod params;
pub mod processor;

pub use config::PreviewConfig;
pub use context::{MAX_CHANNELS, PlaybackContext, PlaybackFormat, UnavailableContext};
pub use graph::{PreviewBuild, PreviewController, PreviewGraph};
pub use params::{PreviewAnalysis, PreviewParams};
pub use processor::PreviewProcessor;
