//! mf-master: settings resolution and offline mastering
//!
//! ## Features
//! - **Genre profiles**: loudness/dynamic-range targets, tonal curves and
//!   full chain presets, with genre name normalization and aliases
//! - **Settings resolution**: neutral defaults, genre overlay, AI patch merge
//! - **Offline pipeline**: the fixed nine-stage mastering chain, deterministic
//!   and cancellable between stages, with a render report
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mf_master::{OfflineMasteringPipeline, RenderContext, RenderControl, SettingsResolver};
//!
//! let settings = SettingsResolver::new().resolve(Some(&analysis), Some("jazz"), None);
//! let output = OfflineMasteringPipeline::default()
//!     .run(&audio, &settings, &RenderContext::from_analysis(&analysis), &RenderControl::none())?;
//! ```

pub mod config;
pub mod pipeline;
pub mod presets;
pub mod resolver;
pub mod stages;

mod error;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{
    OfflineMasteringPipeline, RenderContext, RenderControl, RenderOutput, RenderReport,
    settings_fingerprint,
};
pub use presets::{GenreProfile, canonical_genre, chain_preset, genre_profile};
pub use resolver::SettingsResolver;
pub use stages::Stage;
