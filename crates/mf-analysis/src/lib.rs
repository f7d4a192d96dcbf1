//! mf-analysis: feature extraction for mastering decisions
//!
//! Features:
//! - Loudness (RMS, peak, approximate and gated integrated LUFS, crest DR)
//! - Spectral descriptors (MFCC statistics, centroid, rolloff, ZCR)
//! - Named frequency bands with boost/cut/ok labels
//! - Critical-band masking with ranked recommendations
//! - Stereo field (width, correlation, balance, phase coherence)
//! - Tempo, key and rule-based genre classification

pub mod bands;
pub mod config;
pub mod error;
pub mod extractor;
pub mod genre;
pub mod levels;
pub mod masking;
pub mod rhythm;
pub mod spectral;
pub mod stereo;
mod stft;

pub use config::AnalysisConfig;
pub use error::{ExtractError, ExtractResult};
pub use extractor::FeatureExtractor;
pub use genre::GenreEstimate;
