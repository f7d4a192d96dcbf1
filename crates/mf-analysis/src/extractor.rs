//! Feature extractor
//!
//! Runs every analysis pass over the head of a buffer and assembles an
//! [`AnalysisResult`]. Independent passes run in parallel on the rayon pool.

use std::sync::atomic::{AtomicBool, Ordering};

use mf_core::{AnalysisError, AnalysisResult, AudioBuffer, Track};

use crate::config::AnalysisConfig;
use crate::error::{ExtractError, ExtractResult};
use crate::{bands, genre, levels, masking, rhythm, spectral, stereo};

/// Analyzes PCM buffers into mastering-relevant features
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: AnalysisConfig,
}

impl FeatureExtractor {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a buffer
    pub fn extract(&self, audio: &AudioBuffer) -> ExtractResult<AnalysisResult> {
        self.extract_with_progress(audio, &|_| {}, &AtomicBool::new(false))
    }

    /// Analyze a buffer, reporting sub-step percentages and honouring `cancel`
    pub fn extract_with_progress(
        &self,
        audio: &AudioBuffer,
        progress: &dyn Fn(u8),
        cancel: &AtomicBool,
    ) -> ExtractResult<AnalysisResult> {
        let checkpoint = |percent: u8| -> ExtractResult<()> {
            if cancel.load(Ordering::Relaxed) {
                return Err(ExtractError::Cancelled);
            }
            progress(percent);
            Ok(())
        };

        audio.validate()?;
        let duration = audio.duration();
        if duration < self.config.min_duration {
            return Err(AnalysisError::TooShort {
                duration,
                min: self.config.min_duration,
            }
            .into());
        }
        let peak_db = audio.peak_db();
        if peak_db < self.config.silence_threshold_db {
            return Err(AnalysisError::Silent { peak_db }.into());
        }
        checkpoint(5)?;

        let head = audio.head(self.config.max_analysis_seconds);
        let sample_rate = head.sample_rate as f64;
        let mono = head.to_mono();
        log::debug!(
            "analyzing {:.2}s of {:.2}s ({} ch, {} Hz)",
            head.duration(),
            duration,
            head.channels,
            head.sample_rate
        );

        let loudness = levels::measure(&head);
        checkpoint(20)?;

        let (spectral_pass, band_pass) = rayon::join(
            || spectral::analyze(&mono, sample_rate, &self.config),
            || bands::analyze(&mono, sample_rate, &self.config),
        );
        let tempo = rhythm::estimate_tempo(&spectral_pass.onset_envelope, spectral_pass.frame_rate);
        checkpoint(40)?;

        let key = rhythm::estimate_key(&rhythm::chroma(&band_pass.spectrum, band_pass.bin_hz));
        checkpoint(60)?;

        let masking_analysis = masking::analyze(&mono, sample_rate, &self.config);
        checkpoint(75)?;

        let stereo_analysis = stereo::analyze(&head, &self.config);
        checkpoint(90)?;

        let estimate = genre::classify(&spectral_pass.features, tempo);
        log::info!(
            "analysis: {} ({:.2}), {:.1} BPM, {}, {:.1} LUFS",
            estimate.genre,
            estimate.confidence,
            tempo,
            key,
            loudness.lufs_integrated
        );

        let result = AnalysisResult {
            loudness,
            spectral_features: spectral_pass.features,
            frequency_analysis: band_pass.analysis,
            masking_analysis,
            stereo_analysis,
            genre: estimate.genre,
            genre_confidence: estimate.confidence,
            tempo,
            key,
            analyzed_duration: head.duration(),
        };
        checkpoint(100)?;
        Ok(result)
    }

    /// Analyze `audio` and record the outcome on `track`
    ///
    /// Failures are recorded on the track rather than returned.
    pub fn analyze_track(&self, mut track: Track, audio: &AudioBuffer) -> Track {
        track.sample_rate = audio.sample_rate;
        track.channels = audio.channels;
        track.duration = audio.duration();

        match self.extract(audio) {
            Ok(result) => track.record_analysis(result),
            Err(e) => {
                log::warn!("analysis of track {} failed: {e}", track.id);
                track.record_analysis_error(e.to_string());
            }
        }
        track
    }
}
