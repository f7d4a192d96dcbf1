//! Preview graph construction and the controller handle
//!
//! The controller lives on the UI/engine side and never blocks: commands go
//! through a bounded `rtrb` ring. When the ring is full the newest snapshot
//! is kept and retried on the next push.

use std::sync::Arc;

use portable_atomic::{AtomicF64, Ordering};
use rtrb::{Producer, RingBuffer};

use mf_core::{GraphBuildError, MasteringSettings};

use crate::config::PreviewConfig;
use crate::context::{PlaybackContext, PlaybackFormat};
use crate::params::{PreviewAnalysis, PreviewParams};
use crate::processor::{Chain, PreviewCommand, PreviewProcessor};

/// Result of building a preview graph
///
/// Always usable: on failure the processor passes audio through and
/// `error` says why.
pub struct PreviewBuild {
    pub controller: PreviewController,
    pub processor: PreviewProcessor,
    pub error: Option<GraphBuildError>,
}

impl PreviewBuild {
    pub fn is_passthrough(&self) -> bool {
        self.error.is_some()
    }
}

/// Builder for live preview chains
pub struct PreviewGraph;

impl PreviewGraph {
    /// Build a graph for `context` with initial `settings`
    pub fn build(
        context: &dyn PlaybackContext,
        settings: &MasteringSettings,
        analysis: Option<PreviewAnalysis>,
        config: &PreviewConfig,
    ) -> PreviewBuild {
        let (producer, consumer) = RingBuffer::new(config.effective_capacity());
        let meter = Arc::new(AtomicF64::new(0.0));

        let (format, chain, error) = match context.format() {
            Ok(format) => {
                let params = PreviewParams::from_settings(settings, analysis.as_ref(), format.sample_rate);
                let chain = Chain::new(format, params, config.effective_smoothing_ms());
                log::info!(
                    "preview graph built: {} Hz, {} ch, smoothing {} ms",
                    format.sample_rate,
                    format.channels,
                    config.effective_smoothing_ms()
                );
                (Some(format), Some(Box::new(chain)), None)
            }
            Err(err) => {
                log::warn!("preview graph unavailable, passing audio through: {err}");
                (None, None, Some(err))
            }
        };

        PreviewBuild {
            controller: PreviewController {
                producer,
                format,
                settings: settings.clone(),
                analysis,
                bypassed: false,
                pending_params: None,
                pending_topology: None,
                meter: Arc::clone(&meter),
            },
            processor: PreviewProcessor::new(consumer, chain, meter),
            error,
        }
    }
}

/// Control handle of a preview graph
pub struct PreviewController {
    producer: Producer<PreviewCommand>,
    /// `None` for a passthrough graph
    format: Option<PlaybackFormat>,
    settings: MasteringSettings,
    analysis: Option<PreviewAnalysis>,
    bypassed: bool,
    pending_params: Option<PreviewParams>,
    pending_topology: Option<PreviewCommand>,
    meter: Arc<AtomicF64>,
}

impl PreviewController {
    /// Send new settings; audible changes glide over the smoothing time
    pub fn update_parameters(&mut self, settings: &MasteringSettings) {
        self.settings = settings.clone();
        self.queue_params();
    }

    /// Replace the analysis behind the static stages
    pub fn set_analysis(&mut self, analysis: Option<PreviewAnalysis>) {
        self.analysis = analysis;
        self.queue_params();
    }

    /// Route source straight to output
    pub fn bypass(&mut self) {
        if !self.bypassed {
            self.bypassed = true;
            self.pending_topology = Some(PreviewCommand::Bypass);
            self.flush();
        }
    }

    /// Re-attach the full chain with the current settings
    pub fn resume(&mut self) {
        if self.bypassed {
            self.bypassed = false;
            self.pending_topology = Some(PreviewCommand::Resume);
            self.flush();
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Compressor plus limiter reduction reported by the audio callback
    pub fn gain_reduction_db(&self) -> f64 {
        self.meter.load(Ordering::Relaxed)
    }

    pub fn settings(&self) -> &MasteringSettings {
        &self.settings
    }

    pub fn format(&self) -> Option<PlaybackFormat> {
        self.format
    }

    /// A command is waiting for ring space
    pub fn has_pending(&self) -> bool {
        self.pending_params.is_some() || self.pending_topology.is_some()
    }

    /// Retry pending commands; true when nothing is left waiting
    pub fn flush(&mut self) -> bool {
        if let Some(params) = self.pending_params {
            if self.producer.push(PreviewCommand::Update(params)).is_err() {
                log::warn!("preview command ring full, keeping latest settings for the next push");
                return false;
            }
            self.pending_params = None;
        }
        if let Some(command) = self.pending_topology {
            if self.producer.push(command).is_err() {
                log::warn!("preview command ring full, bypass state change deferred");
                return false;
            }
            self.pending_topology = None;
        }
        true
    }

    fn queue_params(&mut self) {
        let Some(format) = self.format else {
            log::debug!("preview passthrough, settings recorded only");
            return;
        };
        self.pending_params = Some(PreviewParams::from_settings(
            &self.settings,
            self.analysis.as_ref(),
            format.sample_rate,
        ));
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UnavailableContext;

    #[test]
    fn test_full_ring_keeps_latest() {
        let config = PreviewConfig::default().with_command_capacity(1);
        let mut build = PreviewGraph::build(
            &PlaybackFormat::stereo(48000),
            &MasteringSettings::neutral(),
            None,
            &config,
        );

        build.controller.update_parameters(&MasteringSettings::neutral());
        assert!(!build.controller.has_pending());
        build.controller.update_parameters(&MasteringSettings::default());
        assert!(build.controller.has_pending());

        build.processor.process(&mut [0.0; 64]);
        assert!(build.controller.flush());
        assert!(!build.controller.has_pending());
    }

    #[test]
    fn test_bypass_flag_round_trip() {
        let mut build = PreviewGraph::build(
            &PlaybackFormat::stereo(44100),
            &MasteringSettings::neutral(),
            None,
            &PreviewConfig::default(),
        );
        build.controller.bypass();
        assert!(build.controller.is_bypassed());
        build.processor.process(&mut [0.0; 8]);
        assert!(build.processor.is_bypassed());

        build.controller.resume();
        build.processor.process(&mut [0.0; 8]);
        assert!(!build.processor.is_bypassed());
    }

    #[test]
    fn test_unavailable_context_passes_through() {
        let mut build = PreviewGraph::build(
            &UnavailableContext::new("no output device"),
            &MasteringSettings::neutral(),
            None,
            &PreviewConfig::default(),
        );
        assert!(build.is_passthrough());
        assert!(matches!(build.error, Some(GraphBuildError::ContextUnavailable(_))));

        let input: Vec<f64> = (0..256).map(|i| (i as f64 * 0.1).sin() * 1.5).collect();
        let mut buffer = input.clone();
        build.controller.update_parameters(&MasteringSettings::neutral());
        build.processor.process(&mut buffer);
        assert_eq!(buffer, input);
        assert!(build.processor.is_passthrough());
    }
}
