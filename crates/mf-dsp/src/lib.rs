//! mf-dsp: DSP processors for MasterForge
//!
//! ## Modules
//! - `biquad` - TDF-II biquad filters (lowpass, highpass, peaking, shelving)
//! - `smoothing` - Click-free parameter smoothing
//! - `dynamics` - Stereo-linked compressor, brick-wall limiter
//! - `saturation` - Tube, tape and soft-clip waveshapers
//! - `exciter` - High-band harmonic exciter
//! - `stereo` - M/S width, bass mono, correlation
//! - `loudness` - K-weighted, gated integrated loudness (BS.1770)

pub mod biquad;
pub mod dynamics;
pub mod exciter;
pub mod loudness;
pub mod saturation;
pub mod smoothing;
pub mod stereo;

pub use biquad::{BiquadCoeffs, BiquadTDF2};
pub use dynamics::{BrickwallLimiter, Compressor};
pub use exciter::Exciter;
pub use loudness::{KWeighting, integrated_loudness};
pub use saturation::Saturator;
pub use smoothing::{MIN_SMOOTHING_MS, SmoothedParam};
pub use stereo::{StereoImager, correlation};

/// Trait for all DSP processors
pub trait Processor: Send {
    /// Reset processor state
    fn reset(&mut self);

    /// Get latency in samples
    fn latency(&self) -> usize {
        0
    }
}

/// Mono processor trait
pub trait MonoProcessor: Processor {
    /// Process a single sample
    fn process_sample(&mut self, input: f64) -> f64;

    /// Process a block of samples
    fn process_block(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

/// Stereo processor trait
pub trait StereoProcessor: Processor {
    /// Process a stereo sample pair
    fn process_sample(&mut self, left: f64, right: f64) -> (f64, f64);

    /// Process stereo blocks
    fn process_block(&mut self, left: &mut [f64], right: &mut [f64]) {
        debug_assert_eq!(left.len(), right.len());
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            (*l, *r) = self.process_sample(*l, *r);
        }
    }
}

/// Processor operating on one interleaved frame across all channels
pub trait FrameProcessor: Processor {
    fn process_frame(&mut self, frame: &mut [f64]);

    /// Process an interleaved block
    fn process_interleaved(&mut self, samples: &mut [f64], channels: usize) {
        if channels == 0 {
            return;
        }
        for frame in samples.chunks_exact_mut(channels) {
            self.process_frame(frame);
        }
    }
}
