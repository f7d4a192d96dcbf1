//! Harmonic saturation
//!
//! Memoryless waveshapers blended with the dry signal:
//! - Tube: `tanh(0.7 * drive * x) * 0.95`
//! - Tape: `d / (1 + |d|)` with `d = drive * x`
//! - Soft: `sign(d) * (1 - e^-|d|)`

use mf_core::{SaturationSettings, SaturationType};

use crate::{MonoProcessor, Processor};

/// Saturation processor
#[derive(Debug, Clone, Copy)]
pub struct Saturator {
    sat_type: SaturationType,
    /// Input gain into the curve
    drive: f64,
    /// Dry/wet (0.0 = dry, 1.0 = wet)
    mix: f64,
}

impl Saturator {
    pub fn new(sat_type: SaturationType, drive: f64, mix: f64) -> Self {
        Self {
            sat_type,
            drive,
            mix: mix.clamp(0.0, 1.0),
        }
    }

    pub fn from_settings(settings: &SaturationSettings) -> Self {
        Self::new(settings.saturation_type, settings.drive, settings.mix)
    }

    pub fn set_drive(&mut self, drive: f64) {
        self.drive = drive;
    }

    pub fn set_mix(&mut self, mix: f64) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn set_type(&mut self, sat_type: SaturationType) {
        self.sat_type = sat_type;
    }

    /// Apply the curve without blending
    #[inline]
    pub fn shape(&self, x: f64) -> f64 {
        match self.sat_type {
            SaturationType::Tube => (x * self.drive * 0.7).tanh() * 0.95,
            SaturationType::Tape => {
                let d = x * self.drive;
                d / (1.0 + d.abs())
            }
            SaturationType::Soft => {
                let d = x * self.drive;
                d.signum() * (1.0 - (-d.abs()).exp())
            }
        }
    }
}

impl Processor for Saturator {
    fn reset(&mut self) {}
}

impl MonoProcessor for Saturator {
    #[inline]
    fn process_sample(&mut self, input: f64) -> f64 {
        if self.mix <= 0.0 {
            return input;
        }
        (1.0 - self.mix) * input + self.mix * self.shape(input)
    }
}
