//! Preview configuration

use serde::{Deserialize, Serialize};

use mf_dsp::MIN_SMOOTHING_MS;

/// Preview graph settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Parameter smoothing time constant (ms, floored at 10)
    pub smoothing_ms: f64,
    /// Command ring capacity (controller → audio callback)
    pub command_capacity: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            smoothing_ms: 20.0,
            command_capacity: 64,
        }
    }
}

impl PreviewConfig {
    pub fn with_smoothing_ms(mut self, ms: f64) -> Self {
        self.smoothing_ms = ms;
        self
    }

    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity;
        self
    }

    /// Smoothing time actually used
    pub fn effective_smoothing_ms(&self) -> f64 {
        if self.smoothing_ms.is_finite() {
            self.smoothing_ms.max(MIN_SMOOTHING_MS)
        } else {
            MIN_SMOOTHING_MS
        }
    }

    /// Ring capacity actually used
    pub fn effective_capacity(&self) -> usize {
        self.command_capacity.max(1)
    }
}
