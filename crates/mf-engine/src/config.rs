//! Engine configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use mf_analysis::AnalysisConfig;
use mf_master::PipelineConfig;
use mf_realtime::PreviewConfig;

/// What happens when a track gets a second mastering request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteringPolicy {
    /// Cancel the active render and start the new one
    #[default]
    Supersede,
    /// Run renders for the same track one after another
    Queue,
}

/// Bounded polling at the process boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 120,
            interval_ms: 500,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads (0 = half the logical cores, at least 1)
    pub workers: usize,
    /// Only this much of a track is analyzed (seconds)
    pub max_analysis_seconds: f64,
    pub mastering_policy: MasteringPolicy,
    /// Store resolved settings after analysis without asking
    pub auto_apply_suggestions: bool,
    pub preview: PreviewConfig,
    pub poll: PollConfig,
    pub analysis: AnalysisConfig,
    pub pipeline: PipelineConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            max_analysis_seconds: 30.0,
            mastering_policy: MasteringPolicy::Supersede,
            auto_apply_suggestions: true,
            preview: PreviewConfig::default(),
            poll: PollConfig::default(),
            analysis: AnalysisConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing or invalid files give the defaults
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("engine config {} not readable ({e}), using defaults", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("engine config {} is invalid ({e}), using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_policy(mut self, policy: MasteringPolicy) -> Self {
        self.mastering_policy = policy;
        self
    }

    pub fn with_max_analysis_seconds(mut self, seconds: f64) -> Self {
        self.max_analysis_seconds = seconds;
        self
    }

    pub fn with_auto_apply(mut self, enabled: bool) -> Self {
        self.auto_apply_suggestions = enabled;
        self
    }

    pub fn with_preview(mut self, preview: PreviewConfig) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_poll(mut self, max_attempts: u32, interval_ms: u64) -> Self {
        self.poll = PollConfig {
            max_attempts,
            interval_ms,
        };
        self
    }

    /// Worker count actually used
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            (num_cpus::get() / 2).max(1)
        }
    }

    /// Analysis settings with the engine-level duration cap applied
    pub fn analysis_config(&self) -> AnalysisConfig {
        self.analysis.clone().with_max_seconds(self.max_analysis_seconds)
    }
}
