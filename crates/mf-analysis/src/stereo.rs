//! Stereo field analysis

use mf_core::{AudioBuffer, StereoAnalysis};
use mf_dsp::correlation;

use crate::config::AnalysisConfig;

/// Side energy below this fraction of mid energy counts as mono
const MONO_SIDE_RATIO: f64 = 1e-8;
/// Phase coherence is measured on at most this many seconds
const COHERENCE_SECONDS: f64 = 10.0;

pub const MONO_RECOMMENDATION: &str = "Track is mono - consider stereo enhancement";

fn mean_square(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        0.0
    } else {
        signal.iter().map(|x| x * x).sum::<f64>() / signal.len() as f64
    }
}

#[inline]
fn energy_db(mean_square: f64) -> f64 {
    20.0 * (mean_square.sqrt() + 1e-10).log10()
}

/// Peak normalized cross-correlation magnitude within `max_lag` samples
pub fn phase_coherence(left: &[f64], right: &[f64], max_lag: usize) -> f64 {
    let n = left.len().min(right.len());
    let energy_l: f64 = left[..n].iter().map(|x| x * x).sum();
    let energy_r: f64 = right[..n].iter().map(|x| x * x).sum();
    let norm = (energy_l * energy_r).sqrt();
    if norm < 1e-20 {
        return 1.0;
    }

    let max_lag = max_lag.min(n.saturating_sub(1));
    let mut best = 0.0_f64;
    for lag in 0..=max_lag {
        // Both lag directions
        let forward: f64 = left[lag..n].iter().zip(&right[..n - lag]).map(|(l, r)| l * r).sum();
        let backward: f64 = left[..n - lag].iter().zip(&right[lag..n]).map(|(l, r)| l * r).sum();
        best = best.max(forward.abs()).max(backward.abs());
    }
    (best / norm).min(1.0)
}

/// Recommendations for a measured stereo field
pub fn recommendations(width: f64, balance: f64, correlation: f64, coherence: f64) -> Vec<String> {
    let mut out = Vec::new();

    if width < 0.1 {
        out.push("Very narrow stereo image - increase stereo width (+20-40%)".to_string());
    } else if width > 2.0 {
        out.push("Overly wide stereo image - reduce width (-10-20%)".to_string());
    }

    if balance.abs() > 0.1 {
        let side = if balance > 0.0 { "right" } else { "left" };
        out.push(format!(
            "Stereo imbalance detected - {side} channel louder ({:.1}%)",
            balance.abs() * 100.0
        ));
    }

    if correlation < 0.7 {
        out.push("Low stereo correlation - check phase issues".to_string());
    } else if correlation > 0.95 {
        out.push("Very high correlation - consider stereo enhancement".to_string());
    }

    if coherence < 0.8 {
        out.push("Phase coherence issues detected - check stereo alignment".to_string());
    }

    out
}

fn mono_result(mid_energy: f64, side_energy: f64) -> StereoAnalysis {
    StereoAnalysis {
        width: 0.0,
        correlation: 1.0,
        balance: 0.0,
        mid_energy_db: energy_db(mid_energy),
        side_energy_db: energy_db(side_energy),
        phase_coherence: 1.0,
        is_mono: true,
        recommendations: vec![MONO_RECOMMENDATION.to_string()],
    }
}

/// Analyze the stereo field of a buffer (first two channels)
pub fn analyze(buffer: &AudioBuffer, config: &AnalysisConfig) -> StereoAnalysis {
    if buffer.channels < 2 {
        return mono_result(mean_square(&buffer.channel(0)), 0.0);
    }

    let left = buffer.channel(0);
    let right = buffer.channel(1);

    let (mid, side): (Vec<f64>, Vec<f64>) = left
        .iter()
        .zip(&right)
        .map(|(l, r)| ((l + r) * 0.5, (l - r) * 0.5))
        .unzip();
    let mid_energy = mean_square(&mid);
    let side_energy = mean_square(&side);

    if side_energy <= mid_energy * MONO_SIDE_RATIO {
        log::debug!("stereo: side channel negligible, treating as mono");
        return mono_result(mid_energy, side_energy);
    }

    let width = side_energy / (mid_energy + 1e-10);
    let corr = correlation(&left, &right);
    let left_energy = mean_square(&left);
    let right_energy = mean_square(&right);
    let balance = (right_energy - left_energy) / (right_energy + left_energy + 1e-10);

    let sr = buffer.sample_rate as f64;
    let window = ((COHERENCE_SECONDS * sr) as usize).min(left.len());
    let max_lag = (config.coherence_max_lag_ms / 1000.0 * sr).round() as usize;
    let coherence = phase_coherence(&left[..window], &right[..window], max_lag);

    StereoAnalysis {
        width,
        correlation: corr,
        balance,
        mid_energy_db: energy_db(mid_energy),
        side_energy_db: energy_db(side_energy),
        phase_coherence: coherence,
        is_mono: false,
        recommendations: recommendations(width, balance, corr, coherence),
    }
}
