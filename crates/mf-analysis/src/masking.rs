//! Critical-band masking analysis
//!
//! Each band's energy is compared against a threshold built from the
//! energy of every other band, spread across band distance, and an
//! absolute audibility floor.

use mf_core::{CriticalBand, MaskingAnalysis};

use crate::config::AnalysisConfig;
use crate::stft::Stft;

/// Bark-scale approximation (low Hz, high Hz)
pub const CRITICAL_BANDS: [(f64, f64); 25] = [
    (20.0, 100.0),
    (100.0, 200.0),
    (200.0, 300.0),
    (300.0, 400.0),
    (400.0, 510.0),
    (510.0, 630.0),
    (630.0, 770.0),
    (770.0, 920.0),
    (920.0, 1080.0),
    (1080.0, 1270.0),
    (1270.0, 1480.0),
    (1480.0, 1720.0),
    (1720.0, 2000.0),
    (2000.0, 2320.0),
    (2320.0, 2700.0),
    (2700.0, 3150.0),
    (3150.0, 3700.0),
    (3700.0, 4400.0),
    (4400.0, 5300.0),
    (5300.0, 6400.0),
    (6400.0, 7700.0),
    (7700.0, 9500.0),
    (9500.0, 12000.0),
    (12000.0, 15500.0),
    (15500.0, 20000.0),
];

/// Masker level below its own energy (dB)
const MASKING_OFFSET_DB: f64 = 10.0;
/// Spread per band toward higher bands, masker below (dB)
const UPWARD_SLOPE_DB: f64 = 12.0;
/// Spread per band toward lower bands, masker above (dB)
const DOWNWARD_SLOPE_DB: f64 = 27.0;

/// Below this centre frequency no recommendation is made
const RECOMMENDATION_MIN_HZ: f64 = 100.0;

/// Masking threshold of every band from the band energies (dB)
pub fn masking_thresholds(energies_db: &[f64], floor_db: f64) -> Vec<f64> {
    (0..energies_db.len())
        .map(|i| {
            energies_db
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, &e)| {
                    let distance = i.abs_diff(j) as f64;
                    let slope = if j < i { UPWARD_SLOPE_DB } else { DOWNWARD_SLOPE_DB };
                    e - MASKING_OFFSET_DB - slope * distance
                })
                .fold(floor_db, f64::max)
        })
        .collect()
}

/// Textual boost suggestion for a masked band
pub fn recommendation(center_hz: f64) -> String {
    if center_hz < 500.0 {
        format!("Boost {center_hz:.0}Hz (+2-4dB) - masked low frequencies")
    } else if center_hz < 2000.0 {
        format!("Boost {center_hz:.0}Hz (+1-3dB) - masked midrange")
    } else {
        format!("Boost {center_hz:.0}Hz (+2-5dB) - masked high frequencies")
    }
}

/// Analyze the first `masking_seconds` of a mono signal
pub fn analyze(mono: &[f64], sample_rate: f64, config: &AnalysisConfig) -> MaskingAnalysis {
    let limit = ((config.masking_seconds * sample_rate) as usize).min(mono.len());
    let mut stft = Stft::new(config.masking_fft_size);
    let spectrum = stft.average_magnitude(&mono[..limit], config.masking_hop);
    let nyquist = sample_rate / 2.0;

    let layout: Vec<(f64, f64)> = CRITICAL_BANDS
        .iter()
        .copied()
        .filter(|&(low, _)| low < nyquist)
        .collect();

    let energies_db: Vec<f64> = layout
        .iter()
        .map(|&(low, high)| {
            let lo = stft.hz_to_bin(low, sample_rate);
            let mut hi = stft.hz_to_bin(high, sample_rate);
            if hi <= lo {
                hi = (lo + 1).min(spectrum.len());
            }
            let slice = &spectrum[lo.min(hi)..hi];
            let mean = if slice.is_empty() {
                0.0
            } else {
                slice.iter().sum::<f64>() / slice.len() as f64
            };
            20.0 * (mean + 1e-10).log10()
        })
        .collect();

    let thresholds = masking_thresholds(&energies_db, config.masking_floor_db);

    let bands: Vec<CriticalBand> = layout
        .iter()
        .zip(energies_db.iter().zip(&thresholds))
        .map(|(&(low_hz, high_hz), (&energy_db, &threshold_db))| CriticalBand {
            low_hz,
            high_hz,
            center_hz: (low_hz + high_hz) / 2.0,
            energy_db,
            threshold_db,
            is_masked: energy_db < threshold_db,
        })
        .collect();

    let mut ranked: Vec<&CriticalBand> = bands
        .iter()
        .filter(|b| b.is_masked && b.center_hz > RECOMMENDATION_MIN_HZ)
        .collect();
    ranked.sort_by(|a, b| {
        (b.threshold_db - b.energy_db).total_cmp(&(a.threshold_db - a.energy_db))
    });
    let recommendations = ranked.iter().map(|b| recommendation(b.center_hz)).collect();
    let total_masked_bands = bands.iter().filter(|b| b.is_masked).count();

    log::debug!("masking: {total_masked_bands}/{} bands masked", bands.len());

    MaskingAnalysis {
        bands,
        recommendations,
        total_masked_bands,
    }
}
