//! Named frequency bands
//!
//! Energy is the mean spectral magnitude inside each band. Labels compare
//! each band's share of the total against the share pink noise would have.

use mf_core::{BandEnergy, BandLabel, FrequencyAnalysis};

use crate::config::AnalysisConfig;
use crate::stft::Stft;

/// (name, low Hz, high Hz)
pub const NAMED_BANDS: [(&str, f64, f64); 7] = [
    ("sub_bass", 20.0, 60.0),
    ("bass", 60.0, 250.0),
    ("low_mid", 250.0, 500.0),
    ("mid", 500.0, 2000.0),
    ("high_mid", 2000.0, 4000.0),
    ("presence", 4000.0, 6000.0),
    ("brilliance", 6000.0, 20000.0),
];

/// Share below this multiple of the reference asks for a boost
const BOOST_RATIO: f64 = 0.5;
/// Share above this multiple of the reference asks for a cut
const CUT_RATIO: f64 = 2.0;

/// Band shares of a 1/f power (pink) spectrum
pub fn pink_reference() -> [f64; 7] {
    // Mean of f^-1/2 over [a, b]
    let mut energies = [0.0; 7];
    for (e, (_, lo, hi)) in energies.iter_mut().zip(NAMED_BANDS) {
        *e = 2.0 * (hi.sqrt() - lo.sqrt()) / (hi - lo);
    }
    let total: f64 = energies.iter().sum();
    energies.map(|e| e / total)
}

fn label_for(share: f64, reference: f64) -> BandLabel {
    if share < reference * BOOST_RATIO {
        BandLabel::Boost
    } else if share > reference * CUT_RATIO {
        BandLabel::Cut
    } else {
        BandLabel::Ok
    }
}

/// Band analysis plus the average spectrum it was computed from
#[derive(Debug, Clone)]
pub struct BandPass {
    pub analysis: FrequencyAnalysis,
    pub spectrum: Vec<f64>,
    pub bin_hz: f64,
}

/// Analyze the first `band_seconds` of a mono signal
pub fn analyze(mono: &[f64], sample_rate: f64, config: &AnalysisConfig) -> BandPass {
    let limit = ((config.band_seconds * sample_rate) as usize).min(mono.len());
    let mut stft = Stft::new(config.band_fft_size);
    let hop = (stft.size() / 4).max(1);
    let spectrum = stft.average_magnitude(&mono[..limit], hop);
    let bin_hz = stft.bin_hz(1, sample_rate);

    let energies: Vec<f64> = NAMED_BANDS
        .iter()
        .map(|&(_, lo, hi)| {
            let (sum, count) = spectrum
                .iter()
                .enumerate()
                .filter(|(k, _)| {
                    let f = *k as f64 * bin_hz;
                    f >= lo && f < hi
                })
                .fold((0.0, 0usize), |(s, c), (_, m)| (s + m, c + 1));
            if count == 0 { 0.0 } else { sum / count as f64 }
        })
        .collect();
    let total: f64 = energies.iter().sum();
    let reference = pink_reference();

    let bands = NAMED_BANDS
        .iter()
        .zip(energies)
        .zip(reference)
        .map(|((&(name, low_hz, high_hz), energy), reference)| {
            let share = if total > 0.0 { energy / total } else { 0.0 };
            BandEnergy {
                name: name.to_string(),
                low_hz,
                high_hz,
                energy,
                share,
                label: if total > 0.0 { label_for(share, reference) } else { BandLabel::Ok },
            }
        })
        .collect();

    let dominant_bin = spectrum
        .iter()
        .enumerate()
        .skip(1)
        .fold((0usize, f64::NEG_INFINITY), |best, (k, &m)| if m > best.1 { (k, m) } else { best })
        .0;

    BandPass {
        analysis: FrequencyAnalysis {
            bands,
            dominant_frequency: dominant_bin as f64 * bin_hz,
        },
        spectrum,
        bin_hz,
    }
}
