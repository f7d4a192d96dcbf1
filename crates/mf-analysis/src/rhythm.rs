//! Tempo and key estimation

/// Tempo reported when no periodicity is found
pub const DEFAULT_TEMPO: f64 = 120.0;

const MIN_BPM: f64 = 60.0;
const MAX_BPM: f64 = 180.0;

/// Key reported when the chroma is flat
pub const UNKNOWN_KEY: &str = "C major";

const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Krumhansl-Kessler key profiles, tonic first
const MAJOR_PROFILE: [f64; 12] = [6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88];
const MINOR_PROFILE: [f64; 12] = [6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17];

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPO
// ═══════════════════════════════════════════════════════════════════════════════

/// Estimate BPM from an onset envelope sampled at `frame_rate` Hz
///
/// Autocorrelation over the 60-180 BPM lag range, weighted by a
/// log-normal preference centred on 120 BPM.
pub fn estimate_tempo(onset_envelope: &[f64], frame_rate: f64) -> f64 {
    if onset_envelope.len() < 8 || frame_rate <= 0.0 {
        return DEFAULT_TEMPO;
    }

    let mean = onset_envelope.iter().sum::<f64>() / onset_envelope.len() as f64;
    let centred: Vec<f64> = onset_envelope.iter().map(|x| x - mean).collect();
    let energy: f64 = centred.iter().map(|x| x * x).sum();
    if energy < 1e-9 {
        return DEFAULT_TEMPO;
    }

    let min_lag = (frame_rate * 60.0 / MAX_BPM).floor().max(1.0) as usize;
    let max_lag = ((frame_rate * 60.0 / MIN_BPM).ceil() as usize).min(centred.len() - 1);
    if min_lag >= max_lag {
        return DEFAULT_TEMPO;
    }

    let mut best: Option<(f64, f64, f64)> = None; // (score, raw, bpm)
    for lag in min_lag..=max_lag {
        let raw: f64 = centred[..centred.len() - lag]
            .iter()
            .zip(&centred[lag..])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / energy;
        let bpm = 60.0 * frame_rate / lag as f64;
        let prior = (-0.5 * (bpm / DEFAULT_TEMPO).log2().powi(2)).exp();
        let score = raw * prior;
        if best.is_none_or(|(s, _, _)| score > s) {
            best = Some((score, raw, bpm));
        }
    }

    match best {
        Some((_, raw, bpm)) if raw >= 0.1 => bpm,
        _ => DEFAULT_TEMPO,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Fold a magnitude spectrum into a 12-bin chroma vector
pub fn chroma(spectrum: &[f64], bin_hz: f64) -> [f64; 12] {
    let mut chroma = [0.0; 12];
    for (k, m) in spectrum.iter().enumerate() {
        let f = k as f64 * bin_hz;
        if !(50.0..=5000.0).contains(&f) {
            continue;
        }
        let midi = 69.0 + 12.0 * (f / 440.0).log2();
        let pitch = (midi.round() as i64).rem_euclid(12) as usize;
        chroma[pitch] += m * m;
    }
    chroma
}

fn pearson(a: &[f64; 12], b: &[f64; 12]) -> f64 {
    let ma = a.iter().sum::<f64>() / 12.0;
    let mb = b.iter().sum::<f64>() / 12.0;
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for i in 0..12 {
        cov += (a[i] - ma) * (b[i] - mb);
        va += (a[i] - ma).powi(2);
        vb += (b[i] - mb).powi(2);
    }
    if va <= 0.0 || vb <= 0.0 {
        0.0
    } else {
        cov / (va * vb).sqrt()
    }
}

/// Best-matching key for a chroma vector, e.g. "A minor"
pub fn estimate_key(chroma: &[f64; 12]) -> String {
    if chroma.iter().sum::<f64>() <= 1e-12 {
        return UNKNOWN_KEY.to_string();
    }

    let mut best = (f64::NEG_INFINITY, 0usize, "major");
    for tonic in 0..12 {
        let mut rotated = [0.0; 12];
        for (i, slot) in rotated.iter_mut().enumerate() {
            *slot = chroma[(tonic + i) % 12];
        }
        for (mode, profile) in [("major", &MAJOR_PROFILE), ("minor", &MINOR_PROFILE)] {
            let r = pearson(&rotated, profile);
            if r > best.0 {
                best = (r, tonic, mode);
            }
        }
    }

    format!("{} {}", PITCH_NAMES[best.1], best.2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_click_track_tempo() {
        // 100 fps envelope with a click every 0.5 s: 120 BPM
        let frame_rate = 100.0;
        let envelope: Vec<f64> = (0..1000).map(|i| if i % 50 == 0 { 1.0 } else { 0.0 }).collect();
        assert_abs_diff_eq!(estimate_tempo(&envelope, frame_rate), 120.0, epsilon = 1.0);
    }

    #[test]
    fn test_slow_click_track() {
        // A click every 0.6 s: 100 BPM
        let envelope: Vec<f64> = (0..1200).map(|i| if i % 60 == 0 { 1.0 } else { 0.0 }).collect();
        assert_abs_diff_eq!(estimate_tempo(&envelope, 100.0), 100.0, epsilon = 1.0);
    }

    #[test]
    fn test_flat_envelope_falls_back() {
        assert_eq!(estimate_tempo(&[0.3; 500], 86.0), DEFAULT_TEMPO);
        assert_eq!(estimate_tempo(&[], 86.0), DEFAULT_TEMPO);
    }

    #[test]
    fn test_a_minor_triad() {
        let mut chroma = [0.0; 12];
        chroma[9] = 1.0; // A
        chroma[0] = 0.8; // C
        chroma[4] = 0.8; // E
        assert_eq!(estimate_key(&chroma), "A minor");
    }

    #[test]
    fn test_c_major_triad() {
        let mut chroma = [0.0; 12];
        chroma[0] = 1.0;
        chroma[4] = 0.8;
        chroma[7] = 0.8;
        assert_eq!(estimate_key(&chroma), "C major");
    }

    #[test]
    fn test_chroma_of_a440() {
        let bin_hz = 10.0;
        let mut spectrum = vec![0.0; 200];
        spectrum[44] = 1.0;
        let c = chroma(&spectrum, bin_hz);
        assert_eq!(c[9], 1.0);
        assert_eq!(c.iter().sum::<f64>(), 1.0);
    }
}
