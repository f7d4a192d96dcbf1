//! Short-time Fourier transform helper

use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

/// Hann-windowed real STFT producing amplitude-scaled magnitudes
///
/// Magnitudes are scaled so a full-scale sine centred on a bin reads ~1.0.
pub(crate) struct Stft {
    size: usize,
    fft: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
    scale: f64,
    input: Vec<f64>,
    output: Vec<Complex<f64>>,
    magnitudes: Vec<f64>,
}

impl Stft {
    pub fn new(size: usize) -> Self {
        let size = size.max(16);
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(size);

        // Hann window
        let window: Vec<f64> = (0..size)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * i as f64 / size as f64;
                0.5 * (1.0 - phase.cos())
            })
            .collect();
        let scale = 2.0 / window.iter().sum::<f64>();

        Self {
            input: fft.make_input_vec(),
            output: fft.make_output_vec(),
            magnitudes: vec![0.0; size / 2 + 1],
            size,
            fft,
            window,
            scale,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Frequency of bin `k`
    pub fn bin_hz(&self, k: usize, sample_rate: f64) -> f64 {
        k as f64 * sample_rate / self.size as f64
    }

    /// Bin nearest to `hz`, clamped to the spectrum
    pub fn hz_to_bin(&self, hz: f64, sample_rate: f64) -> usize {
        ((hz * self.size as f64 / sample_rate).round().max(0.0) as usize).min(self.bins() - 1)
    }

    /// Run `f` on the magnitude spectrum of every frame
    ///
    /// Input shorter than one frame is zero padded into a single frame.
    pub fn for_each_frame(&mut self, signal: &[f64], hop: usize, mut f: impl FnMut(&[f64])) {
        let hop = hop.max(1);
        let mut start = 0;
        loop {
            let end = (start + self.size).min(signal.len());
            let frame = &signal[start.min(signal.len())..end];
            for (i, slot) in self.input.iter_mut().enumerate() {
                *slot = frame.get(i).copied().unwrap_or(0.0) * self.window[i];
            }

            if let Err(e) = self.fft.process(&mut self.input, &mut self.output) {
                log::warn!("FFT frame at {start} skipped: {e}");
            } else {
                for (m, c) in self.magnitudes.iter_mut().zip(self.output.iter()) {
                    *m = c.norm() * self.scale;
                }
                f(&self.magnitudes);
            }

            start += hop;
            if start + self.size > signal.len() {
                break;
            }
        }
    }

    /// Mean magnitude spectrum over all frames
    pub fn average_magnitude(&mut self, signal: &[f64], hop: usize) -> Vec<f64> {
        let mut sum = vec![0.0; self.bins()];
        let mut frames = 0usize;
        self.for_each_frame(signal, hop, |mags| {
            for (s, m) in sum.iter_mut().zip(mags) {
                *s += m;
            }
            frames += 1;
        });
        if frames > 0 {
            for s in &mut sum {
                *s /= frames as f64;
            }
        }
        sum
    }
}
