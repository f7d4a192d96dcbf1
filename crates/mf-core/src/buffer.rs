//! Interleaved audio buffer

use crate::error::DecodeError;

/// Audio buffer (f64 for maximum precision, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved samples
    pub samples: Vec<f64>,
    /// Number of channels
    pub channels: usize,
    /// Sample rate
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create an empty buffer
    pub fn new(channels: usize, sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            channels,
            sample_rate,
        }
    }

    /// Create a validated buffer from interleaved samples
    pub fn from_interleaved(
        samples: Vec<f64>,
        channels: usize,
        sample_rate: u32,
    ) -> Result<Self, DecodeError> {
        let buffer = Self {
            samples,
            channels,
            sample_rate,
        };
        buffer.validate()?;
        Ok(buffer)
    }

    /// Create a validated buffer from planar channel data
    ///
    /// Channels shorter than the longest one are zero padded.
    pub fn from_channels(channels: &[Vec<f64>], sample_rate: u32) -> Result<Self, DecodeError> {
        let count = channels.len();
        let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
        let mut samples = vec![0.0; frames * count];
        for (ch, data) in channels.iter().enumerate() {
            for (i, &s) in data.iter().enumerate() {
                samples[i * count + ch] = s;
            }
        }
        Self::from_interleaved(samples, count, sample_rate)
    }

    /// Check that the buffer can be processed
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.channels == 0 {
            return Err(DecodeError::NoChannels);
        }
        if self.sample_rate == 0 {
            return Err(DecodeError::ZeroSampleRate);
        }
        if self.samples.is_empty() {
            return Err(DecodeError::Empty);
        }
        if self.samples.len() % self.channels != 0 {
            return Err(DecodeError::Misaligned {
                len: self.samples.len(),
                channels: self.channels,
            });
        }
        if let Some(index) = self.samples.iter().position(|s| !s.is_finite()) {
            return Err(DecodeError::NonFinite { index });
        }
        Ok(())
    }

    /// Number of frames
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copy out one channel (non-interleaved)
    pub fn channel(&self, channel: usize) -> Vec<f64> {
        if channel >= self.channels {
            return Vec::new();
        }
        self.samples
            .iter()
            .skip(channel)
            .step_by(self.channels)
            .copied()
            .collect()
    }

    /// Split into planar channels
    pub fn to_planar(&self) -> Vec<Vec<f64>> {
        (0..self.channels).map(|ch| self.channel(ch)).collect()
    }

    /// Overwrite one channel from planar data
    pub fn set_channel(&mut self, channel: usize, data: &[f64]) {
        if channel >= self.channels {
            return;
        }
        for (i, &sample) in data.iter().enumerate() {
            let idx = i * self.channels + channel;
            if idx < self.samples.len() {
                self.samples[idx] = sample;
            }
        }
    }

    /// Replace all channels from planar data of equal length
    pub fn write_planar(&mut self, planar: &[Vec<f64>]) {
        for (ch, data) in planar.iter().enumerate() {
            self.set_channel(ch, data);
        }
    }

    /// Mix down to a single channel
    pub fn to_mono(&self) -> Vec<f64> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        let scale = 1.0 / self.channels as f64;
        self.samples
            .chunks_exact(self.channels)
            .map(|frame| frame.iter().sum::<f64>() * scale)
            .collect()
    }

    /// Truncate to at most `seconds` of audio
    pub fn head(&self, seconds: f64) -> AudioBuffer {
        let max_frames = (seconds * self.sample_rate as f64).max(0.0) as usize;
        if max_frames >= self.frames() {
            return self.clone();
        }
        Self {
            samples: self.samples[..max_frames * self.channels].to_vec(),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Apply gain in dB
    pub fn apply_gain(&mut self, gain_db: f64) {
        let gain = crate::db_to_linear(gain_db);
        for s in &mut self.samples {
            *s *= gain;
        }
    }

    /// Peak absolute sample value
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()))
    }

    /// Peak in dBFS
    pub fn peak_db(&self) -> f64 {
        crate::linear_to_db(self.peak())
    }

    /// RMS over all channels
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|s| s * s).sum();
        (sum / self.samples.len() as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_validation() {
        assert_eq!(
            AudioBuffer::from_interleaved(vec![0.0; 4], 0, 44100),
            Err(DecodeError::NoChannels)
        );
        assert_eq!(
            AudioBuffer::from_interleaved(vec![0.0; 3], 2, 44100),
            Err(DecodeError::Misaligned { len: 3, channels: 2 })
        );
        assert_eq!(
            AudioBuffer::from_interleaved(vec![0.0, f64::NAN], 1, 44100),
            Err(DecodeError::NonFinite { index: 1 })
        );
        assert_eq!(
            AudioBuffer::from_interleaved(Vec::new(), 1, 44100),
            Err(DecodeError::Empty)
        );
    }

    #[test]
    fn test_planar_round_trip() {
        let left = vec![0.1, 0.2, 0.3];
        let right = vec![-0.1, -0.2, -0.3];
        let buffer = AudioBuffer::from_channels(&[left.clone(), right.clone()], 48000).unwrap();

        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.channel(0), left);
        assert_eq!(buffer.channel(1), right);
        assert_eq!(buffer.to_mono(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_levels() {
        let mut buffer = AudioBuffer::from_interleaved(vec![0.5, -0.25], 1, 48000).unwrap();
        assert_relative_eq!(buffer.peak(), 0.5);
        assert_relative_eq!(buffer.peak_db(), -6.0206, epsilon = 1e-3);

        buffer.apply_gain(6.0206);
        assert_relative_eq!(buffer.peak(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_head() {
        let buffer = AudioBuffer::from_interleaved(vec![0.1; 200], 2, 100).unwrap();
        let head = buffer.head(0.5);
        assert_eq!(head.frames(), 50);
        assert_eq!(buffer.head(10.0).frames(), 100);
    }
}
