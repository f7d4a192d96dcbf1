//! WAV decode/encode via hound
//!
//! Input: 16/24/32-bit integer or 32-bit float PCM. Output is written in
//! the same sample format and bit depth as the input.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use mf_core::AudioBuffer;

/// Sample encoding of a WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub bits_per_sample: u16,
    pub sample_format: SampleFormat,
}

impl WavFormat {
    fn check(self) -> Result<Self> {
        match (self.sample_format, self.bits_per_sample) {
            (SampleFormat::Int, 16 | 24 | 32) | (SampleFormat::Float, 32) => Ok(self),
            (format, bits) => bail!("unsupported WAV format: {bits}-bit {format:?}"),
        }
    }

    fn int_scale(self) -> f64 {
        (1i64 << (self.bits_per_sample - 1)) as f64
    }
}

/// Decoded audio plus its source encoding
#[derive(Debug, Clone)]
pub struct DecodedWav {
    pub audio: AudioBuffer,
    pub format: WavFormat,
}

pub fn read_wav(path: &Path) -> Result<DecodedWav> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let reader = WavReader::new(BufReader::new(file))
        .with_context(|| format!("{} is not a WAV file", path.display()))?;
    decode(reader).with_context(|| format!("failed to decode {}", path.display()))
}

pub fn decode<R: Read>(reader: WavReader<R>) -> Result<DecodedWav> {
    let spec = reader.spec();
    let format = WavFormat {
        bits_per_sample: spec.bits_per_sample,
        sample_format: spec.sample_format,
    }
    .check()?;

    let samples: Vec<f64> = match format.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = format.int_scale();
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let audio = AudioBuffer::from_interleaved(samples, spec.channels as usize, spec.sample_rate)?;
    log::debug!(
        "decoded {} frames, {} ch @ {} Hz, {}-bit {:?}",
        audio.frames(),
        audio.channels,
        audio.sample_rate,
        format.bits_per_sample,
        format.sample_format
    );
    Ok(DecodedWav { audio, format })
}

pub fn write_wav(path: &Path, audio: &AudioBuffer, format: WavFormat) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    encode(BufWriter::new(file), audio, format)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn encode<W: Write + Seek>(writer: W, audio: &AudioBuffer, format: WavFormat) -> Result<()> {
    let format = format.check()?;
    let spec = WavSpec {
        channels: u16::try_from(audio.channels).context("too many channels for WAV")?,
        sample_rate: audio.sample_rate,
        bits_per_sample: format.bits_per_sample,
        sample_format: format.sample_format,
    };
    let mut writer = WavWriter::new(writer, spec)?;

    match format.sample_format {
        SampleFormat::Float => {
            for &sample in &audio.samples {
                writer.write_sample(sample as f32)?;
            }
        }
        SampleFormat::Int => {
            let max = format.int_scale() - 1.0;
            for &sample in &audio.samples {
                let value = (sample.clamp(-1.0, 1.0) * max).round();
                match format.bits_per_sample {
                    16 => writer.write_sample(value as i16)?,
                    _ => writer.write_sample(value as i32)?,
                }
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ramp() -> AudioBuffer {
        let samples = (0..200).map(|i| (i as f64 / 100.0) - 1.0).collect();
        AudioBuffer::from_interleaved(samples, 2, 44100).unwrap()
    }

    fn through(format: WavFormat) -> DecodedWav {
        let mut bytes = Cursor::new(Vec::new());
        encode(&mut bytes, &ramp(), format).unwrap();
        bytes.set_position(0);
        decode(WavReader::new(bytes).unwrap()).unwrap()
    }

    #[test]
    fn test_24_bit_keeps_format_and_precision() {
        let format = WavFormat {
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        let decoded = through(format);
        assert_eq!(decoded.format, format);
        assert_eq!(decoded.audio.channels, 2);
        assert_eq!(decoded.audio.frames(), 100);
        for (a, b) in ramp().samples.iter().zip(&decoded.audio.samples) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_float_is_exact_for_f32_values() {
        let decoded = through(WavFormat {
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        });
        assert_eq!(decoded.audio.samples[150], 0.5);
    }

    #[test]
    fn test_8_bit_is_rejected() {
        let mut bytes = Cursor::new(Vec::new());
        let format = WavFormat {
            bits_per_sample: 8,
            sample_format: SampleFormat::Int,
        };
        assert!(encode(&mut bytes, &ramp(), format).is_err());
    }
}
