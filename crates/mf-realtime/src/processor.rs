//! Audio-callback side of the preview graph
//!
//! Everything here runs on the playback thread: no locks, no allocation,
//! no logging. Buffers are sized when the chain is built.

use std::sync::Arc;

use portable_atomic::{AtomicF64, Ordering};
use rtrb::Consumer;

use mf_core::{EQ_BAND_COUNT, db_to_linear};
use mf_dsp::{
    BiquadCoeffs, BiquadTDF2, BrickwallLimiter, Compressor, Exciter, FrameProcessor,
    MonoProcessor, Processor, Saturator, SmoothedParam, StereoImager, StereoProcessor,
};

use crate::context::{MAX_CHANNELS, PlaybackFormat};
use crate::params::{MAX_PREVIEW_BOOSTS, PreviewParams};

/// Smoothed parameters are re-applied at this granularity (frames)
pub const CONTROL_BLOCK: usize = 32;

/// Messages from the controller
#[derive(Debug, Clone, Copy)]
pub(crate) enum PreviewCommand {
    Update(PreviewParams),
    Bypass,
    Resume,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SMOOTHING
// ═══════════════════════════════════════════════════════════════════════════════

/// Every continuously variable parameter of the chain
struct Smoothers {
    eq_freq: [SmoothedParam; EQ_BAND_COUNT],
    eq_gain: [SmoothedParam; EQ_BAND_COUNT],
    eq_q: [SmoothedParam; EQ_BAND_COUNT],
    masking_gain: [SmoothedParam; MAX_PREVIEW_BOOSTS],
    makeup: SmoothedParam,
    saturation_mix: SmoothedParam,
    exciter_mix: SmoothedParam,
    width: SmoothedParam,
    loudness_gain: SmoothedParam,
    ceiling: SmoothedParam,
}

impl Smoothers {
    fn new(params: &PreviewParams, smoothing_ms: f64, sample_rate: f64) -> Self {
        let param = |value: f64| SmoothedParam::new(value, smoothing_ms, sample_rate);
        Self {
            eq_freq: std::array::from_fn(|i| param(params.eq[i].frequency)),
            eq_gain: std::array::from_fn(|i| param(params.eq[i].gain)),
            eq_q: std::array::from_fn(|i| param(params.eq[i].q)),
            masking_gain: std::array::from_fn(|i| param(masking_gain(params, i))),
            makeup: param(params.compression.map_or(0.0, |c| c.makeup_gain)),
            saturation_mix: param(params.saturation.map_or(0.0, |s| s.mix)),
            exciter_mix: param(params.exciter.map_or(0.0, |e| e.mix)),
            width: param(params.stereo.map_or(1.0, |s| s.width)),
            loudness_gain: param(params.loudness_gain_db),
            ceiling: param(params.limiter.ceiling),
        }
    }

    fn all_mut(&mut self) -> impl Iterator<Item = &mut SmoothedParam> {
        self.eq_freq
            .iter_mut()
            .chain(self.eq_gain.iter_mut())
            .chain(self.eq_q.iter_mut())
            .chain(self.masking_gain.iter_mut())
            .chain([
                &mut self.makeup,
                &mut self.saturation_mix,
                &mut self.exciter_mix,
                &mut self.width,
                &mut self.loudness_gain,
                &mut self.ceiling,
            ])
    }

    fn set_targets(&mut self, params: &PreviewParams) {
        for i in 0..EQ_BAND_COUNT {
            self.eq_freq[i].set_target(params.eq[i].frequency);
            self.eq_gain[i].set_target(params.eq[i].gain);
            self.eq_q[i].set_target(params.eq[i].q);
        }
        for i in 0..MAX_PREVIEW_BOOSTS {
            self.masking_gain[i].set_target(masking_gain(params, i));
        }
        if let Some(c) = params.compression {
            self.makeup.set_target(c.makeup_gain);
        }
        if let Some(s) = params.saturation {
            self.saturation_mix.set_target(s.mix);
        }
        if let Some(e) = params.exciter {
            self.exciter_mix.set_target(e.mix);
        }
        if let Some(s) = params.stereo {
            self.width.set_target(s.width);
        }
        self.loudness_gain.set_target(params.loudness_gain_db);
        self.ceiling.set_target(params.limiter.ceiling);
    }
}

/// Gain of boost slot `i`; unused slots sit at 0 dB
fn masking_gain(params: &PreviewParams, i: usize) -> f64 {
    if i < params.masking_count {
        params.masking[i].gain_db
    } else {
        0.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN
// ═══════════════════════════════════════════════════════════════════════════════

/// The nine stages in offline order
pub(crate) struct Chain {
    sample_rate: f64,
    channels: usize,
    params: PreviewParams,
    smoothers: Smoothers,
    /// Structural change waiting for the next control block
    dirty: bool,

    eq: Vec<[BiquadTDF2; EQ_BAND_COUNT]>,
    masking: Vec<[BiquadTDF2; MAX_PREVIEW_BOOSTS]>,
    compressor: Compressor,
    saturator: Saturator,
    exciters: Vec<Exciter>,
    imager: StereoImager,
    loudness: f64,
    dynamics: Compressor,
    limiter: BrickwallLimiter,
}

impl Chain {
    pub(crate) fn new(format: PlaybackFormat, params: PreviewParams, smoothing_ms: f64) -> Self {
        let sample_rate = format.sample_rate as f64;
        let channels = format.channels;
        let exciter = params.exciter.unwrap_or_default();

        let mut chain = Self {
            sample_rate,
            channels,
            params,
            smoothers: Smoothers::new(&params, smoothing_ms, sample_rate),
            dirty: false,
            eq: (0..channels).map(|_| std::array::from_fn(|_| BiquadTDF2::new())).collect(),
            masking: (0..channels).map(|_| std::array::from_fn(|_| BiquadTDF2::new())).collect(),
            compressor: Compressor::new(sample_rate),
            saturator: Saturator::from_settings(&params.saturation.unwrap_or_default()),
            exciters: (0..channels).map(|_| Exciter::new(&exciter, sample_rate)).collect(),
            imager: StereoImager::new(sample_rate),
            loudness: 1.0,
            dynamics: Compressor::new(sample_rate),
            limiter: BrickwallLimiter::new(params.limiter.ceiling, params.limiter.release, sample_rate),
        };
        chain.apply_controls();
        chain
    }

    /// Take a new snapshot; smoothed values glide, the rest apply next block
    pub(crate) fn set_params(&mut self, params: PreviewParams) {
        let old = self.params;

        // Stages entering the chain start from clean state
        if old.compression.is_none() && params.compression.is_some() {
            self.compressor.reset();
        }
        if old.exciter.is_none() && params.exciter.is_some() {
            self.exciters.iter_mut().for_each(|e| e.reset());
        }
        if old.stereo.is_none() && params.stereo.is_some() {
            self.imager.reset();
        }
        if old.dynamic_range.is_none() && params.dynamic_range.is_some() {
            self.dynamics.reset();
        }

        self.params = params;
        self.smoothers.set_targets(&params);
        self.dirty = true;
    }

    /// Clear every stage's state and jump to the current targets
    pub(crate) fn reset(&mut self) {
        for filters in self.eq.iter_mut() {
            filters.iter_mut().for_each(|f| f.reset());
        }
        for filters in self.masking.iter_mut() {
            filters.iter_mut().for_each(|f| f.reset());
        }
        self.compressor.reset();
        self.exciters.iter_mut().for_each(|e| e.reset());
        self.imager.reset();
        self.dynamics.reset();
        self.limiter.reset();
        self.smoothers.all_mut().for_each(SmoothedParam::snap);
        self.apply_controls();
        self.dirty = false;
    }

    /// Push current smoothed values and snapshot fields into the processors
    fn apply_controls(&mut self) {
        let sr = self.sample_rate;
        let p = &self.params;
        let s = &self.smoothers;

        for filters in self.eq.iter_mut() {
            for (i, filter) in filters.iter_mut().enumerate() {
                filter.set_coeffs(BiquadCoeffs::eq_band(
                    p.eq[i].band_type,
                    s.eq_freq[i].current(),
                    s.eq_q[i].current(),
                    s.eq_gain[i].current(),
                    sr,
                ));
            }
        }
        for filters in self.masking.iter_mut() {
            for (i, filter) in filters.iter_mut().enumerate() {
                let boost = p.masking[i];
                filter.set_coeffs(BiquadCoeffs::peaking(
                    boost.center_hz,
                    boost.q,
                    s.masking_gain[i].current(),
                    sr,
                ));
            }
        }

        if let Some(c) = p.compression {
            self.compressor
                .set_params(c.threshold, c.ratio, c.attack, c.release, s.makeup.current());
        }
        if let Some(sat) = p.saturation {
            self.saturator.set_type(sat.saturation_type);
            self.saturator.set_drive(sat.drive);
            self.saturator.set_mix(s.saturation_mix.current());
        }
        if let Some(mut e) = p.exciter {
            e.mix = s.exciter_mix.current();
            for exciter in self.exciters.iter_mut() {
                exciter.set_params(&e, sr);
            }
        }
        if let Some(st) = p.stereo {
            self.imager.set_width(s.width.current());
            self.imager.set_bass_mono(st.bass_mono_freq);
            self.imager.set_invert_right(p.invert_right);
        }
        self.loudness = db_to_linear(s.loudness_gain.current());
        if let Some(dr) = p.dynamic_range {
            self.dynamics
                .set_params(dr.threshold, dr.ratio, dr.attack, dr.release, dr.makeup_gain);
        }
        self.limiter.set_params(s.ceiling.current(), p.limiter.release);
    }

    /// Advance smoothing by one control block
    fn tick(&mut self, frames: usize) {
        let mut moving = false;
        for param in self.smoothers.all_mut() {
            if param.is_smoothing() {
                param.advance(frames);
                moving = true;
            }
        }
        if moving || self.dirty {
            self.apply_controls();
            self.dirty = false;
        }
    }

    #[inline]
    fn process_frame(&mut self, frame: &mut [f64]) {
        let p = &self.params;

        for (ch, sample) in frame.iter_mut().enumerate() {
            let mut x = *sample;
            for filter in self.eq[ch].iter_mut() {
                x = filter.process_sample(x);
            }
            for filter in self.masking[ch][..p.masking_count].iter_mut() {
                x = filter.process_sample(x);
            }
            *sample = x;
        }

        if p.compression.is_some() {
            self.compressor.process_frame(frame);
        }
        if p.saturation.is_some() {
            for sample in frame.iter_mut() {
                *sample = self.saturator.process_sample(*sample);
            }
        }
        if p.exciter.is_some() {
            for (sample, exciter) in frame.iter_mut().zip(self.exciters.iter_mut()) {
                *sample = exciter.process_sample(*sample);
            }
        }
        if p.stereo.is_some() && self.channels >= 2 {
            let (l, r) = self.imager.process_sample(frame[0], frame[1]);
            frame[0] = l;
            frame[1] = r;
        }
        if self.loudness != 1.0 {
            for sample in frame.iter_mut() {
                *sample *= self.loudness;
            }
        }
        if p.dynamic_range.is_some() {
            self.dynamics.process_frame(frame);
        }
        self.limiter.process_frame(frame);
    }

    pub(crate) fn process(&mut self, samples: &mut [f64]) {
        let channels = self.channels;
        let whole = samples.len() - samples.len() % channels;
        let (frames, partial) = samples.split_at_mut(whole);
        for block in frames.chunks_mut(CONTROL_BLOCK * channels) {
            self.tick(block.len() / channels);
            for frame in block.chunks_exact_mut(channels) {
                self.process_frame(frame);
            }
        }

        // A trailing partial frame is zero-padded so it still reaches the limiter
        if !partial.is_empty() {
            let mut frame = [0.0; MAX_CHANNELS];
            frame[..partial.len()].copy_from_slice(partial);
            self.tick(1);
            self.process_frame(&mut frame[..channels]);
            partial.copy_from_slice(&frame[..partial.len()]);
        }
    }

    /// Combined compressor and limiter gain reduction (dB)
    pub(crate) fn gain_reduction_db(&self) -> f64 {
        let comp = if self.params.compression.is_some() {
            self.compressor.gain_reduction()
        } else {
            0.0
        };
        comp + self.limiter.gain_reduction()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROCESSOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Audio-callback handle of a preview graph
///
/// Move it to the playback thread and call [`process`](Self::process) with
/// each interleaved buffer.
pub struct PreviewProcessor {
    commands: Consumer<PreviewCommand>,
    /// `None` means passthrough (graph construction failed)
    chain: Option<Box<Chain>>,
    bypassed: bool,
    meter: Arc<AtomicF64>,
}

impl PreviewProcessor {
    pub(crate) fn new(
        commands: Consumer<PreviewCommand>,
        chain: Option<Box<Chain>>,
        meter: Arc<AtomicF64>,
    ) -> Self {
        Self {
            commands,
            chain,
            bypassed: false,
            meter,
        }
    }

    /// Process one interleaved buffer in place
    pub fn process(&mut self, samples: &mut [f64]) {
        self.drain_commands();

        let Some(chain) = self.chain.as_mut() else {
            return;
        };
        if self.bypassed {
            self.meter.store(0.0, Ordering::Relaxed);
            return;
        }
        chain.process(samples);
        self.meter.store(chain.gain_reduction_db(), Ordering::Relaxed);
    }

    /// Audio is passed through untouched because the graph could not be built
    pub fn is_passthrough(&self) -> bool {
        self.chain.is_none()
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                PreviewCommand::Update(params) => {
                    if let Some(chain) = self.chain.as_mut() {
                        chain.set_params(params);
                    }
                }
                PreviewCommand::Bypass => self.bypassed = true,
                PreviewCommand::Resume => {
                    if self.bypassed {
                        self.bypassed = false;
                        if let Some(chain) = self.chain.as_mut() {
                            chain.reset();
                        }
                    }
                }
            }
        }
    }
}
