//! Parameter smoothing
//!
//! One-pole exponential smoothing with a floor on the time constant so a
//! parameter change is never applied instantaneously.

/// Shortest allowed smoothing time constant
pub const MIN_SMOOTHING_MS: f64 = 10.0;

/// Smoothed parameter for audio-thread use
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    target: f64,
    current: f64,
    /// Smoothing coefficient for exponential
    coeff: f64,
    min_value: f64,
    max_value: f64,
}

impl SmoothedParam {
    /// Create new smoothed parameter (time constant floored at 10 ms)
    pub fn new(initial_value: f64, smoothing_time_ms: f64, sample_rate: f64) -> Self {
        let samples = (smoothing_time_ms.max(MIN_SMOOTHING_MS) / 1000.0) * sample_rate;
        Self {
            target: initial_value,
            current: initial_value,
            coeff: Self::calculate_coeff(samples),
            min_value: f64::NEG_INFINITY,
            max_value: f64::INFINITY,
        }
    }

    /// Create with value range
    pub fn with_range(
        initial_value: f64,
        smoothing_time_ms: f64,
        sample_rate: f64,
        min: f64,
        max: f64,
    ) -> Self {
        let mut param = Self::new(initial_value.clamp(min, max), smoothing_time_ms, sample_rate);
        param.min_value = min;
        param.max_value = max;
        param
    }

    /// Time constant: reach ~63% of a step in `samples`
    fn calculate_coeff(samples: f64) -> f64 {
        if samples <= 0.0 {
            1.0
        } else {
            1.0 - (-1.0 / samples).exp()
        }
    }

    /// Per-sample coefficient
    pub fn coeff(&self) -> f64 {
        self.coeff
    }

    #[inline]
    pub fn set_target(&mut self, value: f64) {
        if value.is_finite() {
            self.target = value.clamp(self.min_value, self.max_value);
        }
    }

    #[inline]
    pub fn target(&self) -> f64 {
        self.target
    }

    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Jump to a value immediately (initialization and resume only)
    pub fn set_immediate(&mut self, value: f64) {
        if value.is_finite() {
            self.target = value.clamp(self.min_value, self.max_value);
        }
        self.current = self.target;
    }

    /// Snap the current value to the target
    pub fn snap(&mut self) {
        self.current = self.target;
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        (self.current - self.target).abs() > 1e-9
    }

    /// Advance one sample
    #[inline]
    pub fn next(&mut self) -> f64 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Advance `n` samples at once
    #[inline]
    pub fn advance(&mut self, n: usize) -> f64 {
        let remaining = (1.0 - self.coeff).powi(n as i32);
        self.current = self.target + (self.current - self.target) * remaining;
        if !self.is_smoothing() {
            self.current = self.target;
        }
        self.current
    }
}
