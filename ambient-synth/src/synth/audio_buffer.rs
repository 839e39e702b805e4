use rand::Rng;

/// Upper bound on the length of a resampled buffer.
const MAX_RESAMPLED_SECONDS: f64 = 600.0;

/// A mono block of decoded or generated samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: f32,
    data: Vec<f32>,
}

impl AudioBuffer {
    pub fn new(sample_rate: f32, data: Vec<f32>) -> Self {
        Self { sample_rate, data }
    }

    /// Uniform white noise in `[-amplitude, amplitude)`, at least one sample long.
    pub fn noise<R: Rng>(
        sample_rate: f32,
        seconds: f32,
        amplitude: f32,
        rng: &mut R,
    ) -> Self {
        let len = ((seconds * sample_rate).floor() as usize).max(1);
        let data = (0..len)
            .map(|_| (rng.random::<f32>() * 2.0 - 1.0) * amplitude)
            .collect();
        Self { sample_rate, data }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// False for rates that cannot be played or resampled: zero, negative,
    /// NaN or infinite.
    pub fn has_valid_rate(&self) -> bool {
        self.sample_rate.is_finite() && self.sample_rate > 0.0
    }

    pub fn duration(&self) -> f32 {
        self.data.len() as f32 / self.sample_rate
    }

    /// Linear-interpolated copy at `target_rate`, at most ten minutes long.
    /// Returns the data unchanged when the rates already match or either
    /// rate is unusable.
    pub fn resampled(&self, target_rate: f32) -> Self {
        let target_valid = target_rate.is_finite() && target_rate > 0.0;
        if (self.sample_rate - target_rate).abs() < f32::EPSILON
            || self.data.is_empty()
            || !self.has_valid_rate()
            || !target_valid
        {
            return Self::new(target_rate, self.data.clone());
        }

        let ratio = self.sample_rate as f64 / target_rate as f64;
        let max_len = (MAX_RESAMPLED_SECONDS * target_rate as f64).max(1.0);
        let out_len = ((self.data.len() as f64) / ratio)
            .floor()
            .clamp(1.0, max_len) as usize;
        let last = self.data.len() - 1;

        let data = (0..out_len)
            .map(|i| {
                let pos = i as f64 * ratio;
                let index = (pos.floor() as usize).min(last);
                let next = (index + 1).min(last);
                let frac = (pos - index as f64) as f32;
                self.data[index] + (self.data[next] - self.data[index]) * frac
            })
            .collect();

        Self::new(target_rate, data)
    }
}
