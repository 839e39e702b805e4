use atomic::Atomic;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle of an [`AudioContext`]. Contexts start suspended, the way a
/// browser audio context does before the first user gesture.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

pub struct AudioContext {
    sample_rate: f32,
    current_sample: AtomicU64,
    state: Atomic<ContextState>,
}

impl AudioContext {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            current_sample: AtomicU64::new(0),
            state: Atomic::new(ContextState::Suspended),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        self.state.load(Ordering::SeqCst)
    }

    pub fn set_state(&self, state: ContextState) {
        self.state.store(state, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.state() == ContextState::Running
    }

    pub fn increment_samples(&self, n: u64) {
        self.current_sample.fetch_add(n, Ordering::Relaxed);
    }

    pub fn current_sample(&self) -> u64 {
        self.current_sample.load(Ordering::Relaxed)
    }

    /// Clock position in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_sample() as f64 / self.sample_rate as f64
    }

    /// Converts a duration in seconds to a whole number of samples at this
    /// context's rate. Negative durations map to zero.
    pub fn seconds_to_samples(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate as f64).round() as u64
    }

    /// Absolute sample index `seconds` after the current position.
    pub fn sample_after(&self, seconds: f64) -> u64 {
        self.current_sample() + self.seconds_to_samples(seconds)
    }
}
