use crate::synth::audio_buffer::AudioBuffer;
use crate::synth::audio_context::AudioContext;
use crate::synth::audio_node::AudioNode;
use std::sync::Arc;

/// Plays a shared [`AudioBuffer`] once, or in a loop, from its start sample
/// until its stop sample.
pub struct BufferSource {
    buffer: Arc<AudioBuffer>,
    looping: bool,
    position: usize,
    start_sample: u64,
    stop_sample: Option<u64>,
    ended: bool,
}

impl BufferSource {
    pub fn new(buffer: Arc<AudioBuffer>) -> Self {
        Self {
            buffer,
            looping: false,
            position: 0,
            start_sample: 0,
            stop_sample: None,
            ended: false,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn start_at(&mut self, sample: u64) {
        self.start_sample = sample;
    }

    pub fn stop_at(&mut self, sample: u64) {
        self.stop_sample = Some(sample);
    }

    pub fn start_sample(&self) -> u64 {
        self.start_sample
    }

    pub fn stop_sample(&self) -> Option<u64> {
        self.stop_sample
    }
}

impl AudioNode for BufferSource {
    fn process(&mut self, _context: &AudioContext, current_sample: u64) -> f32 {
        if current_sample < self.start_sample || self.is_finished(current_sample) {
            return 0.0;
        }

        let data = self.buffer.data();
        if data.is_empty() {
            self.ended = true;
            return 0.0;
        }

        let value = data[self.position];
        self.position += 1;
        if self.position >= data.len() {
            if self.looping {
                self.position = 0;
            } else {
                self.ended = true;
            }
        }

        value
    }

    fn is_finished(&self, current_sample: u64) -> bool {
        self.ended
            || self
                .stop_sample
                .is_some_and(|stop| current_sample >= stop)
    }
}
