// src/synth/audio_node.rs

use crate::synth::audio_context::AudioContext;
use std::sync::{Arc, Mutex};

pub trait AudioNode: Send {
    fn process(&mut self, context: &AudioContext, current_sample: u64) -> f32;

    fn set_parameter(&mut self, _name: &str, _value: f32) {}

    fn connect_input(&mut self, _name: &str, _node: Box<dyn AudioNode>) {}

    /// Detaches the named input. Returns whether anything was removed.
    fn clear_input(&mut self, _input_name: &str) -> bool {
        false
    }

    /// One-shot nodes report true once they will never produce sound again,
    /// so their parent can drop them without extra bookkeeping.
    fn is_finished(&self, _current_sample: u64) -> bool {
        false
    }
}

impl<T> AudioNode for Arc<Mutex<T>>
where
    T: AudioNode + 'static,
{
    fn process(&mut self, context: &AudioContext, current_sample: u64) -> f32 {
        match self.lock() {
            Ok(mut node) => node.process(context, current_sample),
            Err(_) => 0.0,
        }
    }

    fn set_parameter(&mut self, name: &str, value: f32) {
        if let Ok(mut node) = self.lock() {
            node.set_parameter(name, value);
        }
    }

    fn connect_input(&mut self, name: &str, input: Box<dyn AudioNode>) {
        if let Ok(mut node) = self.lock() {
            node.connect_input(name, input);
        }
    }

    fn clear_input(&mut self, name: &str) -> bool {
        match self.lock() {
            Ok(mut node) => node.clear_input(name),
            Err(_) => false,
        }
    }

    fn is_finished(&self, current_sample: u64) -> bool {
        match self.lock() {
            Ok(node) => node.is_finished(current_sample),
            Err(_) => true,
        }
    }
}
