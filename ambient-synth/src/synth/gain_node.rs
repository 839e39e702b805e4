use crate::synth::audio_context::AudioContext;
use crate::synth::audio_node::AudioNode;
use crate::synth::audio_param::AudioParam;
use std::collections::HashMap;

/// Inputs are checked for completion every this many samples.
const PRUNE_INTERVAL: u64 = 128;

/// Sums its named inputs and scales the result by an automatable gain.
pub struct GainNode {
    gain: AudioParam,
    inputs: HashMap<String, Box<dyn AudioNode>>,
    finish_when_drained: bool,
}

impl GainNode {
    pub fn new(gain: f32) -> Self {
        Self {
            gain: AudioParam::new(gain, 0.0, 10.0),
            inputs: HashMap::new(),
            finish_when_drained: false,
        }
    }

    /// A gain stage for a one-shot voice: it reports finished once every
    /// input has finished.
    pub fn one_shot(gain: f32) -> Self {
        Self {
            finish_when_drained: true,
            ..Self::new(gain)
        }
    }

    pub fn with_input(mut self, name: &str, node: Box<dyn AudioNode>) -> Self {
        self.inputs.insert(name.to_string(), node);
        self
    }

    pub fn gain(&mut self) -> &mut AudioParam {
        &mut self.gain
    }

    pub fn gain_value_at(&self, sample: u64) -> f32 {
        self.gain.value_at(sample)
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    /// Drops every input that has finished playing.
    pub fn prune_finished(&mut self, current_sample: u64) {
        self.inputs
            .retain(|_, node| !node.is_finished(current_sample));
    }
}

impl AudioNode for GainNode {
    fn process(&mut self, context: &AudioContext, current_sample: u64) -> f32 {
        if current_sample % PRUNE_INTERVAL == 0 {
            self.prune_finished(current_sample);
        }

        let input_signal: f32 = self
            .inputs
            .values_mut()
            .map(|node| node.process(context, current_sample))
            .sum();

        input_signal * self.gain.get_value(current_sample)
    }

    fn set_parameter(&mut self, name: &str, value: f32) {
        match name {
            "gain" => self.gain.set_value(value),
            _ => log::debug!("GainNode: unknown parameter '{}'", name),
        }
    }

    fn connect_input(&mut self, name: &str, node: Box<dyn AudioNode>) {
        self.inputs.insert(name.to_string(), node);
    }

    fn clear_input(&mut self, input_name: &str) -> bool {
        self.inputs.remove(input_name).is_some()
    }

    fn is_finished(&self, current_sample: u64) -> bool {
        self.finish_when_drained
            && self
                .inputs
                .values()
                .all(|node| node.is_finished(current_sample))
    }
}
