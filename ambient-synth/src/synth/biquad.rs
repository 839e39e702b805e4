use crate::synth::audio_context::AudioContext;
use crate::synth::audio_node::AudioNode;
use std::f32::consts::{FRAC_1_SQRT_2, PI};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterType {
    LowPass,
    BandPass,
}

impl FilterType {
    fn default_q(self) -> f32 {
        match self {
            Self::LowPass => FRAC_1_SQRT_2,
            Self::BandPass => 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    /// RBJ cookbook coefficients, normalised by a0.
    fn compute(filter_type: FilterType, cutoff: f32, q: f32, sample_rate: f32) -> Self {
        let sample_rate = sample_rate.max(1.0);
        let cutoff = cutoff.max(1.0).min(sample_rate * 0.49);
        let q = q.max(0.01);

        let omega = 2.0 * PI * cutoff / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);

        let (b0, b1, b2) = match filter_type {
            FilterType::LowPass => (
                (1.0 - cos_omega) / 2.0,
                1.0 - cos_omega,
                (1.0 - cos_omega) / 2.0,
            ),
            // constant 0 dB peak gain
            FilterType::BandPass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// Two-pole IIR filter (Direct Form I) over the sum of its inputs.
pub struct BiquadFilter {
    filter_type: FilterType,
    frequency: f32,
    q: f32,
    coefficients: Option<(f32, Coefficients)>,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
    inputs: Vec<(String, Box<dyn AudioNode>)>,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, frequency: f32) -> Self {
        Self {
            filter_type,
            frequency,
            q: filter_type.default_q(),
            coefficients: None,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            inputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, name: &str, node: Box<dyn AudioNode>) -> Self {
        self.connect_input(name, node);
        self
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    fn coefficients_for(&mut self, sample_rate: f32) -> Coefficients {
        match self.coefficients {
            Some((rate, coefficients)) if rate == sample_rate => coefficients,
            _ => {
                let coefficients =
                    Coefficients::compute(self.filter_type, self.frequency, self.q, sample_rate);
                self.coefficients = Some((sample_rate, coefficients));
                coefficients
            }
        }
    }
}

impl AudioNode for BiquadFilter {
    fn process(&mut self, context: &AudioContext, current_sample: u64) -> f32 {
        let input: f32 = self
            .inputs
            .iter_mut()
            .map(|(_, node)| node.process(context, current_sample))
            .sum();

        let c = self.coefficients_for(context.sample_rate());
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2
            - c.a1 * self.y1
            - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn set_parameter(&mut self, name: &str, value: f32) {
        match name {
            "frequency" => self.frequency = value,
            "q" => self.q = value,
            _ => return,
        }
        self.coefficients = None;
    }

    fn connect_input(&mut self, name: &str, node: Box<dyn AudioNode>) {
        self.inputs.retain(|(existing, _)| existing != name);
        self.inputs.push((name.to_string(), node));
    }

    fn clear_input(&mut self, input_name: &str) -> bool {
        let before = self.inputs.len();
        self.inputs.retain(|(existing, _)| existing != input_name);
        self.inputs.len() != before
    }

    fn is_finished(&self, current_sample: u64) -> bool {
        !self.inputs.is_empty()
            && self
                .inputs
                .iter()
                .all(|(_, node)| node.is_finished(current_sample))
    }
}
