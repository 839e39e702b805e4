// src/synth/oscillator.rs

use crate::synth::audio_context::AudioContext;
use crate::synth::audio_node::AudioNode;
use crate::synth::audio_param::AudioParam;
use std::f32::consts::PI;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OscillatorType {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

#[derive(Clone)]
pub struct Oscillator {
    osc_type: OscillatorType,
    frequency: AudioParam,
    gain: AudioParam,
    phase: f32,
    start_sample: u64,
    stop_sample: Option<u64>,
}

impl Oscillator {
    pub fn new(osc_type: OscillatorType) -> Self {
        Self {
            osc_type,
            frequency: AudioParam::new(440.0, 0.01, 22050.0),
            gain: AudioParam::new(1.0, 0.0, 1.0),
            phase: 0.0,
            start_sample: 0,
            stop_sample: None,
        }
    }

    pub fn frequency(&mut self) -> &mut AudioParam {
        &mut self.frequency
    }

    pub fn gain(&mut self) -> &mut AudioParam {
        &mut self.gain
    }

    pub fn start_at(&mut self, sample: u64) {
        self.start_sample = sample;
    }

    pub fn stop_at(&mut self, sample: u64) {
        self.stop_sample = Some(sample);
    }

    fn poly_blep(&self, t: f32, dt: f32) -> f32 {
        if t < dt {
            let t = t / dt;
            2.0 * t - t * t - 1.0
        } else if t > 1.0 - dt {
            let t = (t - 1.0) / dt;
            t * t + 2.0 * t + 1.0
        } else {
            0.0
        }
    }

    fn process_bandlimited(&mut self, sample_rate: f32, current_sample: u64) -> f32 {
        let freq = self.frequency.get_value(current_sample);
        let dt = freq / sample_rate;

        let output = match self.osc_type {
            OscillatorType::Sine => (self.phase * 2.0 * PI).sin(),
            OscillatorType::Square => {
                let mut out = if self.phase < 0.5 { 1.0 } else { -1.0 };
                out += self.poly_blep(self.phase, dt);
                out -= self.poly_blep(fmod(self.phase + 0.5, 1.0), dt);
                out
            }
            OscillatorType::Sawtooth => {
                let mut out = 2.0 * self.phase - 1.0;
                out -= self.poly_blep(self.phase, dt);
                out
            }
            OscillatorType::Triangle => 4.0 * (self.phase - 0.5).abs() - 1.0,
        };

        self.phase += dt;
        self.phase = fmod(self.phase, 1.0);

        output
    }
}

fn fmod(x: f32, y: f32) -> f32 {
    x - (x / y).floor() * y
}

impl AudioNode for Oscillator {
    fn process(&mut self, context: &AudioContext, current_sample: u64) -> f32 {
        if current_sample < self.start_sample || self.is_finished(current_sample) {
            return 0.0;
        }
        let output = self.process_bandlimited(context.sample_rate(), current_sample);
        output * self.gain.get_value(current_sample)
    }

    fn set_parameter(&mut self, name: &str, value: f32) {
        match name {
            "frequency" => self.frequency.set_value(value),
            "gain" => self.gain.set_value(value),
            _ => {}
        }
    }

    fn is_finished(&self, current_sample: u64) -> bool {
        self.stop_sample
            .is_some_and(|stop| current_sample >= stop)
    }
}
