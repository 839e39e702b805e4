/// Floor used for exponential targets; exponential curves cannot reach zero.
pub const EXPONENTIAL_FLOOR: f32 = 0.00001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RampType {
    Step,
    Linear,
    Exponential,
}

#[derive(Debug, Clone)]
struct AutomationEvent {
    value: f32,
    sample: u64,
    ramp_type: RampType,
}

/// An automatable value driven by the sample clock.
///
/// Events are kept sorted by sample. A ramp interpolates from the previous
/// event (or from the anchor left behind by `set_value` and by pruning) to its
/// own target, reaching it exactly at its sample index.
#[derive(Debug, Clone)]
pub struct AudioParam {
    min_value: f32,
    max_value: f32,
    anchor_sample: u64,
    anchor_value: f32,
    events: Vec<AutomationEvent>,
}

impl AudioParam {
    pub fn new(default_value: f32, min_value: f32, max_value: f32) -> Self {
        Self {
            min_value,
            max_value,
            anchor_sample: 0,
            anchor_value: default_value,
            events: Vec::new(),
        }
    }

    /// Sets the value immediately and drops every scheduled event.
    pub fn set_value(&mut self, value: f32) {
        let value = self.clamp_value(value);
        self.anchor_sample = 0;
        self.anchor_value = value;
        self.events.clear();
    }

    pub fn set_value_at_time(&mut self, value: f32, sample: u64) {
        let value = self.clamp_value(value);
        self.insert(AutomationEvent {
            value,
            sample,
            ramp_type: RampType::Step,
        });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_sample: u64) {
        let value = self.clamp_value(value);
        self.insert(AutomationEvent {
            value,
            sample: end_sample,
            ramp_type: RampType::Linear,
        });
    }

    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, end_sample: u64) {
        let value = self.clamp_value(value.max(EXPONENTIAL_FLOOR));
        self.insert(AutomationEvent {
            value,
            sample: end_sample,
            ramp_type: RampType::Exponential,
        });
    }

    /// Removes every event scheduled at or after `sample`.
    pub fn cancel_scheduled_values(&mut self, sample: u64) {
        self.events.retain(|event| event.sample < sample);
    }

    /// Value of the timeline at `sample` without consuming any events.
    pub fn value_at(&self, sample: u64) -> f32 {
        let mut prev_sample = self.anchor_sample;
        let mut prev_value = self.anchor_value;

        for event in &self.events {
            if sample < event.sample {
                let span = event.sample.saturating_sub(prev_sample);
                if span == 0 {
                    return prev_value;
                }
                let t = sample.saturating_sub(prev_sample) as f32 / span as f32;
                return match event.ramp_type {
                    RampType::Step => prev_value,
                    RampType::Linear => prev_value + (event.value - prev_value) * t,
                    RampType::Exponential => {
                        if prev_value > 0.0 && event.value > 0.0 {
                            prev_value * (event.value / prev_value).powf(t)
                        } else {
                            prev_value
                        }
                    }
                };
            }
            prev_sample = event.sample;
            prev_value = event.value;
        }

        prev_value
    }

    /// Value at `sample`, retiring events that lie entirely in the past.
    pub fn get_value(&mut self, sample: u64) -> f32 {
        let value = self.value_at(sample);

        let elapsed = self
            .events
            .iter()
            .take_while(|event| event.sample <= sample)
            .count();
        if elapsed > 0 {
            let last = &self.events[elapsed - 1];
            self.anchor_sample = last.sample;
            self.anchor_value = last.value;
            self.events.drain(..elapsed);
        }

        value
    }

    fn insert(&mut self, event: AutomationEvent) {
        let index = self.events.partition_point(|e| e.sample <= event.sample);
        self.events.insert(index, event);
    }

    fn clamp_value(&self, value: f32) -> f32 {
        value.clamp(self.min_value, self.max_value)
    }
}
