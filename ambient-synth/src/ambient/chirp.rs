use super::presets::PresetDefinition;
use crate::synth::{
    AudioBuffer, AudioContext, AudioNode, AudioParam, BiquadFilter, BufferSource, FilterType,
    GainNode, Oscillator, OscillatorType,
};
use rand::Rng;
use std::fmt;
use std::sync::Arc;

/// Every envelope decays to this level instead of zero.
const ENVELOPE_FLOOR: f32 = 0.0001;

/// One of the foreground sounds a scene can drop on top of its noise bed.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ChirpKind {
    /// Soft pitched call from a single oscillator.
    Tone,
    /// Long low-passed noise swell.
    Rumble,
    /// Two gliding oscillators through a band-pass filter.
    Bird,
    /// Very short percussive noise grain.
    Grain,
    /// Generic filtered noise burst.
    #[default]
    Noise,
}

impl ChirpKind {
    /// Parses an event type name. Anything unknown is a plain noise burst.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "tone" => Self::Tone,
            "rumble" => Self::Rumble,
            "bird" => Self::Bird,
            "grain" => Self::Grain,
            _ => Self::Noise,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tone => "tone",
            Self::Rumble => "rumble",
            Self::Bird => "bird",
            Self::Grain => "grain",
            Self::Noise => "noise",
        }
    }

    fn default_len(self) -> f32 {
        match self {
            Self::Tone => 0.08,
            Self::Rumble => 1.0,
            Self::Bird => 0.14,
            Self::Grain => 0.03,
            Self::Noise => 0.35,
        }
    }

    fn default_amp(self) -> f32 {
        match self {
            Self::Tone | Self::Rumble => 0.02,
            Self::Bird => 0.03,
            Self::Grain => 0.06,
            Self::Noise => 0.04,
        }
    }

    fn attack_secs(self) -> f32 {
        match self {
            Self::Tone => 0.006,
            Self::Rumble => 0.02,
            Self::Bird => 0.005,
            Self::Grain => 0.002,
            Self::Noise => 0.01,
        }
    }

    /// How long after the envelope ends the sources are stopped.
    fn tail_secs(self) -> f32 {
        match self {
            Self::Grain => 0.01,
            _ => 0.02,
        }
    }
}

impl fmt::Display for ChirpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open uniform range `[min, max)`. A degenerate range always yields `min`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformRange {
    pub min: f32,
    pub max: f32,
}

impl UniformRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        self.min + rng.random::<f32>() * (self.max - self.min)
    }

    pub fn contains(&self, value: f32) -> bool {
        if self.max > self.min {
            value >= self.min && value < self.max
        } else {
            value == self.min
        }
    }
}

const AMP_JITTER: UniformRange = UniformRange::new(0.0, 0.01);
const FALLBACK_LEN: UniformRange = UniformRange::new(0.18, 0.63);
const TONE_SCALE: UniformRange = UniformRange::new(0.5, 1.4);
const RUMBLE_LEN: UniformRange = UniformRange::new(0.6, 1.8);
const BIRD_BASE: UniformRange = UniformRange::new(1800.0, 3000.0);
const BIRD_LOW_START: UniformRange = UniformRange::new(0.9, 1.15);
const BIRD_LOW_END: UniformRange = UniformRange::new(0.4, 1.0);
const BIRD_HIGH_START: UniformRange = UniformRange::new(1.6, 2.2);
const BIRD_HIGH_END: UniformRange = UniformRange::new(1.0, 1.3);

const FALLBACK_FREQ: f32 = 2500.0;
const FALLBACK_AMP: f32 = 0.04;
const FALLBACK_FILTER_FREQ: f32 = 1600.0;
const FALLBACK_TYPES: &[ChirpKind] = &[ChirpKind::Noise, ChirpKind::Grain, ChirpKind::Tone];

/// Parameters for a single event. Unset fields take the kind's defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChirpParams {
    pub kind: ChirpKind,
    pub amp: Option<f32>,
    pub len: Option<f32>,
    pub freq: Option<f32>,
    pub filter_freq: Option<f32>,
    pub filter_type: Option<FilterType>,
    pub wave: Option<OscillatorType>,
    pub sample: Option<String>,
}

impl ChirpParams {
    pub fn new(kind: ChirpKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Draws the next event for a scene: the kind uniformly from the
    /// preset's eligible types, everything else from its ranges.
    pub fn draw<R: Rng>(preset: &PresetDefinition, rng: &mut R) -> Self {
        let base_freq = preset
            .chirp_freq
            .map(|(lo, hi)| UniformRange::new(lo, hi).sample(rng));
        let amp = preset.chirp_amp.unwrap_or(FALLBACK_AMP) + AMP_JITTER.sample(rng);
        let len = match preset.chirp_len {
            Some(len) => len,
            None => FALLBACK_LEN.sample(rng),
        };

        let types: &[ChirpKind] = match preset.chirp_types.as_deref() {
            Some(types) if !types.is_empty() => types,
            _ => FALLBACK_TYPES,
        };
        let kind = types[rng.random_range(0..types.len())];

        let mut params = ChirpParams {
            kind,
            amp: Some(amp),
            len: Some(len),
            filter_freq: Some(if preset.filter_freq > 0.0 {
                preset.filter_freq
            } else {
                FALLBACK_FILTER_FREQ
            }),
            ..ChirpParams::default()
        };

        match kind {
            ChirpKind::Tone => {
                params.freq = Some(base_freq.unwrap_or(FALLBACK_FREQ) * TONE_SCALE.sample(rng));
            }
            ChirpKind::Rumble => params.len = Some(RUMBLE_LEN.sample(rng)),
            ChirpKind::Bird => params.freq = base_freq,
            ChirpKind::Grain | ChirpKind::Noise => {}
        }

        params
    }

    pub fn with_sample(mut self, name: impl Into<String>) -> Self {
        self.sample = Some(name.into());
        self
    }

    fn amp_or_default(&self) -> f32 {
        self.amp.unwrap_or_else(|| self.kind.default_amp())
    }

    fn len_or_default(&self) -> f32 {
        self.len
            .filter(|len| *len > 0.0)
            .unwrap_or_else(|| self.kind.default_len())
    }
}

/// Sample-clock positions for one event, all relative to `now`.
struct Timing {
    now: u64,
    sample_rate: f32,
}

impl Timing {
    fn at(&self, seconds: f32) -> u64 {
        self.now + (seconds.max(0.0) * self.sample_rate).round() as u64
    }
}

/// Attack to `peak` over `attack` seconds, exponential decay to the floor
/// at `len` seconds.
fn shape_envelope(
    gain: &mut AudioParam,
    timing: &Timing,
    start: f32,
    peak: f32,
    attack: f32,
    len: f32,
) {
    gain.set_value(start);
    gain.set_value_at_time(start, timing.now);
    gain.linear_ramp_to_value_at_time(peak, timing.at(attack));
    gain.exponential_ramp_to_value_at_time(ENVELOPE_FLOOR, timing.at(len.max(attack)));
}

fn glide(frequency: &mut AudioParam, timing: &Timing, from: f32, to: f32, end: u64) {
    frequency.set_value(from);
    frequency.set_value_at_time(from, timing.now);
    frequency.exponential_ramp_to_value_at_time(to, end);
}

/// Builds the self-contained node chain for one synthesized event. The chain
/// stops its own sources and reports finished once they have ended.
pub(crate) fn synthesize<R: Rng>(
    params: &ChirpParams,
    context: &AudioContext,
    rng: &mut R,
) -> Box<dyn AudioNode> {
    let timing = Timing {
        now: context.current_sample(),
        sample_rate: context.sample_rate(),
    };
    let kind = params.kind;
    let amp = params.amp_or_default();
    let len = params.len_or_default();
    let stop = timing.at(len + kind.tail_secs());

    match kind {
        ChirpKind::Tone => {
            let mut osc = Oscillator::new(params.wave.unwrap_or(OscillatorType::Triangle));
            osc.frequency().set_value(params.freq.unwrap_or(2400.0));
            osc.start_at(timing.now);
            osc.stop_at(stop);

            let mut gain = GainNode::one_shot(0.0).with_input("osc", Box::new(osc));
            shape_envelope(gain.gain(), &timing, 0.0, amp, kind.attack_secs(), len);
            Box::new(gain)
        }
        ChirpKind::Bird => {
            let base = params.freq.unwrap_or_else(|| BIRD_BASE.sample(rng));
            let glide_end = timing.at(len * 0.9);

            let mut low = Oscillator::new(params.wave.unwrap_or(OscillatorType::Sine));
            glide(
                low.frequency(),
                &timing,
                base * BIRD_LOW_START.sample(rng),
                base * BIRD_LOW_END.sample(rng),
                glide_end,
            );

            let mut high = Oscillator::new(OscillatorType::Triangle);
            glide(
                high.frequency(),
                &timing,
                base * BIRD_HIGH_START.sample(rng),
                base * BIRD_HIGH_END.sample(rng),
                glide_end,
            );

            for osc in [&mut low, &mut high] {
                osc.start_at(timing.now);
                osc.stop_at(stop);
            }

            let band = BiquadFilter::new(
                FilterType::BandPass,
                params.filter_freq.unwrap_or(base * 1.2),
            )
            .with_input("low", Box::new(low))
            .with_input("high", Box::new(high));

            let mut gain = GainNode::one_shot(ENVELOPE_FLOOR).with_input("band", Box::new(band));
            shape_envelope(gain.gain(), &timing, ENVELOPE_FLOOR, amp, kind.attack_secs(), len);
            Box::new(gain)
        }
        ChirpKind::Rumble | ChirpKind::Grain | ChirpKind::Noise => {
            let (default_type, default_freq) = match kind {
                ChirpKind::Rumble => (FilterType::LowPass, 600.0),
                ChirpKind::Grain => (FilterType::BandPass, 2200.0),
                _ => (FilterType::LowPass, 4500.0),
            };
            // rumble is always low-passed; the others honour the hint
            let filter_type = match kind {
                ChirpKind::Rumble => FilterType::LowPass,
                _ => params.filter_type.unwrap_or(default_type),
            };

            let buffer = Arc::new(AudioBuffer::noise(timing.sample_rate, len, amp, rng));
            let mut source = BufferSource::new(buffer);
            source.start_at(timing.now);
            source.stop_at(stop);

            let filter = BiquadFilter::new(filter_type, params.filter_freq.unwrap_or(default_freq))
                .with_input("noise", Box::new(source));

            let mut gain = GainNode::one_shot(0.0).with_input("filter", Box::new(filter));
            shape_envelope(gain.gain(), &timing, 0.0, amp, kind.attack_secs(), len);
            Box::new(gain)
        }
    }
}

/// Node chain playing a decoded sample with the same envelope shape as a
/// noise burst.
pub(crate) fn sample_voice(
    params: &ChirpParams,
    buffer: Arc<AudioBuffer>,
    context: &AudioContext,
) -> Box<dyn AudioNode> {
    let timing = Timing {
        now: context.current_sample(),
        sample_rate: context.sample_rate(),
    };
    let len = params
        .len
        .filter(|len| *len > 0.0)
        .unwrap_or_else(|| buffer.duration());
    let amp = params.amp.unwrap_or(0.8);

    let mut source = BufferSource::new(buffer);
    source.start_at(timing.now);
    source.stop_at(timing.at(len + 0.02));

    let filter = BiquadFilter::new(
        params.filter_type.unwrap_or(FilterType::LowPass),
        params.filter_freq.unwrap_or(350.0),
    )
    .with_input("sample", Box::new(source));

    let mut gain = GainNode::one_shot(ENVELOPE_FLOOR).with_input("filter", Box::new(filter));
    shape_envelope(gain.gain(), &timing, ENVELOPE_FLOOR, amp, 0.02, len);
    Box::new(gain)
}
