// First, make the synth module public
pub mod synth {
    pub use self::audio_buffer::AudioBuffer;
    pub use self::audio_context::{AudioContext, ContextState};
    pub use self::audio_graph::AudioGraph;
    pub use self::audio_node::AudioNode;
    pub use self::audio_param::{AudioParam, RampType, EXPONENTIAL_FLOOR};
    pub use self::biquad::{BiquadFilter, FilterType};
    pub use self::buffer_source::BufferSource;
    pub use self::gain_node::GainNode;
    pub use self::oscillator::{Oscillator, OscillatorType};

    mod audio_buffer;
    mod audio_context;
    mod audio_graph;
    pub mod audio_node;
    mod audio_param;
    mod biquad;
    mod buffer_source;
    mod gain_node;
    mod oscillator;
}

pub mod ambient;
pub mod error;

// Re-export everything at the crate root level
pub use ambient::{
    pick_preset, AmbientEngine, ChirpKind, ChirpParams, EngineConfig, FileSampleLoader,
    NatureStyle, OutputBackend, PlaybackState, PresetDefinition, PresetKey, SampleLoader,
    SceneSnapshot, SettingsStore, SoundSettings,
};
pub use error::EngineError;
pub use synth::{
    AudioBuffer, AudioContext, AudioGraph, AudioNode, AudioParam, BiquadFilter, BufferSource,
    ContextState, FilterType, GainNode, Oscillator, OscillatorType,
};
