//! Generative park soundscapes built on the [`synth`](crate::synth) graph.
//!
//! A scene is a looping filtered noise bed plus randomly scheduled foreground
//! events ("chirps") mixed through one master gain. [`AmbientEngine`] keeps at
//! most one scene driving audio and crossfades between them.

mod chirp;
mod engine;
mod presets;
mod samples;
mod settings;
mod timers;

pub use chirp::{ChirpKind, ChirpParams, UniformRange};
pub use engine::{AmbientEngine, EngineConfig, OutputBackend, PlaybackState, SceneSnapshot};
pub use presets::{pick_preset, PresetDefinition, PresetKey};
pub use samples::{decode_wav, FileSampleLoader, SampleBank, SampleLoaded, SampleLoader};
pub use settings::{NatureStyle, SettingsStore, SoundSettings};
pub use timers::{TimerId, TimerQueue};
