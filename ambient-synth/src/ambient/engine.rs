use super::chirp::{self, ChirpKind, ChirpParams};
use super::presets::{pick_preset, PresetDefinition, PresetKey};
use super::samples::{SampleBank, SampleLoader};
use super::settings::{NatureStyle, SoundSettings};
use super::timers::{TimerId, TimerQueue};
use crate::error::{EngineError, Result};
use crate::synth::{
    AudioBuffer, AudioContext, AudioGraph, AudioNode, BiquadFilter, BufferSource, FilterType,
    GainNode,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Timing and asset constants for scene playback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Level the master gain ramps up to when a scene starts.
    pub master_gain: f32,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
    /// When the noise bed stops, measured from `stop()`.
    pub noise_stop_secs: f64,
    /// When a stopped scene is disconnected, measured from `stop()`.
    pub cleanup_delay_secs: f64,
    /// Offset applied to the noise bed start.
    pub start_offset_secs: f64,
    pub default_chirp_interval_ms: u64,
    pub noise_bed_secs: f32,
    pub noise_bed_amplitude: f32,
    /// `(name, url)` pairs requested when a scene starts in the birds style.
    pub bird_samples: Vec<(String, String)>,
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            master_gain: 0.9,
            fade_in_secs: 1.2,
            fade_out_secs: 0.8,
            noise_stop_secs: 0.85,
            cleanup_delay_secs: 1.2,
            start_offset_secs: 0.01,
            default_chirp_interval_ms: 3000,
            noise_bed_secs: 2.0,
            noise_bed_amplitude: 0.25,
            bird_samples: (1..=3)
                .map(|i| (format!("bird{i}"), format!("/assets/birds/bird{i}.wav")))
                .collect(),
            seed: 0x5eed_a11b_1e55_u64,
        }
    }
}

/// Where the engine's audio graph renders to. The graph itself is only
/// created on first use.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OutputBackend {
    /// No device; the host drives the clock through [`AmbientEngine::render`].
    Offline { sample_rate: f32 },
    /// The default cpal output device.
    #[cfg(feature = "cpal-output")]
    Device,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlaybackState {
    Idle,
    Starting,
    Playing,
    Stopping,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TimerAction {
    Chirp(u64),
    Cleanup(u64),
}

struct PlaybackInstance {
    token: u64,
    preset_id: String,
    preset: PresetKey,
    definition: PresetDefinition,
    master: Arc<Mutex<GainNode>>,
    noise_src: Arc<Mutex<BufferSource>>,
    chirp_timer: Option<TimerId>,
    stopping: bool,
}

/// Point-in-time view of the active scene, for hosts and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneSnapshot {
    pub token: u64,
    pub preset_id: String,
    pub preset: PresetKey,
    pub filter_freq: f32,
    pub noise_gain: f32,
    pub chirp_interval: Option<Duration>,
    pub chirp_types: Vec<ChirpKind>,
    pub master_gain: f32,
    pub noise_start_sample: u64,
    pub noise_stop_sample: Option<u64>,
    pub stopping: bool,
}

fn scene_name(token: u64) -> String {
    format!("scene-{token}")
}

/// Plays one park soundscape at a time.
///
/// All methods are meant to be called from a single control thread; the
/// audio callback only ever sees the graph.
pub struct AmbientEngine {
    config: EngineConfig,
    backend: OutputBackend,
    graph: Option<AudioGraph>,
    noise_buffer: Option<Arc<AudioBuffer>>,
    current: Option<PlaybackInstance>,
    next_token: u64,
    chirp_seq: u64,
    timers: TimerQueue<TimerAction>,
    samples: SampleBank,
    loader: Option<Box<dyn SampleLoader>>,
    settings: Box<dyn SoundSettings>,
    indicator: Box<dyn FnMut(&str)>,
    now_playing: String,
    rng: SmallRng,
    state: PlaybackState,
}

impl AmbientEngine {
    pub fn new(
        backend: OutputBackend,
        config: EngineConfig,
        settings: Box<dyn SoundSettings>,
    ) -> Self {
        let rng = SmallRng::seed_from_u64(config.seed);
        Self {
            config,
            backend,
            graph: None,
            noise_buffer: None,
            current: None,
            next_token: 1,
            chirp_seq: 0,
            timers: TimerQueue::new(),
            samples: SampleBank::new(),
            loader: None,
            settings,
            indicator: Box::new(|_| {}),
            now_playing: String::new(),
            rng,
            state: PlaybackState::Idle,
        }
    }

    /// Hook called with the active park key, or an empty string, whenever
    /// the "now playing" indicator changes.
    pub fn with_indicator(mut self, indicator: impl FnMut(&str) + 'static) -> Self {
        self.indicator = Box::new(indicator);
        self
    }

    pub fn with_sample_loader(mut self, loader: Box<dyn SampleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts the scene for `identifier`, fading out whatever was playing.
    ///
    /// Never fails: a context that will not resume, or a muted park, leaves
    /// the engine silent with the indicator updated.
    pub fn start_preset(&mut self, identifier: &str, park_key: Option<&str>) {
        let previous_state = self.state;
        self.state = PlaybackState::Starting;
        let indicator_key = park_key.unwrap_or(identifier).to_string();

        let resumed = self.ensure_graph().and_then(|graph| Ok(graph.resume()?));
        self.set_indicator(&indicator_key);
        if let Err(err) = resumed {
            log::warn!("Audio context unavailable, not starting {}: {:#}", identifier, err);
            self.state = previous_state;
            return;
        }

        let muted = !self.settings.is_sound_enabled_for(&indicator_key)
            || !self.settings.is_global_sound_enabled();
        if muted {
            log::debug!("Sound disabled for {}, not starting audio", indicator_key);
            self.state = previous_state;
            return;
        }

        if let Err(err) = self.start_scene(identifier, park_key) {
            log::warn!("Could not start scene {}: {}", identifier, err);
            self.state = self.settled_state();
        }
    }

    fn start_scene(&mut self, identifier: &str, park_key: Option<&str>) -> Result<()> {
        let sample_rate = self.graph()?.context().sample_rate();
        if self.noise_buffer.is_none() {
            self.noise_buffer = Some(Arc::new(AudioBuffer::noise(
                sample_rate,
                self.config.noise_bed_secs,
                self.config.noise_bed_amplitude,
                &mut self.rng,
            )));
        }
        let noise_buffer = self
            .noise_buffer
            .clone()
            .ok_or(EngineError::Output("noise buffer missing".to_string()))?;

        self.stop();

        let preset = pick_preset(identifier, park_key.unwrap_or_default());
        let style_key = park_key.unwrap_or(preset.as_str());
        let style = self.settings.nature_style_for(style_key);
        let definition = match style {
            NatureStyle::Birds => preset.definition().with_bird_style(),
            NatureStyle::Wind => preset.definition().clone(),
        };

        let graph = self.graph.as_ref().ok_or(EngineError::NoActiveScene)?;
        let context = graph.context().clone();
        let now = context.current_sample();

        let mut master = GainNode::new(0.0);
        master.gain().set_value_at_time(0.0, now);
        master.gain().linear_ramp_to_value_at_time(
            self.config.master_gain,
            context.sample_after(self.config.fade_in_secs),
        );
        let master = Arc::new(Mutex::new(master));

        let mut noise_src = BufferSource::new(noise_buffer).looping(true);
        noise_src.start_at(context.sample_after(self.config.start_offset_secs));
        let noise_src = Arc::new(Mutex::new(noise_src));

        let bed_filter = BiquadFilter::new(FilterType::LowPass, definition.filter_freq)
            .with_input("noise", Box::new(noise_src.clone()));
        let bed_gain =
            GainNode::new(definition.noise_gain).with_input("filter", Box::new(bed_filter));
        master
            .lock()
            .map_err(|_| EngineError::LockPoisoned("master gain"))?
            .connect_input("noise-bed", Box::new(bed_gain));

        let token = self.next_token;
        self.next_token += 1;
        graph.connect(&scene_name(token), Box::new(master.clone()));

        let chirp_timer = definition.chirp.then(|| {
            let interval_ms = definition
                .chirp_rate_ms
                .unwrap_or(self.config.default_chirp_interval_ms);
            let period = context.seconds_to_samples(interval_ms as f64 / 1000.0);
            self.timers
                .set_interval(now, period, TimerAction::Chirp(token))
        });

        log::debug!(
            "Starting scene {} ({}, {} style) as instance {} at {:.2}s",
            identifier,
            preset,
            style,
            token,
            context.current_time()
        );

        self.current = Some(PlaybackInstance {
            token,
            preset_id: identifier.to_string(),
            preset,
            definition,
            master,
            noise_src,
            chirp_timer,
            stopping: false,
        });
        self.state = PlaybackState::Playing;

        let sample_style_key = park_key.unwrap_or(identifier);
        if self.settings.nature_style_for(sample_style_key) == NatureStyle::Birds {
            self.request_bird_samples();
        }

        Ok(())
    }

    /// Fades the current scene out. Its nodes stay connected until the
    /// cleanup timer fires, which only clears the engine's reference if no
    /// newer scene has started in the meantime.
    pub fn stop(&mut self) {
        let Some(graph) = self.graph.as_ref() else {
            return;
        };
        let Some(inst) = self.current.as_mut() else {
            return;
        };
        if inst.stopping {
            return;
        }

        let context = graph.context();
        let now = context.current_sample();

        match inst.master.lock() {
            Ok(mut master) => {
                let gain = master.gain();
                let value = gain.value_at(now);
                gain.cancel_scheduled_values(now);
                gain.set_value_at_time(value, now);
                gain.linear_ramp_to_value_at_time(
                    0.0,
                    context.sample_after(self.config.fade_out_secs),
                );
            }
            Err(_) => log::warn!("Stop skipped fade: master gain lock poisoned"),
        }
        match inst.noise_src.lock() {
            Ok(mut noise) => noise.stop_at(context.sample_after(self.config.noise_stop_secs)),
            Err(_) => log::warn!("Stop skipped noise release: source lock poisoned"),
        }
        if let Some(timer) = inst.chirp_timer.take() {
            self.timers.clear(timer);
        }

        let delay = context.seconds_to_samples(self.config.cleanup_delay_secs);
        self.timers
            .set_timeout(now, delay, TimerAction::Cleanup(inst.token));
        inst.stopping = true;
        self.state = PlaybackState::Stopping;
    }

    /// Fires due timers and accepts finished sample loads. Hosts call this
    /// every few milliseconds.
    pub fn poll(&mut self) {
        let Some(graph) = self.graph.as_ref() else {
            return;
        };
        let sample_rate = graph.context().sample_rate();
        self.samples.collect(sample_rate);

        loop {
            let Some(now) = self.graph.as_ref().map(|g| g.context().current_sample()) else {
                return;
            };
            let Some((_, action)) = self.timers.pop_due(now) else {
                return;
            };
            match action {
                TimerAction::Chirp(token) => self.on_chirp_tick(token),
                TimerAction::Cleanup(token) => self.on_cleanup(token),
            }
        }
    }

    fn on_chirp_tick(&mut self, token: u64) {
        let Some(inst) = self.current.as_ref().filter(|inst| inst.token == token) else {
            return;
        };
        if inst.stopping {
            return;
        }

        let mut params = ChirpParams::draw(&inst.definition, &mut self.rng);
        if params.kind == ChirpKind::Bird && !self.samples.is_empty() {
            let names = self.samples.names();
            let pick = self.rng.random_range(0..names.len());
            params.sample = Some(names[pick].clone());
        }
        self.spawn_chirp(&params);
    }

    fn on_cleanup(&mut self, token: u64) {
        if let Some(graph) = &self.graph {
            graph.disconnect(&scene_name(token));
        }
        if self.current.as_ref().is_some_and(|inst| inst.token == token) {
            self.current = None;
            self.state = PlaybackState::Idle;
            self.set_indicator("");
            log::debug!("Scene instance {} released", token);
        }
    }

    /// Adds one foreground event to the active scene. Failures are logged
    /// and otherwise ignored.
    pub fn spawn_chirp(&mut self, params: &ChirpParams) {
        if params.kind == ChirpKind::Bird {
            if let Some(name) = &params.sample {
                if self.samples.contains(name) {
                    self.spawn_sample(params);
                    return;
                }
            }
        }

        let spawned = self.try_spawn(|context, rng| chirp::synthesize(params, context, rng));
        if let Err(err) = spawned {
            log::warn!("Chirp spawn failed: {}", err);
        }
    }

    /// Plays a loaded sample through the active scene. Does nothing if the
    /// named sample has not finished loading.
    pub fn spawn_sample(&mut self, params: &ChirpParams) {
        let Some(buffer) = params.sample.as_deref().and_then(|name| self.samples.get(name)) else {
            return;
        };
        let spawned = self.try_spawn(|context, _| chirp::sample_voice(params, buffer, context));
        if let Err(err) = spawned {
            log::warn!("Sample playback failed: {}", err);
        }
    }

    fn try_spawn<F>(&mut self, build: F) -> Result<()>
    where
        F: FnOnce(&AudioContext, &mut SmallRng) -> Box<dyn AudioNode>,
    {
        let inst = self.current.as_ref().ok_or(EngineError::NoActiveScene)?;
        let context = self
            .graph
            .as_ref()
            .ok_or(EngineError::NoActiveScene)?
            .context()
            .clone();

        let voice = build(&context, &mut self.rng);

        self.chirp_seq += 1;
        inst.master
            .lock()
            .map_err(|_| EngineError::LockPoisoned("master gain"))?
            .connect_input(&format!("chirp-{}", self.chirp_seq), voice);
        Ok(())
    }

    /// Requests a named sample from the configured loader. Each name is
    /// fetched at most once per engine, even if the first attempt failed.
    pub fn load_sample(&mut self, name: &str, url: &str) -> bool {
        match &self.loader {
            Some(loader) => self.samples.request(loader.as_ref(), name, url),
            None => {
                log::debug!("No sample loader configured, skipping {}", name);
                false
            }
        }
    }

    /// Accepts an already decoded sample, e.g. one the host page decoded.
    pub fn add_sample(&mut self, name: &str, buffer: AudioBuffer) {
        let sample_rate = self
            .graph
            .as_ref()
            .map(|graph| graph.context().sample_rate())
            .unwrap_or(buffer.sample_rate());
        if let Err(err) = self.samples.insert(name, buffer, sample_rate) {
            log::warn!("Sample {} dropped: {}", name, err);
        }
    }

    fn request_bird_samples(&mut self) {
        let Some(loader) = self.loader.as_deref() else {
            return;
        };
        for (name, url) in &self.config.bird_samples {
            self.samples.request(loader, name, url);
        }
    }

    /// Renders the next block on an offline graph and fires any timers that
    /// became due. A device-backed graph is driven by its output stream, so
    /// `output` is left silent and only timers run.
    pub fn render(&mut self, output: &mut [f32]) {
        match (&self.backend, &self.graph) {
            (OutputBackend::Offline { .. }, Some(graph)) => graph.render(output),
            _ => output.fill(0.0),
        }
        self.poll();
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn now_playing(&self) -> &str {
        &self.now_playing
    }

    pub fn active_scene(&self) -> Option<SceneSnapshot> {
        let inst = self.current.as_ref()?;
        let graph = self.graph.as_ref()?;
        let context = graph.context();
        let now = context.current_sample();

        let master_gain = inst
            .master
            .lock()
            .map(|master| master.gain_value_at(now))
            .unwrap_or(0.0);
        let (noise_start_sample, noise_stop_sample) = inst
            .noise_src
            .lock()
            .map(|noise| (noise.start_sample(), noise.stop_sample()))
            .unwrap_or((0, None));
        let chirp_interval = inst.chirp_timer.map(|_| {
            Duration::from_millis(
                inst.definition
                    .chirp_rate_ms
                    .unwrap_or(self.config.default_chirp_interval_ms),
            )
        });

        Some(SceneSnapshot {
            token: inst.token,
            preset_id: inst.preset_id.clone(),
            preset: inst.preset,
            filter_freq: inst.definition.filter_freq,
            noise_gain: inst.definition.noise_gain,
            chirp_interval,
            chirp_types: inst
                .definition
                .chirp_types
                .as_deref()
                .map(<[ChirpKind]>::to_vec)
                .unwrap_or_default(),
            master_gain,
            noise_start_sample,
            noise_stop_sample,
            stopping: inst.stopping,
        })
    }

    /// Scenes still connected to the output, including ones fading out.
    pub fn scene_count(&self) -> usize {
        self.graph
            .as_ref()
            .map(AudioGraph::connection_count)
            .unwrap_or(0)
    }

    /// Foreground events currently mixed into the active scene.
    pub fn active_voice_count(&self) -> usize {
        self.current
            .as_ref()
            .and_then(|inst| inst.master.lock().ok().map(|m| m.input_count()))
            .map(|count| count.saturating_sub(1))
            .unwrap_or(0)
    }

    pub fn has_noise_buffer(&self) -> bool {
        self.noise_buffer.is_some()
    }

    pub fn sample_names(&self) -> Vec<String> {
        self.samples.names()
    }

    pub fn samples(&self) -> &SampleBank {
        &self.samples
    }

    pub fn graph(&self) -> Result<&AudioGraph> {
        self.graph.as_ref().ok_or(EngineError::NoActiveScene)
    }

    fn ensure_graph(&mut self) -> Result<&mut AudioGraph> {
        if self.graph.is_none() {
            let graph = match self.backend {
                OutputBackend::Offline { sample_rate } => AudioGraph::offline(sample_rate),
                #[cfg(feature = "cpal-output")]
                OutputBackend::Device => AudioGraph::open_default_output()?,
            };
            log::debug!(
                "Created audio context at {}Hz",
                graph.context().sample_rate()
            );
            self.graph = Some(graph);
        }
        self.graph
            .as_mut()
            .ok_or_else(|| EngineError::Output("audio graph missing".to_string()))
    }

    fn settled_state(&self) -> PlaybackState {
        match &self.current {
            None => PlaybackState::Idle,
            Some(inst) if inst.stopping => PlaybackState::Stopping,
            Some(_) => PlaybackState::Playing,
        }
    }

    fn set_indicator(&mut self, key: &str) {
        self.now_playing = key.to_string();
        (self.indicator)(key);
    }
}
