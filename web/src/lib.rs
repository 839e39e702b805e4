use ambient_synth::ambient::SampleLoaded;
use ambient_synth::{
    AmbientEngine, AudioBuffer, ChirpKind, ChirpParams, EngineConfig, EngineError, NatureStyle,
    OutputBackend, PlaybackState, SampleLoader, SoundSettings,
};
use crossbeam::channel::Sender;
use serde_json::Value;
use std::cell::{RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

const POLL_INTERVAL_MS: i32 = 10;

const SOUND_ENABLED_KEY: &str = "soundEnabled";
const NATURE_STYLE_KEY: &str = "natureStyle";
const GLOBAL_SOUND_KEY: &str = "globalSoundEnabled";

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            _ => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

#[wasm_bindgen(start)]
pub fn main_js() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }
    Ok(())
}

/// Raises or lowers console verbosity: "error", "warn", "info", "debug" or "trace".
#[wasm_bindgen]
pub fn set_log_level(level: &str) {
    match level.parse::<log::LevelFilter>() {
        Ok(filter) => log::set_max_level(filter),
        Err(_) => log::warn!("Unknown log level {}", level),
    }
}

/// Sound preferences read straight from `window.localStorage` on every query,
/// so changes made by the page apply to the next scene.
struct LocalStorageSettings;

impl LocalStorageSettings {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }

    fn item(key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    fn map(key: &str) -> HashMap<String, Value> {
        Self::item(key)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    fn update_map(key: &str, entry: &str, value: Value) {
        let Some(storage) = Self::storage() else {
            return;
        };
        let mut map = Self::map(key);
        map.insert(entry.to_string(), value);
        match serde_json::to_string(&map) {
            Ok(json) => {
                if storage.set_item(key, &json).is_err() {
                    log::warn!("Could not persist {}", key);
                }
            }
            Err(err) => log::warn!("Could not encode {}: {}", key, err),
        }
    }
}

impl SoundSettings for LocalStorageSettings {
    fn is_sound_enabled_for(&self, key: &str) -> bool {
        Self::map(SOUND_ENABLED_KEY).get(key) != Some(&Value::Bool(false))
    }

    fn is_global_sound_enabled(&self) -> bool {
        Self::item(GLOBAL_SOUND_KEY).map_or(true, |value| value == "1")
    }

    fn nature_style_for(&self, key: &str) -> NatureStyle {
        match Self::map(NATURE_STYLE_KEY).get(key) {
            Some(Value::String(style)) => NatureStyle::parse(style),
            _ => NatureStyle::Birds,
        }
    }
}

#[wasm_bindgen]
pub fn set_sound_enabled_for(key: &str, enabled: bool) {
    LocalStorageSettings::update_map(SOUND_ENABLED_KEY, key, Value::Bool(enabled));
}

#[wasm_bindgen]
pub fn set_nature_style_for(key: &str, style: &str) {
    let style = NatureStyle::parse(style);
    LocalStorageSettings::update_map(
        NATURE_STYLE_KEY,
        key,
        Value::String(style.as_str().to_string()),
    );
}

#[wasm_bindgen]
pub fn set_global_sound_enabled(enabled: bool) {
    if let Some(storage) = LocalStorageSettings::storage() {
        let value = if enabled { "1" } else { "0" };
        if storage.set_item(GLOBAL_SOUND_KEY, value).is_err() {
            log::warn!("Could not persist {}", GLOBAL_SOUND_KEY);
        }
    }
}

type PendingSamples = Rc<RefCell<HashMap<String, (String, Sender<SampleLoaded>)>>>;

/// Hands sample requests to a page callback `(name, url)`. The page fetches
/// and decodes the file, then answers with [`Handle::add_sample`] or
/// [`Handle::sample_failed`].
struct PageSampleLoader {
    callback: js_sys::Function,
    pending: PendingSamples,
}

impl SampleLoader for PageSampleLoader {
    fn load(&self, name: String, url: String, reply: Sender<SampleLoaded>) {
        self.pending
            .borrow_mut()
            .insert(name.clone(), (url.clone(), reply.clone()));
        let requested = self.callback.call2(
            &JsValue::NULL,
            &JsValue::from_str(&name),
            &JsValue::from_str(&url),
        );
        match requested {
            Ok(_) => {}
            Err(err) => {
                self.pending.borrow_mut().remove(&name);
                let source = std::io::Error::other(format!("{:?}", err));
                let _ = reply.send(SampleLoaded {
                    name,
                    url: url.clone(),
                    result: Err(EngineError::SampleFetch { url, source }),
                });
            }
        }
    }
}

#[wasm_bindgen]
pub struct Handle {
    engine: Rc<RefCell<AmbientEngine>>,
    pending_samples: PendingSamples,
    interval_id: i32,
    _tick: Closure<dyn FnMut()>,
}

#[wasm_bindgen]
impl Handle {
    /// `indicator` is called with the active park key, or "", whenever the
    /// now-playing state changes. It must not call back into the handle.
    #[wasm_bindgen(constructor)]
    pub fn new(
        indicator: Option<js_sys::Function>,
        sample_loader: Option<js_sys::Function>,
    ) -> Result<Handle, JsValue> {
        let config = EngineConfig {
            seed: (js_sys::Math::random() * u32::MAX as f64) as u64,
            ..EngineConfig::default()
        };
        let mut engine = AmbientEngine::new(
            OutputBackend::Device,
            config,
            Box::new(LocalStorageSettings),
        );

        if let Some(callback) = indicator {
            engine = engine.with_indicator(move |key| {
                if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(key)) {
                    log::warn!("Playing indicator failed: {:?}", err);
                }
            });
        }

        let pending_samples = PendingSamples::default();
        if let Some(callback) = sample_loader {
            engine = engine.with_sample_loader(Box::new(PageSampleLoader {
                callback,
                pending: pending_samples.clone(),
            }));
        }

        let engine = Rc::new(RefCell::new(engine));
        let ticking = engine.clone();
        let tick = Closure::<dyn FnMut()>::new(move || {
            // skipped while a handle method holds the engine
            if let Ok(mut engine) = ticking.try_borrow_mut() {
                engine.poll();
            }
        });

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        let interval_id = window.set_interval_with_callback_and_timeout_and_arguments_0(
            tick.as_ref().unchecked_ref(),
            POLL_INTERVAL_MS,
        )?;
        log::debug!("Ambient engine ready, polling every {}ms", POLL_INTERVAL_MS);

        Ok(Handle {
            engine,
            pending_samples,
            interval_id,
            _tick: tick,
        })
    }

    /// Starts the scene for a park. Call from a user gesture so the browser
    /// lets the audio context resume.
    pub fn start_preset(&self, identifier: &str, park_key: Option<String>) -> Result<(), JsValue> {
        self.engine()?.start_preset(identifier, park_key.as_deref());
        Ok(())
    }

    pub fn stop(&self) -> Result<(), JsValue> {
        self.engine()?.stop();
        Ok(())
    }

    /// Plays one foreground event by type name; unknown names play a noise burst.
    pub fn spawn_chirp(&self, kind: &str) -> Result<(), JsValue> {
        self.engine()?
            .spawn_chirp(&ChirpParams::new(ChirpKind::parse(kind)));
        Ok(())
    }

    pub fn load_sample(&self, name: &str, url: &str) -> Result<bool, JsValue> {
        Ok(self.engine()?.load_sample(name, url))
    }

    /// Accepts decoded mono PCM for `name`, either answering an earlier
    /// loader request or adding a sample the page chose on its own.
    pub fn add_sample(&self, name: &str, pcm: Vec<f32>, sample_rate: f32) -> Result<(), JsValue> {
        let buffer = AudioBuffer::new(sample_rate, pcm);
        let pending = self.pending_samples.borrow_mut().remove(name);
        match pending {
            Some((url, reply)) => {
                let loaded = SampleLoaded {
                    name: name.to_string(),
                    url,
                    result: Ok(buffer),
                };
                // collected on the next poll
                let _ = reply.send(loaded);
            }
            None => self.engine()?.add_sample(name, buffer),
        }
        Ok(())
    }

    /// Reports that the page could not fetch or decode a requested sample.
    /// The name is not requested again.
    pub fn sample_failed(&self, name: &str, reason: &str) {
        if let Some((url, reply)) = self.pending_samples.borrow_mut().remove(name) {
            let source = std::io::Error::other(reason.to_string());
            let _ = reply.send(SampleLoaded {
                name: name.to_string(),
                url: url.clone(),
                result: Err(EngineError::SampleFetch { url, source }),
            });
        }
    }

    pub fn now_playing(&self) -> Result<String, JsValue> {
        Ok(self.engine()?.now_playing().to_string())
    }

    pub fn is_playing(&self) -> Result<bool, JsValue> {
        Ok(self.engine()?.state() == PlaybackState::Playing)
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), JsValue> {
        let engine = self.engine()?;
        if let Ok(graph) = engine.graph() {
            graph.set_volume(volume);
        }
        Ok(())
    }
}

impl Handle {
    fn engine(&self) -> Result<RefMut<'_, AmbientEngine>, JsValue> {
        self.engine
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Ambient engine is busy"))
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.interval_id);
        }
    }
}
