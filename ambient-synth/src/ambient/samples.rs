use crate::error::{EngineError, Result};
use crate::synth::AudioBuffer;
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Completion message for one sample request.
#[derive(Debug)]
pub struct SampleLoaded {
    pub name: String,
    pub url: String,
    pub result: Result<AudioBuffer>,
}

/// Fetches and decodes named samples without blocking the caller. The
/// outcome is sent on `reply` whenever it is ready.
pub trait SampleLoader {
    fn load(&self, name: String, url: String, reply: Sender<SampleLoaded>);
}

/// Loads WAV files on a worker thread. URLs are resolved as paths below
/// `root`, so `/assets/birds/bird1.wav` reads `<root>/assets/birds/bird1.wav`.
#[derive(Clone, Debug)]
pub struct FileSampleLoader {
    root: PathBuf,
}

impl FileSampleLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, url: &str) -> PathBuf {
        let relative = url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_start_matches('/');
        self.root.join(relative)
    }

    fn read(path: &Path, name: &str, url: &str) -> Result<AudioBuffer> {
        let bytes = std::fs::read(path).map_err(|source| EngineError::SampleFetch {
            url: url.to_string(),
            source,
        })?;
        decode_wav(name, &bytes)
    }
}

impl SampleLoader for FileSampleLoader {
    fn load(&self, name: String, url: String, reply: Sender<SampleLoaded>) {
        let path = self.resolve(&url);
        let spawned = thread::Builder::new()
            .name(format!("sample-{}", name))
            .spawn(move || {
                let result = Self::read(&path, &name, &url);
                // the engine may be gone by now
                let _ = reply.send(SampleLoaded { name, url, result });
            });
        if let Err(err) = spawned {
            log::warn!("Could not spawn sample loader thread: {}", err);
        }
    }
}

/// Decodes a WAV file (integer or float PCM) to a mono buffer, averaging
/// channels.
pub fn decode_wav(name: &str, bytes: &[u8]) -> Result<AudioBuffer> {
    let decode_err = |source| EngineError::SampleDecode {
        name: name.to_string(),
        source,
    };

    let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(decode_err)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(EngineError::InvalidSampleRate {
            name: name.to_string(),
            rate: 0.0,
        });
    }
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_err)?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(decode_err)?
        }
    };

    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    if mono.is_empty() {
        return Err(EngineError::EmptySample(name.to_string()));
    }

    Ok(AudioBuffer::new(spec.sample_rate as f32, mono))
}

/// Decoded samples by name, plus the bookkeeping that keeps each name from
/// being requested twice. A name that failed once stays failed.
pub struct SampleBank {
    samples: BTreeMap<String, Arc<AudioBuffer>>,
    pending: HashSet<String>,
    failed: HashSet<String>,
    reply_tx: Sender<SampleLoaded>,
    reply_rx: Receiver<SampleLoaded>,
}

impl Default for SampleBank {
    fn default() -> Self {
        let (reply_tx, reply_rx) = unbounded();
        Self {
            samples: BTreeMap::new(),
            pending: HashSet::new(),
            failed: HashSet::new(),
            reply_tx,
            reply_rx,
        }
    }
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks `loader` for `name` unless it is loaded, in flight, or already
    /// failed. Returns whether a request was issued.
    pub fn request(&mut self, loader: &dyn SampleLoader, name: &str, url: &str) -> bool {
        if self.samples.contains_key(name)
            || self.pending.contains(name)
            || self.failed.contains(name)
        {
            return false;
        }
        self.pending.insert(name.to_string());
        loader.load(name.to_string(), url.to_string(), self.reply_tx.clone());
        true
    }

    /// Moves every finished load into the bank, resampling to `sample_rate`.
    /// Returns the names that became available.
    pub fn collect(&mut self, sample_rate: f32) -> Vec<String> {
        let mut loaded = Vec::new();
        while let Ok(message) = self.reply_rx.try_recv() {
            self.pending.remove(&message.name);
            match message.result {
                Ok(buffer) => {
                    log::debug!(
                        "Loaded sample {} ({:.2}s) from {}",
                        message.name,
                        buffer.duration(),
                        message.url
                    );
                    match self.insert(&message.name, buffer, sample_rate) {
                        Ok(()) => loaded.push(message.name),
                        Err(err) => {
                            log::warn!("sample dropped {} {}: {}", message.name, message.url, err);
                            self.failed.insert(message.name);
                        }
                    }
                }
                Err(err) => {
                    log::warn!("sample load failed {} {}: {}", message.name, message.url, err);
                    self.failed.insert(message.name);
                }
            }
        }
        loaded
    }

    /// Stores `buffer` resampled to `sample_rate`. Buffers whose rate is
    /// unusable are rejected and leave the bank unchanged.
    pub fn insert(&mut self, name: &str, buffer: AudioBuffer, sample_rate: f32) -> Result<()> {
        if !buffer.has_valid_rate() {
            return Err(EngineError::InvalidSampleRate {
                name: name.to_string(),
                rate: buffer.sample_rate(),
            });
        }
        self.failed.remove(name);
        self.samples
            .insert(name.to_string(), Arc::new(buffer.resampled(sample_rate)));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<AudioBuffer>> {
        self.samples.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.samples.contains_key(name)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.contains(name)
    }

    pub fn has_failed(&self, name: &str) -> bool {
        self.failed.contains(name)
    }

    /// Loaded sample names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.samples.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
