use super::audio_context::{AudioContext, ContextState};
use super::audio_node::AudioNode;
use super::gain_node::GainNode;
use atomic_float::AtomicF32;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

#[cfg(feature = "cpal-output")]
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
#[cfg(feature = "cpal-output")]
use cpal::{FromSample, Sample};

/// The output side of the engine: a context clock, one destination bus and,
/// when opened on a device, the cpal stream pulling from it.
pub struct AudioGraph {
    context: Arc<AudioContext>,
    destination: Arc<Mutex<GainNode>>,
    volume: Arc<AtomicF32>,
    #[cfg(feature = "cpal-output")]
    stream: Option<cpal::Stream>,
}

impl AudioGraph {
    /// A graph with no device attached. The clock only moves through
    /// [`AudioGraph::render`].
    pub fn offline(sample_rate: f32) -> Self {
        Self {
            context: Arc::new(AudioContext::new(sample_rate)),
            destination: Arc::new(Mutex::new(GainNode::new(1.0))),
            volume: Arc::new(AtomicF32::new(1.0)),
            #[cfg(feature = "cpal-output")]
            stream: None,
        }
    }

    /// Opens the default output device. The stream is built paused; call
    /// [`AudioGraph::resume`] to start pulling audio.
    #[cfg(feature = "cpal-output")]
    pub fn open_default_output() -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No output device available"))?;

        let config = device.default_output_config()?;
        let sample_rate = config.sample_rate().0 as f32;
        log::debug!(
            "Opening output device {} at {}Hz",
            device.name().unwrap_or_default(),
            sample_rate
        );

        let mut graph = Self::offline(sample_rate);
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => graph.build_stream::<f32>(&device, &config.into())?,
            cpal::SampleFormat::I16 => graph.build_stream::<i16>(&device, &config.into())?,
            cpal::SampleFormat::U16 => graph.build_stream::<u16>(&device, &config.into())?,
            other => {
                return Err(anyhow::anyhow!("Unsupported sample format: {:?}", other));
            }
        };
        if let Err(err) = stream.pause() {
            log::debug!("Output stream could not be paused before resume: {}", err);
        }
        graph.stream = Some(stream);

        Ok(graph)
    }

    #[cfg(feature = "cpal-output")]
    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> anyhow::Result<cpal::Stream>
    where
        T: Sample + FromSample<f32> + cpal::SizedSample,
    {
        let channels = config.channels as usize;
        let context = self.context.clone();
        let destination = self.destination.clone();
        let volume = self.volume.clone();
        let mut scratch: Vec<f32> = Vec::new();

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                scratch.resize(frames, 0.0);
                Self::render_block(&context, &destination, &volume, &mut scratch);

                for (frame, value) in data.chunks_mut(channels.max(1)).zip(scratch.iter()) {
                    let sample_value = T::from_sample(*value);
                    for sample in frame.iter_mut() {
                        *sample = sample_value;
                    }
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }

    fn render_block(
        context: &AudioContext,
        destination: &Mutex<GainNode>,
        volume: &AtomicF32,
        output: &mut [f32],
    ) {
        if !context.is_running() {
            output.fill(0.0);
            return;
        }

        let start = context.current_sample();
        let volume = volume.load(Ordering::Relaxed);
        match destination.lock() {
            Ok(mut bus) => {
                for (offset, sample) in output.iter_mut().enumerate() {
                    *sample = bus.process(context, start + offset as u64) * volume;
                }
            }
            Err(_) => output.fill(0.0),
        }
        context.increment_samples(output.len() as u64);
    }

    /// Renders the next `output.len()` samples. Silent, and the clock
    /// stands still, unless the context is running.
    pub fn render(&self, output: &mut [f32]) {
        Self::render_block(&self.context, &self.destination, &self.volume, output);
    }

    pub fn context(&self) -> &Arc<AudioContext> {
        &self.context
    }

    pub fn resume(&mut self) -> anyhow::Result<()> {
        match self.context.state() {
            ContextState::Running => return Ok(()),
            ContextState::Closed => return Err(anyhow::anyhow!("Audio context is closed")),
            ContextState::Suspended => {}
        }

        #[cfg(feature = "cpal-output")]
        if let Some(stream) = &self.stream {
            stream.play()?;
        }

        self.context.set_state(ContextState::Running);
        log::debug!("Audio context running at {}Hz", self.context.sample_rate());
        Ok(())
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.store(volume.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    /// Attaches `node` to the destination under `name`, replacing any node
    /// already connected with that name.
    pub fn connect(&self, name: &str, node: Box<dyn AudioNode>) {
        if let Ok(mut bus) = self.destination.lock() {
            bus.connect_input(name, node);
        }
    }

    pub fn disconnect(&self, name: &str) -> bool {
        match self.destination.lock() {
            Ok(mut bus) => bus.clear_input(name),
            Err(_) => false,
        }
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.destination
            .lock()
            .map(|bus| bus.has_input(name))
            .unwrap_or(false)
    }

    pub fn connection_count(&self) -> usize {
        self.destination
            .lock()
            .map(|bus| bus.input_count())
            .unwrap_or(0)
    }
}

impl Drop for AudioGraph {
    fn drop(&mut self) {
        self.context.set_state(ContextState::Closed);
    }
}
