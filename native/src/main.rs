mod cli;

use ambient_synth::{
    pick_preset, AmbientEngine, EngineConfig, FileSampleLoader, NatureStyle, OutputBackend,
    PresetKey, SettingsStore, SoundSettings,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, StyleArg, Toggle};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Long enough for the fade-out and the delayed disconnect.
const RELEASE_TIME: Duration = Duration::from_millis(1500);

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            identifier,
            park_key,
            seconds,
            assets,
            seed,
        } => play(&cli.settings, &identifier, park_key.as_deref(), seconds, assets, seed),
        Commands::Render {
            identifier,
            park_key,
            out,
            seconds,
            sample_rate,
            assets,
            seed,
        } => render(
            &cli.settings,
            &identifier,
            park_key.as_deref(),
            &out,
            seconds,
            sample_rate,
            assets,
            seed,
        ),
        Commands::Resolve { identifier, name } => {
            let preset = pick_preset(&identifier, &name);
            println!("{} -> {}", identifier, preset);
            Ok(())
        }
        Commands::Presets => {
            list_presets();
            Ok(())
        }
        Commands::Mute { key } => update_settings(&cli.settings, |s| {
            s.set_sound_enabled_for(&key, false)
        }),
        Commands::Unmute { key } => update_settings(&cli.settings, |s| {
            s.set_sound_enabled_for(&key, true)
        }),
        Commands::Style { key, style } => update_settings(&cli.settings, |s| {
            let style = match style {
                StyleArg::Birds => NatureStyle::Birds,
                StyleArg::Wind => NatureStyle::Wind,
            };
            s.set_nature_style_for(&key, style)
        }),
        Commands::Global { state } => update_settings(&cli.settings, |s| {
            s.set_global_sound_enabled(matches!(state, Toggle::On))
        }),
    }
}

fn build_engine(
    settings_path: &Path,
    backend: OutputBackend,
    assets: Option<PathBuf>,
    seed: Option<u64>,
) -> AmbientEngine {
    let settings = SettingsStore::load_or_default(settings_path);
    let mut config = EngineConfig::default();
    if let Some(seed) = seed {
        config.seed = seed;
    }

    let engine = AmbientEngine::new(backend, config, Box::new(settings))
        .with_indicator(|key| {
            if key.is_empty() {
                log::info!("Now playing: nothing");
            } else {
                log::info!("Now playing: {}", key);
            }
        });

    match assets {
        Some(root) => engine.with_sample_loader(Box::new(FileSampleLoader::new(root))),
        None => engine,
    }
}

fn play(
    settings_path: &Path,
    identifier: &str,
    park_key: Option<&str>,
    seconds: f32,
    assets: Option<PathBuf>,
    seed: Option<u64>,
) -> Result<()> {
    let mut engine = build_engine(settings_path, OutputBackend::Device, assets, seed);
    engine.start_preset(identifier, park_key);

    if engine.active_scene().is_none() {
        log::info!("No audio started for {}", identifier);
        return Ok(());
    }

    run_for(&mut engine, Duration::from_secs_f32(seconds.max(0.0)));
    engine.stop();
    run_for(&mut engine, RELEASE_TIME);

    Ok(())
}

fn run_for(engine: &mut AmbientEngine, duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        engine.poll();
        sleep(POLL_INTERVAL);
    }
}

#[allow(clippy::too_many_arguments)]
fn render(
    settings_path: &Path,
    identifier: &str,
    park_key: Option<&str>,
    out: &Path,
    seconds: f32,
    sample_rate: u32,
    assets: Option<PathBuf>,
    seed: Option<u64>,
) -> Result<()> {
    if sample_rate == 0 {
        bail!("Sample rate must be positive");
    }

    let backend = OutputBackend::Offline {
        sample_rate: sample_rate as f32,
    };
    let mut engine = build_engine(settings_path, backend, assets, seed);
    engine.start_preset(identifier, park_key);

    let block_len = (sample_rate / 100).max(1) as usize;
    let play_blocks = (seconds.max(0.0) * 100.0).round() as usize;
    let release_blocks = RELEASE_TIME.as_millis() as usize / 10;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(out, spec)
        .with_context(|| format!("Cannot create {}", out.display()))?;

    let mut block = vec![0.0f32; block_len];
    for index in 0..play_blocks + release_blocks {
        if index == play_blocks {
            engine.stop();
        }
        engine.render(&mut block);
        for sample in &block {
            writer.write_sample(*sample)?;
        }
    }
    writer.finalize()?;

    log::info!(
        "Rendered {:.1}s of {} to {}",
        (play_blocks + release_blocks) as f32 / 100.0,
        identifier,
        out.display()
    );
    Ok(())
}

fn list_presets() {
    for key in PresetKey::ALL {
        let def = key.definition();
        let types = def
            .chirp_types
            .as_deref()
            .map(|types| {
                types
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} filter {:>6.0}Hz  noise {:.3}  every {:>5}ms  types {}",
            key.as_str(),
            def.filter_freq,
            def.noise_gain,
            def.chirp_rate_ms.unwrap_or(EngineConfig::default().default_chirp_interval_ms),
            types
        );
    }
}

fn update_settings(path: &Path, edit: impl FnOnce(&mut SettingsStore)) -> Result<()> {
    let mut settings = SettingsStore::load_or_default(path);
    edit(&mut settings);
    settings.save(path)?;
    log::info!(
        "Saved {} (global sound {})",
        path.display(),
        if settings.is_global_sound_enabled() {
            "on"
        } else {
            "off"
        }
    );
    Ok(())
}
