//! Command line definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ambient")]
#[command(about = "Play generative park soundscapes")]
pub struct Cli {
    /// Sound preferences file, in the same JSON shape the web page stores
    #[arg(long, global = true, default_value = "ambient-settings.json")]
    pub settings: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play a park scene on the default output device
    Play {
        /// Park id or name, e.g. "yell" or "big-sur-coastal-trail"
        identifier: String,

        /// Key used for the mute and nature style preferences
        #[arg(long)]
        park_key: Option<String>,

        /// How long to play before fading out
        #[arg(long, short, default_value_t = 30.0)]
        seconds: f32,

        /// Directory that `/assets/...` sample URLs resolve against
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Seed for the event generator
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Render a scene offline to a WAV file
    Render {
        identifier: String,

        #[arg(long)]
        park_key: Option<String>,

        #[arg(long, short)]
        out: PathBuf,

        #[arg(long, short, default_value_t = 10.0)]
        seconds: f32,

        #[arg(long, default_value_t = 44100)]
        sample_rate: u32,

        #[arg(long)]
        assets: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show which preset a park resolves to
    Resolve {
        identifier: String,

        /// Display name, matched along with the identifier
        #[arg(long, default_value = "")]
        name: String,
    },
    /// List every preset and its settings
    Presets,
    /// Mute one park
    Mute { key: String },
    /// Unmute one park
    Unmute { key: String },
    /// Choose the nature style for one park
    Style { key: String, style: StyleArg },
    /// Turn all ambient sound on or off
    Global { state: Toggle },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StyleArg {
    Birds,
    Wind,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}
