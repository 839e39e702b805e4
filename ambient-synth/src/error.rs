use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("failed to fetch sample '{url}': {source}")]
    SampleFetch {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode sample '{name}': {source}")]
    SampleDecode {
        name: String,
        #[source]
        source: hound::Error,
    },

    #[error("sample '{name}' has unusable sample rate {rate}")]
    InvalidSampleRate { name: String, rate: f32 },

    #[error("sample '{0}' contains no audio")]
    EmptySample(String),

    #[error("no scene is playing")]
    NoActiveScene,

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("settings file {path}: {source}")]
    Settings {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("settings format: {0}")]
    SettingsFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Output(format!("{err:#}"))
    }
}
