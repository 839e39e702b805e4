use super::chirp::ChirpKind;
use std::borrow::Cow;
use std::fmt;

/// Every named scene the engine can play.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PresetKey {
    Forest,
    Coastal,
    Mountain,
    Canyon,
    Desert,
    Swamp,
    Tundra,
    Default,
    Yellowstone,
    Yosemite,
    Rocky,
}

impl PresetKey {
    pub const ALL: [PresetKey; 11] = [
        PresetKey::Forest,
        PresetKey::Coastal,
        PresetKey::Mountain,
        PresetKey::Canyon,
        PresetKey::Desert,
        PresetKey::Swamp,
        PresetKey::Tundra,
        PresetKey::Default,
        PresetKey::Yellowstone,
        PresetKey::Yosemite,
        PresetKey::Rocky,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PresetKey::Forest => "forest",
            PresetKey::Coastal => "coastal",
            PresetKey::Mountain => "mountain",
            PresetKey::Canyon => "canyon",
            PresetKey::Desert => "desert",
            PresetKey::Swamp => "swamp",
            PresetKey::Tundra => "tundra",
            PresetKey::Default => "default",
            PresetKey::Yellowstone => "yellowstone",
            PresetKey::Yosemite => "yosemite",
            PresetKey::Rocky => "rocky",
        }
    }

    /// Looks a preset up by its own name, not by park.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    pub fn definition(self) -> &'static PresetDefinition {
        match self {
            PresetKey::Forest => &FOREST,
            PresetKey::Coastal => &COASTAL,
            PresetKey::Mountain => &MOUNTAIN,
            PresetKey::Canyon => &CANYON,
            PresetKey::Desert => &DESERT,
            PresetKey::Swamp => &SWAMP,
            PresetKey::Tundra => &TUNDRA,
            PresetKey::Default => &DEFAULT,
            PresetKey::Yellowstone => &YELLOWSTONE,
            PresetKey::Yosemite => &YOSEMITE,
            PresetKey::Rocky => &ROCKY,
        }
    }
}

impl fmt::Display for PresetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthesis parameters for one scene. `None` fields fall back to the
/// engine's per-tick defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct PresetDefinition {
    /// Low-pass cutoff of the noise bed, also used as the chirp filter hint.
    pub filter_freq: f32,
    /// Gain of the continuous noise bed.
    pub noise_gain: f32,
    /// Whether foreground events are scheduled at all.
    pub chirp: bool,
    pub chirp_freq: Option<(f32, f32)>,
    pub chirp_rate_ms: Option<u64>,
    pub chirp_amp: Option<f32>,
    pub chirp_len: Option<f32>,
    pub chirp_types: Option<Cow<'static, [ChirpKind]>>,
}

impl PresetDefinition {
    /// The "birds" nature style: no continuous noise bed, and bird events
    /// always eligible.
    pub fn with_bird_style(&self) -> PresetDefinition {
        let chirp_types: Cow<'static, [ChirpKind]> = match &self.chirp_types {
            Some(types) if types.contains(&ChirpKind::Bird) => types.clone(),
            Some(types) => {
                let mut forced = Vec::with_capacity(types.len() + 1);
                forced.push(ChirpKind::Bird);
                forced.extend_from_slice(types);
                Cow::Owned(forced)
            }
            None => Cow::Borrowed(&[ChirpKind::Bird]),
        };

        PresetDefinition {
            noise_gain: 0.0,
            chirp_types: Some(chirp_types),
            ..self.clone()
        }
    }
}

static FOREST: PresetDefinition = PresetDefinition {
    filter_freq: 1800.0,
    noise_gain: 0.02,
    chirp: true,
    chirp_freq: Some((2200.0, 3600.0)),
    chirp_rate_ms: Some(2800),
    chirp_amp: Some(0.035),
    chirp_len: Some(0.34),
    chirp_types: Some(Cow::Borrowed(&[ChirpKind::Bird, ChirpKind::Grain])),
};

static COASTAL: PresetDefinition = PresetDefinition {
    filter_freq: 900.0,
    noise_gain: 0.0,
    chirp: true,
    chirp_freq: Some((2800.0, 4200.0)),
    chirp_rate_ms: Some(4200),
    chirp_amp: Some(0.032),
    chirp_len: Some(0.5),
    chirp_types: Some(Cow::Borrowed(&[ChirpKind::Bird])),
};

static MOUNTAIN: PresetDefinition = PresetDefinition {
    filter_freq: 2400.0,
    noise_gain: 0.0,
    chirp: true,
    chirp_freq: Some((1600.0, 3000.0)),
    chirp_rate_ms: Some(4200),
    chirp_amp: Some(0.03),
    chirp_len: Some(0.5),
    chirp_types: Some(Cow::Borrowed(&[ChirpKind::Bird, ChirpKind::Grain])),
};

static CANYON: PresetDefinition = PresetDefinition {
    filter_freq: 600.0,
    noise_gain: 0.0,
    chirp: true,
    chirp_freq: None,
    chirp_rate_ms: None,
    chirp_amp: Some(0.02),
    chirp_len: None,
    chirp_types: Some(Cow::Borrowed(&[ChirpKind::Bird])),
};

static DESERT: PresetDefinition = PresetDefinition {
    filter_freq: 1400.0,
    noise_gain: 0.0,
    chirp: true,
    chirp_freq: None,
    chirp_rate_ms: Some(4200),
    chirp_amp: Some(0.02),
    chirp_len: None,
    chirp_types: Some(Cow::Borrowed(&[ChirpKind::Bird, ChirpKind::Grain])),
};

static SWAMP: PresetDefinition = PresetDefinition {
    filter_freq: 700.0,
    noise_gain: 0.0,
    chirp: true,
    chirp_freq: Some((1500.0, 3000.0)),
    chirp_rate_ms: Some(4200),
    chirp_amp: Some(0.035),
    chirp_len: Some(0.6),
    chirp_types: Some(Cow::Borrowed(&[ChirpKind::Grain, ChirpKind::Bird])),
};

static TUNDRA: PresetDefinition = PresetDefinition {
    filter_freq: 2600.0,
    noise_gain: 0.0,
    chirp: true,
    chirp_freq: None,
    chirp_rate_ms: None,
    chirp_amp: Some(0.02),
    chirp_len: None,
    chirp_types: Some(Cow::Borrowed(&[ChirpKind::Bird])),
};

static DEFAULT: PresetDefinition = PresetDefinition {
    filter_freq: 1600.0,
    noise_gain: 0.0,
    chirp: true,
    chirp_freq: Some((2000.0, 3200.0)),
    chirp_rate_ms: Some(3000),
    chirp_amp: Some(0.03),
    chirp_len: Some(0.35),
    chirp_types: Some(Cow::Borrowed(&[ChirpKind::Bird, ChirpKind::Grain])),
};

static YELLOWSTONE: PresetDefinition = PresetDefinition {
    filter_freq: 2200.0,
    noise_gain: 0.0,
    chirp: true,
    chirp_freq: Some((800.0, 1600.0)),
    chirp_rate_ms: Some(5200),
    chirp_amp: Some(0.03),
    chirp_len: Some(0.6),
    chirp_types: Some(Cow::Borrowed(&[ChirpKind::Bird])),
};

static YOSEMITE: PresetDefinition = PresetDefinition {
    filter_freq: 3000.0,
    noise_gain: 0.0,
    chirp: true,
    chirp_freq: Some((3200.0, 4800.0)),
    chirp_rate_ms: Some(2600),
    chirp_amp: Some(0.03),
    chirp_len: Some(0.28),
    chirp_types: Some(Cow::Borrowed(&[ChirpKind::Bird])),
};

static ROCKY: PresetDefinition = PresetDefinition {
    filter_freq: 1800.0,
    noise_gain: 0.0,
    chirp: true,
    chirp_freq: Some((1200.0, 2400.0)),
    chirp_rate_ms: Some(6000),
    chirp_amp: Some(0.012),
    chirp_len: Some(1.2),
    chirp_types: Some(Cow::Borrowed(&[ChirpKind::Bird])),
};

/// Park ids and name fragments with a dedicated preset. Checked in order;
/// the first fragment contained in the identifier wins.
const PARK_PRESET_MAP: &[(&str, PresetKey)] = &[
    ("acad", PresetKey::Coastal),
    ("acadia", PresetKey::Coastal),
    ("island", PresetKey::Coastal),
    ("yosemite", PresetKey::Yosemite),
    ("yosem", PresetKey::Yosemite),
    ("yell", PresetKey::Yellowstone),
    ("yellowstone", PresetKey::Yellowstone),
    ("grandcanyon", PresetKey::Canyon),
    ("grca", PresetKey::Canyon),
    ("canyon", PresetKey::Canyon),
    ("zion", PresetKey::Desert),
    ("bryce", PresetKey::Desert),
    ("death valley", PresetKey::Desert),
    ("everglades", PresetKey::Swamp),
    ("denali", PresetKey::Tundra),
    ("glacier", PresetKey::Mountain),
    ("romo", PresetKey::Mountain),
    ("rocky", PresetKey::Rocky),
    ("rockymountain", PresetKey::Rocky),
    ("rocky mountain", PresetKey::Rocky),
];

/// Landscape keywords tried when no park fragment matches.
const KEYWORD_HEURISTICS: &[(&[&str], PresetKey)] = &[
    (&["coast", "beach", "island"], PresetKey::Coastal),
    (&["mount", "peak", "glacier", "range"], PresetKey::Mountain),
    (&["canyon", "gorge", "rim"], PresetKey::Canyon),
    (&["desert", "dune", "valley"], PresetKey::Desert),
    (&["swamp", "everglade", "marsh"], PresetKey::Swamp),
    (&["tundra", "alaska", "denali"], PresetKey::Tundra),
];

/// Chooses a preset for a park id and display name. Case-insensitive;
/// anything unrecognised gets the forest scene.
pub fn pick_preset(id: &str, name: &str) -> PresetKey {
    let haystack = format!("{} {}", id, name).to_lowercase();

    if let Some((_, key)) = PARK_PRESET_MAP
        .iter()
        .find(|(fragment, _)| haystack.contains(fragment))
    {
        return *key;
    }

    KEYWORD_HEURISTICS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(_, key)| *key)
        .unwrap_or(PresetKey::Forest)
}
