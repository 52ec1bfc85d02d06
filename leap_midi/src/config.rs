//! Static configuration.
//!
//! Loaded once at startup from TOML (every key optional; missing keys take
//! the built-in defaults below) and validated before any frame is processed.
//! Nothing here is re-read while running.
//!
//! ```toml
//! [output]
//! port = "USB MIDI Interface 1"
//!
//! [chords]
//! strike_threshold = 15.0
//! cooldown_ms      = 200
//!
//! [[chords.tables]]
//! name   = "two chords"
//! chords = [{ root = 48, quality = "major" }, { root = 50, quality = "minor" }]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gesture_midi::{presets, Chord, HeightRange, ScaleTable, TableError, DEFAULT_VELOCITY};
use hand_frame::Axis;

// ════════════════════════════════════════════════════════════════════════════
// ConfigError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid table: {0}")]
    Table(#[from] TableError),
}

type Result<T> = std::result::Result<T, ConfigError>;

// ════════════════════════════════════════════════════════════════════════════
// Config
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub cc:     CcConfig,
    pub drums:  DrumConfig,
    pub chords: ChordConfig,
    pub lead:   LeadConfig,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml(&text)
    }

    /// Check every section, including the parts a policy only builds later.
    pub fn validate(&self) -> Result<()> {
        self.cc.validate()?;
        self.drums.validate()?;
        self.chords.validate()?;
        self.lead.validate()?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Case-insensitive substring of the output port name.  When no port
    /// matches, the first available port is used.
    pub port: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig { port: Some("USB MIDI Interface 1".to_string()) }
    }
}

// ── shared validators ─────────────────────────────────────────────────────

fn channel(what: &str, ch: u8) -> Result<()> {
    if ch > 15 {
        return Err(ConfigError::Invalid(format!("{what}: channel {ch} is not in 0–15")));
    }
    Ok(())
}

fn data_byte(what: &str, v: u8) -> Result<()> {
    if v > 127 {
        return Err(ConfigError::Invalid(format!("{what}: {v} is not in 0–127")));
    }
    Ok(())
}

fn positive(what: &str, v: f32) -> Result<()> {
    if !v.is_finite() || v <= 0.0 {
        return Err(ConfigError::Invalid(format!("{what}: {v} must be a positive distance")));
    }
    Ok(())
}

fn non_negative(what: &str, v: f32) -> Result<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(ConfigError::Invalid(format!("{what}: {v} must be >= 0")));
    }
    Ok(())
}

fn unit(what: &str, v: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&v) {
        return Err(ConfigError::Invalid(format!("{what}: {v} is not in 0.0–1.0")));
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Continuous CC
// ════════════════════════════════════════════════════════════════════════════

/// How one hand's position drives one control stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisMapping {
    pub channel: u8,
    /// Held while the hand is in view.
    pub note:    u8,
    pub control: u8,
    pub axis:    Axis,
    /// Position (mm) mapped to CC 0.
    pub min:     f32,
    /// Position (mm) mapped to CC 127.
    pub max:     f32,
}

impl AxisMapping {
    fn validate(&self, what: &str) -> Result<()> {
        channel(what, self.channel)?;
        data_byte(what, self.note)?;
        data_byte(what, self.control)?;
        HeightRange::new(self.min, self.max)?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcConfig {
    pub velocity: u8,
    pub left:     AxisMapping,
    pub right:    AxisMapping,
}

impl Default for CcConfig {
    fn default() -> Self {
        CcConfig {
            velocity: DEFAULT_VELOCITY,
            left:  AxisMapping { channel: 8, note: 60, control: 74, axis: Axis::X, min: -150.0, max: 150.0 },
            right: AxisMapping { channel: 9, note: 62, control: 74, axis: Axis::Y, min:   50.0, max: 350.0 },
        }
    }
}

impl CcConfig {
    pub fn validate(&self) -> Result<()> {
        data_byte("cc.velocity", self.velocity)?;
        self.left.validate("cc.left")?;
        self.right.validate("cc.right")?;
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Drums
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteSlot {
    pub channel: u8,
    pub note:    u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrumConfig {
    /// Horizontal radius (mm) of the playing zone.
    pub radius:           f32,
    /// Grab strength below which the hand counts as open.
    pub open_below:       f32,
    /// Downward travel (mm) that fires a re-strike.
    pub strike_threshold: f32,
    pub cooldown_ms:      u64,
    pub velocity:         u8,
    pub left:             NoteSlot,
    pub right:            NoteSlot,
}

impl Default for DrumConfig {
    fn default() -> Self {
        DrumConfig {
            radius:           120.0,
            open_below:       0.2,
            strike_threshold: 30.0,
            cooldown_ms:      0,
            velocity:         DEFAULT_VELOCITY,
            left:             NoteSlot { channel: 8, note: 60 },
            right:            NoteSlot { channel: 9, note: 20 },
        }
    }
}

impl DrumConfig {
    pub fn cooldown(&self) -> Duration { Duration::from_millis(self.cooldown_ms) }

    pub fn validate(&self) -> Result<()> {
        positive("drums.radius", self.radius)?;
        unit("drums.open_below", self.open_below)?;
        non_negative("drums.strike_threshold", self.strike_threshold)?;
        data_byte("drums.velocity", self.velocity)?;
        for (what, slot) in [("drums.left", self.left), ("drums.right", self.right)] {
            channel(what, slot.channel)?;
            data_byte(what, slot.note)?;
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Chords
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChordTableConfig {
    pub name:   String,
    pub chords: Vec<Chord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChordConfig {
    pub channel:          u8,
    /// Control number that selects the chord quality.
    pub quality_control:  u8,
    pub velocity:         u8,
    pub radius:           f32,
    /// Grab strength above which the chord hand is muted.
    pub mute_above:       f32,
    pub height_min:       f32,
    pub height_max:       f32,
    pub strike_threshold: f32,
    pub sticky_zone:      f32,
    pub cooldown_ms:      u64,
    /// Grab strength of the other hand that cycles to the next table.
    pub scale_grab:       f32,
    /// The cycling grab re-arms below `scale_grab - grab_release_gap`.
    pub grab_release_gap: f32,
    pub tables:           Vec<ChordTableConfig>,
}

impl Default for ChordConfig {
    fn default() -> Self {
        ChordConfig {
            channel:          1,
            quality_control:  15,
            velocity:         DEFAULT_VELOCITY,
            radius:           100.0,
            mute_above:       0.9,
            height_min:       75.0,
            height_max:       350.0,
            strike_threshold: 15.0,
            sticky_zone:      20.0,
            cooldown_ms:      200,
            scale_grab:       0.9,
            grab_release_gap: 0.2,
            tables: presets::chord_tables().into_iter()
                .map(|t| ChordTableConfig { name: t.name().to_string(), chords: t.values().to_vec() })
                .collect(),
        }
    }
}

impl ChordConfig {
    pub fn cooldown(&self) -> Duration { Duration::from_millis(self.cooldown_ms) }

    pub fn height_range(&self) -> Result<HeightRange> {
        Ok(HeightRange::new(self.height_min, self.height_max)?)
    }

    /// Validated tables in cycling order.
    pub fn chord_tables(&self) -> Result<Vec<ScaleTable<Chord>>> {
        if self.tables.is_empty() {
            return Err(ConfigError::Invalid("chords.tables: at least one table is required".into()));
        }
        self.tables.iter()
            .map(|t| -> Result<ScaleTable<Chord>> {
                for c in &t.chords {
                    data_byte(&format!("chords.tables '{}' root", t.name), c.root)?;
                }
                Ok(ScaleTable::new(t.name.clone(), t.chords.clone())?)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        channel("chords.channel", self.channel)?;
        data_byte("chords.quality_control", self.quality_control)?;
        data_byte("chords.velocity", self.velocity)?;
        positive("chords.radius", self.radius)?;
        unit("chords.mute_above", self.mute_above)?;
        unit("chords.scale_grab", self.scale_grab)?;
        unit("chords.grab_release_gap", self.grab_release_gap)?;
        non_negative("chords.strike_threshold", self.strike_threshold)?;
        non_negative("chords.sticky_zone", self.sticky_zone)?;
        self.height_range()?;
        self.chord_tables()?;
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Lead + detune
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadConfig {
    pub channel:        u8,
    pub velocity:       u8,
    pub radius:         f32,
    pub mute_above:     f32,
    pub height_min:     f32,
    pub height_max:     f32,
    /// Pitch table, lowest height first.
    pub notes:          Vec<u8>,
    pub detune_control: u8,
    pub detune_center:  u8,
    /// Vertical travel (mm) from the start height to full detune.
    pub detune_span:    f32,
}

impl Default for LeadConfig {
    fn default() -> Self {
        LeadConfig {
            channel:        6,
            velocity:       DEFAULT_VELOCITY,
            radius:         100.0,
            mute_above:     0.9,
            height_min:     75.0,
            height_max:     350.0,
            notes:          presets::lead_scale().values().to_vec(),
            detune_control: 18,
            detune_center:  64,
            detune_span:    100.0,
        }
    }
}

impl LeadConfig {
    pub fn height_range(&self) -> Result<HeightRange> {
        Ok(HeightRange::new(self.height_min, self.height_max)?)
    }

    pub fn pitch_table(&self) -> Result<ScaleTable<u8>> {
        for &n in &self.notes {
            data_byte("lead.notes", n)?;
        }
        Ok(ScaleTable::new("lead", self.notes.clone())?)
    }

    pub fn validate(&self) -> Result<()> {
        channel("lead.channel", self.channel)?;
        data_byte("lead.velocity", self.velocity)?;
        data_byte("lead.detune_control", self.detune_control)?;
        data_byte("lead.detune_center", self.detune_center)?;
        positive("lead.radius", self.radius)?;
        positive("lead.detune_span", self.detune_span)?;
        unit("lead.mute_above", self.mute_above)?;
        self.height_range()?;
        self.pitch_table()?;
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
