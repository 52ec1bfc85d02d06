//! Scale / chord tables and height quantization.
//!
//! A [`ScaleTable`] is an ordered, non-empty list of musical values.  A hand
//! height is clamped into a [`HeightRange`], normalized to `0.0..=1.0`, and
//! mapped to `floor(normalized * (len - 1))`:
//!
//! ```rust
//! use gesture_midi::{HeightRange, ScaleTable};
//!
//! let range = HeightRange::new(75.0, 350.0).unwrap();
//! let table = ScaleTable::new("lead", vec![45u8, 50, 55, 57, 60]).unwrap();
//! assert_eq!(table.quantize(40.0,  &range), 45);   // below range
//! assert_eq!(table.quantize(230.0, &range), 55);
//! assert_eq!(table.quantize(999.0, &range), 60);   // above range
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("table '{0}' is empty")]
    Empty(String),

    #[error("invalid height range [{min}, {max}]: need finite min < max")]
    InvalidRange { min: f32, max: f32 },
}

// ════════════════════════════════════════════════════════════════════════════
// HeightRange
// ════════════════════════════════════════════════════════════════════════════

/// Vertical band (mm) mapped onto a table.  Always finite with `min < max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightRange {
    min: f32,
    max: f32,
}

impl HeightRange {
    pub fn new(min: f32, max: f32) -> Result<Self, TableError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(TableError::InvalidRange { min, max });
        }
        Ok(HeightRange { min, max })
    }

    pub fn min(&self) -> f32 { self.min }
    pub fn max(&self) -> f32 { self.max }

    /// Clamp into the band and scale to `0.0..=1.0`.
    pub fn normalize(&self, height: f32) -> f32 {
        let clamped = height.clamp(self.min, self.max);
        (clamped - self.min) / (self.max - self.min)
    }
}

/// Table index for `height`, always in `0..len`.  `len` must be non-zero.
pub fn quantize_index(height: f32, range: &HeightRange, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let last = len - 1;
    let idx = (range.normalize(height) * last as f32).floor();
    if idx.is_nan() || idx < 0.0 {
        return 0;
    }
    (idx as usize).min(last)
}

// ════════════════════════════════════════════════════════════════════════════
// ScaleTable
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct ScaleTable<T> {
    name:   String,
    values: Vec<T>,
}

impl<T: Copy> ScaleTable<T> {
    pub fn new(name: impl Into<String>, values: Vec<T>) -> Result<Self, TableError> {
        let name = name.into();
        if values.is_empty() {
            return Err(TableError::Empty(name));
        }
        Ok(ScaleTable { name, values })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn values(&self) -> &[T] { &self.values }
    pub fn len(&self) -> usize { self.values.len() }

    /// Never true; tables are validated non-empty.
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    pub fn index_for(&self, height: f32, range: &HeightRange) -> usize {
        quantize_index(height, range, self.values.len())
    }

    pub fn quantize(&self, height: f32, range: &HeightRange) -> T {
        self.values[self.index_for(height, range)]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Chords
// ════════════════════════════════════════════════════════════════════════════

/// Chord quality, announced to the chord synth as a control-change value
/// before the root note is played.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordQuality {
    #[serde(alias = "maj")]
    Major,
    #[serde(alias = "maj7")]
    Major7,
    #[serde(alias = "dom7", alias = "7")]
    Dominant7,
    #[serde(alias = "min")]
    Minor,
    #[serde(alias = "min7", alias = "m7")]
    Minor7,
    #[serde(alias = "dim")]
    Diminished,
}

impl ChordQuality {
    /// Control-change value selecting this quality.
    pub fn cc_value(self) -> u8 {
        match self {
            ChordQuality::Major      => 0,
            ChordQuality::Major7     => 1,
            ChordQuality::Dominant7  => 2,
            ChordQuality::Minor      => 3,
            ChordQuality::Minor7     => 4,
            ChordQuality::Diminished => 6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ChordQuality::Major      => "",
            ChordQuality::Major7     => "maj7",
            ChordQuality::Dominant7  => "7",
            ChordQuality::Minor      => "m",
            ChordQuality::Minor7     => "m7",
            ChordQuality::Diminished => "dim",
        }
    }
}

/// Root note plus quality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chord {
    pub root:    u8,
    pub quality: ChordQuality,
}

impl Chord {
    pub const fn new(root: u8, quality: ChordQuality) -> Self {
        Chord { root, quality }
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 12] = ["C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B"];
        let octave = (self.root / 12) as i32 - 1;
        write!(f, "{}{}{}", NAMES[(self.root % 12) as usize], octave, self.quality.symbol())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Presets
// ════════════════════════════════════════════════════════════════════════════

/// Built-in tables used when the configuration names none.
pub mod presets {
    use super::{Chord, ChordQuality::*, ScaleTable};

    const C_DIATONIC_HARMONY: [Chord; 5] = [
        Chord::new(48, Major), Chord::new(50, Minor), Chord::new(52, Minor),
        Chord::new(53, Major), Chord::new(55, Dominant7),
    ];
    const FUNKY_PROGRESSION_CM: [Chord; 5] = [
        Chord::new(48, Minor7), Chord::new(51, Major7), Chord::new(53, Dominant7),
        Chord::new(56, Minor7), Chord::new(55, Dominant7),
    ];
    const A_NATURAL_MINOR: [Chord; 5] = [
        Chord::new(45, Minor), Chord::new(48, Major), Chord::new(50, Minor),
        Chord::new(52, Minor), Chord::new(55, Major),
    ];

    fn table(name: &str, chords: &[Chord]) -> ScaleTable<Chord> {
        ScaleTable { name: name.to_string(), values: chords.to_vec() }
    }

    /// The three chord tables cycled by the scale-change gesture, in order.
    pub fn chord_tables() -> Vec<ScaleTable<Chord>> {
        vec![
            table("C diatonic harmony", &C_DIATONIC_HARMONY),
            table("funky progression Cm", &FUNKY_PROGRESSION_CM),
            table("A natural minor", &A_NATURAL_MINOR),
        ]
    }

    /// Lead-line pitches: A2 and G3.
    pub fn lead_scale() -> ScaleTable<u8> {
        ScaleTable { name: "lead".to_string(), values: vec![45, 55] }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> HeightRange {
        HeightRange::new(75.0, 350.0).unwrap()
    }

    fn five() -> ScaleTable<u8> {
        ScaleTable::new("five", vec![0, 1, 2, 3, 4]).unwrap()
    }

    #[test]
    fn rejects_empty_table() {
        assert_eq!(
            ScaleTable::<u8>::new("x", vec![]),
            Err(TableError::Empty("x".to_string()))
        );
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!(HeightRange::new(350.0, 75.0).is_err());
        assert!(HeightRange::new(100.0, 100.0).is_err());
        assert!(HeightRange::new(f32::NAN, 100.0).is_err());
        assert!(HeightRange::new(0.0, f32::INFINITY).is_err());
    }

    #[test]
    fn ends_of_range() {
        let t = five();
        assert_eq!(t.index_for(350.0, &range()), 4);
        assert_eq!(t.index_for(500.0, &range()), 4);
        assert_eq!(t.index_for(75.0, &range()), 0);
        assert_eq!(t.index_for(10.0, &range()), 0);
    }

    #[test]
    fn interior_uses_floor() {
        let t = five();
        // (200 - 75) / 275 = 0.4545 → floor(1.818) = 1
        assert_eq!(t.index_for(200.0, &range()), 1);
        // Exactly half way: 212.5 → floor(2.0) = 2
        assert_eq!(t.index_for(212.5, &range()), 2);
        assert_eq!(t.index_for(349.0, &range()), 3);
    }

    #[test]
    fn monotonic_in_height() {
        let t = five();
        let mut prev = 0;
        for h in (0..450).map(|h| h as f32) {
            let idx = t.index_for(h, &range());
            assert!(idx >= prev, "index dropped at height {}", h);
            prev = idx;
        }
        assert_eq!(prev, 4);
    }

    #[test]
    fn single_entry_table() {
        let t = ScaleTable::new("one", vec![60u8]).unwrap();
        for h in [-100.0, 75.0, 200.0, 350.0, 1e6] {
            assert_eq!(t.quantize(h, &range()), 60);
        }
    }

    #[test]
    fn nan_height_maps_to_first() {
        assert_eq!(five().index_for(f32::NAN, &range()), 0);
    }

    #[test]
    fn quality_cc_values() {
        assert_eq!(ChordQuality::Major.cc_value(), 0);
        assert_eq!(ChordQuality::Major7.cc_value(), 1);
        assert_eq!(ChordQuality::Dominant7.cc_value(), 2);
        assert_eq!(ChordQuality::Minor.cc_value(), 3);
        assert_eq!(ChordQuality::Minor7.cc_value(), 4);
        assert_eq!(ChordQuality::Diminished.cc_value(), 6);
    }

    #[test]
    fn chord_display() {
        assert_eq!(Chord::new(48, ChordQuality::Major).to_string(), "C3");
        assert_eq!(Chord::new(51, ChordQuality::Major7).to_string(), "Eb3maj7");
        assert_eq!(Chord::new(45, ChordQuality::Minor).to_string(), "A2m");
    }

    #[test]
    fn presets_are_non_empty() {
        let tables = presets::chord_tables();
        assert_eq!(tables.len(), 3);
        assert!(tables.iter().all(|t| t.len() == 5));
        assert_eq!(presets::lead_scale().values(), &[45, 55]);
    }
}
