use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Natural letter name of a pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Scan order used when choosing a spelling; earlier letters win ties.
    pub const ALL: [Step; 7] = [
        Step::C,
        Step::D,
        Step::E,
        Step::F,
        Step::G,
        Step::A,
        Step::B,
    ];

    /// Chromatic index of the natural letter within one octave.
    pub fn chromatic_index(self) -> i64 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }

    pub fn from_letter(letter: char) -> Option<Step> {
        match letter {
            'C' => Some(Step::C),
            'D' => Some(Step::D),
            'E' => Some(Step::E),
            'F' => Some(Step::F),
            'G' => Some(Step::G),
            'A' => Some(Step::A),
            'B' => Some(Step::B),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = String;

    /// Accepts exactly one upper-case letter, as written in `<step>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => {
                Step::from_letter(letter).ok_or_else(|| format!("unknown step '{}'", s))
            }
            _ => Err(format!("unknown step '{}'", s)),
        }
    }
}

/// `#` per sharp, `b` per flat.
pub fn accidental_text(alter: i32) -> String {
    if alter >= 0 {
        "#".repeat(alter as usize)
    } else {
        "b".repeat(alter.unsigned_abs() as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub step: Step,
    pub alter: i32,
    pub octave: i32,
}

impl Pitch {
    pub fn new(step: Step, alter: i32, octave: i32) -> Self {
        Self {
            step,
            alter,
            octave,
        }
    }

    pub fn natural(step: Step, octave: i32) -> Self {
        Self::new(step, 0, octave)
    }

    /// Semitones above C of octave 0; independent of spelling.
    pub fn sounding(&self) -> i64 {
        self.step.chromatic_index() + i64::from(self.alter) + 12 * i64::from(self.octave)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.step, accidental_text(self.alter), self.octave)
    }
}

impl FromStr for Pitch {
    type Err = String;

    /// Parses scientific pitch notation such as `C4`, `F#4`, `Bb-1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.char_indices();
        let step = chars
            .next()
            .and_then(|(_, c)| Step::from_letter(c))
            .ok_or_else(|| format!("invalid pitch '{}'", s))?;

        let mut alter = 0i32;
        let mut octave_start = s.len();
        for (i, c) in chars {
            match c {
                '#' => alter += 1,
                'b' => alter -= 1,
                _ => {
                    octave_start = i;
                    break;
                }
            }
        }

        let octave = s[octave_start..]
            .parse::<i32>()
            .map_err(|_| format!("invalid octave in pitch '{}'", s))?;
        Ok(Pitch::new(step, alter, octave))
    }
}

/// How the score document is packaged on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScorePackage {
    /// Compressed MusicXML; the document is one entry of the archive.
    Archive { bytes: Vec<u8>, entry_name: String },
    /// Uncompressed MusicXML file.
    Plain,
}

#[derive(Debug, Clone)]
pub struct ExtractedScore {
    pub package: ScorePackage,
    pub document: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransposeStats {
    pub notes_transposed: usize,
    pub unpitched_notes: usize,
    pub malformed_notes: usize,
}

impl TransposeStats {
    pub fn total_notes(&self) -> usize {
        self.notes_transposed + self.unpitched_notes + self.malformed_notes
    }
}

#[derive(Debug, Clone)]
pub struct TransposedScore {
    pub package: ScorePackage,
    pub document: Vec<u8>,
    pub stats: TransposeStats,
}

/// Result of one successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransposeOutcome {
    pub output_path: String,
    pub entry_name: Option<String>,
    pub stats: TransposeStats,
}

/// Provenance summary printed by the binaries with `--json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransposeReport {
    pub input: String,
    pub output: String,
    pub entry_name: Option<String>,
    pub interval: i32,
    pub stats: TransposeStats,
    pub original_key: Option<String>,
    pub transposed_key: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_parsing_is_strict() {
        assert_eq!("G".parse::<Step>().unwrap(), Step::G);
        assert!("g".parse::<Step>().is_err());
        assert!("H".parse::<Step>().is_err());
        assert!("".parse::<Step>().is_err());
        assert!("CD".parse::<Step>().is_err());
    }

    #[test]
    fn test_pitch_display_and_parse() {
        let f_sharp = Pitch::new(Step::F, 1, 4);
        assert_eq!(f_sharp.to_string(), "F#4");
        assert_eq!("F#4".parse::<Pitch>().unwrap(), f_sharp);
        assert_eq!("Bb3".parse::<Pitch>().unwrap(), Pitch::new(Step::B, -1, 3));
        assert_eq!("Ebb-1".parse::<Pitch>().unwrap(), Pitch::new(Step::E, -2, -1));
        assert!("X4".parse::<Pitch>().is_err());
        assert!("C#".parse::<Pitch>().is_err());
    }

    #[test]
    fn test_sounding_ignores_spelling() {
        let c_sharp = Pitch::new(Step::C, 1, 4);
        let d_flat = Pitch::new(Step::D, -1, 4);
        let b_sharp = Pitch::new(Step::B, 1, 3);
        let c4 = Pitch::natural(Step::C, 4);

        assert_eq!(c_sharp.sounding(), d_flat.sounding());
        assert_eq!(b_sharp.sounding(), c4.sounding());
        assert_eq!(c4.sounding(), 48);
    }

    #[test]
    fn test_stats_total() {
        let stats = TransposeStats {
            notes_transposed: 3,
            unpitched_notes: 2,
            malformed_notes: 1,
        };
        assert_eq!(stats.total_notes(), 6);
    }
}
