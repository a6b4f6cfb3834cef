//! Key labels such as `Bb major` or `F# minor`, transposed with the same
//! spelling policy as notes so the provenance record matches the score.

use crate::core::transposer::transpose;
use crate::domain::model::{accidental_text, Pitch, Step};
use crate::utils::error::{Result, TransposeError};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLabel {
    pub tonic: Step,
    pub alter: i32,
    /// Free-form mode word as the user wrote it, e.g. `major`, `Minor`.
    pub mode: Option<String>,
}

impl KeyLabel {
    pub fn transposed(&self, interval: i32) -> KeyLabel {
        let moved = transpose(Pitch::new(self.tonic, self.alter, 0), interval);
        KeyLabel {
            tonic: moved.step,
            alter: moved.alter,
            mode: self.mode.clone(),
        }
    }
}

impl FromStr for KeyLabel {
    type Err = TransposeError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| TransposeError::InvalidConfigValue {
            field: "key".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.split_whitespace();
        let name = parts.next().ok_or_else(|| invalid("Key label is empty"))?;
        let mode = parts.next().map(str::to_string);
        if parts.next().is_some() {
            return Err(invalid("Expected '<tonic> [mode]'"));
        }

        let mut chars = name.chars();
        let tonic = chars
            .next()
            .and_then(|c| Step::from_letter(c.to_ascii_uppercase()))
            .ok_or_else(|| invalid("Tonic must be one of A-G"))?;

        let mut alter = 0;
        for c in chars {
            match c {
                '#' => alter += 1,
                'b' => alter -= 1,
                _ => return Err(invalid("Accidentals must be '#' or 'b'")),
            }
        }

        Ok(KeyLabel { tonic, alter, mode })
    }
}

impl fmt::Display for KeyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tonic, accidental_text(self.alter))?;
        if let Some(mode) = &self.mode {
            write!(f, " {}", mode)?;
        }
        Ok(())
    }
}
