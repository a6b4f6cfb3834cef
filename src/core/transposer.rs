use crate::domain::model::{Pitch, Step};

/// Shift `pitch` by `interval` semitones and respell the result.
///
/// The octave carries on every full 12-semitone cycle in either direction.
/// The new letter is the natural letter closest to the resulting chromatic
/// index, scanning C D E F G A B and keeping the first best match, so the
/// black-key positions always come out as the lower letter sharped (C#, D#,
/// F#, G#, A#) and the alteration is always 0 or +1.
pub fn transpose(pitch: Pitch, interval: i32) -> Pitch {
    let shifted = pitch.step.chromatic_index() + i64::from(pitch.alter) + i64::from(interval);

    let octave = i64::from(pitch.octave) + shifted.div_euclid(12);
    let normalized = shifted.rem_euclid(12);

    let step = nearest_step(normalized);
    let alter = normalized - step.chromatic_index();

    Pitch {
        step,
        // alter is 0 or 1 here
        alter: alter as i32,
        octave: clamp_octave(octave),
    }
}

fn nearest_step(index: i64) -> Step {
    let mut best = Step::C;
    let mut best_distance = i64::MAX;

    for step in Step::ALL {
        let distance = (step.chromatic_index() - index).abs();
        if distance < best_distance {
            best = step;
            best_distance = distance;
        }
    }

    best
}

fn clamp_octave(octave: i64) -> i32 {
    i32::try_from(octave).unwrap_or(if octave < 0 { i32::MIN } else { i32::MAX })
}
