use crate::notes::{note_name, octave};
use crate::types::{FretPosition, TuningEntry};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;

pub const STRING_COUNT: u8 = 6;
pub const MAX_FRET: u8 = 12;

/// Standard tuning, string 1 (high E) first.
///
/// Open tuning (string 1 = highest pitch, string 6 = lowest):
///   1:E4  2:B3  3:G3  4:D3  5:A2  6:E2
pub const STANDARD_TUNING: [TuningEntry; 6] = [
    TuningEntry { string_index: 1, note_name: "E", octave: 4, reference_hz: 329.63, midi: 64 },
    TuningEntry { string_index: 2, note_name: "B", octave: 3, reference_hz: 246.94, midi: 59 },
    TuningEntry { string_index: 3, note_name: "G", octave: 3, reference_hz: 196.00, midi: 55 },
    TuningEntry { string_index: 4, note_name: "D", octave: 3, reference_hz: 146.83, midi: 50 },
    TuningEntry { string_index: 5, note_name: "A", octave: 2, reference_hz: 110.00, midi: 45 },
    TuningEntry { string_index: 6, note_name: "E", octave: 2, reference_hz: 82.41, midi: 40 },
];

static FRETBOARD: Lazy<Vec<FretPosition>> = Lazy::new(build_fretboard);

/// Generate every (string, fret) position from the tuning table.
///
/// Each fret raises the open string by one equal-tempered semitone:
/// `hz = open_hz · 2^(fret/12)`, `midi = open_midi + fret`.
/// Ordered by string, then fret.
pub fn build_fretboard() -> Vec<FretPosition> {
    STANDARD_TUNING
        .iter()
        .flat_map(|open| {
            (0..=MAX_FRET).map(move |fret| {
                let midi = open.midi + fret as i32;
                FretPosition {
                    string_index: open.string_index,
                    fret,
                    note_name: note_name(midi),
                    octave: octave(midi),
                    frequency_hz: open.reference_hz * 2.0_f64.powf(fret as f64 / 12.0),
                    midi,
                }
            })
        })
        .collect()
}

/// The shared, lazily built fretboard table (78 positions).
pub fn fretboard() -> &'static [FretPosition] {
    &FRETBOARD
}

pub fn tuning_entry(string_index: u8) -> Option<&'static TuningEntry> {
    STANDARD_TUNING.iter().find(|e| e.string_index == string_index)
}

pub fn position(string_index: u8, fret: u8) -> Option<&'static FretPosition> {
    if !(1..=STRING_COUNT).contains(&string_index) || fret > MAX_FRET {
        return None;
    }
    let idx = (string_index as usize - 1) * (MAX_FRET as usize + 1) + fret as usize;
    fretboard().get(idx)
}

/// Expected frequency of a string stopped at `fret`.
pub fn fret_frequency(string_index: u8, fret: u8) -> Option<f64> {
    position(string_index, fret).map(|p| p.frequency_hz)
}

/// Every position that sounds the given note name, in any octave.
pub fn positions_for_note(name: &str) -> Vec<&'static FretPosition> {
    fretboard().iter().filter(|p| p.note_name == name).collect()
}

/// Restricts which positions a challenge may be drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeFilter {
    /// Allowed strings (1–6). Empty means all strings.
    pub strings: Vec<u8>,
    /// Highest fret to ask for.
    pub max_fret: u8,
}

impl Default for ChallengeFilter {
    fn default() -> Self {
        Self {
            strings: Vec::new(),
            max_fret: MAX_FRET,
        }
    }
}

impl ChallengeFilter {
    pub fn allows(&self, p: &FretPosition) -> bool {
        (self.strings.is_empty() || self.strings.contains(&p.string_index))
            && p.fret <= self.max_fret
    }
}

/// Uniformly random position from the whole fretboard, drawn from the
/// thread-local RNG.
pub fn random_challenge() -> &'static FretPosition {
    let board = fretboard();
    &board[rand::thread_rng().gen_range(0..board.len())]
}

/// Uniformly random position among those the filter allows.
/// None if the filter excludes everything.
pub fn random_challenge_with<R: Rng + ?Sized>(
    rng: &mut R,
    filter: &ChallengeFilter,
) -> Option<&'static FretPosition> {
    let candidates: Vec<&'static FretPosition> =
        fretboard().iter().filter(|p| filter.allows(p)).collect();
    candidates.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::frequency_to_note;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_fretboard_size() {
        assert_eq!(fretboard().len(), 78);
        assert_eq!(build_fretboard(), fretboard());
    }

    #[test]
    fn test_frequencies_increase_along_string() {
        for s in 1..=STRING_COUNT {
            let row: Vec<_> = fretboard().iter().filter(|p| p.string_index == s).collect();
            assert_eq!(row.len(), 13);
            for pair in row.windows(2) {
                assert!(pair[1].frequency_hz > pair[0].frequency_hz);
                assert_eq!(pair[1].midi, pair[0].midi + 1);
            }
            let open = row[0].frequency_hz;
            assert!((row[12].frequency_hz - 2.0 * open).abs() < 0.5);
            assert_eq!(row[12].note_name, row[0].note_name);
            assert_eq!(row[12].octave, row[0].octave + 1);
        }
    }

    #[test]
    fn test_round_trip_through_note_mapper() {
        for p in fretboard() {
            let n = frequency_to_note(p.frequency_hz).unwrap();
            assert_eq!(n.name, p.note_name, "{}", p);
            assert_eq!(n.midi, p.midi, "{}", p);
            assert_eq!(n.octave, p.octave, "{}", p);
        }
    }

    #[test]
    fn test_lookup() {
        let p = position(5, 0).unwrap();
        assert_eq!((p.note_name, p.octave, p.midi), ("A", 2, 45));
        let p = position(6, 5).unwrap();
        assert_eq!((p.note_name, p.octave), ("A", 2));
        let p = position(1, 12).unwrap();
        assert_eq!((p.note_name, p.octave, p.midi), ("E", 5, 76));
        assert!(position(0, 0).is_none());
        assert!(position(7, 0).is_none());
        assert!(position(1, 13).is_none());
        assert!((fret_frequency(6, 0).unwrap() - 82.41).abs() < 1e-9);
        assert_eq!(tuning_entry(3).unwrap().note_name, "G");
        assert!(tuning_entry(9).is_none());
    }

    #[test]
    fn test_positions_for_note() {
        let es = positions_for_note("E");
        // Open 1st/6th, 2nd string 5th fret, 3rd string 9th, 4th string 2nd and
        // 6th string 12th, 5th string 7th, 1st string 12th
        assert_eq!(es.len(), 8);
        assert!(es.iter().all(|p| p.note_name == "E"));
        assert!(positions_for_note("H").is_empty());
    }

    #[test]
    fn test_random_challenge_covers_board() {
        let mut seen = HashSet::new();
        for _ in 0..5000 {
            let p = random_challenge();
            seen.insert((p.string_index, p.fret));
        }
        assert_eq!(seen.len(), 78, "all positions should eventually appear");
    }

    #[test]
    fn test_random_challenge_with_filter() {
        let mut rng = StdRng::seed_from_u64(7);
        let filter = ChallengeFilter {
            strings: vec![6, 5],
            max_fret: 3,
        };
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let p = random_challenge_with(&mut rng, &filter).unwrap();
            assert!(p.string_index >= 5 && p.fret <= 3, "{}", p);
            seen.insert((p.string_index, p.fret));
        }
        assert_eq!(seen.len(), 8);

        let empty = ChallengeFilter {
            strings: vec![9],
            max_fret: 12,
        };
        assert!(random_challenge_with(&mut rng, &empty).is_none());
    }
}
