//! Equal-tempered note arithmetic: MIDI ↔ Hz and nearest-note lookup.

use crate::types::NoteInfo;

/// Chromatic note names starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Frequencies outside this open interval are not treated as notes.
pub const MIN_NOTE_HZ: f64 = 20.0;
pub const MAX_NOTE_HZ: f64 = 5000.0;

/// Convert MIDI note number (fractional) to Hz. A4 = MIDI 69 = 440 Hz.
pub fn midi_to_hz(midi: f64) -> f64 {
    440.0 * 2.0_f64.powf((midi - 69.0) / 12.0)
}

/// Convert Hz to MIDI note number (fractional).
pub fn hz_to_midi(hz: f64) -> f64 {
    69.0 + 12.0 * (hz / 440.0).log2()
}

/// Note name for an integer MIDI number. Negative numbers wrap correctly.
pub fn note_name(midi: i32) -> &'static str {
    NOTE_NAMES[midi.rem_euclid(12) as usize]
}

/// Scientific-pitch octave for an integer MIDI number (MIDI 60 = C4).
pub fn octave(midi: i32) -> i32 {
    midi.div_euclid(12) - 1
}

/// Nearest chromatic note to `hz`.
///
/// Returns None for frequencies outside (20, 5000) Hz, which no guitar string
/// or singing voice produces and which usually mean a bad estimate.
pub fn frequency_to_note(hz: f64) -> Option<NoteInfo> {
    if !(hz > MIN_NOTE_HZ && hz < MAX_NOTE_HZ) {
        return None;
    }
    let midi = hz_to_midi(hz).round() as i32;
    Some(NoteInfo {
        name: note_name(midi),
        midi,
        octave: octave(midi),
    })
}
