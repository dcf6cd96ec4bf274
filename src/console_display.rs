use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

/// Width of the cents meter, in characters, for ±50 cents.
const METER_WIDTH: usize = 41;

/// Prints one status line per displayed frame: detected note, frequency,
/// confidence, and a cents meter against the target when there is one.
pub struct ConsoleDisplay {
    rx: Receiver<DetectionFrame>,
    /// Print every Nth frame
    every: u64,
}

impl ConsoleDisplay {
    /// `update_hz` is the print rate; passes arrive at `pass_hz`.
    pub fn new(rx: Receiver<DetectionFrame>, update_hz: u32, pass_hz: u32) -> Self {
        let every = if update_hz == 0 {
            1
        } else {
            (pass_hz / update_hz).max(1) as u64
        };
        Self { rx, every }
    }

    pub fn run(&self) {
        let mut count: u64 = 0;
        let mut stdout = io::stdout();
        let mut matched_before = false;

        for frame in self.rx.iter() {
            count += 1;
            // Always show the frame a match lands on
            let new_match = frame.matched && !matched_before;
            matched_before = frame.matched;
            if count % self.every != 0 && !new_match {
                continue;
            }
            let _ = writeln!(stdout, "{}", render_line(&frame));
            let _ = stdout.flush();
        }
    }
}

/// One display line for a frame.
pub fn render_line(frame: &DetectionFrame) -> String {
    let note = frame
        .note
        .map(|n| n.to_string())
        .unwrap_or_else(|| "--".to_string());
    let hz = frame
        .estimate
        .frequency_hz
        .map(|f| format!("{:7.2} Hz", f))
        .unwrap_or_else(|| "    --- Hz".to_string());

    let mut line = format!(
        "{:>4}  {}  conf {:>3.0}%",
        note,
        hz,
        frame.estimate.confidence * 100.0
    );

    if let Some(target) = &frame.target {
        line.push_str(&format!(
            "  target {}{} (s{} f{})  {}",
            target.note_name,
            target.octave,
            target.string_index,
            target.fret,
            make_meter(frame.cents_offset, METER_WIDTH)
        ));
        if let Some(c) = frame.cents_offset {
            line.push_str(&format!(" {:+6.1}¢", c));
        }
        if frame.matched {
            line.push_str("  ✓ MATCH");
        }
    }
    line
}

/// Horizontal cents meter: centre tick is in tune, ends are ±50 cents.
/// Offsets beyond the ends pin to the edge.
fn make_meter(cents: Option<f64>, width: usize) -> String {
    let mid = width / 2;
    let mut cells: Vec<char> = (0..width)
        .map(|i| if i == mid { '|' } else { '·' })
        .collect();
    if let Some(c) = cents {
        let pos = (mid as f64 + (c / 50.0).clamp(-1.0, 1.0) * mid as f64).round() as usize;
        cells[pos.min(width - 1)] = '●';
    }
    format!("[{}]", cells.into_iter().collect::<String>())
}
