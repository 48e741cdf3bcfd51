//! Live terminal plot for the capture session.
//!
//! Stands in for a plotting window: every accepted frame becomes one
//! colored row, one cell per subcarrier, cold-to-hot over the display
//! amplitude range, so the terminal scrollback itself holds the recent
//! history. All rendering side effects live here; the numeric state stays
//! in [`crate::window`].

use std::collections::VecDeque;

use colored::Colorize;

/// Top of the amplitude color scale; amplitudes above it saturate.
const AMP_SCALE: f64 = 1500.0;
/// At most this many cells per row, so wide channels still fit a terminal.
const MAX_CELLS: usize = 64;

pub struct LivePlot {
    frames: u64,
}

impl LivePlot {
    pub fn new() -> Self {
        Self { frames: 0 }
    }

    /// Render one row from the newest column of the display windows,
    /// annotated with the accepted-frame count, RSSI and current gap.
    pub fn draw(&mut self, windows: &[VecDeque<f64>], rssi: i8, gap: f64) {
        self.frames += 1;
        let step = (windows.len().div_ceil(MAX_CELLS)).max(1);
        let row: String = windows
            .iter()
            .step_by(step)
            .map(|w| cell(w.back().copied().unwrap_or(0.0)))
            .collect();
        println!(
            "  {:>6}  {}  {:>4} dBm  gap {}",
            self.frames,
            row,
            rssi,
            format!("{gap:8.1}").bold(),
        );
    }
}

/// Map an amplitude to a colored block: blue at the bottom of the scale,
/// red at the top.
fn cell(amp: f64) -> String {
    let t = (amp / AMP_SCALE).clamp(0.0, 1.0);
    let r = (255.0 * t) as u8;
    let g = (80.0 * (1.0 - (2.0 * t - 1.0).abs())) as u8;
    let b = (255.0 * (1.0 - t)) as u8;
    "█".truecolor(r, g, b).to_string()
}
