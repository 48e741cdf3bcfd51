//! Sliding amplitude windows and the min–max gap accumulator.
//!
//! The only state that lives for a whole capture session. Every subcarrier
//! owns a fixed-length FIFO of its most recent amplitudes (the history the
//! live plot scrolls through) and a running `(min, max)` pair that resets
//! every `reset_cadence` accepted frames. The session "gap" is the widest
//! `max − min` spread across all subcarriers since the last reset — a quick
//! read on how stable the measurement currently is.

use std::collections::VecDeque;

pub struct AmplitudeWindows {
    /// One FIFO per subcarrier, always exactly `window_len` samples long.
    windows: Vec<VecDeque<f64>>,
    /// Per-subcarrier `(min, max)` since the last cadence reset. Empty
    /// until the first update.
    minmax: Vec<(f64, f64)>,
    reset_cadence: usize,
    /// Accepted-frame counter, wrapped modulo `reset_cadence`.
    cycle: usize,
}

impl AmplitudeWindows {
    /// Fresh state for `subcarriers` subcarriers. Windows start pre-filled
    /// with zeros so the display has a full-length history from the first
    /// frame; the gap accumulator stays empty until the first update.
    pub fn new(subcarriers: usize, window_len: usize, reset_cadence: usize) -> Self {
        Self {
            windows: (0..subcarriers)
                .map(|_| std::iter::repeat(0.0).take(window_len).collect())
                .collect(),
            minmax: Vec::with_capacity(subcarriers),
            reset_cadence: reset_cadence.max(1),
            cycle: 0,
        }
    }

    /// Feed one amplitude vector: evict the oldest sample from every
    /// window, append the new one, update the gap accumulator and return
    /// the current gap.
    ///
    /// `amps` must carry one value per subcarrier.
    pub fn update(&mut self, amps: &[f64]) -> f64 {
        debug_assert_eq!(amps.len(), self.windows.len());

        let reset = self.cycle == 0;
        if reset {
            self.minmax.clear();
        }
        for (i, (&v, window)) in amps.iter().zip(&mut self.windows).enumerate() {
            window.pop_front();
            window.push_back(v);
            if reset {
                self.minmax.push((v, v));
            } else {
                let mm = &mut self.minmax[i];
                if v < mm.0 {
                    mm.0 = v;
                }
                if v > mm.1 {
                    mm.1 = v;
                }
            }
        }
        self.cycle = (self.cycle + 1) % self.reset_cadence;
        self.gap()
    }

    /// Widest `max − min` amplitude spread across all subcarriers since the
    /// last accumulator reset. Zero before the first update.
    pub fn gap(&self) -> f64 {
        self.minmax
            .iter()
            .map(|&(lo, hi)| hi - lo)
            .fold(0.0, f64::max)
    }

    /// Per-subcarrier display windows, oldest sample first.
    pub fn windows(&self) -> &[VecDeque<f64>] {
        &self.windows
    }
}
