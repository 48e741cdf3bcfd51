//! Offline browser over recorded CSI session logs.
//!
//! Loads a `csi_data_*.csv` file and cycles three views on a single "next"
//! trigger: per-subcarrier time series, a subcarrier × time heatmap, and
//! per-subcarrier mean / standard-deviation bars. Rendering is stateless;
//! the browse loop owns all IO.

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::Path;

use colored::Colorize;

/// Width of the time axis in terminal cells.
const PLOT_WIDTH: usize = 72;
/// At most this many sparkline rows in the time-series view.
const MAX_SERIES: usize = 16;
/// At most this many subcarrier rows in the heatmap view.
const MAX_HEAT_ROWS: usize = 32;
/// Width of the mean bar in the statistics view.
const BAR_WIDTH: usize = 30;

/// A loaded session log: one timestamp and one amplitude row per frame.
pub struct CsiLog {
    pub timestamps: Vec<String>,
    /// `frames[t][i]` = amplitude of subcarrier `i` at frame `t`.
    pub frames: Vec<Vec<f64>>,
}

impl CsiLog {
    pub fn subcarriers(&self) -> usize {
        self.frames.first().map_or(0, Vec::len)
    }

    fn max_amplitude(&self) -> f64 {
        self.frames.iter().flatten().copied().fold(0.0, f64::max)
    }
}

/// Load a session log, skipping blank or garbled rows.
pub fn load_log(path: &Path) -> Result<CsiLog, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut timestamps = Vec::new();
    let mut frames = Vec::new();
    let mut width = None;

    for record in reader.records() {
        let record = record?;
        let mut fields = record.iter();
        let Some(ts) = fields.next() else { continue };
        let amps: Vec<f64> = fields.filter_map(|f| f.trim().parse().ok()).collect();
        if amps.is_empty() {
            continue;
        }
        // A row narrower than the first one is a truncated write; skip it.
        let expected = *width.get_or_insert(amps.len());
        if amps.len() != expected {
            continue;
        }
        timestamps.push(ts.to_string());
        frames.push(amps);
    }

    if frames.is_empty() {
        return Err(format!("no data rows in {}", path.display()).into());
    }
    Ok(CsiLog { timestamps, frames })
}

/// The three offline views, cycled in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    TimeSeries,
    Heatmap,
    Stats,
}

impl View {
    pub fn next(self) -> Self {
        match self {
            View::TimeSeries => View::Heatmap,
            View::Heatmap => View::Stats,
            View::Stats => View::TimeSeries,
        }
    }

    fn title(self) -> &'static str {
        match self {
            View::TimeSeries => "Amplitude time series",
            View::Heatmap => "Subcarrier × time heatmap",
            View::Stats => "Per-subcarrier mean / σ",
        }
    }
}

/// Render one view of the log. Pure — no IO, no state.
pub fn render(view: View, log: &CsiLog) -> String {
    let body = match view {
        View::TimeSeries => render_time_series(log),
        View::Heatmap => render_heatmap(log),
        View::Stats => render_stats(log),
    };
    format!(
        "\n{}\n\n{}",
        format!("  ── {} ──", view.title()).bold().cyan(),
        body
    )
}

/// Interactive loop: print a view, wait for Enter (next view) or `q`.
pub fn browse(path: &Path) -> Result<(), Box<dyn Error>> {
    let log = load_log(path)?;
    log::info!(
        "Loaded {} frames × {} subcarriers from {}",
        log.frames.len(),
        log.subcarriers(),
        path.display()
    );

    let mut view = View::TimeSeries;
    let stdin = io::stdin();
    loop {
        println!("{}", render(view, &log));
        print!("  {}", "[Enter] next view, [q] quit > ".dimmed());
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }
        view = view.next();
    }
    Ok(())
}

fn render_time_series(log: &CsiLog) -> String {
    let max = log.max_amplitude();
    let nsub = log.subcarriers();
    let step = nsub.div_ceil(MAX_SERIES).max(1);

    let mut out = String::new();
    for i in (0..nsub).step_by(step) {
        let series: Vec<f64> = log.frames.iter().map(|f| f[i]).collect();
        let line = sparkline(&downsample(&series, PLOT_WIDTH), max);
        out.push_str(&format!(
            "  {:>14}  {}\n",
            format!("subcarrier_{i}"),
            line.cyan()
        ));
    }
    out.push_str(&format!(
        "\n  {} frames, {} to {}, amplitude scale 0–{max:.0}\n",
        log.frames.len(),
        log.timestamps.first().map(String::as_str).unwrap_or("?"),
        log.timestamps.last().map(String::as_str).unwrap_or("?"),
    ));
    out
}

fn render_heatmap(log: &CsiLog) -> String {
    let max = log.max_amplitude();
    let nsub = log.subcarriers();
    let step = nsub.div_ceil(MAX_HEAT_ROWS).max(1);

    let mut out = String::new();
    for i in (0..nsub).step_by(step) {
        let series: Vec<f64> = log.frames.iter().map(|f| f[i]).collect();
        let row: String = downsample(&series, PLOT_WIDTH)
            .iter()
            .map(|&v| heat_cell(if max > 0.0 { v / max } else { 0.0 }))
            .collect();
        out.push_str(&format!("  {:>14}  {row}\n", format!("subcarrier_{i}")));
    }
    out.push_str(&format!("\n  time → ({} frames)\n", log.frames.len()));
    out
}

fn render_stats(log: &CsiLog) -> String {
    let nsub = log.subcarriers();
    let stats: Vec<(f64, f64)> = (0..nsub)
        .map(|i| {
            let series: Vec<f64> = log.frames.iter().map(|f| f[i]).collect();
            mean_std(&series)
        })
        .collect();
    let max_mean = stats.iter().map(|&(m, _)| m).fold(0.0, f64::max);

    let mut out = String::new();
    for (i, &(mean, std)) in stats.iter().enumerate() {
        let width = if max_mean > 0.0 {
            ((mean / max_mean) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        out.push_str(&format!(
            "  {:>14}  mean {:>8.1}  σ {:>7.1}  {}\n",
            format!("subcarrier_{i}"),
            mean,
            std,
            "■".repeat(width).blue()
        ));
    }
    out
}

/// Downsample to at most `width` points by averaging equal chunks.
fn downsample(values: &[f64], width: usize) -> Vec<f64> {
    if values.len() <= width {
        return values.to_vec();
    }
    (0..width)
        .map(|i| {
            let start = i * values.len() / width;
            let end = ((i + 1) * values.len() / width).max(start + 1);
            let chunk = &values[start..end];
            chunk.iter().sum::<f64>() / chunk.len() as f64
        })
        .collect()
}

/// Mean and sample standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn sparkline(values: &[f64], max: f64) -> String {
    values
        .iter()
        .map(|&v| {
            let t = if max > 0.0 { (v / max).clamp(0.0, 1.0) } else { 0.0 };
            SPARKS[(t * 7.0).round() as usize]
        })
        .collect()
}

/// Relative amplitude → colored background cell, dark blue to red.
fn heat_cell(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let r = (255.0 * t) as u8;
    let g = (80.0 * (1.0 - (2.0 * t - 1.0).abs())) as u8;
    let b = (200.0 * (1.0 - t)) as u8;
    " ".on_truecolor(r, g, b).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_log_skips_garbled_rows() {
        let path = std::env::temp_dir().join(format!("csi-viewer-test-{}.csv", std::process::id()));
        fs::write(
            &path,
            "timestamp,subcarrier_0,subcarrier_1\n\
             2026-08-07 10:00:00.000001,1.5,2.5\n\
             2026-08-07 10:00:00.000002,3.0\n\
             \n\
             2026-08-07 10:00:00.000003,4.0,5.0\n",
        )
        .unwrap();

        let log = load_log(&path).unwrap();
        assert_eq!(log.frames.len(), 2);
        assert_eq!(log.subcarriers(), 2);
        assert_eq!(log.frames[1], vec![4.0, 5.0]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_view_cycle() {
        let mut view = View::TimeSeries;
        view = view.next();
        assert_eq!(view, View::Heatmap);
        view = view.next();
        assert_eq!(view, View::Stats);
        view = view.next();
        assert_eq!(view, View::TimeSeries);
    }

    #[test]
    fn test_render_is_total_over_views() {
        let log = CsiLog {
            timestamps: vec!["a".into(), "b".into(), "c".into()],
            frames: vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
        };
        for view in [View::TimeSeries, View::Heatmap, View::Stats] {
            assert!(!render(view, &log).is_empty());
        }
    }

    #[test]
    fn test_downsample() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        let down = downsample(&values, 10);
        assert_eq!(down.len(), 10);
        // Chunk means stay ordered for an increasing series.
        assert!(down.windows(2).all(|w| w[0] < w[1]));

        let short = vec![1.0, 2.0];
        assert_eq!(downsample(&short, 10), short);
    }

    #[test]
    fn test_mean_std() {
        let (mean, std) = mean_std(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(mean, 3.0);
        assert!((std - 2.5_f64.sqrt()).abs() < 1e-12);
    }
}
