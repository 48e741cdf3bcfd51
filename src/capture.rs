//! CSI capture loop.
//!
//! Opens the interface with libpcap, filters the stream down to UDP CSI
//! reports from the target device, converts each report to per-subcarrier
//! amplitudes and feeds the sliding-window state, the session CSV log and
//! the live terminal plot — one frame at a time, in arrival order.

use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use colored::Colorize;
use pcap::{Capture, Device};

use crate::display::LivePlot;
use crate::extract;
use crate::filter;
use crate::recorder::CsvRecorder;
use crate::window::AmplitudeWindows;

/// Immutable configuration for one capture session.
pub struct CaptureConfig {
    /// Interface name to capture on.
    pub interface: String,
    /// UDP port the CSI reports arrive on.
    pub port: u16,
    /// Hardware address of the one device whose reports are kept.
    pub target: [u8; 6],
    /// Channel bandwidth in MHz; fixes the subcarrier count for the session.
    pub bandwidth: u16,
    /// Display window length per subcarrier.
    pub window_len: usize,
    /// Accepted-frame cadence at which the min–max gap accumulator resets.
    pub gap_cadence: usize,
    /// Directory session CSV logs are written to.
    pub out_dir: PathBuf,
}

/// Run the capture loop until interrupted.
///
/// Startup failures (interface unavailable, permission denied, log file
/// not writable) propagate as errors before any frame is processed. Once
/// running, malformed or mismatched frames are dropped silently and sink
/// failures are logged without stopping the capture.
pub fn run(cfg: CaptureConfig, running: Arc<AtomicBool>) -> Result<(), Box<dyn Error>> {
    let nsub = extract::subcarrier_count(cfg.bandwidth as f64);

    let device = Device::from(cfg.interface.as_str());
    let mut cap = Capture::from_device(device)?
        .promisc(true)
        .snaplen(65535)
        .timeout(50) // short read timeout so we can check `running`
        .immediate_mode(true)
        .open()?;
    cap.filter(&format!("udp and port {}", cfg.port), true)?;

    let mut recorder = CsvRecorder::create(&cfg.out_dir, nsub)?;
    log::info!("Recording CSI amplitudes to {}", recorder.path().display());

    println!(
        "\n{}",
        format!(
            "  Sniffing on {} — UDP port {} — target {} — {} subcarriers",
            cfg.interface,
            cfg.port,
            filter::format_mac(&cfg.target),
            nsub
        )
        .bold()
    );
    println!("  {}", "Press Ctrl-C to stop.\n".dimmed());

    let mut windows = AmplitudeWindows::new(nsub, cfg.window_len, cfg.gap_cadence);
    let mut plot = LivePlot::new();
    let mut prev_ts = 0.0_f64;
    let mut accepted: u64 = 0;

    while running.load(Ordering::Relaxed) {
        let packet = match cap.next_packet() {
            Ok(packet) => packet,
            Err(pcap::Error::TimeoutExpired) => {
                // Expected — an empty pull, loop and re-check the flag.
                continue;
            }
            Err(e) => {
                log::error!("Capture error: {e}");
                break;
            }
        };

        let ts = packet.header.ts.tv_sec as f64 + packet.header.ts.tv_usec as f64 * 1e-6;
        if filter::is_duplicate(ts, prev_ts) {
            prev_ts = ts;
            continue;
        }

        let Some(frame) = filter::parse_frame(packet.data, cfg.port, &cfg.target) else {
            continue;
        };

        let amps = match extract::amplitudes(frame.csi, nsub) {
            Ok(amps) => amps,
            Err(e) => {
                log::debug!("Dropping frame: {e}");
                continue;
            }
        };

        let gap = windows.update(&amps);

        if let Err(e) = recorder.append(Local::now(), &amps) {
            log::warn!("CSV write failed: {e}");
        }
        plot.draw(windows.windows(), frame.rssi, gap);

        accepted += 1;
        prev_ts = ts;
    }

    log::info!("Capture stopped after {accepted} accepted frames");
    Ok(())
}
