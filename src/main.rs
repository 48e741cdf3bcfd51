//! # csi-sniffer
//!
//! Real-time WiFi Channel State Information (CSI) amplitude monitor.
//!
//! Captures CSI report frames carried in UDP packets (as emitted by
//! CSI-extraction firmware on Broadcom chips), reduces each report to
//! per-subcarrier amplitudes, logs them to a per-session CSV file and
//! scrolls them through a colored terminal plot together with a rolling
//! min–max "gap" statistic used to judge measurement stability.
//!
//! ## Commands
//!
//! ```text
//! sudo csi-sniffer capture 5c:02:14:fb:65:52 --interface wlan0
//! csi-sniffer view csi_data/csi_data_20260807_103000.csv
//! sudo csi-sniffer discover 192.168.1.0/24 --interface wlan0
//! ```
//!
//! `capture` and `discover` open raw capture handles and therefore need
//! root; `view` works on any recorded log.

mod capture;
mod discover;
mod display;
mod extract;
mod filter;
mod recorder;
mod viewer;
mod window;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "csi-sniffer")]
#[command(version, about = "WiFi CSI amplitude sniffer with CSV logging and offline log views")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture CSI frames live, log amplitudes to CSV and plot them.
    Capture {
        /// Hardware address of the device whose CSI reports to keep
        /// (12 hex digits, separators optional).
        mac: String,

        /// Network interface to capture on. Auto-detected if omitted.
        #[arg(short, long)]
        interface: Option<String>,

        /// UDP port the CSI reports arrive on.
        #[arg(short, long, default_value_t = 5500)]
        port: u16,

        /// Channel bandwidth in MHz. The subcarrier count is bandwidth × 3.2.
        #[arg(short, long, default_value_t = 20)]
        bandwidth: u16,

        /// Number of amplitude samples the live display scrolls through.
        #[arg(short = 'w', long, default_value_t = 100)]
        window: usize,

        /// Accepted-frame cadence at which the min–max gap resets.
        #[arg(short = 'g', long, default_value_t = 20)]
        gap_cadence: usize,

        /// Directory session CSV logs are written to.
        #[arg(short, long, default_value = "csi_data")]
        out_dir: PathBuf,
    },

    /// Browse a recorded CSV log: time series, heatmap and mean/σ views.
    View {
        /// Path to a csi_data_*.csv session log.
        file: PathBuf,
    },

    /// ARP-scan an IPv4 range to find candidate target devices.
    Discover {
        /// IPv4 range to sweep, in CIDR notation.
        #[arg(default_value = "192.168.1.0/24")]
        range: String,

        /// Network interface to scan from. Auto-detected if omitted.
        #[arg(short, long)]
        interface: Option<String>,

        /// Seconds to wait for replies after the sweep.
        #[arg(short, long, default_value_t = 3)]
        timeout: u64,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Capture {
            mac,
            interface,
            port,
            bandwidth,
            window,
            gap_cadence,
            out_dir,
        } => {
            let Some(target) = filter::parse_mac(&mac) else {
                log::error!("Invalid hardware address {mac:?} — expected 12 hex digits");
                std::process::exit(1);
            };

            let cfg = capture::CaptureConfig {
                interface: resolve_interface(interface),
                port,
                target,
                bandwidth,
                window_len: window,
                gap_cadence,
                out_dir,
            };

            // ── Ctrl-C handler ──────────────────────────────────────────
            let running = Arc::new(AtomicBool::new(true));
            {
                let running = Arc::clone(&running);
                ctrlc::set_handler(move || {
                    log::info!("Interrupt received — stopping after the current frame …");
                    running.store(false, Ordering::Relaxed);
                })
                .expect("Failed to set Ctrl-C handler");
            }

            if let Err(e) = capture::run(cfg, running) {
                log::error!("Capture failed: {e}");
                log::error!(
                    "Make sure you are running as root and that the interface \
                     sees the CSI report traffic."
                );
                std::process::exit(1);
            }
        }

        Command::View { file } => {
            if let Err(e) = viewer::browse(&file) {
                log::error!("Viewer failed: {e}");
                std::process::exit(1);
            }
        }

        Command::Discover {
            range,
            interface,
            timeout,
        } => {
            let iface = resolve_interface(interface);
            match discover::scan(&iface, &range, Duration::from_secs(timeout)) {
                Ok(neighbors) => discover::print_table(&neighbors),
                Err(e) => {
                    log::error!("Discovery failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Use the interface the operator named, or let libpcap pick one.
fn resolve_interface(arg: Option<String>) -> String {
    match arg {
        Some(name) => name,
        None => match pcap::Device::lookup() {
            Ok(Some(device)) => {
                log::info!("Auto-selected capture interface {}", device.name);
                device.name
            }
            _ => {
                log::error!("No capture interface found — pass one with --interface");
                std::process::exit(1);
            }
        },
    }
}
