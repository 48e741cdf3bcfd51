//! Per-session CSV log of amplitude vectors.
//!
//! One file per capture session, named after the session start time. The
//! header row is written once; every accepted frame appends exactly one
//! row and flushes it, so a crash never loses more than the current frame.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

pub struct CsvRecorder {
    writer: csv::Writer<fs::File>,
    path: PathBuf,
}

impl CsvRecorder {
    /// Create `csi_data_<YYYYmmdd_HHMMSS>.csv` under `dir` (the directory
    /// is created if missing) and write the header row:
    /// `timestamp,subcarrier_0,…,subcarrier_{N-1}`.
    pub fn create(dir: &Path, subcarriers: usize) -> Result<Self, Box<dyn Error>> {
        fs::create_dir_all(dir)?;
        let name = format!("csi_data_{}.csv", Local::now().format("%Y%m%d_%H%M%S"));
        let path = dir.join(name);

        let mut writer = csv::Writer::from_path(&path)?;
        let mut header = vec!["timestamp".to_string()];
        header.extend((0..subcarriers).map(|i| format!("subcarrier_{i}")));
        writer.write_record(&header)?;
        writer.flush()?;

        Ok(Self { writer, path })
    }

    /// Append one row: a microsecond-precision timestamp followed by one
    /// amplitude per subcarrier. Rows are flushed individually, never
    /// batched, and the header is never repeated.
    pub fn append(&mut self, ts: DateTime<Local>, amps: &[f64]) -> Result<(), Box<dyn Error>> {
        let mut row = vec![ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()];
        row.extend(amps.iter().map(|a| a.to_string()));
        self.writer.write_record(&row)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Path of the session log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows() {
        let dir = std::env::temp_dir().join(format!("csi-recorder-test-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let mut recorder = CsvRecorder::create(&dir, 3).unwrap();
        recorder.append(Local::now(), &[1.0, 2.5, 3.0]).unwrap();
        recorder.append(Local::now(), &[4.0, 5.0, 6.25]).unwrap();
        let path = recorder.path().to_path_buf();
        drop(recorder);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,subcarrier_0,subcarrier_1,subcarrier_2");
        assert!(lines[1].ends_with(",1,2.5,3"));
        assert!(lines[2].ends_with(",4,5,6.25"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
