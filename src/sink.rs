use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{debug, info};

use crate::samples::TelemetryRow;

/// CSV header, written exactly once per file.
pub const CSV_HEADER: &str = "Timestamp,EMG1,EMG2,EMG3,EMG4,EMG5,EMG6,EMG7,EMG8,\
OrientationW,OrientationX,OrientationY,OrientationZ,\
AccX,AccY,AccZ,GyroX,GyroY,GyroZ";

/// Append-only CSV writer for one recording session.
///
/// Opened once per session. Rows may sit in the buffer between appends,
/// but `close` flushes and syncs so every appended row is durable before
/// it returns.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl CsvSink {
    /// Create or append to the file at `path`. The schema header is
    /// written only when the file is new or empty, so reopening an
    /// existing log never duplicates it.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = BufWriter::new(file);
        if needs_header {
            writeln!(writer, "{}", CSV_HEADER)?;
            debug!("wrote schema header to {}", path.display());
        }
        info!("csv sink open: {}", path.display());

        Ok(Self {
            path,
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize one row in the fixed field order and append it.
    pub fn append(&mut self, row: &TelemetryRow) -> std::io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "csv sink already closed")
        })?;

        write!(writer, "{}", row.timestamp_ms)?;
        for channel in &row.emg.channels {
            write!(writer, ",{}", channel)?;
        }
        let ori = &row.imu.orientation;
        write!(writer, ",{},{},{},{}", ori.w, ori.x, ori.y, ori.z)?;
        let acc = &row.imu.accelerometer;
        write!(writer, ",{},{},{}", acc.x, acc.y, acc.z)?;
        let gyr = &row.imu.gyroscope;
        writeln!(writer, ",{},{},{}", gyr.x, gyr.y, gyr.z)?;
        Ok(())
    }

    /// Flush and sync everything appended so far, then release the file.
    /// Idempotent; a second call is a no-op.
    pub fn close(&mut self) -> std::io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
            info!("csv sink closed: {}", self.path.display());
        }
        Ok(())
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        // Recorder closes explicitly; this only covers early-error paths.
        let _ = self.close();
    }
}

/// `myo_data_<YYYYMMDD>_<HHMMSS>.csv`, from local wall-clock time at
/// session start. Two sessions started within the same second collide;
/// that risk is documented, not resolved.
pub fn session_filename(now: DateTime<Local>) -> String {
    format!("myo_data_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Companion summary filename carrying the same session timestamp as the
/// CSV, so consecutive sessions keep distinct summaries.
pub fn summary_filename(now: DateTime<Local>) -> String {
    format!("myo_data_{}_summary.json", now.format("%Y%m%d_%H%M%S"))
}
