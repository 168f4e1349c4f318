use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// End-of-session statistics, printed and saved as JSON beside the CSV.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub started_at_ms: i64,
    pub uptime_seconds: u64,
    pub emg_updates: u64,
    pub imu_updates: u64,
    pub rows_written: u64,
    pub output_file: String,
}

impl SessionSummary {
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
