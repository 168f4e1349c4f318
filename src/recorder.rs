use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{info, warn};
use thiserror::Error;

use crate::cache::LatestSampleCache;
use crate::cadence::{CadenceScheduler, DEFAULT_INTERVAL};
use crate::device::{ClassifierMode, DeviceFault, EmgMode, ImuMode, MyoDevice, SleepMode};
use crate::samples::{ImuSample, TelemetryRow};
use crate::shutdown::ShutdownSignal;
use crate::sink::CsvSink;
use crate::summary::SessionSummary;

/// Fatal session errors. Every failure ends the session: resuming after a
/// gap would leave an ambiguous, silently discontinuous dataset, which is
/// worse than a hard stop.
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("device connection failed")]
    Connection,
    #[error("device stream fault: {0}")]
    Stream(#[from] DeviceFault),
    #[error("persistence failure: {0}")]
    Persistence(#[from] std::io::Error),
}

/// Session lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Connecting,
    Streaming,
    Draining,
    Closed,
}

/// Recorder settings for one session.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// CSV output file for this session.
    pub output_path: PathBuf,
    /// Output cadence; one row per elapsed interval.
    pub interval: Duration,
    /// Per-iteration voluntary sleep bounding CPU usage. Cadence accuracy
    /// comes from the scheduler's elapsed-time check, not from this value,
    /// but it does bound worst-case shutdown latency.
    pub yield_interval: Duration,
}

impl RecorderConfig {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            interval: DEFAULT_INTERVAL,
            yield_interval: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, Default)]
struct UpdateCounters {
    emg: AtomicU64,
    imu: AtomicU64,
}

/// Drives one recording session: pumps the device, funnels callback
/// updates into the sample cache, and appends one combined row to the CSV
/// sink whenever the cadence scheduler says one is owed.
pub struct TelemetryRecorder {
    device: Box<dyn MyoDevice>,
    config: RecorderConfig,
    shutdown: ShutdownSignal,
    cache: Arc<LatestSampleCache>,
    counters: Arc<UpdateCounters>,
    state: RecorderState,
    rows_written: u64,
    started_at_ms: i64,
}

impl TelemetryRecorder {
    pub fn new(
        device: Box<dyn MyoDevice>,
        config: RecorderConfig,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            device,
            config,
            shutdown,
            cache: Arc::new(LatestSampleCache::new()),
            counters: Arc::new(UpdateCounters::default()),
            state: RecorderState::Connecting,
            rows_written: 0,
            started_at_ms: 0,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Run the session to completion: Connecting → Streaming → Draining →
    /// Closed. Returns the session summary on a clean shutdown; any fatal
    /// error unwinds out after the sink has been drained.
    pub fn run(&mut self) -> Result<SessionSummary, RecorderError> {
        if !self.device.connect() || !self.device.connected() {
            self.state = RecorderState::Closed;
            return Err(RecorderError::Connection);
        }
        info!("device connected");

        self.register_callbacks();
        self.device.set_sleep_mode(SleepMode::NeverSleep);
        self.device
            .set_streaming_mode(EmgMode::SendEmg, ImuMode::SendData, ClassifierMode::Disabled);

        let mut sink = match CsvSink::open(&self.config.output_path) {
            Ok(sink) => sink,
            Err(err) => {
                self.device.disconnect();
                self.state = RecorderState::Closed;
                return Err(RecorderError::Persistence(err));
            }
        };

        self.started_at_ms = Utc::now().timestamp_millis();
        self.state = RecorderState::Streaming;
        let stream_result = self.stream(&mut sink);

        // One final flush-and-close, however streaming ended. Rows written
        // up to the last successful tick stay on disk.
        self.state = RecorderState::Draining;
        if stream_result.is_err() {
            warn!("draining after stream fault");
        }
        let close_result = sink.close();
        self.device.disconnect();
        self.state = RecorderState::Closed;

        stream_result?;
        close_result?;

        info!("session closed: {} rows", self.rows_written);
        Ok(self.summary())
    }

    fn stream(&mut self, sink: &mut CsvSink) -> Result<(), RecorderError> {
        let mut scheduler = CadenceScheduler::new(self.config.interval);

        loop {
            // All callback-driven cache updates from this pump round land
            // before the cadence check below.
            self.device.pump_events()?;

            if self.shutdown.should_stop() {
                info!("stop requested after {} rows", self.rows_written);
                return Ok(());
            }

            if scheduler.due(Instant::now()) {
                let (emg, imu) = self.cache.snapshot();
                let row = TelemetryRow::new(Utc::now().timestamp_millis(), emg, imu);
                sink.append(&row)?;
                self.rows_written += 1;
            }

            thread::sleep(self.config.yield_interval);
        }
    }

    fn register_callbacks(&mut self) {
        let cache = Arc::clone(&self.cache);
        let counters = Arc::clone(&self.counters);
        self.device.on_emg(Box::new(move |emg| {
            cache.update_emg(emg);
            counters.emg.fetch_add(1, Ordering::Relaxed);
        }));

        let cache = Arc::clone(&self.cache);
        let counters = Arc::clone(&self.counters);
        self.device
            .on_imu(Box::new(move |orientation, accelerometer, gyroscope| {
                cache.update_imu(ImuSample::new(orientation, accelerometer, gyroscope));
                counters.imu.fetch_add(1, Ordering::Relaxed);
            }));
    }

    fn summary(&self) -> SessionSummary {
        let uptime_ms = Utc::now()
            .timestamp_millis()
            .saturating_sub(self.started_at_ms);
        SessionSummary {
            started_at_ms: self.started_at_ms,
            uptime_seconds: (uptime_ms / 1000).max(0) as u64,
            emg_updates: self.counters.emg.load(Ordering::Relaxed),
            imu_updates: self.counters.imu.load(Ordering::Relaxed),
            rows_written: self.rows_written,
            output_file: self.config.output_path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{EmgCallback, ImuCallback};
    use crate::samples::{
        AccelerometerSample, EmgSample, GyroscopeSample, OrientationSample,
    };
    use crate::sink::CSV_HEADER;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU64 as SeqCounter;

    static TEST_FILE_SEQ: SeqCounter = SeqCounter::new(0);

    fn temp_csv_path(tag: &str) -> PathBuf {
        let seq = TEST_FILE_SEQ.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "myo_recorder_rec_{}_{}_{}.csv",
            tag,
            std::process::id(),
            seq
        ))
    }

    fn fast_config(path: &PathBuf) -> RecorderConfig {
        let mut config = RecorderConfig::new(path);
        config.interval = Duration::ZERO;
        config.yield_interval = Duration::ZERO;
        config
    }

    enum PumpStep {
        Emg(EmgSample),
        Imu(OrientationSample, AccelerometerSample, GyroscopeSample),
        Stop,
        Fail,
    }

    /// Replays a fixed script: one `Vec<PumpStep>` per pump call. When the
    /// script runs out it requests a stop so tests always terminate.
    struct ScriptedDevice {
        script: VecDeque<Vec<PumpStep>>,
        shutdown: ShutdownSignal,
        connect_ok: bool,
        connected: bool,
        emg_callback: Option<EmgCallback>,
        imu_callback: Option<ImuCallback>,
    }

    impl ScriptedDevice {
        fn new(script: Vec<Vec<PumpStep>>, shutdown: ShutdownSignal) -> Self {
            Self {
                script: script.into(),
                shutdown,
                connect_ok: true,
                connected: false,
                emg_callback: None,
                imu_callback: None,
            }
        }

        fn refusing_connection(shutdown: ShutdownSignal) -> Self {
            let mut device = Self::new(Vec::new(), shutdown);
            device.connect_ok = false;
            device
        }
    }

    impl MyoDevice for ScriptedDevice {
        fn connect(&mut self) -> bool {
            self.connected = self.connect_ok;
            self.connect_ok
        }

        fn connected(&self) -> bool {
            self.connected
        }

        fn disconnect(&mut self) {
            self.connected = false;
        }

        fn set_sleep_mode(&mut self, _mode: SleepMode) {}

        fn set_streaming_mode(
            &mut self,
            _emg: EmgMode,
            _imu: ImuMode,
            _classifier: ClassifierMode,
        ) {
        }

        fn on_emg(&mut self, callback: EmgCallback) {
            self.emg_callback = Some(callback);
        }

        fn on_imu(&mut self, callback: ImuCallback) {
            self.imu_callback = Some(callback);
        }

        fn pump_events(&mut self) -> Result<(), DeviceFault> {
            let steps = match self.script.pop_front() {
                Some(steps) => steps,
                None => {
                    self.shutdown.request_stop();
                    return Ok(());
                }
            };
            for step in steps {
                match step {
                    PumpStep::Emg(emg) => {
                        if let Some(callback) = self.emg_callback.as_mut() {
                            callback(emg);
                        }
                    }
                    PumpStep::Imu(orientation, accelerometer, gyroscope) => {
                        if let Some(callback) = self.imu_callback.as_mut() {
                            callback(orientation, accelerometer, gyroscope);
                        }
                    }
                    PumpStep::Stop => self.shutdown.request_stop(),
                    PumpStep::Fail => {
                        return Err(DeviceFault::Transport("scripted fault".to_string()))
                    }
                }
            }
            Ok(())
        }
    }

    fn read_lines(path: &PathBuf) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| line.to_string())
            .collect()
    }

    #[test]
    fn test_connection_failure_is_fatal_and_writes_nothing() {
        let path = temp_csv_path("noconnect");
        let shutdown = ShutdownSignal::new();
        let device = ScriptedDevice::refusing_connection(shutdown.clone());

        let mut recorder =
            TelemetryRecorder::new(Box::new(device), fast_config(&path), shutdown);
        let result = recorder.run();

        assert!(matches!(result, Err(RecorderError::Connection)));
        assert_eq!(recorder.state(), RecorderState::Closed);
        assert!(!path.exists());
    }

    #[test]
    fn test_row_reflects_last_update_of_each_kind() {
        let path = temp_csv_path("lastwins");
        let shutdown = ShutdownSignal::new();
        let script = vec![vec![
            PumpStep::Emg(EmgSample::new([9; 8])),
            PumpStep::Emg(EmgSample::new([0, 0, 0, 0, 0, 0, 0, 0])),
            PumpStep::Imu(
                OrientationSample::new(1.0, 0.0, 0.0, 0.0),
                AccelerometerSample::new(0.0, 0.0, 9.8),
                GyroscopeSample::new(0.0, 0.0, 0.0),
            ),
        ]];
        let device = ScriptedDevice::new(script, shutdown.clone());

        let mut recorder =
            TelemetryRecorder::new(Box::new(device), fast_config(&path), shutdown);
        let summary = recorder.run().unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(summary.rows_written, 1);
        // The earlier all-nines EMG vector must not appear; the emitted
        // row holds the final update of each kind.
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(&fields[1..9], &["0"; 8]);
        assert_eq!(&fields[9..13], &["1", "0", "0", "0"]);
        assert_eq!(&fields[13..16], &["0", "0", "9.8"]);
        assert_eq!(&fields[16..19], &["0", "0", "0"]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_no_rows_after_stop_and_summary_counts() {
        let path = temp_csv_path("stop");
        let shutdown = ShutdownSignal::new();
        let script = vec![
            vec![PumpStep::Emg(EmgSample::new([1; 8]))],
            // Stop lands mid-pump; the update in the same round still
            // reaches the cache but no further row may be emitted.
            vec![PumpStep::Stop, PumpStep::Emg(EmgSample::new([2; 8]))],
        ];
        let device = ScriptedDevice::new(script, shutdown.clone());

        let mut recorder =
            TelemetryRecorder::new(Box::new(device), fast_config(&path), shutdown);
        let summary = recorder.run().unwrap();

        assert_eq!(summary.rows_written, 1);
        assert_eq!(summary.emg_updates, 2);
        assert_eq!(recorder.state(), RecorderState::Closed);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(&fields[1..9], &["1"; 8]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_stream_fault_keeps_rows_up_to_last_tick() {
        let path = temp_csv_path("fault");
        let shutdown = ShutdownSignal::new();
        let script = vec![
            vec![PumpStep::Emg(EmgSample::new([3; 8]))],
            vec![PumpStep::Fail],
        ];
        let device = ScriptedDevice::new(script, shutdown.clone());

        let mut recorder =
            TelemetryRecorder::new(Box::new(device), fast_config(&path), shutdown);
        let result = recorder.run();

        assert!(matches!(result, Err(RecorderError::Stream(_))));
        assert_eq!(recorder.state(), RecorderState::Closed);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let path = temp_csv_path("order");
        let shutdown = ShutdownSignal::new();
        let script = vec![Vec::new(), Vec::new(), Vec::new(), Vec::new()];
        let device = ScriptedDevice::new(script, shutdown.clone());

        let mut recorder =
            TelemetryRecorder::new(Box::new(device), fast_config(&path), shutdown);
        let summary = recorder.run().unwrap();
        assert_eq!(summary.rows_written, 4);

        let lines = read_lines(&path);
        let timestamps: Vec<i64> = lines[1..]
            .iter()
            .map(|line| line.split(',').next().unwrap().parse().unwrap())
            .collect();
        for pair in timestamps.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_nonzero_interval_paces_rows_by_elapsed_time() {
        let path = temp_csv_path("paced");
        let shutdown = ShutdownSignal::new();
        let script: Vec<Vec<PumpStep>> = (0..16).map(|_| Vec::new()).collect();
        let device = ScriptedDevice::new(script, shutdown.clone());

        let mut config = RecorderConfig::new(&path);
        config.interval = Duration::from_millis(20);
        config.yield_interval = Duration::from_millis(5);

        let mut recorder = TelemetryRecorder::new(Box::new(device), config, shutdown);
        let summary = recorder.run().unwrap();

        // 16 iterations at ~5 ms apiece span ~80 ms; rows are owed per
        // elapsed 20 ms interval, not one per iteration.
        assert!(summary.rows_written >= 2);
        assert!(summary.rows_written < 16);

        let lines = read_lines(&path);
        let timestamps: Vec<i64> = lines[1..]
            .iter()
            .map(|line| line.split(',').next().unwrap().parse().unwrap())
            .collect();
        // Consecutive wall-clock stamps track the monotonic interval,
        // allowing a little rounding jitter.
        for pair in timestamps.windows(2) {
            assert!(pair[1] - pair[0] >= 15);
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_never_seen_channels_emit_zero_defaults() {
        let path = temp_csv_path("defaults");
        let shutdown = ShutdownSignal::new();
        let device = ScriptedDevice::new(vec![Vec::new()], shutdown.clone());

        let mut recorder =
            TelemetryRecorder::new(Box::new(device), fast_config(&path), shutdown);
        recorder.run().unwrap();

        let lines = read_lines(&path);
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields.len(), 19);
        assert!(fields[1..].iter().all(|f| *f == "0"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unwritable_path_is_persistence_error() {
        let path = std::env::temp_dir()
            .join("myo_recorder_missing_dir")
            .join("nested")
            .join("out.csv");
        let shutdown = ShutdownSignal::new();
        let device = ScriptedDevice::new(Vec::new(), shutdown.clone());

        let mut recorder =
            TelemetryRecorder::new(Box::new(device), fast_config(&path), shutdown);
        let result = recorder.run();

        assert!(matches!(result, Err(RecorderError::Persistence(_))));
        assert_eq!(recorder.state(), RecorderState::Closed);
    }
}
