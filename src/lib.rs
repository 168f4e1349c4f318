//! Telemetry recorder for an 8-channel EMG + IMU wearable armband.
//!
//! Samples arrive from the device at its own irregular rate; the recorder
//! keeps only the latest value per channel and writes one combined CSV row
//! on a fixed cadence (10 ms by default) until a shutdown signal or a
//! fatal device/persistence error ends the session.

pub mod cache;
pub mod cadence;
pub mod device;
pub mod recorder;
pub mod samples;
pub mod shutdown;
pub mod sink;
pub mod summary;

pub use cache::LatestSampleCache;
pub use cadence::CadenceScheduler;
pub use device::{MyoDevice, SimulatedDevice};
pub use recorder::{RecorderConfig, RecorderError, RecorderState, TelemetryRecorder};
pub use samples::{
    AccelerometerSample, EmgSample, GyroscopeSample, ImuSample, OrientationSample, TelemetryRow,
};
pub use shutdown::ShutdownSignal;
pub use sink::CsvSink;
pub use summary::SessionSummary;
