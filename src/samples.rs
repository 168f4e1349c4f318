use serde::{Deserialize, Serialize};

/// Number of EMG electrodes on the armband.
pub const EMG_CHANNELS: usize = 8;

/// One surface-EMG reading, one signed value per electrode.
///
/// Index `i` always refers to channel `i`; the vector is replaced wholesale
/// on every device callback, never patched per-channel. A device that has
/// not yet delivered an EMG sample is represented by the all-zero default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmgSample {
    pub channels: [i32; EMG_CHANNELS],
}

impl EmgSample {
    pub fn new(channels: [i32; EMG_CHANNELS]) -> Self {
        Self { channels }
    }
}

/// Orientation quaternion from the IMU.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrientationSample {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl OrientationSample {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }
}

/// Accelerometer reading in device axes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccelerometerSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelerometerSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Gyroscope reading in device axes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GyroscopeSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GyroscopeSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// The correlated orientation + accelerometer + gyroscope triple.
///
/// The device delivers all three in one callback; they are stored and
/// replaced as a single unit so a snapshot can never observe a torn IMU
/// update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImuSample {
    pub orientation: OrientationSample,
    pub accelerometer: AccelerometerSample,
    pub gyroscope: GyroscopeSample,
}

impl ImuSample {
    pub fn new(
        orientation: OrientationSample,
        accelerometer: AccelerometerSample,
        gyroscope: GyroscopeSample,
    ) -> Self {
        Self {
            orientation,
            accelerometer,
            gyroscope,
        }
    }
}

/// Immutable snapshot emitted at one cadence tick.
///
/// Fields hold the most recent value seen per channel as of the emission
/// instant; nothing is interpolated or rolled back. Constructed once,
/// serialized, discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRow {
    /// Milliseconds since the Unix epoch, wall clock.
    pub timestamp_ms: i64,
    pub emg: EmgSample,
    pub imu: ImuSample,
}

impl TelemetryRow {
    pub fn new(timestamp_ms: i64, emg: EmgSample, imu: ImuSample) -> Self {
        Self {
            timestamp_ms,
            emg,
            imu,
        }
    }
}
