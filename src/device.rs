use std::time::{Duration, Instant};

use thiserror::Error;

use crate::samples::{
    AccelerometerSample, EmgSample, GyroscopeSample, OrientationSample, EMG_CHANNELS,
};

/// Fatal fault reported by the device event pump. There is no retryable
/// class: a mid-session gap would leave a silently discontinuous dataset,
/// so every fault ends the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceFault {
    #[error("device disconnected")]
    Disconnected,
    #[error("transport fault: {0}")]
    Transport(String),
}

/// Armband power management.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepMode {
    Normal,
    NeverSleep,
}

/// EMG streaming configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmgMode {
    None,
    SendEmg,
    SendEmgRaw,
}

/// IMU streaming configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImuMode {
    None,
    SendData,
    SendEvents,
    SendAll,
    SendRaw,
}

/// On-device gesture classifier configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierMode {
    Disabled,
    Enabled,
}

pub type EmgCallback = Box<dyn FnMut(EmgSample) + Send>;
pub type ImuCallback =
    Box<dyn FnMut(OrientationSample, AccelerometerSample, GyroscopeSample) + Send>;

/// Boundary to the wearable device. Transport, handshake, and wire-level
/// decoding live behind this trait; the recorder only sees decoded samples
/// through the registered callbacks.
///
/// `pump_events` processes whatever device data is pending, synchronously
/// invoking zero or more registered callbacks before it returns. It may
/// block briefly on the transport's own read timeout, never unboundedly.
pub trait MyoDevice: Send {
    fn connect(&mut self) -> bool;
    fn connected(&self) -> bool;
    fn disconnect(&mut self);

    fn set_sleep_mode(&mut self, mode: SleepMode);
    fn set_streaming_mode(&mut self, emg: EmgMode, imu: ImuMode, classifier: ClassifierMode);

    fn on_emg(&mut self, callback: EmgCallback);
    fn on_imu(&mut self, callback: ImuCallback);

    fn pump_events(&mut self) -> Result<(), DeviceFault>;
}

/// Synthetic armband for running the recorder without hardware.
///
/// Emits deterministic waveforms: EMG at ~200 Hz, the IMU triple at
/// ~50 Hz, both derived from elapsed time so the emission rate tracks
/// wall-clock regardless of how often the pump is called.
pub struct SimulatedDevice {
    connected: bool,
    started: Option<Instant>,
    emg_period: Duration,
    imu_period: Duration,
    emg_ticks: u64,
    imu_ticks: u64,
    emg_callback: Option<EmgCallback>,
    imu_callback: Option<ImuCallback>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            connected: false,
            started: None,
            emg_period: Duration::from_millis(5),
            imu_period: Duration::from_millis(20),
            emg_ticks: 0,
            imu_ticks: 0,
            emg_callback: None,
            imu_callback: None,
        }
    }

    /// Override the synthetic emission periods (tests use short ones).
    pub fn with_periods(mut self, emg_period: Duration, imu_period: Duration) -> Self {
        self.emg_period = emg_period;
        self.imu_period = imu_period;
        self
    }

    fn emg_at(tick: u64) -> EmgSample {
        let t = tick as f64 * 0.05;
        let mut channels = [0i32; EMG_CHANNELS];
        for (i, channel) in channels.iter_mut().enumerate() {
            *channel = (100.0 * (t + i as f64 * 0.7).sin()) as i32;
        }
        EmgSample::new(channels)
    }

    /// Whole emission periods contained in `elapsed`. Integer nanosecond
    /// math, so the tick counter never passes through a narrower type.
    fn ticks_owed(elapsed: Duration, period: Duration) -> u64 {
        (elapsed.as_nanos() / period.as_nanos().max(1)) as u64
    }

    fn imu_at(tick: u64) -> (OrientationSample, AccelerometerSample, GyroscopeSample) {
        // Slow rotation about the z axis; accelerometer sees gravity.
        let angle = tick as f64 * 0.01;
        let orientation =
            OrientationSample::new((angle / 2.0).cos(), 0.0, 0.0, (angle / 2.0).sin());
        let accelerometer = AccelerometerSample::new(0.0, 0.0, 9.81);
        let gyroscope = GyroscopeSample::new(0.0, 0.0, 0.5);
        (orientation, accelerometer, gyroscope)
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MyoDevice for SimulatedDevice {
    fn connect(&mut self) -> bool {
        self.connected = true;
        self.started = Some(Instant::now());
        true
    }

    fn connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn set_sleep_mode(&mut self, _mode: SleepMode) {}

    fn set_streaming_mode(&mut self, _emg: EmgMode, _imu: ImuMode, _classifier: ClassifierMode) {}

    fn on_emg(&mut self, callback: EmgCallback) {
        self.emg_callback = Some(callback);
    }

    fn on_imu(&mut self, callback: ImuCallback) {
        self.imu_callback = Some(callback);
    }

    fn pump_events(&mut self) -> Result<(), DeviceFault> {
        if !self.connected {
            return Err(DeviceFault::Disconnected);
        }
        let started = match self.started {
            Some(started) => started,
            None => return Err(DeviceFault::Disconnected),
        };
        let elapsed = started.elapsed();

        let emg_owed = Self::ticks_owed(elapsed, self.emg_period);
        while self.emg_ticks < emg_owed {
            self.emg_ticks += 1;
            if let Some(callback) = self.emg_callback.as_mut() {
                callback(Self::emg_at(self.emg_ticks));
            }
        }

        let imu_owed = Self::ticks_owed(elapsed, self.imu_period);
        while self.imu_ticks < imu_owed {
            self.imu_ticks += 1;
            if let Some(callback) = self.imu_callback.as_mut() {
                let (orientation, accelerometer, gyroscope) = Self::imu_at(self.imu_ticks);
                callback(orientation, accelerometer, gyroscope);
            }
        }

        Ok(())
    }
}
