use std::sync::Mutex;

use crate::samples::{EmgSample, ImuSample};

/// Most recently observed EMG vector and IMU triple.
///
/// The device pushes updates at its own irregular rate while the recorder
/// snapshots on a fixed cadence, so this is a last-value-wins cache rather
/// than a queue: the consumer only ever wants "current state", and
/// buffering every intermediate update would be unbounded for no benefit.
///
/// Updates run in the same control thread as the snapshot today, but each
/// operation holds the lock only for a plain copy, so moving the device
/// pump to its own thread later would not change this type.
#[derive(Debug, Default)]
pub struct LatestSampleCache {
    inner: Mutex<CacheState>,
}

#[derive(Debug, Clone, Copy, Default)]
struct CacheState {
    emg: EmgSample,
    imu: ImuSample,
}

impl LatestSampleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored EMG vector wholesale.
    pub fn update_emg(&self, emg: EmgSample) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.emg = emg;
    }

    /// Replace the orientation/accelerometer/gyroscope triple as one unit.
    /// A concurrent snapshot sees either the whole old triple or the whole
    /// new one, never a mix.
    pub fn update_imu(&self, imu: ImuSample) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.imu = imu;
    }

    /// Copy out the current state. Channels that have never received a
    /// sample read as the all-zero defaults.
    pub fn snapshot(&self) -> (EmgSample, ImuSample) {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        (state.emg, state.imu)
    }
}
