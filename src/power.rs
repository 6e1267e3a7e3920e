// ECG Edge: Power Management
//
// Sensor power state and the inactivity timer that puts the AD8232 into
// shutdown when no usable signal has arrived for a while. Timestamps are
// milliseconds since boot and wrap at ~49 days, so comparisons use
// `wrapping_sub`.

/// AD8232 power state as seen by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorPower {
    #[default]
    Asleep,
    Active,
}

#[derive(Debug, Clone)]
pub struct InactivityMonitor {
    timeout_ms: u32,
    last_activity_ms: u32,
}

impl InactivityMonitor {
    pub fn new(timeout_ms: u32, now_ms: u32) -> Self {
        Self {
            timeout_ms,
            last_activity_ms: now_ms,
        }
    }

    pub fn touch(&mut self, now_ms: u32) {
        self.last_activity_ms = now_ms;
    }

    pub fn idle_ms(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.last_activity_ms)
    }

    pub fn is_expired(&self, now_ms: u32) -> bool {
        self.idle_ms(now_ms) > self.timeout_ms
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}
