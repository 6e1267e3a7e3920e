// ECG Edge: ESP-IDF drivers behind the task traits.

pub mod ad8232;
pub mod button;
