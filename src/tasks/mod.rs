// ECG Edge: Tasks
//
// Each task is a loop owning its hardware behind a small trait, so the same
// code runs on FreeRTOS threads and in host tests.

pub mod report;
pub mod sensor;
pub mod ui;
