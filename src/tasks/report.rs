// ECG Edge: Report Task
//
// Downstream end of the sampling loop. Logs every status change and reading;
// the network uplink hangs off this queue.

use std::sync::mpsc::Receiver;

use crate::events::{Reading, ReportEvent};

/// One log line per reading.
pub fn describe(reading: &Reading) -> String {
    let r = &reading.result;
    if !r.is_informative() {
        return format!("no rhythm ({} peaks)", r.peaks);
    }
    let mut line = format!(
        "BPM {} (avg {:.0}), HRV {:.1} ms, {} peaks",
        r.bpm, reading.smoothed_bpm, r.hrv, r.peaks
    );
    if r.dropped_intervals > 0 {
        line.push_str(&format!(", {} intervals over cap", r.dropped_intervals));
    }
    line
}

pub fn report_task(events: Receiver<ReportEvent>) {
    log::info!("Report task started");

    for event in events {
        match event {
            ReportEvent::StatusChanged(status) => log::info!("Status: {}", status.label()),
            ReportEvent::Reading(reading) => {
                if reading.non_finite > 0 {
                    log::warn!("{} (non-finite samples: {})", describe(&reading), reading.non_finite);
                } else {
                    log::info!("{}", describe(&reading));
                }
            }
        }
    }

    log::warn!("Sensor channel closed, exiting report task");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::DetectionResult;
    use std::sync::mpsc;

    fn reading(bpm: u32, peaks: u32, dropped_intervals: u32) -> Reading {
        Reading {
            result: DetectionResult {
                bpm,
                hrv: 12.5,
                peaks,
                dropped_intervals,
            },
            smoothed_bpm: 71.6,
            non_finite: 0,
        }
    }

    #[test]
    fn describes_readings() {
        assert_eq!(describe(&reading(72, 9, 0)), "BPM 72 (avg 72), HRV 12.5 ms, 9 peaks");
        assert_eq!(
            describe(&reading(150, 25, 4)),
            "BPM 150 (avg 72), HRV 12.5 ms, 25 peaks, 4 intervals over cap"
        );
        assert_eq!(describe(&reading(0, 1, 0)), "no rhythm (1 peaks)");
    }

    #[test]
    fn exits_when_sender_drops() {
        let (tx, rx) = mpsc::channel();
        tx.send(ReportEvent::Reading(reading(72, 9, 0))).unwrap();
        drop(tx);
        report_task(rx);
    }
}
