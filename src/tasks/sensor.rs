// ECG Edge: Sensor Task
//
// The sampling loop. Owns the DeviceState and the analog front-end, reads one
// sample per period, and forwards completed readings to the report task.
// Other tasks reach it only through the SensorCommand queue.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::device::DeviceState;
use crate::events::{DeviceStatus, ReportEvent, SensorCommand};

/// Analog front-end seen by the sampling loop.
pub trait EcgFrontEnd {
    /// One raw ADC conversion of the ECG output.
    fn read_raw(&mut self) -> anyhow::Result<u16>;

    /// Both electrodes report skin contact.
    fn leads_attached(&mut self) -> bool;

    /// Drive the front-end shutdown line.
    fn set_powered(&mut self, on: bool) -> anyhow::Result<()>;
}

pub struct SensorLoop<F> {
    front_end: F,
    device: DeviceState,
    commands: Receiver<SensorCommand>,
    reports: Sender<ReportEvent>,
    reported_status: DeviceStatus,
}

impl<F: EcgFrontEnd> SensorLoop<F> {
    pub fn new(
        front_end: F,
        device: DeviceState,
        commands: Receiver<SensorCommand>,
        reports: Sender<ReportEvent>,
    ) -> Self {
        let reported_status = device.status();
        Self {
            front_end,
            device,
            commands,
            reports,
            reported_status,
        }
    }

    pub fn device(&self) -> &DeviceState {
        &self.device
    }

    pub fn front_end(&self) -> &F {
        &self.front_end
    }

    /// One sampling period: apply pending commands, acquire one sample,
    /// enforce the inactivity timeout. Returns `Ok(false)` once the report
    /// channel has closed and the loop should stop.
    pub fn tick(&mut self, now_ms: u32) -> anyhow::Result<bool> {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(command, now_ms)?,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        // Surface transitions made by the commands before this tick's sample.
        if !self.publish_status() {
            return Ok(false);
        }

        if self.device.is_sensor_active() {
            let leads = self.front_end.leads_attached();
            let raw = if leads {
                match self.front_end.read_raw() {
                    Ok(raw) => Some(raw),
                    Err(e) => {
                        log::warn!("ECG ADC read error: {}", e);
                        None
                    }
                }
            } else {
                Some(0)
            };

            if let Some(raw) = raw {
                if let Some(capture) = self.device.process_sample(f32::from(raw), leads, now_ms) {
                    let reading = capture.reading();
                    if !self.send(ReportEvent::Reading(reading)) {
                        return Ok(false);
                    }
                }
            }

            if self.device.check_inactivity(now_ms) {
                self.front_end.set_powered(false)?;
            }
        }

        Ok(self.publish_status())
    }

    /// Run forever at `interval`, catching up on overruns by restarting the
    /// schedule rather than bursting.
    pub fn run(mut self, interval: Duration, now_ms: impl Fn() -> u32) {
        log::info!("Sensor task started ({} us period)", interval.as_micros());

        let mut next = Instant::now();
        loop {
            match self.tick(now_ms()) {
                Ok(true) => {}
                Ok(false) => {
                    log::warn!("Report channel closed, exiting sensor task");
                    return;
                }
                Err(e) => log::error!("Sensor task error: {:#}", e),
            }

            next += interval;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                next = now;
            }
        }
    }

    fn apply(&mut self, command: SensorCommand, now_ms: u32) -> anyhow::Result<()> {
        match command {
            SensorCommand::Wake => {
                if !self.device.is_sensor_active() {
                    self.front_end.set_powered(true)?;
                    self.device.wake(now_ms);
                }
            }
            SensorCommand::Sleep => {
                if self.device.is_sensor_active() {
                    self.device.sleep();
                    self.front_end.set_powered(false)?;
                }
            }
            SensorCommand::Touch => self.device.touch(now_ms),
        }
        Ok(())
    }

    fn publish_status(&mut self) -> bool {
        let status = self.device.status();
        if status == self.reported_status {
            return true;
        }
        self.reported_status = status;
        self.send(ReportEvent::StatusChanged(status))
    }

    fn send(&self, event: ReportEvent) -> bool {
        self.reports.send(event).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use std::sync::mpsc;

    #[derive(Default)]
    struct MockFrontEnd {
        powered: bool,
        leads: bool,
        fail_reads: bool,
        reads: usize,
        value: u16,
    }

    impl EcgFrontEnd for MockFrontEnd {
        fn read_raw(&mut self) -> anyhow::Result<u16> {
            if self.fail_reads {
                anyhow::bail!("ADC timeout");
            }
            self.reads += 1;
            Ok(self.value)
        }

        fn leads_attached(&mut self) -> bool {
            self.leads
        }

        fn set_powered(&mut self, on: bool) -> anyhow::Result<()> {
            self.powered = on;
            Ok(())
        }
    }

    struct Harness {
        sensor: SensorLoop<MockFrontEnd>,
        commands: Sender<SensorCommand>,
        reports: Receiver<ReportEvent>,
    }

    fn harness(signal_length: usize) -> Harness {
        let config = PipelineConfig {
            signal_length,
            ..PipelineConfig::default()
        };
        let device = DeviceState::new(&config).unwrap();
        let front_end = MockFrontEnd {
            leads: true,
            value: 2048,
            ..MockFrontEnd::default()
        };
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();
        Harness {
            sensor: SensorLoop::new(front_end, device, cmd_rx, report_tx),
            commands: cmd_tx,
            reports: report_rx,
        }
    }

    #[test]
    fn idle_until_woken() {
        let mut h = harness(8);
        assert!(h.sensor.tick(0).unwrap());
        assert_eq!(h.sensor.front_end().reads, 0);
        assert!(h.reports.try_recv().is_err());
    }

    #[test]
    fn wake_powers_front_end_and_reports_status() {
        let mut h = harness(8);
        h.commands.send(SensorCommand::Wake).unwrap();
        assert!(h.sensor.tick(0).unwrap());

        assert!(h.sensor.front_end().powered);
        assert_eq!(h.sensor.front_end().reads, 1);
        assert_eq!(h.reports.try_recv().unwrap(), ReportEvent::StatusChanged(DeviceStatus::WakingUp));
        assert_eq!(h.reports.try_recv().unwrap(), ReportEvent::StatusChanged(DeviceStatus::Measuring));
    }

    #[test]
    fn full_window_emits_reading() {
        let mut h = harness(8);
        h.commands.send(SensorCommand::Wake).unwrap();
        for t in 0..8 {
            assert!(h.sensor.tick(t).unwrap());
        }

        let events: Vec<ReportEvent> = h.reports.try_iter().collect();
        assert!(matches!(events[0], ReportEvent::StatusChanged(DeviceStatus::WakingUp)));
        assert!(matches!(events[1], ReportEvent::StatusChanged(DeviceStatus::Measuring)));
        assert!(matches!(events[2], ReportEvent::Reading(r) if r.result.bpm == 0));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn lead_off_skips_adc_reads() {
        let mut h = harness(8);
        h.commands.send(SensorCommand::Wake).unwrap();
        h.sensor.tick(0).unwrap();
        h.sensor.front_end.leads = false;
        h.sensor.tick(1).unwrap();

        assert_eq!(h.sensor.front_end().reads, 1);
        let events: Vec<ReportEvent> = h.reports.try_iter().collect();
        assert_eq!(events.last(), Some(&ReportEvent::StatusChanged(DeviceStatus::LeadOff)));
    }

    #[test]
    fn read_errors_drop_the_sample() {
        let mut h = harness(8);
        h.commands.send(SensorCommand::Wake).unwrap();
        h.sensor.front_end.fail_reads = true;
        assert!(h.sensor.tick(0).unwrap());
        assert_eq!(h.sensor.device().buffered(), 0);
        assert_eq!(
            h.reports.try_iter().collect::<Vec<_>>(),
            vec![ReportEvent::StatusChanged(DeviceStatus::WakingUp)]
        );
    }

    #[test]
    fn sleep_command_and_inactivity_power_down() {
        let mut h = harness(8);
        h.commands.send(SensorCommand::Wake).unwrap();
        h.sensor.tick(0).unwrap();
        h.commands.send(SensorCommand::Sleep).unwrap();
        h.sensor.tick(1).unwrap();
        assert!(!h.sensor.front_end().powered);
        assert!(!h.sensor.device().is_sensor_active());

        h.commands.send(SensorCommand::Wake).unwrap();
        h.sensor.tick(2).unwrap();
        assert!(h.sensor.front_end().powered);

        h.sensor.front_end.leads = false;
        h.sensor.tick(3).unwrap();
        h.sensor.tick(70_000).unwrap();
        assert!(!h.sensor.front_end().powered);
        assert_eq!(h.sensor.device().status(), DeviceStatus::Sleeping);
    }

    #[test]
    fn closed_report_channel_stops_the_loop() {
        let mut h = harness(8);
        drop(h.reports);
        h.commands.send(SensorCommand::Wake).unwrap();
        assert!(!h.sensor.tick(0).unwrap());
    }
}
