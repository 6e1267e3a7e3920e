// ECG Edge: Firmware Entry Point
//
// Boot sequence:
//   1. Install the ESP-IDF logger and take the peripherals.
//   2. Bring up the AD8232 (held in shutdown) and the BOOT button.
//   3. Build the signal pipeline from the default configuration.
//   4. Spawn the sensor, report and button tasks.
//   5. Wake the sensor.
//
// The sensor goes back to sleep after a minute without a usable signal.
// Holding the button for 2 s wakes it, holding for 3 s erases NVS and reboots.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::main()
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("ecg-edge firmware runs on ESP-IDF targets only; use `cargo test` on the host")
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::gpio::{IOPin, InputPin, OutputPin, PinDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_sys::esp;

    use ecg_edge::config::*;
    use ecg_edge::device::DeviceState;
    use ecg_edge::drivers::ad8232::Ad8232;
    use ecg_edge::drivers::button::GpioButton;
    use ecg_edge::events::SensorCommand;
    use ecg_edge::input::ButtonTiming;
    use ecg_edge::tasks::report::report_task;
    use ecg_edge::tasks::sensor::SensorLoop;
    use ecg_edge::tasks::ui::ButtonTask;

    // -----------------------------------------------------------------------
    // Utility: milliseconds since boot (wraps at ~49 days, fine for timeouts)
    // -----------------------------------------------------------------------
    fn now_ms() -> u32 {
        unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
    }

    pub fn main() -> anyhow::Result<()> {
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("ECG Edge firmware starting...");

        // ---- Peripherals ---------------------------------------------------
        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        let front_end = Ad8232::new(
            PinDriver::input(pins.gpio25.downgrade_input())?,
            PinDriver::input(pins.gpio26.downgrade_input())?,
            PinDriver::output(pins.gpio27.downgrade_output())?,
        )?;
        let button = GpioButton::new(PinDriver::input(pins.gpio0.downgrade())?)?;

        // ---- Pipeline ------------------------------------------------------
        let config = PipelineConfig::default();
        let device = DeviceState::new(&config)?;
        let sample_interval = Duration::from_micros(config.sample_interval_us());

        // ---- Channels ------------------------------------------------------
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();

        // ---- Spawn tasks (FreeRTOS tasks via std::thread) -------------------

        // Sensor task: sole owner of the device state, tightest timing.
        thread::Builder::new()
            .name("sensor".into())
            .stack_size(STACK_SENSOR)
            .spawn(move || {
                SensorLoop::new(front_end, device, cmd_rx, report_tx).run(sample_interval, now_ms);
            })?;

        thread::Builder::new()
            .name("report".into())
            .stack_size(STACK_REPORT)
            .spawn(move || report_task(report_rx))?;

        let button_tx = cmd_tx.clone();
        thread::Builder::new()
            .name("ui".into())
            .stack_size(STACK_UI)
            .spawn(move || {
                ButtonTask::new(button, ButtonTiming::default(), button_tx, factory_reset)
                    .run(Duration::from_millis(BUTTON_POLL_INTERVAL_MS), now_ms);
            })?;

        cmd_tx.send(SensorCommand::Wake)?;
        log::info!("Boot complete, entering normal operation");

        // Nothing left for the main thread; all work happens in the tasks.
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    }

    /// Wipe stored credentials and reboot. Does not return on success.
    fn factory_reset() -> anyhow::Result<()> {
        log::warn!("Factory reset: erasing NVS and restarting");
        esp!(unsafe { esp_idf_sys::nvs_flash_erase() })?;
        esp_idf_hal::reset::restart()
    }
}
