// ECG Edge: Button Task
//
// Polls the user button at ~100 Hz, runs it through the hold state machine and
// turns the resulting events into sensor commands. A medium hold wakes the
// sensor; a long hold runs the factory-reset action supplied by the firmware.

use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use crate::events::{ButtonEvent, SensorCommand};
use crate::input::{ButtonMachine, ButtonTiming};

pub trait ButtonInput {
    /// Current raw level, `true` while held down.
    fn is_pressed(&mut self) -> bool;
}

pub struct ButtonTask<B, R> {
    button: B,
    machine: ButtonMachine,
    commands: Sender<SensorCommand>,
    factory_reset: R,
}

impl<B, R> ButtonTask<B, R>
where
    B: ButtonInput,
    R: FnMut() -> anyhow::Result<()>,
{
    pub fn new(button: B, timing: ButtonTiming, commands: Sender<SensorCommand>, factory_reset: R) -> Self {
        Self {
            button,
            machine: ButtonMachine::new(timing),
            commands,
            factory_reset,
        }
    }

    /// Sample the button once and act on whatever event the machine emits.
    pub fn poll(&mut self, now_ms: u32) -> anyhow::Result<Option<ButtonEvent>> {
        let pressed = self.button.is_pressed();
        let Some(event) = self.machine.update(pressed, now_ms) else {
            return Ok(None);
        };

        match event {
            ButtonEvent::Pressed => self.commands.send(SensorCommand::Touch)?,
            ButtonEvent::MediumHold => {
                log::info!("Button held, waking sensor");
                self.commands.send(SensorCommand::Wake)?;
            }
            ButtonEvent::LongHold => {
                log::warn!("Button long hold, factory reset");
                (self.factory_reset)()?;
            }
            ButtonEvent::Released { held_ms } => log::debug!("Button released after {} ms", held_ms),
            ButtonEvent::Cancelled { held_ms } => log::debug!("Short press ({} ms) ignored", held_ms),
        }

        Ok(Some(event))
    }

    pub fn run(mut self, poll_interval: Duration, now_ms: impl Fn() -> u32) {
        log::info!("Button task started");

        loop {
            if let Err(e) = self.poll(now_ms()) {
                log::error!("Button task error: {:#}", e);
                return;
            }
            thread::sleep(poll_interval);
        }
    }
}
