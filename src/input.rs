// ECG Edge: Button State Machine
//
// Debounced hold detector for the single user button:
//
//   Idle -> Pressed -> MediumHeld -> LongHeld
//              |           |            |
//              +-----------+------------+--> Released -> Idle
//
// Holding past WAKE_HOLD_MS wakes the sensor, holding past
// FACTORY_RESET_HOLD_MS wipes stored credentials. Polled at ~100 Hz from the
// UI task with the raw pin level and a millisecond timestamp.

use crate::config::*;
use crate::events::ButtonEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTiming {
    pub debounce_ms: u32,
    pub medium_hold_ms: u32,
    pub long_hold_ms: u32,
}

impl Default for ButtonTiming {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            medium_hold_ms: WAKE_HOLD_MS,
            long_hold_ms: FACTORY_RESET_HOLD_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    Idle,
    Pressed { since_ms: u32 },
    MediumHeld { since_ms: u32 },
    LongHeld { since_ms: u32 },
    Released,
}

#[derive(Debug, Clone)]
pub struct ButtonMachine {
    timing: ButtonTiming,
    state: ButtonState,

    // Debounce state
    last_raw: bool,
    last_change_ms: u32,
}

impl Default for ButtonMachine {
    fn default() -> Self {
        Self::new(ButtonTiming::default())
    }
}

impl ButtonMachine {
    pub fn new(timing: ButtonTiming) -> Self {
        Self {
            timing,
            state: ButtonState::Idle,
            last_raw: false,
            last_change_ms: 0,
        }
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    /// Feed the raw level (`true` = pressed) and return at most one event.
    pub fn update(&mut self, raw_pressed: bool, now_ms: u32) -> Option<ButtonEvent> {
        // ---- debounce filter ----
        if raw_pressed != self.last_raw {
            self.last_raw = raw_pressed;
            self.last_change_ms = now_ms;
        }
        if now_ms.wrapping_sub(self.last_change_ms) < self.timing.debounce_ms {
            return None;
        }
        let pressed = raw_pressed;

        if self.state == ButtonState::Released {
            self.state = ButtonState::Idle;
        }

        match self.state {
            ButtonState::Idle | ButtonState::Released => {
                if pressed {
                    self.state = ButtonState::Pressed { since_ms: now_ms };
                    return Some(ButtonEvent::Pressed);
                }
                None
            }
            ButtonState::Pressed { since_ms } => {
                let held_ms = now_ms.wrapping_sub(since_ms);
                if !pressed {
                    self.state = ButtonState::Released;
                    Some(ButtonEvent::Cancelled { held_ms })
                } else if held_ms >= self.timing.medium_hold_ms {
                    self.state = ButtonState::MediumHeld { since_ms };
                    Some(ButtonEvent::MediumHold)
                } else {
                    None
                }
            }
            ButtonState::MediumHeld { since_ms } => {
                let held_ms = now_ms.wrapping_sub(since_ms);
                if !pressed {
                    self.state = ButtonState::Released;
                    Some(ButtonEvent::Released { held_ms })
                } else if held_ms >= self.timing.long_hold_ms {
                    self.state = ButtonState::LongHeld { since_ms };
                    Some(ButtonEvent::LongHold)
                } else {
                    None
                }
            }
            ButtonState::LongHeld { since_ms } => {
                if !pressed {
                    self.state = ButtonState::Released;
                    return Some(ButtonEvent::Released {
                        held_ms: now_ms.wrapping_sub(since_ms),
                    });
                }
                None
            }
        }
    }
}
