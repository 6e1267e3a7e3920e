// ECG Edge: Button GPIO
//
// BOOT button with the internal pull-up enabled; reads LOW while pressed.

use esp_idf_hal::gpio::{AnyIOPin, Input, PinDriver, Pull};

use crate::config::PIN_BUTTON;
use crate::tasks::ui::ButtonInput;

pub struct GpioButton {
    pin: PinDriver<'static, AnyIOPin, Input>,
}

impl GpioButton {
    pub fn new(mut pin: PinDriver<'static, AnyIOPin, Input>) -> anyhow::Result<Self> {
        pin.set_pull(Pull::Up)?;
        log::info!("Button on GPIO{} (active LOW)", PIN_BUTTON);
        Ok(Self { pin })
    }
}

impl ButtonInput for GpioButton {
    fn is_pressed(&mut self) -> bool {
        self.pin.is_low()
    }
}
