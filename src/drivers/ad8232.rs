// ECG Edge: AD8232 Front-End Driver
//
// ECG output on ADC1 through the ESP-IDF oneshot API, lead-off comparators on
// two GPIO inputs, and the SDN line for power control.

use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, Input, Output, PinDriver};
use esp_idf_sys::esp;

use crate::config::*;
use crate::tasks::sensor::EcgFrontEnd;

pub struct Ad8232 {
    adc: esp_idf_sys::adc_oneshot_unit_handle_t,
    channel: esp_idf_sys::adc_channel_t,
    lo_plus: PinDriver<'static, AnyInputPin, Input>,
    lo_minus: PinDriver<'static, AnyInputPin, Input>,
    shutdown: PinDriver<'static, AnyOutputPin, Output>,
}

// SAFETY: the oneshot unit handle is only used from the thread that owns the
// driver; ESP-IDF does not tie it to the creating task.
unsafe impl Send for Ad8232 {}

impl Ad8232 {
    /// Set up ADC1 channel 6 (GPIO34) at 12 bits with 11 dB attenuation.
    /// The front-end starts in shutdown.
    pub fn new(
        lo_plus: PinDriver<'static, AnyInputPin, Input>,
        lo_minus: PinDriver<'static, AnyInputPin, Input>,
        mut shutdown: PinDriver<'static, AnyOutputPin, Output>,
    ) -> anyhow::Result<Self> {
        shutdown.set_low()?;

        let channel = esp_idf_sys::adc_channel_t_ADC_CHANNEL_6;
        let mut adc: esp_idf_sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        unsafe {
            let unit_cfg = esp_idf_sys::adc_oneshot_unit_init_cfg_t {
                unit_id: esp_idf_sys::adc_unit_t_ADC_UNIT_1,
                ulp_mode: esp_idf_sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..core::mem::zeroed()
            };
            esp!(esp_idf_sys::adc_oneshot_new_unit(&unit_cfg, &mut adc))?;

            let chan_cfg = esp_idf_sys::adc_oneshot_chan_cfg_t {
                atten: esp_idf_sys::adc_atten_t_ADC_ATTEN_DB_11,
                bitwidth: esp_idf_sys::adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            if let Err(e) = esp!(esp_idf_sys::adc_oneshot_config_channel(adc, channel, &chan_cfg)) {
                esp_idf_sys::adc_oneshot_del_unit(adc);
                return Err(e.into());
            }
        }
        log::info!("AD8232 on GPIO{} (LO+ {}, LO- {}, SDN {})", PIN_ECG, PIN_LO_PLUS, PIN_LO_MINUS, PIN_SDN);

        Ok(Self {
            adc,
            channel,
            lo_plus,
            lo_minus,
            shutdown,
        })
    }
}

impl EcgFrontEnd for Ad8232 {
    fn read_raw(&mut self) -> anyhow::Result<u16> {
        let mut raw: i32 = 0;
        unsafe {
            esp!(esp_idf_sys::adc_oneshot_read(self.adc, self.channel, &mut raw))?;
        }
        Ok(raw.clamp(0, i32::from(ADC_FULL_SCALE)) as u16)
    }

    fn leads_attached(&mut self) -> bool {
        self.lo_plus.is_low() && self.lo_minus.is_low()
    }

    fn set_powered(&mut self, on: bool) -> anyhow::Result<()> {
        if on {
            self.shutdown.set_high()?;
        } else {
            self.shutdown.set_low()?;
        }
        Ok(())
    }
}

impl Drop for Ad8232 {
    fn drop(&mut self) {
        let _ = self.shutdown.set_low();
        unsafe {
            esp_idf_sys::adc_oneshot_del_unit(self.adc);
        }
    }
}
