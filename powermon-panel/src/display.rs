//! SSD1331 panel wiring: SPI1 for data, plain GPIO outputs for chip select, D/C and reset.


use core::marker::PhantomData;

use pmp_drivers::ssd1331::{DisplayBus, DisplayError};
use stm32f7::stm32f745::Peripherals;

use crate::gpio_output::{DisplayDataNotCommand, DisplayNotChipSelect, DisplayNotReset, GpioOutput};
use crate::spi::Spi;
use crate::systick::delay_ms;


const RESET_STEP_MS: u32 = 100;
const CHIP_SELECT_SETTLE_MS: u32 = 1;


pub struct PanelBus<'p, S: Spi> {
    peripherals: &'p Peripherals,
    timeout_ms: u32,
    spi: PhantomData<S>,
}
impl<'p, S: Spi> PanelBus<'p, S> {
    /// Sets up the control lines; SPI must already be set up as controller.
    pub fn new(peripherals: &'p Peripherals, timeout_ms: u32) -> Self {
        DisplayNotChipSelect::set_up(peripherals);
        DisplayDataNotCommand::set_up(peripherals);
        DisplayNotReset::set_up(peripherals);

        // deselected, not in reset
        DisplayNotChipSelect::set_high(peripherals);
        DisplayNotReset::set_high(peripherals);

        Self {
            peripherals,
            timeout_ms,
            spi: PhantomData,
        }
    }
}
impl<'p, S: Spi> DisplayBus for PanelBus<'p, S> {
    fn write_command(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        // start a fresh frame
        DisplayNotChipSelect::set_high(self.peripherals);
        delay_ms(CHIP_SELECT_SETTLE_MS);
        DisplayNotChipSelect::set_low(self.peripherals);

        DisplayDataNotCommand::set_low(self.peripherals);
        let result = S::write_bytes(self.peripherals, bytes, self.timeout_ms);

        DisplayNotChipSelect::set_high(self.peripherals);

        result.map_err(|_| {
            log::debug!("SPI timeout sending {} command byte(s) to display", bytes.len());
            DisplayError::Bus
        })
    }

    fn reset(&mut self) -> Result<(), DisplayError> {
        DisplayNotReset::set_high(self.peripherals);
        delay_ms(RESET_STEP_MS);
        DisplayNotReset::set_low(self.peripherals);
        delay_ms(RESET_STEP_MS);
        DisplayNotReset::set_high(self.peripherals);
        delay_ms(RESET_STEP_MS);
        Ok(())
    }
}
