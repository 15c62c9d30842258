use stm32f7::stm32f745::Peripherals;
use stm32f7::stm32f745::spi1;
use stm32f7::stm32f745::spi1::cr1::BR;

use crate::systick::Deadline;


/// A byte did not make it through the shift register in time.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SpiTimeout;


pub trait Spi {
    fn get_peripheral(peripherals: &Peripherals) -> &spi1::RegisterBlock;
    fn enable_peripheral_clock(peripherals: &Peripherals);

    /// Sets the peripheral up as a transmitting controller in mode 0 (clock idles low, data is
    /// sampled on the rising edge), eight bits per frame, most significant bit first.
    fn set_up_as_controller(peripherals: &Peripherals, speed_divisor: BR) {
        let spi = Self::get_peripheral(peripherals);

        // pins must be in alternate function mode by now
        Self::enable_peripheral_clock(peripherals);

        // CR1 may only be changed while the peripheral is off
        spi.cr1().modify(|_, w| w
            .spe().disabled()
        );

        spi.cr1().modify(|_, w| w
            .br().variant(speed_divisor)
            .cpol().idle_low()
            .cpha().first_edge()
            .rxonly().full_duplex() // the panel never answers, but Rx is drained anyway
            .bidimode().unidirectional()
            .lsbfirst().clear_bit() // MSB first
            .crcen().disabled()
            .ssm().enabled() // chip select is a plain GPIO
            .ssi().slave_not_selected()
            .mstr().master()
        );
        spi.cr2().modify(|_, w| w
            .ds().eight_bit()
            .ssoe().enabled()
            .nssp().no_pulse()
            .frxth().quarter() // RXNE as soon as a single byte is in
            .txdmaen().clear_bit()
            .rxdmaen().clear_bit()
        );

        spi.cr1().modify(|_, w| w
            .spe().enabled()
        );
    }

    /// Writes `data` via SPI, discarding whatever comes back.
    ///
    /// The chip select line must be handled by the caller.
    fn write_bytes(peripherals: &Peripherals, data: &[u8], timeout_ms: u32) -> Result<(), SpiTimeout> {
        let spi = Self::get_peripheral(peripherals);
        let deadline = Deadline::after_ms(timeout_ms);

        // internal chip select follows the frame
        spi.cr1().modify(|_, w| w
            .ssi().slave_selected()
        );

        let result = shift_out(spi, data, &deadline);

        spi.cr1().modify(|_, w| w
            .ssi().slave_not_selected()
        );

        result
    }
}


fn wait_until<F: Fn() -> bool>(deadline: &Deadline, condition: F) -> Result<(), SpiTimeout> {
    while !condition() {
        if deadline.has_passed() {
            return Err(SpiTimeout);
        }
    }
    Ok(())
}

fn shift_out(spi: &spi1::RegisterBlock, data: &[u8], deadline: &Deadline) -> Result<(), SpiTimeout> {
    for b in data {
        // wait until previous transfer is complete
        wait_until(deadline, || spi.sr().read().txe().is_empty())?;

        // (we must use dr8() here, otherwise SPI will try to send the 16 bits as 2 bytes)
        spi.dr8().modify(|_, w| w
            .dr().set(*b)
        );

        // wait for the echo and throw it away so that Rx doesn't overrun
        wait_until(deadline, || spi.sr().read().rxne().is_not_empty())?;
        let _ = spi.dr8().read().dr().bits();
    }

    // wait for the last bits to leave before the caller releases chip select
    wait_until(deadline, || spi.sr().read().bsy().bit_is_clear())
}


pub struct Spi1;
impl Spi for Spi1 {
    fn get_peripheral(peripherals: &Peripherals) -> &spi1::RegisterBlock {
        &*peripherals.SPI1
    }

    fn enable_peripheral_clock(peripherals: &Peripherals) {
        peripherals.RCC.apb2enr().modify(|_, w| w
            .spi1en().set_bit()
        );
    }
}
