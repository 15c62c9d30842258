use core::marker::PhantomData;

use pmp_drivers::{BusConfig, BusError, I2cAddress, I2cBus};
use stm32f7::stm32f745::i2c1;
use stm32f7::stm32f745::Peripherals;

use crate::systick::Deadline;


/// SCL speed grades the timing register is set up for.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum I2cSpeed {
    /// 100 kHz
    Standard,

    /// 400 kHz
    Fast,
}
impl I2cSpeed {
    pub fn from_kbps(baud_rate_kbps: u32) -> Self {
        if baud_rate_kbps > 100 {
            Self::Fast
        } else {
            Self::Standard
        }
    }
}


pub trait I2c {
    fn get_peripheral(peripherals: &Peripherals) -> &i2c1::RegisterBlock;
    fn enable_peripheral_clock(peripherals: &Peripherals);

    fn set_up_as_controller(peripherals: &Peripherals, speed: I2cSpeed) {
        let i2c = Self::get_peripheral(peripherals);

        // assumes pins are already set up

        // gimme clock
        Self::enable_peripheral_clock(peripherals);

        // timing may only be changed while the peripheral is off
        i2c.cr1().modify(|_, w| w
            .pe().disabled()
        );

        // set up noise filter
        i2c.cr1().modify(|_, w| w
            .anfoff().enabled() // analog filter enabled
            .dnf().no_filter() // the timings below assume no digital filter
            .txdmaen().disabled() // no DMA for transmission
            .rxdmaen().disabled() // no DMA for reception
            .sbc().disabled() // this option may only be enabled if we're the peripheral
            .nostretch().disabled() // this option may only be enabled if we're the peripheral
            .smbhen().disabled() // ignore the SMBus host address
            .smbden().disabled() // ignore the SMBus default address
            .alerten().disabled() // no SMBus alerts
            .pecen().disabled() // no packet error checking
        );
        i2c.cr2().modify(|_, w| w
            .add10().bit7() // 7-bit addresses
        );

        // I2C peripheral clock is 16 MHz; values from RM0385 Table 187
        match speed {
            I2cSpeed::Standard => {
                i2c.timingr().modify(|_, w| w
                    .presc().set(0x3)
                    .scll().set(0x13)
                    .sclh().set(0x0F)
                    .sdadel().set(0x2)
                    .scldel().set(0x4)
                );
            },
            I2cSpeed::Fast => {
                i2c.timingr().modify(|_, w| w
                    .presc().set(0x1)
                    .scll().set(0x09)
                    .sclh().set(0x03)
                    .sdadel().set(0x2)
                    .scldel().set(0x3)
                );
            },
        }

        // turn on
        i2c.cr1().modify(|_, w| w
            .pe().enabled()
        );
    }

    /// Writes `command` and `payload` back-to-back in one transfer, then issues a STOP.
    fn write_data(
        peripherals: &Peripherals,
        address: I2cAddress,
        command: &[u8],
        payload: &[u8],
        timeout_ms: u32,
    ) -> Result<(), BusError> {
        let i2c = Self::get_peripheral(peripherals);
        let total_length = command.len() + payload.len();
        assert!(total_length <= 0xFF);

        let deadline = Deadline::after_ms(timeout_ms);

        // wait until bus is idle
        wait_for(i2c, &deadline, |isr| isr.busy().bit_is_clear())?;

        // 7-bit addresses live in SADD[7:1]
        i2c.cr2().modify(|_, w| w
            .sadd().set(u16::from(address.as_u8()) << 1)
            .rd_wrn().write() // we are writing
            .nbytes().set(total_length as u8)
            .reload().clear_bit() // no reloading after 255 bytes
            .autoend().set_bit() // STOP after the last byte
        );

        // go go go!
        i2c.cr2().modify(|_, w| w
            .start().set_bit()
        );

        for &byte in command.iter().chain(payload.iter()) {
            // wait until the device wants the next byte
            if let Err(e) = wait_for(i2c, &deadline, |isr| isr.txis().bit_is_set()) {
                recover(i2c, e);
                return Err(e);
            }

            i2c.txdr().write(|w| w
                .txdata().set(byte)
            );
        }

        if let Err(e) = wait_for(i2c, &deadline, |isr| isr.stopf().bit_is_set()) {
            recover(i2c, e);
            return Err(e);
        }
        i2c.icr().write(|w| w
            .stopcf().clear_bit_by_one()
        );
        Ok(())
    }

    /// Writes `command`, then reads `data` after a repeated START.
    fn write_read_data(
        peripherals: &Peripherals,
        address: I2cAddress,
        command: &[u8],
        data: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), BusError> {
        let i2c = Self::get_peripheral(peripherals);
        assert!(command.len() <= 0xFF);
        assert!(data.len() <= 0xFF);

        let deadline = Deadline::after_ms(timeout_ms);

        wait_for(i2c, &deadline, |isr| isr.busy().bit_is_clear())?;

        i2c.cr2().modify(|_, w| w
            .sadd().set(u16::from(address.as_u8()) << 1)
            .rd_wrn().write()
            .nbytes().set(command.len() as u8)
            .reload().clear_bit()
            .autoend().clear_bit() // no STOP; we turn the bus around with a repeated START
        );
        i2c.cr2().modify(|_, w| w
            .start().set_bit()
        );

        for &byte in command {
            if let Err(e) = wait_for(i2c, &deadline, |isr| isr.txis().bit_is_set()) {
                recover(i2c, e);
                return Err(e);
            }
            i2c.txdr().write(|w| w
                .txdata().set(byte)
            );
        }

        // wait until the register address is out
        if let Err(e) = wait_for(i2c, &deadline, |isr| isr.tc().bit_is_set()) {
            recover(i2c, e);
            return Err(e);
        }

        i2c.cr2().modify(|_, w| w
            .rd_wrn().read() // we are reading
            .nbytes().set(data.len() as u8)
            .autoend().set_bit() // NACK + STOP after the last byte
        );
        i2c.cr2().modify(|_, w| w
            .start().set_bit()
        );

        for byte in data {
            // wait until the read register is full
            if let Err(e) = wait_for(i2c, &deadline, |isr| isr.rxne().bit_is_set()) {
                recover(i2c, e);
                return Err(e);
            }
            *byte = i2c.rxdr().read().rxdata().bits();
        }

        if let Err(e) = wait_for(i2c, &deadline, |isr| isr.stopf().bit_is_set()) {
            recover(i2c, e);
            return Err(e);
        }
        i2c.icr().write(|w| w
            .stopcf().clear_bit_by_one()
        );
        Ok(())
    }
}


/// Spins until `condition` holds, an error flag comes up or the deadline passes.
fn wait_for<F: Fn(&i2c1::isr::R) -> bool>(
    i2c: &i2c1::RegisterBlock,
    deadline: &Deadline,
    condition: F,
) -> Result<(), BusError> {
    loop {
        let isr = i2c.isr().read();
        if isr.nackf().bit_is_set() {
            return Err(BusError::Nack);
        }
        if isr.arlo().bit_is_set() {
            return Err(BusError::ArbitrationLost);
        }
        if isr.berr().bit_is_set() {
            return Err(BusError::BusFault);
        }
        if condition(&isr) {
            return Ok(());
        }
        if deadline.has_passed() {
            return Err(BusError::Timeout);
        }
    }
}

/// Brings the peripheral back into a usable state after a failed transfer.
fn recover(i2c: &i2c1::RegisterBlock, error: BusError) {
    if error == BusError::Timeout {
        // we may be stuck in the middle of a transfer
        i2c.cr2().modify(|_, w| w
            .stop().set_bit()
        );
    }

    // the controller sends STOP by itself after NACK; clear all the error flags
    i2c.icr().write(|w| w
        .nackcf().clear_bit_by_one()
        .stopcf().clear_bit_by_one()
        .berrcf().clear_bit_by_one()
        .arlocf().clear_bit_by_one()
    );

    // software reset: PE low for at least three APB clock cycles
    i2c.cr1().modify(|_, w| w
        .pe().disabled()
    );
    for _ in 0..4 {
        cortex_m::asm::nop();
    }
    i2c.cr1().modify(|_, w| w
        .pe().enabled()
    );
}


macro_rules! implement_i2c {
    (
        $struct_name:ident,
        $peripheral_name:ident,
        $rcc_enable_register:ident,
        $rcc_field:ident $(,)?
    ) => {
        pub struct $struct_name;
        impl I2c for $struct_name {
            fn get_peripheral(peripherals: &Peripherals) -> &i2c1::RegisterBlock {
                &*peripherals.$peripheral_name
            }

            fn enable_peripheral_clock(peripherals: &Peripherals) {
                peripherals.RCC.$rcc_enable_register().modify(|_, w| w
                    .$rcc_field().set_bit()
                );
            }
        }
    };
}

implement_i2c!(I2c2, I2C2, apb1enr, i2c2en);


/// Hands one of the I2C peripherals to the register drivers.
pub struct PeripheralI2c<'p, I: I2c> {
    peripherals: &'p Peripherals,
    i2c: PhantomData<I>,
}
impl<'p, I: I2c> PeripheralI2c<'p, I> {
    pub fn new(peripherals: &'p Peripherals) -> Self {
        Self {
            peripherals,
            i2c: PhantomData,
        }
    }
}
impl<'p, I: I2c> I2cBus for PeripheralI2c<'p, I> {
    fn send(
        &mut self,
        address: I2cAddress,
        config: &BusConfig,
        command: &[u8],
        payload: &[u8],
    ) -> Result<(), BusError> {
        I::write_data(self.peripherals, address, command, payload, config.timeout_ms)
    }

    fn receive(
        &mut self,
        address: I2cAddress,
        config: &BusConfig,
        command: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), BusError> {
        I::write_read_data(self.peripherals, address, command, buffer, config.timeout_ms)
    }
}
