use core::fmt;
use core::marker::PhantomData;

use log::{LevelFilter, Log, Metadata, Record};
use stm32f7::stm32f745::Peripherals;
use stm32f7::stm32f745::usart1;


pub trait Uart {
    fn get_peripheral(peripherals: &Peripherals) -> &usart1::RegisterBlock;
    fn enable_peripheral_clock(peripherals: &Peripherals);

    fn set_up(peripherals: &Peripherals, speed_divisor: u16) {
        let uart = Self::get_peripheral(peripherals);

        // pins must be in alternate function mode by now
        Self::enable_peripheral_clock(peripherals);

        // 8N1 with 16x oversampling
        uart.cr1().modify(|_, w| w
            .m0().bit8()
            .m1().m0()
            .over8().oversampling16()
            .pce().disabled()
        );
        uart.brr().modify(|_, w| w
            .brr().set(speed_divisor)
        );
        uart.cr2().modify(|_, w| w
            .stop().stop1()
            .txinv().standard()
            .datainv().positive()
            .msbfirst().clear_bit() // LSB first, as usual for a serial console
        );

        uart.cr1().modify(|_, w| w
            .ue().enabled()
        );

        // the console only ever talks
        uart.cr1().modify(|_, w| w
            .te().enabled()
        );
    }

    /// Writes via UART.
    fn write(peripherals: &Peripherals, data: &[u8]) {
        let uart = Self::get_peripheral(peripherals);

        for &b in data {
            while uart.isr().read().txe().is_full() {
            }
            uart.tdr().write(|w| w
                .tdr().set(u16::from(b))
            );
        }

        // let the last byte leave the shift register
        while uart.isr().read().tc().bit_is_clear() {
        }
    }
}


pub struct Usart3;
impl Uart for Usart3 {
    fn get_peripheral(peripherals: &Peripherals) -> &usart1::RegisterBlock {
        &*peripherals.USART3
    }

    fn enable_peripheral_clock(peripherals: &Peripherals) {
        peripherals.RCC.apb1enr().modify(|_, w| w
            .usart3en().set_bit()
        );
    }
}


/// Lets `write!` target a UART; newlines are expanded to CR LF.
pub struct UartWriter<'p, U: Uart> {
    peripherals: &'p Peripherals,
    uart: PhantomData<U>,
}
impl<'p, U: Uart> UartWriter<'p, U> {
    pub fn new(peripherals: &'p Peripherals) -> Self {
        Self {
            peripherals,
            uart: PhantomData,
        }
    }
}
impl<'p, U: Uart> fmt::Write for UartWriter<'p, U> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for (i, line) in s.split('\n').enumerate() {
            if i > 0 {
                U::write(self.peripherals, b"\r\n");
            }
            U::write(self.peripherals, line.as_bytes());
        }
        Ok(())
    }
}


/// Sends log records to the debug console on USART3.
pub struct ConsoleLogger;
impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // log lines must not interleave with each other
        critical_section::with(|_cs| {
            // USART3 is set up before the logger is installed
            let peripherals = unsafe { Peripherals::steal() };
            let mut writer: UartWriter<Usart3> = UartWriter::new(&peripherals);
            let _ = fmt::Write::write_fmt(
                &mut writer,
                format_args!("[{}] {}: {}\n", record.level(), record.target(), record.args()),
            );
        });
    }

    fn flush(&self) {
    }
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Installs [`ConsoleLogger`]; USART3 must already be set up.
pub fn install_logger(level: LevelFilter) {
    // fails only if a logger is already installed, in which case that one stays
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
