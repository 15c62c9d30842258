#![no_main]
#![no_std]


mod display;
mod gpio_output;
mod i2c;
mod spi;
mod systick;
mod uart;


use core::fmt::Write;
use core::panic::PanicInfo;

use cortex_m_rt::entry;
use log::LevelFilter;
use pmp_drivers::{BusConfig, I2cAddress, Status};
use pmp_drivers::ina219::{self, AdcSetting, BusVoltage, Configuration, Ina219};
use pmp_drivers::mma8451q::{self, Mma8451q};
use pmp_drivers::ssd1331::{Color, Point, Rect, Ssd1331, WIDTH};
use stm32f7::stm32f745::Peripherals;
use stm32f7::stm32f745::spi1::cr1::BR;

use crate::display::PanelBus;
use crate::gpio_output::{GpioOutput, StatusLed};
use crate::i2c::{I2c, I2c2, I2cSpeed, PeripheralI2c};
use crate::spi::{Spi, Spi1};
use crate::uart::{Uart, UartWriter, Usart3};


pub const CLOCK_SPEED_HZ: u32 = 16_000_000;

const CONSOLE_BAUD_RATE: u32 = 115_200;
const SPI_TIMEOUT_MS: u32 = 10;
const REPORT_INTERVAL_MS: u32 = 1000;

const I2C_CONFIG: BusConfig = BusConfig {
    baud_rate_kbps: 100,
    timeout_ms: 5,
};

// 0.1 Ω shunt, 100 µA per current LSB: 0.04096 / (100 µA * 0.1 Ω)
const INA219_CALIBRATION: u16 = 4096;

const MMA8451Q_F_SETUP_FIFO_OFF: u8 = 0x00;
const MMA8451Q_CTRL_REG1_ACTIVE: u8 = 0x01;

// full scale of the bus voltage bar
const BAR_FULL_SCALE_MV: u32 = 16_000;

const INA219_ADDRESS: I2cAddress = I2cAddress::new(ina219::DEFAULT_I2C_ADDRESS).unwrap();
const MMA8451Q_ADDRESS: I2cAddress = I2cAddress::new(mma8451q::DEFAULT_I2C_ADDRESS).unwrap();

const STATUS_BAR: Rect = Rect::new(0, 0, WIDTH - 1, 7).unwrap();
const VOLTAGE_BAR_ROW: u8 = 20;


#[panic_handler]
fn handle_panic(_info: &PanicInfo) -> ! {
    loop {
    }
}


/// Reconfigures the clocks of the microcontroller.
///
/// The board has a 16 MHz crystal, which we use directly for everything:
///
/// ```plain
/// ╭────────╮ ╒══════╕
/// │ HSE    ├─┤ HPRE ├───┬─────────┬─────────╴╴╴──┐ AHB (max. 216 MHz)
/// │ 16 MHz │ │   /1 ├┐  │         │              │
/// ╰────────╯ └──────┘│ ┌┴───────┐┌┴───────┐     ┌┴───────┐
///                    │ │ SYSCLK ││ GPIOA  │ ... │ GPIOD  │
///                    │ │ 16 MHz ││ 16 MHz │     │ 16 MHz │
///                    │ └────────┘└────────┘     └────────┘
///                    │╒═══════╕
///                    ├┤ PPRE1 ├──┬─────────┐ APB1 (max. 54 MHz)
///                    ││    /1 │  │         │
///                    │└───────┘ ┌┴───────┐┌┴───────┐
///                    │          │ USART3 ││ I2C2   │
///                    │          │ 16 MHz ││ 16 MHz │
///                    │          └────────┘└────────┘
///                    │╒═══════╕
///                    └┤ PPRE2 ├──┐ APB2 (max. 108 MHz)
///                     │    /1 │  │
///                     └───────┘ ┌┴───────┐
///                               │ SPI1   │
///                               │ 16 MHz │
///                               └────────┘
/// ```
///
/// The debug console runs at 115 200 b/s: USARTDIV = 16 000 000 / 115 200 = 138.8..., round to 139.
///
/// The I2C timing values for 16 MHz come from the reference manual (see [`crate::i2c`]).
///
/// The SSD1331 accepts a serial clock of up to 6.6 MHz, so SPI1 gets /4 (4 MHz).
fn setup_clocks(peripherals: &mut Peripherals) {
    // HSEBYP=0: crystal between OSCIN and OSCOUT
    peripherals.RCC.cr().modify(|_, w| w
        .hsebyp().clear_bit()
    );

    // turn on HSE
    peripherals.RCC.cr().modify(|_, w| w
        .hseon().set_bit()
    );

    // wait for HSE to become ready
    while peripherals.RCC.cr().read().hserdy().is_not_ready() {
    }

    // 3.3V supply, 0 MHz < 16 MHz < 30 MHz => 0 wait states
    peripherals.FLASH.acr().modify(|_, w| w
        .latency().ws0()
    );

    // set prescalers to /1
    peripherals.RCC.cfgr().modify(|_, w| w
        .hpre().div1() // warning: max. 216 MHz
        .ppre2().div1() // warning: max. 108 MHz
        .ppre1().div1() // warning: max. 54 MHz
    );

    // switch clock input over to HSE
    peripherals.RCC.cfgr().modify(|_, w| w
        .sw().hse()
    );

    // wait until clock input switches over
    while !peripherals.RCC.cfgr().read().sws().is_hse() {
    }

    // feed the clock to the GPIO banks we use; the peripherals enable their own clocks
    peripherals.RCC.ahb1enr().modify(|_, w| w
        .gpioaen().enabled()
        .gpioben().enabled()
        .gpioden().enabled()
    );
}

fn setup_pins(peripherals: &mut Peripherals) {
    // choose alternate functions
    peripherals.GPIOA.afrl().modify(|_, w| w
        .afrl5().af5() // PA5 to SPI1 SCK
        .afrl7().af5() // PA7 to SPI1 COPI
    );
    peripherals.GPIOB.afrh().modify(|_, w| w
        .afrh10().af4() // PB10 to I2C2 SCL
        .afrh11().af4() // PB11 to I2C2 SDA
    );
    peripherals.GPIOD.afrh().modify(|_, w| w
        .afrh8().af7() // PD8 to USART3 Tx
    );

    // set push-pull on output ports except I2C
    peripherals.GPIOA.otyper().modify(|_, w| w
        .ot5().push_pull()
        .ot7().push_pull()
    );
    peripherals.GPIOB.otyper().modify(|_, w| w
        .ot10().open_drain()
        .ot11().open_drain()
    );
    peripherals.GPIOD.otyper().modify(|_, w| w
        .ot8().push_pull()
    );

    // the breakout board has no I2C pull-ups
    peripherals.GPIOB.pupdr().modify(|_, w| w
        .pupdr10().pull_up()
        .pupdr11().pull_up()
    );

    // set port modes; the display control lines are set up by the panel bus
    peripherals.GPIOA.moder().modify(|_, w| w
        .moder5().alternate() // SPI1
        .moder7().alternate() // SPI1
    );
    peripherals.GPIOB.moder().modify(|_, w| w
        .moder10().alternate() // I2C2
        .moder11().alternate() // I2C2
    );
    peripherals.GPIOD.moder().modify(|_, w| w
        .moder8().alternate() // USART3
    );

    // set SPI and I2C ports to fast
    peripherals.GPIOA.ospeedr().modify(|_, w| w
        .ospeedr5().high_speed()
        .ospeedr7().high_speed()
    );
    peripherals.GPIOB.ospeedr().modify(|_, w| w
        .ospeedr10().high_speed()
        .ospeedr11().high_speed()
    );
}


const fn divide_u32_to_u16_round(dividend: u32, divisor: u32) -> u16 {
    let quotient = (dividend + (divisor / 2)) / divisor;
    assert!(quotient <= (u16::MAX as u32));
    quotient as u16
}


/// Length in pixels of the bus voltage bar.
fn voltage_bar_length(bus_voltage: BusVoltage) -> u8 {
    let millivolts = u32::from(bus_voltage.millivolts).min(BAR_FULL_SCALE_MV);
    let length = millivolts * u32::from(WIDTH - 1) / BAR_FULL_SCALE_MV;
    length as u8
}


type BoardIna219<'p> = Ina219<PeripheralI2c<'p, I2c2>>;
type BoardMma8451q<'p> = Mma8451q<PeripheralI2c<'p, I2c2>>;
type BoardDisplay<'p> = Ssd1331<PanelBus<'p, Spi1>>;


fn set_up_ina219(peripherals: &Peripherals) -> BoardIna219<'_> {
    let mut ina = Ina219::init(PeripheralI2c::new(peripherals), I2C_CONFIG, INA219_ADDRESS);

    let configuration = Configuration::default()
        .with_bus_adc(AdcSetting::Samples16)
        .with_shunt_adc(AdcSetting::Samples16);
    let status = Status::from(&ina.write_configuration(configuration));
    if !status.is_ok() {
        log::warn!("INA219 configuration write failed: {:?}", status);
    }
    let status = Status::from(&ina.configure(INA219_CALIBRATION));
    if !status.is_ok() {
        log::warn!("INA219 calibration write failed: {:?}", status);
    }

    ina
}

fn set_up_mma8451q(peripherals: &Peripherals) -> Option<BoardMma8451q<'_>> {
    let mut mma = Mma8451q::init(PeripheralI2c::new(peripherals), I2C_CONFIG, MMA8451Q_ADDRESS);

    match mma.read_device_id() {
        Ok(mma8451q::DEVICE_ID) => {},
        Ok(other) => {
            log::info!("no MMA8451Q fitted (WHO_AM_I is 0x{:02x})", other);
            return None;
        },
        Err(e) => {
            log::info!("no MMA8451Q fitted ({})", e);
            return None;
        },
    }

    match mma.configure_sensor(MMA8451Q_F_SETUP_FIFO_OFF, MMA8451Q_CTRL_REG1_ACTIVE) {
        Ok(()) => Some(mma),
        Err(e) => {
            log::warn!("MMA8451Q configuration failed: {}", e);
            None
        },
    }
}

fn draw_status(display: &mut BoardDisplay<'_>, healthy: bool, bus_voltage: Option<BusVoltage>) {
    let color = if healthy { Color::GREEN } else { Color::RED };
    if let Err(e) = display.fill_rect(STATUS_BAR, color, color) {
        log::debug!("status bar not drawn: {:?}", e);
        return;
    }

    let row = Point::new(0, VOLTAGE_BAR_ROW);
    let full = Point::new(WIDTH - 1, VOLTAGE_BAR_ROW);
    let result = display.draw_line(row, full, Color::BLACK)
        .and_then(|()| match bus_voltage {
            Some(bv) => display.draw_line(row, Point::new(voltage_bar_length(bv), VOLTAGE_BAR_ROW), Color::WHITE),
            None => Ok(()),
        });
    if let Err(e) = result {
        log::debug!("voltage bar not drawn: {:?}", e);
    }
}


#[entry]
fn main() -> ! {
    let mut peripherals = unsafe { Peripherals::steal() };
    let core_peripherals = unsafe { cortex_m::Peripherals::steal() };

    setup_clocks(&mut peripherals);
    setup_pins(&mut peripherals);
    systick::set_up(&core_peripherals);

    // set up peripherals:
    // * USART3 (debug console and log output)
    // * I2C2 (INA219, MMA8451Q)
    // * SPI1 (SSD1331)
    Usart3::set_up(
        &peripherals,
        divide_u32_to_u16_round(CLOCK_SPEED_HZ, CONSOLE_BAUD_RATE),
    );
    uart::install_logger(LevelFilter::Info);

    I2c2::set_up_as_controller(&peripherals, I2cSpeed::from_kbps(I2C_CONFIG.baud_rate_kbps));

    // 16 MHz / 4 stays below the 6.6 MHz the SSD1331 accepts
    Spi1::set_up_as_controller(&peripherals, BR::Div4);

    StatusLed::set_up(&peripherals);
    StatusLed::set_high(&peripherals);

    let mut ina = set_up_ina219(&peripherals);
    let mut mma = set_up_mma8451q(&peripherals);

    let mut display = Ssd1331::new(PanelBus::<Spi1>::new(&peripherals, SPI_TIMEOUT_MS));
    if let Err(e) = display.init() {
        log::warn!("display initialization failed: {:?}", e);
    }

    StatusLed::set_low(&peripherals);
    log::info!("power monitor panel up");

    let mut console: UartWriter<Usart3> = UartWriter::new(&peripherals);
    let mut led_on = false;
    loop {
        let _ = write!(console, "INA219:");
        let _ = ina.print_sensor_data(&mut console, false);
        if let Some(mma) = mma.as_mut() {
            let _ = write!(console, " MMA8451Q:");
            let _ = mma.print_sensor_data(&mut console, false);
        }
        let _ = writeln!(console);

        let bus_voltage_reading = ina.read_bus_voltage_raw();
        let healthy = Status::from(&bus_voltage_reading).is_ok();
        let bus_voltage = bus_voltage_reading.ok().map(BusVoltage::from);
        if let Some(bv) = bus_voltage {
            if bv.overflow {
                log::warn!("INA219 math overflow at {} mV", bv.millivolts);
            }
        }
        if let Ok(raw) = ina.read_shunt_voltage_raw() {
            log::debug!("shunt voltage {} µV", ina219::shunt_voltage_microvolts(raw));
        }
        draw_status(&mut display, healthy, bus_voltage);

        led_on = !led_on;
        StatusLed::set_level(&peripherals, led_on);

        systick::delay_ms(REPORT_INTERVAL_MS);
    }
}
