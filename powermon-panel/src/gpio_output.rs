use stm32f7::stm32f745::Peripherals;


macro_rules! make_gpio_output {
    (
        $name:ident,
        $pin_bank:ident,
        $pin:expr $(,)?
    ) => {
        pub struct $name;
        impl GpioOutput for $name {
            fn set_up(peripherals: &Peripherals) {
                // feed the bank
                peripherals.RCC.ahb1enr().modify(|_, w|
                    make_gpio_output!(@clock_field, $pin_bank, w).enabled()
                );

                // general-purpose output mode
                make_gpio_output!(@gpio_peripheral, $pin_bank, peripherals).moder().modify(|_, w| w
                    .moder($pin).output()
                );

                // drive both levels
                make_gpio_output!(@gpio_peripheral, $pin_bank, peripherals).otyper().modify(|_, w| w
                    .ot($pin).push_pull()
                );

                // the display lines toggle at SPI speed
                make_gpio_output!(@gpio_peripheral, $pin_bank, peripherals).ospeedr().modify(|_, w| w
                    .ospeedr($pin).high_speed()
                );
            }

            fn set_high(peripherals: &Peripherals) {
                make_gpio_output!(@gpio_peripheral, $pin_bank, peripherals).odr().modify(|_, w| w
                    .odr($pin).high()
                );
            }

            fn set_low(peripherals: &Peripherals) {
                make_gpio_output!(@gpio_peripheral, $pin_bank, peripherals).odr().modify(|_, w| w
                    .odr($pin).low()
                );
            }
        }
    };
    (@clock_field, A, $register:expr) => {$register.gpioaen()};
    (@clock_field, B, $register:expr) => {$register.gpioben()};
    (@gpio_peripheral, A, $peripherals:expr) => {$peripherals.GPIOA};
    (@gpio_peripheral, B, $peripherals:expr) => {$peripherals.GPIOB};
}


pub trait GpioOutput {
    fn set_up(peripherals: &Peripherals);
    fn set_high(peripherals: &Peripherals);
    fn set_low(peripherals: &Peripherals);

    fn set_level(peripherals: &Peripherals, high: bool) {
        if high {
            Self::set_high(peripherals)
        } else {
            Self::set_low(peripherals)
        }
    }
}


make_gpio_output!(StatusLed, A, 8);
make_gpio_output!(DisplayNotChipSelect, B, 13);
make_gpio_output!(DisplayDataNotCommand, A, 12);
make_gpio_output!(DisplayNotReset, B, 0);
