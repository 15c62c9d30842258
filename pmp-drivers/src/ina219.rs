//! Texas Instruments INA219 current/power monitor.
//!
//! All registers are 16 bits wide and travel big-endian. Only the configuration and calibration
//! registers are writable.


use core::fmt;

use crate::device::{RegisterMap, SignalType};
use crate::i2c::I2cBus;
use crate::register::RegisterDevice;
use crate::status::{Error, write_reading};


pub const REG_CONFIGURATION: u8 = 0x00;
pub const REG_SHUNT_VOLTAGE: u8 = 0x01;
pub const REG_BUS_VOLTAGE: u8 = 0x02;
pub const REG_POWER: u8 = 0x03;
pub const REG_CURRENT: u8 = 0x04;
pub const REG_CALIBRATION: u8 = 0x05;

/// Address with A0 and A1 both tied to ground.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x40;


pub struct Ina219Registers;
impl RegisterMap for Ina219Registers {
    const NAME: &'static str = "INA219";
    const SIGNAL_TYPES: SignalType = SignalType::CONFIGURATION
        .union(SignalType::SHUNT_VOLTAGE)
        .union(SignalType::BUS_VOLTAGE)
        .union(SignalType::POWER)
        .union(SignalType::CURRENT)
        .union(SignalType::CALIBRATION);
    const WRITABLE_REGISTERS: &'static [u8] = &[REG_CONFIGURATION, REG_CALIBRATION];
    const READABLE_REGISTERS: &'static [u8] = &[
        REG_CONFIGURATION, REG_SHUNT_VOLTAGE, REG_BUS_VOLTAGE,
        REG_POWER, REG_CURRENT, REG_CALIBRATION,
    ];
    const CONFIGURATION_REGISTER: u8 = REG_CALIBRATION;
    type Payload = u16;
}

pub type Ina219<B> = RegisterDevice<B, Ina219Registers>;


#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u16)]
pub enum BusVoltageRange {
    Volts16 = 0b0,
    Volts32 = 0b1,
}

/// Shunt voltage full-scale range, selected through the PGA divider.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u16)]
pub enum ShuntGain {
    Millivolts40 = 0b00,
    Millivolts80 = 0b01,
    Millivolts160 = 0b10,
    Millivolts320 = 0b11,
}

/// Resolution or averaging of one ADC.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u16)]
pub enum AdcSetting {
    Bits9 = 0b0000,
    Bits10 = 0b0001,
    Bits11 = 0b0010,
    Bits12 = 0b0011,
    Samples2 = 0b1001,
    Samples4 = 0b1010,
    Samples8 = 0b1011,
    Samples16 = 0b1100,
    Samples32 = 0b1101,
    Samples64 = 0b1110,
    Samples128 = 0b1111,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u16)]
pub enum OperatingMode {
    PowerDown = 0b000,
    ShuntTriggered = 0b001,
    BusTriggered = 0b010,
    ShuntAndBusTriggered = 0b011,
    AdcOff = 0b100,
    ShuntContinuous = 0b101,
    BusContinuous = 0b110,
    ShuntAndBusContinuous = 0b111,
}


/// Value of the configuration register.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Configuration(u16);
impl Configuration {
    pub const fn new() -> Self {
        Self(0x0000)
    }

    /// Setting only the reset bit resets all registers to their power-on values.
    pub const fn reset() -> Self {
        Self(0x8000)
    }

    pub const fn with_bus_voltage_range(self, range: BusVoltageRange) -> Self {
        Self((self.0 & !(0b1 << 13)) | ((range as u16) << 13))
    }

    pub const fn with_shunt_gain(self, gain: ShuntGain) -> Self {
        Self((self.0 & !(0b11 << 11)) | ((gain as u16) << 11))
    }

    pub const fn with_bus_adc(self, setting: AdcSetting) -> Self {
        Self((self.0 & !(0b1111 << 7)) | ((setting as u16) << 7))
    }

    pub const fn with_shunt_adc(self, setting: AdcSetting) -> Self {
        Self((self.0 & !(0b1111 << 3)) | ((setting as u16) << 3))
    }

    pub const fn with_mode(self, mode: OperatingMode) -> Self {
        Self((self.0 & !0b111) | (mode as u16))
    }

    pub const fn as_u16(&self) -> u16 { self.0 }
}
impl Default for Configuration {
    /// The power-on value.
    fn default() -> Self {
        Self(0x399F)
    }
}
impl From<u16> for Configuration {
    fn from(value: u16) -> Self { Self(value) }
}
impl From<Configuration> for u16 {
    fn from(value: Configuration) -> Self { value.0 }
}


/// Converts the shunt voltage register into microvolts (10 µV per LSB, two's complement).
pub const fn shunt_voltage_microvolts(raw: u16) -> i32 {
    (raw as i16 as i32) * 10
}


/// Decoded bus voltage register.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BusVoltage {
    pub millivolts: u16,

    /// A conversion has completed since the power or current register was last read.
    pub conversion_ready: bool,

    /// Power or current calculations are out of range.
    pub overflow: bool,
}
impl From<u16> for BusVoltage {
    fn from(raw: u16) -> Self {
        // 13-bit value in bits 15..3, 4 mV per LSB
        Self {
            millivolts: (raw >> 3) * 4,
            conversion_ready: raw & (1 << 1) != 0,
            overflow: raw & (1 << 0) != 0,
        }
    }
}


impl<B: I2cBus> RegisterDevice<B, Ina219Registers> {
    pub fn write_configuration(&mut self, configuration: Configuration) -> Result<(), Error> {
        self.write_register(REG_CONFIGURATION, configuration.as_u16())
    }

    pub fn read_shunt_voltage_raw(&mut self) -> Result<u16, Error> {
        self.read_register_u16(REG_SHUNT_VOLTAGE)
    }

    pub fn read_bus_voltage_raw(&mut self) -> Result<u16, Error> {
        self.read_register_u16(REG_BUS_VOLTAGE)
    }

    pub fn read_power_raw(&mut self) -> Result<u16, Error> {
        self.read_register_u16(REG_POWER)
    }

    pub fn read_current_raw(&mut self) -> Result<u16, Error> {
        self.read_register_u16(REG_CURRENT)
    }

    /// Writes shunt voltage, bus voltage, power and current to `out`, one field per reading.
    ///
    /// Failed readings are written as ` ----,`.
    pub fn print_sensor_data<W: fmt::Write>(&mut self, out: &mut W, hex_mode: bool) -> fmt::Result {
        for register in [REG_SHUNT_VOLTAGE, REG_BUS_VOLTAGE, REG_POWER, REG_CURRENT] {
            let reading = self.read_register_u16(register);
            write_reading(out, reading, hex_mode)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::{BusConfig, BusError, I2cAddress};
    use crate::mock::{MockBus, Transaction};

    fn new_ina219() -> Ina219<MockBus> {
        Ina219::init(
            MockBus::new(),
            BusConfig::default(),
            I2cAddress::new(DEFAULT_I2C_ADDRESS).unwrap(),
        )
    }

    #[test]
    fn test_signal_types() {
        let ina = new_ina219();
        let signal_type = ina.state().signal_type();
        assert!(signal_type.contains(SignalType::SHUNT_VOLTAGE | SignalType::BUS_VOLTAGE));
        assert!(signal_type.contains(SignalType::POWER | SignalType::CURRENT));
        assert!(signal_type.contains(SignalType::CONFIGURATION | SignalType::CALIBRATION));
        assert!(!signal_type.intersects(
            SignalType::ACCELERATION_X | SignalType::ACCELERATION_Y | SignalType::ACCELERATION_Z
        ));
    }

    #[test]
    fn test_whitelists() {
        let mut ina = new_ina219();
        assert_eq!(ina.write_register(REG_CURRENT, 0x0001), Err(Error::BadDeviceCommand));
        assert_eq!(ina.write_register(REG_SHUNT_VOLTAGE, 0x0001), Err(Error::BadDeviceCommand));
        assert_eq!(ina.read_register(0x06, 2), Err(Error::BadDeviceCommand));
        assert_eq!(ina.bus().transaction_count(), 0);
    }

    #[test]
    fn test_configure_writes_calibration() {
        let mut ina = new_ina219();
        assert_eq!(ina.configure(0x1234), Ok(()));
        ina.bus_mut().respond(&[0x00, 0x64]);
        assert_eq!(ina.read_current_raw(), Ok(100));

        assert_eq!(ina.bus().transactions, vec![
            Transaction::Send { address: 0x40, command: vec![REG_CALIBRATION], payload: vec![0x12, 0x34] },
            Transaction::Receive { address: 0x40, command: vec![REG_CURRENT], length: 2 },
        ]);
    }

    #[test]
    fn test_configuration_builder() {
        assert_eq!(Configuration::default().as_u16(), 0x399F);

        let rebuilt = Configuration::new()
            .with_bus_voltage_range(BusVoltageRange::Volts32)
            .with_shunt_gain(ShuntGain::Millivolts320)
            .with_bus_adc(AdcSetting::Bits12)
            .with_shunt_adc(AdcSetting::Bits12)
            .with_mode(OperatingMode::ShuntAndBusContinuous);
        assert_eq!(rebuilt, Configuration::default());

        let averaged = Configuration::default()
            .with_bus_voltage_range(BusVoltageRange::Volts16)
            .with_shunt_adc(AdcSetting::Samples128)
            .with_mode(OperatingMode::ShuntContinuous);
        assert_eq!(averaged.as_u16(), 0x19FD);

        let mut ina = new_ina219();
        assert_eq!(ina.write_configuration(Configuration::reset()), Ok(()));
        assert_eq!(ina.bus().transactions, vec![
            Transaction::Send { address: 0x40, command: vec![REG_CONFIGURATION], payload: vec![0x80, 0x00] },
        ]);
    }

    #[test]
    fn test_decoding() {
        assert_eq!(shunt_voltage_microvolts(0x0000), 0);
        assert_eq!(shunt_voltage_microvolts(0x0064), 1000);
        assert_eq!(shunt_voltage_microvolts(0xFF9C), -1000);
        assert_eq!(shunt_voltage_microvolts(0x7D00), 320_000);

        // 12 V with conversion ready
        let bus = BusVoltage::from((3000 << 3) | 0b10);
        assert_eq!(bus.millivolts, 12_000);
        assert!(bus.conversion_ready);
        assert!(!bus.overflow);

        let overflowed = BusVoltage::from(0x0001);
        assert_eq!(overflowed.millivolts, 0);
        assert!(overflowed.overflow);
    }

    #[test]
    fn test_print_sensor_data() {
        let mut ina = new_ina219();
        ina.bus_mut()
            .respond(&[0x00, 0x64])
            .respond(&[0x5D, 0xC2])
            .fail_receive(BusError::Nack)
            .respond(&[0x01, 0x00]);

        let mut out = String::new();
        ina.print_sensor_data(&mut out, false).unwrap();
        assert_eq!(out, " 100, 24002, ----, 256,");
        assert_eq!(ina.bus().transaction_count(), 4);

        ina.bus_mut()
            .respond(&[0x00, 0x64])
            .respond(&[0x5D, 0xC2])
            .respond(&[0x00, 0x00])
            .fail_receive(BusError::Timeout);
        let mut out = String::new();
        ina.print_sensor_data(&mut out, true).unwrap();
        assert_eq!(out, " 0x0064, 0x5dc2, 0x0000, ----,");
    }
}
