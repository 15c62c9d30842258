//! NXP MMA8451Q three-axis accelerometer.
//!
//! Registers are 8 bits wide. Each axis is a 14-bit left-justified sample spread over an MSB and
//! an LSB register.


use core::fmt;

use crate::device::{RegisterMap, SignalType};
use crate::i2c::I2cBus;
use crate::register::RegisterDevice;
use crate::status::{Error, write_reading};


pub const REG_STATUS: u8 = 0x00;
pub const REG_OUT_X_MSB: u8 = 0x01;
pub const REG_OUT_X_LSB: u8 = 0x02;
pub const REG_OUT_Y_MSB: u8 = 0x03;
pub const REG_OUT_Y_LSB: u8 = 0x04;
pub const REG_OUT_Z_MSB: u8 = 0x05;
pub const REG_OUT_Z_LSB: u8 = 0x06;
pub const REG_F_SETUP: u8 = 0x09;
pub const REG_WHO_AM_I: u8 = 0x0D;
pub const REG_XYZ_DATA_CFG: u8 = 0x0E;
pub const REG_CTRL_REG1: u8 = 0x2A;

/// Value of WHO_AM_I.
pub const DEVICE_ID: u8 = 0x1A;

/// Address with SA0 pulled high.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x1D;


pub struct Mma8451qRegisters;
impl RegisterMap for Mma8451qRegisters {
    const NAME: &'static str = "MMA8451Q";
    const SIGNAL_TYPES: SignalType = SignalType::ACCELERATION_X
        .union(SignalType::ACCELERATION_Y)
        .union(SignalType::ACCELERATION_Z);
    const WRITABLE_REGISTERS: &'static [u8] = &[
        0x09, 0x0A, 0x0E, 0x0F,
        0x11, 0x12, 0x13, 0x14, 0x15, 0x17, 0x18, 0x1D,
        0x1F, 0x20, 0x21, 0x23, 0x24, 0x25, 0x26, 0x27,
        0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F,
        0x30, 0x31,
    ];
    const READABLE_REGISTERS: &'static [u8] = &[
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
        0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
        0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17,
        0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F,
        0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27,
        0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F,
        0x30, 0x31,
    ];
    const CONFIGURATION_REGISTER: u8 = REG_CTRL_REG1;
    type Payload = u8;
}

pub type Mma8451q<B> = RegisterDevice<B, Mma8451qRegisters>;


#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Axis {
    X,
    Y,
    Z,
}
impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub const fn msb_register(&self) -> u8 {
        match self {
            Self::X => REG_OUT_X_MSB,
            Self::Y => REG_OUT_Y_MSB,
            Self::Z => REG_OUT_Z_MSB,
        }
    }

    pub const fn signal_type(&self) -> SignalType {
        match self {
            Self::X => SignalType::ACCELERATION_X,
            Self::Y => SignalType::ACCELERATION_Y,
            Self::Z => SignalType::ACCELERATION_Z,
        }
    }
}


/// Turns the MSB/LSB register pair of one axis into a signed 14-bit sample.
pub const fn decode_axis(msb: u8, lsb: u8) -> i16 {
    let unsigned = ((msb as u16) << 6) | ((lsb as u16) >> 2);

    // sign-extend from 14 bits
    ((unsigned ^ (1 << 13)) as i16) - (1 << 13)
}


impl<B: I2cBus> RegisterDevice<B, Mma8451qRegisters> {
    /// Writes F_SETUP, then CTRL_REG1.
    ///
    /// Stops at the first failure.
    pub fn configure_sensor(&mut self, f_setup: u8, ctrl_reg1: u8) -> Result<(), Error> {
        self.write_register(REG_F_SETUP, f_setup)?;
        self.write_register(REG_CTRL_REG1, ctrl_reg1)
    }

    pub fn read_device_id(&mut self) -> Result<u8, Error> {
        let bytes = self.read_register(REG_WHO_AM_I, 1)?;
        Ok(bytes[0])
    }

    pub fn read_axis(&mut self, axis: Axis) -> Result<i16, Error> {
        let bytes = self.read_register(axis.msb_register(), 2)?;
        Ok(decode_axis(bytes[0], bytes[1]))
    }

    /// Writes the X, Y and Z samples to `out`; failed axes are written as ` ----,`.
    pub fn print_sensor_data<W: fmt::Write>(&mut self, out: &mut W, hex_mode: bool) -> fmt::Result {
        for axis in Axis::ALL {
            let reading = self.read_axis(axis);
            write_reading(out, reading, hex_mode)?;
        }
        Ok(())
    }
}
