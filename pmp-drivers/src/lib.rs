//! Register-level drivers for the power monitor panel.
//!
//! Everything in here is independent of the microcontroller; the firmware crate provides the bus
//! implementations ([`i2c::I2cBus`], [`ssd1331::DisplayBus`]) on top of the actual peripherals.
#![cfg_attr(not(test), no_std)]


pub mod device;
pub mod i2c;
pub mod ina219;
pub mod mma8451q;
pub mod register;
pub mod ssd1331;
pub mod status;

#[cfg(test)]
pub(crate) mod mock;


pub use crate::device::{DeviceState, I2C_BUFFER_SIZE, RegisterMap, RegisterPayload, SignalType};
pub use crate::i2c::{BusConfig, BusError, I2cAddress, I2cBus};
pub use crate::register::RegisterDevice;
pub use crate::status::{Error, Status};
