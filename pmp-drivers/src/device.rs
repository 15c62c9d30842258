//! Per-device state and the static description of a device's register map.


use bitflags::bitflags;

use crate::i2c::I2cAddress;


/// Capacity of the receive buffer of each device.
pub const I2C_BUFFER_SIZE: usize = 8;


bitflags! {
    /// The kinds of readings a device can deliver.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
    pub struct SignalType : u16 {
        const CONFIGURATION = 0b0000_0000_0000_0001;
        const SHUNT_VOLTAGE = 0b0000_0000_0000_0010;
        const BUS_VOLTAGE = 0b0000_0000_0000_0100;
        const POWER = 0b0000_0000_0000_1000;
        const CURRENT = 0b0000_0000_0001_0000;
        const CALIBRATION = 0b0000_0000_0010_0000;
        const ACCELERATION_X = 0b0000_0000_0100_0000;
        const ACCELERATION_Y = 0b0000_0000_1000_0000;
        const ACCELERATION_Z = 0b0000_0001_0000_0000;
    }
}


/// State of one physical device on the I2C bus.
///
/// The address and the signal type are fixed at construction. The receive buffer is only ever
/// written by [`RegisterDevice`](crate::register::RegisterDevice) while reading a register.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DeviceState {
    i2c_address: I2cAddress,
    signal_type: SignalType,
    receive_buffer: [u8; I2C_BUFFER_SIZE],
}
impl DeviceState {
    pub const fn new(i2c_address: I2cAddress, signal_type: SignalType) -> Self {
        Self {
            i2c_address,
            signal_type,
            receive_buffer: [0u8; I2C_BUFFER_SIZE],
        }
    }

    pub const fn i2c_address(&self) -> I2cAddress { self.i2c_address }
    pub const fn signal_type(&self) -> SignalType { self.signal_type }

    /// The whole receive buffer, starting at index 0.
    pub const fn receive_buffer(&self) -> &[u8; I2C_BUFFER_SIZE] { &self.receive_buffer }

    pub(crate) fn receive_buffer_mut(&mut self) -> &mut [u8; I2C_BUFFER_SIZE] {
        &mut self.receive_buffer
    }
}


/// A register payload as it goes onto the wire.
pub trait RegisterPayload: Copy {
    /// Writes the payload most significant byte first into `out` and returns the number of bytes
    /// used.
    fn encode(self, out: &mut [u8; 2]) -> usize;
}
impl RegisterPayload for u8 {
    fn encode(self, out: &mut [u8; 2]) -> usize {
        out[0] = self;
        1
    }
}
impl RegisterPayload for u16 {
    fn encode(self, out: &mut [u8; 2]) -> usize {
        out[0] = ((self >> 8) & 0xFF) as u8;
        out[1] = ((self >> 0) & 0xFF) as u8;
        2
    }
}


/// Static description of a device type.
pub trait RegisterMap {
    const NAME: &'static str;
    const SIGNAL_TYPES: SignalType;

    /// Registers that may be written.
    const WRITABLE_REGISTERS: &'static [u8];

    /// Registers that may be read.
    const READABLE_REGISTERS: &'static [u8];

    /// The register written by [`RegisterDevice::configure`](crate::register::RegisterDevice::configure).
    const CONFIGURATION_REGISTER: u8;

    type Payload: RegisterPayload;

    fn is_writable(register: u8) -> bool {
        Self::WRITABLE_REGISTERS.contains(&register)
    }

    fn is_readable(register: u8) -> bool {
        Self::READABLE_REGISTERS.contains(&register)
    }
}


#[cfg(test)]
mod tests {
    use super::{DeviceState, RegisterPayload, SignalType};
    use crate::i2c::I2cAddress;

    #[test]
    fn test_payload_encoding() {
        let mut buf = [0u8; 2];
        assert_eq!(0x1234u16.encode(&mut buf), 2);
        assert_eq!(buf, [0x12, 0x34]);

        assert_eq!(0x00FFu16.encode(&mut buf), 2);
        assert_eq!(buf, [0x00, 0xFF]);

        assert_eq!(0xFF00u16.encode(&mut buf), 2);
        assert_eq!(buf, [0xFF, 0x00]);

        let mut buf = [0u8; 2];
        assert_eq!(0xA5u8.encode(&mut buf), 1);
        assert_eq!(buf[0], 0xA5);
    }

    #[test]
    fn test_new_state() {
        let address = I2cAddress::new(0x40).unwrap();
        let state = DeviceState::new(address, SignalType::CURRENT | SignalType::POWER);
        assert_eq!(state.i2c_address(), address);
        assert!(state.signal_type().contains(SignalType::CURRENT));
        assert!(!state.signal_type().contains(SignalType::ACCELERATION_X));
        assert!(state.receive_buffer().iter().all(|b| *b == 0));
    }
}
