//! Whitelisted register access on top of an [`I2cBus`].
//!
//! Every operation is a single blocking transaction. A register that is not on the device's
//! whitelist is rejected before the bus is touched; any failure on the bus is reported as
//! [`Error::DeviceCommunicationFailed`] without retrying.


use core::marker::PhantomData;

use log::{debug, trace};

use crate::device::{DeviceState, I2C_BUFFER_SIZE, RegisterMap, RegisterPayload};
use crate::i2c::{BusConfig, I2cAddress, I2cBus};
use crate::status::Error;


/// Combines two bytes as they arrived on the wire into a 16-bit register value.
///
/// The first byte received is the high byte.
pub const fn combine_u16(first: u8, second: u8) -> u16 {
    ((first as u16) << 8) | (second as u16)
}


/// A device of type `M` reachable through the bus `B`.
pub struct RegisterDevice<B, M> {
    bus: B,
    config: BusConfig,
    state: DeviceState,
    map: PhantomData<M>,
}
impl<B: I2cBus, M: RegisterMap> RegisterDevice<B, M> {
    /// Sets up the device state for the device at `i2c_address`.
    ///
    /// Does not talk to the device.
    pub fn init(bus: B, config: BusConfig, i2c_address: I2cAddress) -> Self {
        Self {
            bus,
            config,
            state: DeviceState::new(i2c_address, M::SIGNAL_TYPES),
            map: PhantomData,
        }
    }

    /// Re-applies the initial assignment of address and signal type.
    pub fn reinit(&mut self, i2c_address: I2cAddress) {
        self.state = DeviceState::new(i2c_address, M::SIGNAL_TYPES);
    }

    pub fn state(&self) -> &DeviceState { &self.state }
    pub fn config(&self) -> &BusConfig { &self.config }
    pub fn bus(&self) -> &B { &self.bus }
    pub fn bus_mut(&mut self) -> &mut B { &mut self.bus }

    pub fn into_bus(self) -> B { self.bus }

    /// Writes `payload` to `register`, most significant byte first.
    pub fn write_register(&mut self, register: u8, payload: M::Payload) -> Result<(), Error> {
        if !M::is_writable(register) {
            debug!("{}: register 0x{:02x} is not writable", M::NAME, register);
            return Err(Error::BadDeviceCommand);
        }

        let command = [register];
        let mut payload_bytes = [0u8; 2];
        let payload_length = payload.encode(&mut payload_bytes);

        trace!(
            "{}@0x{:02x}: write 0x{:02x} <- {:02x?}",
            M::NAME, self.state.i2c_address().as_u8(), register, &payload_bytes[..payload_length],
        );
        self.bus
            .send(
                self.state.i2c_address(),
                &self.config,
                &command,
                &payload_bytes[..payload_length],
            )
            .map_err(|e| {
                debug!("{}: write to register 0x{:02x} failed: {:?}", M::NAME, register, e);
                Error::DeviceCommunicationFailed
            })
    }

    /// Reads `byte_count` bytes starting at `register` into the receive buffer.
    ///
    /// On success, returns the bytes just received (the start of the receive buffer). On a bus
    /// failure, the first `byte_count` bytes of the receive buffer are zeroed; the rest of the
    /// buffer is left alone.
    pub fn read_register(&mut self, register: u8, byte_count: usize) -> Result<&[u8], Error> {
        if !M::is_readable(register) {
            debug!("{}: register 0x{:02x} is not readable", M::NAME, register);
            return Err(Error::BadDeviceCommand);
        }
        if byte_count == 0 || byte_count > I2C_BUFFER_SIZE {
            debug!("{}: cannot read {} bytes", M::NAME, byte_count);
            return Err(Error::BadDeviceCommand);
        }

        let command = [register];
        let address = self.state.i2c_address();
        let buffer = &mut self.state.receive_buffer_mut()[..byte_count];
        match self.bus.receive(address, &self.config, &command, buffer) {
            Ok(()) => {
                trace!(
                    "{}@0x{:02x}: read 0x{:02x} -> {:02x?}",
                    M::NAME, address.as_u8(), register, buffer,
                );
                Ok(&self.state.receive_buffer()[..byte_count])
            },
            Err(e) => {
                buffer.fill(0);
                debug!("{}: read from register 0x{:02x} failed: {:?}", M::NAME, register, e);
                Err(Error::DeviceCommunicationFailed)
            },
        }
    }

    /// Reads a 16-bit register; the first byte on the wire is the high byte.
    pub fn read_register_u16(&mut self, register: u8) -> Result<u16, Error> {
        let bytes = self.read_register(register, 2)?;
        Ok(combine_u16(bytes[0], bytes[1]))
    }

    /// Writes `payload` to the device's configuration register.
    pub fn configure(&mut self, payload: M::Payload) -> Result<(), Error> {
        self.write_register(M::CONFIGURATION_REGISTER, payload)
    }
}


#[cfg(test)]
mod tests {
    use super::{combine_u16, RegisterDevice};
    use crate::device::{I2C_BUFFER_SIZE, RegisterMap, SignalType};
    use crate::i2c::{BusConfig, BusError, I2cAddress};
    use crate::mock::{MockBus, Transaction};
    use crate::status::Error;

    struct TestMap;
    impl RegisterMap for TestMap {
        const NAME: &'static str = "test";
        const SIGNAL_TYPES: SignalType = SignalType::CONFIGURATION.union(SignalType::CURRENT);
        const WRITABLE_REGISTERS: &'static [u8] = &[0x00, 0x05];
        const READABLE_REGISTERS: &'static [u8] = &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05];
        const CONFIGURATION_REGISTER: u8 = 0x05;
        type Payload = u16;
    }

    const ADDRESS: u8 = 0x40;

    fn new_device() -> RegisterDevice<MockBus, TestMap> {
        RegisterDevice::init(
            MockBus::new(),
            BusConfig { baud_rate_kbps: 100, timeout_ms: 7 },
            I2cAddress::new(ADDRESS).unwrap(),
        )
    }

    #[test]
    fn test_init() {
        let device = new_device();
        assert_eq!(device.state().i2c_address().as_u8(), ADDRESS);
        assert_eq!(device.state().signal_type(), SignalType::CONFIGURATION | SignalType::CURRENT);
        assert_eq!(device.bus().transaction_count(), 0);
    }

    #[test]
    fn test_init_idempotent() {
        let mut device = new_device();
        let first = *device.state();
        device.reinit(I2cAddress::new(ADDRESS).unwrap());
        assert_eq!(*device.state(), first);
        device.reinit(I2cAddress::new(ADDRESS).unwrap());
        assert_eq!(*device.state(), first);
    }

    #[test]
    fn test_write_rejects_unlisted_registers() {
        let mut device = new_device();
        for register in 0..=u8::MAX {
            if register == 0x00 || register == 0x05 {
                continue;
            }
            assert_eq!(device.write_register(register, 0xBEEF), Err(Error::BadDeviceCommand));
        }
        assert_eq!(device.bus().transaction_count(), 0);
    }

    #[test]
    fn test_read_rejects_unlisted_registers() {
        let mut device = new_device();
        for register in 0x06..=u8::MAX {
            assert_eq!(device.read_register(register, 2), Err(Error::BadDeviceCommand));
        }
        assert_eq!(device.bus().transaction_count(), 0);
    }

    #[test]
    fn test_read_rejects_bad_lengths() {
        let mut device = new_device();
        assert_eq!(device.read_register(0x01, 0), Err(Error::BadDeviceCommand));
        assert_eq!(device.read_register(0x01, I2C_BUFFER_SIZE + 1), Err(Error::BadDeviceCommand));
        assert_eq!(device.bus().transaction_count(), 0);
    }

    #[test]
    fn test_write_is_big_endian() {
        let mut device = new_device();
        for value in [0x0000u16, 0x0001, 0x00FF, 0x0100, 0x8000, 0xA55A, 0xFFFF] {
            assert_eq!(device.write_register(0x00, value), Ok(()));
        }

        let bus = device.into_bus();
        let payloads: Vec<Vec<u8>> = bus.transactions.iter()
            .map(|t| match t {
                Transaction::Send { address, command, payload } => {
                    assert_eq!(*address, ADDRESS);
                    assert_eq!(command, &vec![0x00]);
                    payload.clone()
                },
                other => panic!("unexpected transaction {:?}", other),
            })
            .collect();
        assert_eq!(payloads, vec![
            vec![0x00, 0x00],
            vec![0x00, 0x01],
            vec![0x00, 0xFF],
            vec![0x01, 0x00],
            vec![0x80, 0x00],
            vec![0xA5, 0x5A],
            vec![0xFF, 0xFF],
        ]);
        assert_eq!(bus.last_timeout_ms, Some(7));
    }

    #[test]
    fn test_write_failure() {
        let mut device = new_device();
        device.bus.fail_send(BusError::Nack);
        assert_eq!(device.write_register(0x05, 0x1000), Err(Error::DeviceCommunicationFailed));
        device.bus.fail_send(BusError::Timeout);
        assert_eq!(device.configure(0x1000), Err(Error::DeviceCommunicationFailed));

        // no retries
        assert_eq!(device.bus().transaction_count(), 2);

        // the bus recovers, and so do we
        assert_eq!(device.configure(0x1000), Ok(()));
    }

    #[test]
    fn test_read_combines_first_byte_high() {
        assert_eq!(combine_u16(0x00, 0x64), 100);
        assert_eq!(combine_u16(0x12, 0x34), 0x1234);
        assert_eq!(combine_u16(0xFF, 0x00), 0xFF00);

        let mut device = new_device();
        device.bus.respond(&[0x12, 0x34]);
        assert_eq!(device.read_register_u16(0x02), Ok(0x1234));
        assert_eq!(&device.state().receive_buffer()[..2], &[0x12, 0x34]);

        assert_eq!(device.bus().transactions, vec![
            Transaction::Receive { address: ADDRESS, command: vec![0x02], length: 2 },
        ]);
    }

    #[test]
    fn test_read_overwrites_buffer() {
        let mut device = new_device();
        device.bus.respond(&[1, 2, 3, 4]);
        device.bus.respond(&[9, 8]);
        assert_eq!(device.read_register(0x00, 4), Ok(&[1u8, 2, 3, 4][..]));
        assert_eq!(device.read_register(0x01, 2), Ok(&[9u8, 8][..]));
        assert_eq!(&device.state().receive_buffer()[..4], &[9, 8, 3, 4]);
    }

    #[test]
    fn test_read_failure_clears_requested_bytes() {
        let mut device = new_device();
        device.bus.respond(&[1, 2, 3, 4]);
        assert!(device.read_register(0x00, 4).is_ok());

        device.bus.fail_receive(BusError::Timeout);
        assert_eq!(device.read_register(0x01, 2), Err(Error::DeviceCommunicationFailed));
        assert_eq!(&device.state().receive_buffer()[..4], &[0, 0, 3, 4]);

        device.bus.fail_receive(BusError::ArbitrationLost);
        assert_eq!(device.read_register_u16(0x04), Err(Error::DeviceCommunicationFailed));
        assert_eq!(device.bus().transaction_count(), 3);
    }

    #[test]
    fn test_configure_then_read() {
        let mut device = new_device();
        assert_eq!(device.configure(0x1234), Ok(()));
        device.bus.respond(&[0x00, 0x64]);
        assert_eq!(device.read_register_u16(0x04), Ok(100));

        assert_eq!(device.bus().transactions, vec![
            Transaction::Send { address: ADDRESS, command: vec![0x05], payload: vec![0x12, 0x34] },
            Transaction::Receive { address: ADDRESS, command: vec![0x04], length: 2 },
        ]);
    }
}
