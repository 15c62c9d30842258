//! I2C bus abstraction used by the register drivers.


/// A 7-bit I2C device address.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct I2cAddress(u8);
impl I2cAddress {
    pub const fn new(address: u8) -> Option<Self> {
        if address & 0b1000_0000 != 0 {
            None
        } else {
            Some(Self(address))
        }
    }

    pub const fn as_u8(&self) -> u8 {
        self.0
    }
}
impl TryFrom<u8> for I2cAddress {
    type Error = ();
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(())
    }
}
impl From<I2cAddress> for u8 {
    fn from(value: I2cAddress) -> Self { value.as_u8() }
}


/// Bus parameters, decided once at startup and handed to every driver.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BusConfig {
    /// SCL frequency in kHz.
    pub baud_rate_kbps: u32,

    /// Upper bound for a single blocking transaction, in milliseconds.
    pub timeout_ms: u32,
}
impl Default for BusConfig {
    fn default() -> Self {
        Self {
            baud_rate_kbps: 100,
            timeout_ms: 5,
        }
    }
}


/// What went wrong on the wire.
///
/// The drivers do not distinguish between these; they are only kept around for diagnostics.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum BusError {
    /// The addressed device (or the register byte) was not acknowledged.
    Nack,
    ArbitrationLost,
    BusFault,
    Timeout,
}


/// A blocking I2C controller.
///
/// Only one transaction is in flight at any time; callers serialize access by holding `&mut`.
pub trait I2cBus {
    /// Writes `command` followed by `payload` to the device as one contiguous transfer.
    fn send(
        &mut self,
        address: I2cAddress,
        config: &BusConfig,
        command: &[u8],
        payload: &[u8],
    ) -> Result<(), BusError>;

    /// Writes `command`, then reads exactly `buffer.len()` bytes from the device into `buffer`.
    fn receive(
        &mut self,
        address: I2cAddress,
        config: &BusConfig,
        command: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), BusError>;
}
impl<T: I2cBus + ?Sized> I2cBus for &mut T {
    fn send(
        &mut self,
        address: I2cAddress,
        config: &BusConfig,
        command: &[u8],
        payload: &[u8],
    ) -> Result<(), BusError> {
        (**self).send(address, config, command, payload)
    }

    fn receive(
        &mut self,
        address: I2cAddress,
        config: &BusConfig,
        command: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), BusError> {
        (**self).receive(address, config, command, buffer)
    }
}
