//! Outcome of a driver operation.


use core::fmt;

use from_to_repr::from_to_other;


/// Why a driver operation did not complete.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Error {
    /// The register is not supported by the device for this direction, or the request does not
    /// fit the receive buffer. Detected locally; the bus was not touched.
    BadDeviceCommand,

    /// The bus transaction failed (NACK, bus error, lost arbitration or timeout).
    DeviceCommunicationFailed,
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadDeviceCommand => write!(f, "bad device command"),
            Self::DeviceCommunicationFailed => write!(f, "device communication failed"),
        }
    }
}


/// Numeric status code shared by all drivers on the board.
///
/// This is what ends up on the diagnostic console and in any status byte sent upstream.
#[derive(Clone, Copy, Debug)]
#[from_to_other(base_type = u8, derive_compare = "as_int")]
pub enum Status {
    Ok = 0x00,
    BadDeviceCommand = 0x01,
    DeviceCommunicationFailed = 0x02,
    Other(u8),
}
impl Status {
    pub fn is_ok(&self) -> bool {
        self.to_base_type() == Self::Ok.to_base_type()
    }
}
impl From<Error> for Status {
    fn from(value: Error) -> Self {
        match value {
            Error::BadDeviceCommand => Self::BadDeviceCommand,
            Error::DeviceCommunicationFailed => Self::DeviceCommunicationFailed,
        }
    }
}
impl<T> From<&Result<T, Error>> for Status {
    fn from(value: &Result<T, Error>) -> Self {
        match value {
            Ok(_) => Self::Ok,
            Err(e) => Self::from(*e),
        }
    }
}


/// Writes one reading in the diagnostic console format shared by the sensor drivers.
///
/// A failed reading shows up as ` ----,`.
pub fn write_reading<W: fmt::Write, V: fmt::Display + fmt::LowerHex>(
    out: &mut W,
    reading: Result<V, Error>,
    hex_mode: bool,
) -> fmt::Result {
    match reading {
        Ok(value) => {
            if hex_mode {
                write!(out, " 0x{:04x},", value)
            } else {
                write!(out, " {},", value)
            }
        },
        Err(_) => write!(out, " ----,"),
    }
}


#[cfg(test)]
mod tests {
    use super::{Error, Status, write_reading};

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Ok.to_base_type(), 0x00);
        assert_eq!(Status::from(Error::BadDeviceCommand).to_base_type(), 0x01);
        assert_eq!(Status::from(Error::DeviceCommunicationFailed).to_base_type(), 0x02);
        assert_eq!(Status::from_base_type(0x02), Status::DeviceCommunicationFailed);
        assert_eq!(Status::from_base_type(0x7F), Status::Other(0x7F));
    }

    #[test]
    fn test_status_from_result() {
        let good: Result<u16, Error> = Ok(100);
        let bad: Result<u16, Error> = Err(Error::BadDeviceCommand);
        assert!(Status::from(&good).is_ok());
        assert!(!Status::from(&bad).is_ok());
        assert_eq!(Status::from(&bad), Status::BadDeviceCommand);
    }

    #[test]
    fn test_write_reading() {
        let mut out = String::new();
        write_reading(&mut out, Ok(100u16), false).unwrap();
        write_reading(&mut out, Ok(-3i16), false).unwrap();
        write_reading(&mut out, Err::<u16, _>(Error::DeviceCommunicationFailed), false).unwrap();
        write_reading(&mut out, Ok(0xABu16), true).unwrap();
        assert_eq!(out, " 100, -3, ----, 0x00ab,");
    }
}
