//! Recording bus doubles for the unit tests.


use std::collections::VecDeque;

use crate::i2c::{BusConfig, BusError, I2cAddress, I2cBus};
use crate::ssd1331::{DisplayBus, DisplayError};


#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Transaction {
    Send {
        address: u8,
        command: Vec<u8>,
        payload: Vec<u8>,
    },
    Receive {
        address: u8,
        command: Vec<u8>,
        length: usize,
    },
}


/// An I2C bus that records every transaction and answers reads from a script.
#[derive(Debug, Default)]
pub struct MockBus {
    pub transactions: Vec<Transaction>,
    pub last_timeout_ms: Option<u32>,
    responses: VecDeque<Result<Vec<u8>, BusError>>,
    send_failures: VecDeque<Option<BusError>>,
}
impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the bytes the device will return on the next read.
    pub fn respond(&mut self, bytes: &[u8]) -> &mut Self {
        self.responses.push_back(Ok(bytes.to_vec()));
        self
    }

    /// Makes the next read fail.
    pub fn fail_receive(&mut self, error: BusError) -> &mut Self {
        self.responses.push_back(Err(error));
        self
    }

    /// Makes the next write fail; writes without a queued failure succeed.
    pub fn fail_send(&mut self, error: BusError) -> &mut Self {
        self.send_failures.push_back(Some(error));
        self
    }

    /// Lets the next write through; used to fail a later one.
    pub fn pass_send(&mut self) -> &mut Self {
        self.send_failures.push_back(None);
        self
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}
impl I2cBus for MockBus {
    fn send(
        &mut self,
        address: I2cAddress,
        config: &BusConfig,
        command: &[u8],
        payload: &[u8],
    ) -> Result<(), BusError> {
        self.last_timeout_ms = Some(config.timeout_ms);
        self.transactions.push(Transaction::Send {
            address: address.as_u8(),
            command: command.to_vec(),
            payload: payload.to_vec(),
        });
        match self.send_failures.pop_front().flatten() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn receive(
        &mut self,
        address: I2cAddress,
        config: &BusConfig,
        command: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), BusError> {
        self.last_timeout_ms = Some(config.timeout_ms);
        self.transactions.push(Transaction::Receive {
            address: address.as_u8(),
            command: command.to_vec(),
            length: buffer.len(),
        });
        match self.responses.pop_front() {
            Some(Ok(bytes)) => {
                assert_eq!(bytes.len(), buffer.len(), "scripted response has the wrong length");
                buffer.copy_from_slice(&bytes);
                Ok(())
            },
            Some(Err(e)) => {
                // a real controller may have clocked in some bytes before giving up
                for b in buffer.iter_mut() {
                    *b = 0xEE;
                }
                Err(e)
            },
            None => panic!("unexpected read"),
        }
    }
}


#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DisplayOp {
    Reset,
    Command(Vec<u8>),
}


/// A display bus that records command frames.
#[derive(Debug, Default)]
pub struct MockDisplayBus {
    pub ops: Vec<DisplayOp>,
    pub fail_after: Option<usize>,
}
impl MockDisplayBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.ops.iter()
            .filter_map(|op| match op {
                DisplayOp::Command(c) => Some(c.clone()),
                DisplayOp::Reset => None,
            })
            .collect()
    }
}
impl DisplayBus for MockDisplayBus {
    fn write_command(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        if let Some(remaining) = self.fail_after {
            if remaining == 0 {
                return Err(DisplayError::Bus);
            }
            self.fail_after = Some(remaining - 1);
        }
        self.ops.push(DisplayOp::Command(bytes.to_vec()));
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DisplayError> {
        self.ops.push(DisplayOp::Reset);
        Ok(())
    }
}
