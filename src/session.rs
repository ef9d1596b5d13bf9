//! Half-duplex exchange layer over the raw serial link.

use embedded_io::Error as _;
use tracing::trace;

use crate::codec;
use crate::error::{Error, Result};
use crate::registers::PmxRegister;

/// Fixed baud rate of the machine interface (8 data bits, even parity,
/// 1 stop bit).
pub const BAUD_RATE: u32 = 19_200;

/// Read window bounding each exchange.
pub const READ_TIMEOUT_MS: u64 = 100;

/// Longest valid inbound frame is a 17-byte write echo; anything past
/// this is noise the decoder will reject anyway.
pub const REPLY_CAP: usize = 32;

pub type Reply = heapless::Vec<u8, REPLY_CAP>;

/// Owns the serial link for the duration of one enable cycle.
///
/// The link is half duplex: one request may be outstanding at a time, and
/// [`exchange`](Self::exchange) blocks until the reply line arrives or the
/// link's read timeout expires. Dropping the session releases the device.
pub struct Session<S: embedded_io::Read + embedded_io::Write> {
    interface: S,
}

impl<S: embedded_io::Read + embedded_io::Write> Session<S> {
    pub fn new(interface: S) -> Self {
        Self { interface }
    }

    /// Write one frame, then collect the reply until a line feed, end of
    /// stream, or the read timeout.
    ///
    /// A timeout or short read yields whatever bytes arrived, possibly
    /// none; only hard I/O failures are errors at this layer. Whether the
    /// collected bytes form a valid reply is the caller's concern.
    pub fn exchange(&mut self, frame: &[u8]) -> Result<Reply, S::Error> {
        self.interface.write_all(frame).map_err(Error::Serial)?;

        let mut reply = Reply::new();
        let mut chunk = [0u8; 8];
        loop {
            match self.interface.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if reply.extend_from_slice(&chunk[..n]).is_err() {
                        // The supply never talks this much; stop and let
                        // the decoder reject what we have.
                        break;
                    }
                    if reply.last() == Some(&b'\n') {
                        break;
                    }
                }
                Err(e) => match e.kind() {
                    // End of the read window; hand back what arrived.
                    embedded_io::ErrorKind::TimedOut | embedded_io::ErrorKind::Other => break,
                    _ => return Err(Error::Serial(e)),
                },
            }
        }
        trace!(sent = frame.len(), received = reply.len(), "exchange");
        Ok(reply)
    }

    /// Read one register, validating the reply frame.
    pub fn read_register(&mut self, register: PmxRegister) -> Result<u16, S::Error> {
        let frame = codec::encode_read_request(codec::DEVICE_ADDRESS, register.into());
        let reply = self.exchange(&frame)?;
        if reply.is_empty() {
            return Err(Error::Timeout);
        }
        Ok(codec::decode_read_reply(&reply, codec::DEVICE_ADDRESS)?)
    }

    /// Write one register; the supply must echo the frame exactly.
    pub fn write_register(&mut self, register: PmxRegister, value: u16) -> Result<(), S::Error> {
        let frame = codec::encode_write_request(codec::DEVICE_ADDRESS, register.into(), value);
        let reply = self.exchange(&frame)?;
        if reply.is_empty() {
            return Err(Error::Timeout);
        }
        if !codec::is_write_echo(&reply, &frame) {
            return Err(Error::EchoMismatch);
        }
        Ok(())
    }
}
