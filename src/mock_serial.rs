//! Test doubles for the serial link.
//!
//! [`MockSerial`] is a byte-level script: it captures whatever is written
//! and replays canned read data, for codec/session tests. [`StubSupply`]
//! goes one step further and behaves like the device: it parses request
//! frames, echoes writes into a register store and answers reads from it,
//! which the bridge lifecycle tests need.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use crate::codec;
use crate::registers::PmxRegister;

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    /// Bytes written to the mock serial port
    write_buffer: heapless::Vec<u8, 256>,
    /// Pre-configured response data to be read
    read_buffer: heapless::Vec<u8, 256>,
    /// Current position in the read buffer
    read_position: usize,
    /// Simulate a dead link on write
    fail_writes: bool,
    /// Simulate a dead link on read
    fail_reads: bool,
}

#[derive(Debug)]
pub enum MockSerialError {
    /// No data inside the simulated read window.
    Timeout,
    /// A scripted buffer ran out of capacity.
    BufferOverflow,
    /// Simulated dead link.
    Disconnected,
}

impl std::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockSerialError::Timeout => write!(f, "timeout"),
            MockSerialError::BufferOverflow => write!(f, "buffer overflow"),
            MockSerialError::Disconnected => write!(f, "disconnected"),
        }
    }
}

impl std::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::Disconnected => embedded_io::ErrorKind::BrokenPipe,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(MockSerialError::Disconnected);
        }
        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MockSerialError::Disconnected);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.fail_reads {
            return Err(MockSerialError::Disconnected);
        }
        if self.read_position >= self.read_buffer.len() {
            return Err(MockSerialError::Timeout);
        }

        let available = self.read_buffer.len() - self.read_position;
        let count = buf.len().min(available);
        buf[..count]
            .copy_from_slice(&self.read_buffer[self.read_position..self.read_position + count]);
        self.read_position += count;
        Ok(count)
    }
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            fail_writes: false,
            fail_reads: false,
        }
    }

    /// Set the data that will be returned when read() is called
    pub fn set_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer.clear();
        self.read_position = 0;
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    /// The bytes written to this mock serial port so far
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Configure whether read operations should fail hard
    pub fn set_read_error(&mut self, should_error: bool) {
        self.fail_reads = should_error;
    }

    /// Configure whether write operations should fail hard
    pub fn set_write_error(&mut self, should_error: bool) {
        self.fail_writes = should_error;
    }
}

#[derive(Default)]
struct StubState {
    registers: BTreeMap<u16, u16>,
    rx: Vec<u8>,
    tx: VecDeque<u8>,
    failing: bool,
    exchanges: usize,
    writes: Vec<(u16, u16)>,
}

/// A scripted supply on the other end of the link.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the bridge's opener hands out fresh "connections" to the same device.
#[derive(Clone)]
pub struct StubSupply {
    state: Rc<RefCell<StubState>>,
}

impl StubSupply {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(StubState::default())),
        }
    }

    pub fn set_register(&self, register: PmxRegister, raw: u16) {
        self.state
            .borrow_mut()
            .registers
            .insert(register.into(), raw);
    }

    /// While failing, requests are swallowed without a reply, as if the
    /// supply were switched off mid-session.
    pub fn set_failing(&self, failing: bool) {
        self.state.borrow_mut().failing = failing;
    }

    /// Number of complete request frames received.
    pub fn exchanges(&self) -> usize {
        self.state.borrow().exchanges
    }

    /// Every `(register, value)` write received, oldest first.
    pub fn writes(&self) -> Vec<(u16, u16)> {
        self.state.borrow().writes.clone()
    }

    fn process_frame(state: &mut StubState, frame: &[u8]) {
        state.exchanges += 1;
        if state.failing || frame.len() != codec::REQUEST_LEN || frame[0] != b':' {
            return;
        }
        let Some(function) = codec::hex_byte(frame[3], frame[4]) else {
            return;
        };
        let Some(register) = codec::hex_u16(&frame[5..9]) else {
            return;
        };
        let Some(payload) = codec::hex_u16(&frame[9..13]) else {
            return;
        };
        match function {
            0x04 => {
                let value = state.registers.get(&register).copied().unwrap_or(0);
                let mut reply = [0u8; codec::READ_REPLY_LEN];
                reply[0] = b':';
                codec::put_hex_u8(&mut reply[1..3], codec::DEVICE_ADDRESS);
                reply[3..7].copy_from_slice(b"0402");
                codec::put_hex_u16(&mut reply[7..11], value);
                let check = codec::lrc(&reply[1..11]).unwrap();
                codec::put_hex_u8(&mut reply[11..13], check);
                reply[13] = b'\r';
                reply[14] = b'\n';
                state.tx.extend(reply);
            }
            0x06 => {
                state.registers.insert(register, payload);
                state.writes.push((register, payload));
                state.tx.extend(frame.iter().copied());
            }
            _ => {}
        }
    }
}

impl embedded_io::ErrorType for StubSupply {
    type Error = MockSerialError;
}

impl embedded_io::Write for StubSupply {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        state.rx.extend_from_slice(buf);
        while let Some(end) = state.rx.iter().position(|&b| b == b'\n') {
            let frame: Vec<u8> = state.rx.drain(..=end).collect();
            Self::process_frame(&mut state, &frame);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io::Read for StubSupply {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.tx.is_empty() {
            return Err(MockSerialError::Timeout);
        }
        let mut count = 0;
        while count < buf.len() {
            match state.tx.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, Write};

    #[test]
    fn mock_captures_writes_and_replays_reads() {
        let mut mock = MockSerial::new();
        mock.write(b":0104").unwrap();
        mock.write(b"2093000147\r\n").unwrap();
        assert_eq!(mock.written_data(), b":01042093000147\r\n");

        mock.set_read_data(b"reply").unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(mock.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"rep");
        assert_eq!(mock.read(&mut buf).unwrap(), 2);
        assert!(matches!(mock.read(&mut buf), Err(MockSerialError::Timeout)));
    }

    #[test]
    fn stub_echoes_writes_into_its_registers() {
        let stub = StubSupply::new();
        let mut port = stub.clone();
        let frame = codec::encode_write_request(codec::DEVICE_ADDRESS, 0x2094, 0x0B40);
        port.write(&frame).unwrap();

        let mut echo = [0u8; codec::REQUEST_LEN];
        port.read_exact(&mut echo).unwrap();
        assert_eq!(echo, frame);
        assert_eq!(stub.writes(), vec![(0x2094, 0x0B40)]);
        assert_eq!(stub.exchanges(), 1);
    }

    #[test]
    fn stub_answers_reads_from_its_registers() {
        let stub = StubSupply::new();
        stub.set_register(PmxRegister::Current, 0x0B40);
        let mut port = stub.clone();
        port.write(&codec::encode_read_request(
            codec::DEVICE_ADDRESS,
            PmxRegister::Current.into(),
        ))
        .unwrap();

        let mut reply = [0u8; codec::READ_REPLY_LEN];
        port.read_exact(&mut reply).unwrap();
        assert_eq!(
            codec::decode_read_reply(&reply, codec::DEVICE_ADDRESS),
            Ok(0x0B40)
        );
    }

    #[test]
    fn failing_stub_swallows_requests() {
        let stub = StubSupply::new();
        stub.set_failing(true);
        let mut port = stub.clone();
        port.write(&codec::encode_read_request(codec::DEVICE_ADDRESS, 0x2098))
            .unwrap();

        let mut buf = [0u8; 1];
        assert!(matches!(port.read(&mut buf), Err(MockSerialError::Timeout)));
        assert_eq!(stub.exchanges(), 1);
    }
}
