//! This crate bridges a CNC control host to Hypertherm Powermax plasma cutting power supplies fitted with the RS-485 machine interface.
//!
//! The supply exposes a small register file over a half-duplex serial
//! link. The [`bridge::Bridge`] translates host setpoints (cut mode,
//! cutting current, gas pressure) from a typed [`signals::SignalBus`]
//! into that register protocol, discovers the supply's allowed setpoint
//! ranges, and publishes live readings (current, pressure, fault code,
//! accumulated arc-on time) back to the host.
//!
//! Supply models this is known to work with:
//! * Powermax45 XP
//! * Powermax65
//! * Powermax85
//! * Powermax105
//! * Powermax125
//!
//! The machine-interface serial port is fixed at:
//! * Baud rate: 19200
//! * Data bits: 8
//! * Parity: Even
//! * Stop bits: 1
//!
//! Any interface which implements [embedded_io::Read] & [embedded_io::Write]
//! can carry the link; `demos/bridge.rs` shows a `serialport`-backed runner.

pub mod bridge;
pub mod codec;
pub mod error;
pub mod fault;
pub mod registers;
pub mod scaling;
pub mod session;
pub mod signals;

#[cfg(test)]
mod mock_serial;
