//! Our error types for Powermax communications.

use thiserror::Error;

use crate::codec::DecodeError;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// A single failed exchange with the supply.
///
/// None of these end the process; the bridge folds them into its
/// consecutive-failure tally and decides there.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    /// The underlying link failed outright (device unplugged, permission
    /// revoked).
    #[error("serial communication error")]
    Serial(I),
    /// No reply arrived inside the read timeout.
    #[error("no reply from the supply")]
    Timeout,
    /// A reply arrived but failed the framing or checksum checks.
    #[error("malformed reply: {0}")]
    Decode(DecodeError),
    /// A write was answered with something other than an echo of the
    /// request frame.
    #[error("write was not echoed")]
    EchoMismatch,
}

impl<I: embedded_io::Error> From<DecodeError> for Error<I> {
    fn from(err: DecodeError) -> Self {
        Error::Decode(err)
    }
}

/// The serial device could not be claimed.
///
/// Fatal when it happens on the first connection attempt of the process;
/// recoverable on any later enable cycle.
#[derive(Error, Debug)]
#[error("cannot open serial device: {0}")]
pub struct OpenError(pub String);
