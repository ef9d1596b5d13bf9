//! This module defines the registers of the Powermax machine interface.

use strum_macros::EnumIter;

use crate::scaling::Scale;

/// Registers exposed by the supply over the RS-485 machine interface.
///
/// Discriminants are the on-wire register addresses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter)]
#[repr(u16)]
pub enum PmxRegister {
    /// __R/W__ - Cut mode selection.
    ///
    /// See [`CutMode`] for the accepted values. Zero hands mode control
    /// back to the front panel.
    Mode = 0x2093,
    /// __R/W__ - Cutting current setpoint, sixty-fourths of an ampere.
    Current = 0x2094,
    /// __R/W__ - Gas pressure setpoint, 1/128ths of a psi.
    ///
    /// Writing zero selects the supply's automatic pressure regulation.
    Pressure = 0x2096,
    /// __R__ - Active fault code, decimal-coded.
    ///
    /// See [`FaultCode`](crate::fault::FaultCode) for the operator text.
    Fault = 0x2098,
    /// __R__ - Lowest accepted current setpoint, sixty-fourths of an ampere.
    CurrentMin = 0x2099,
    /// __R__ - Highest accepted current setpoint, sixty-fourths of an ampere.
    CurrentMax = 0x209A,
    /// __R__ - Lowest accepted pressure setpoint, 1/128ths of a psi.
    PressureMin = 0x209C,
    /// __R__ - Highest accepted pressure setpoint, 1/128ths of a psi.
    PressureMax = 0x209D,
    /// __R__ - Accumulated arc-on time in seconds, low 16 bits.
    ArcTimeLow = 0x209E,
    /// __R__ - Accumulated arc-on time in seconds, high 16 bits.
    ///
    /// Word order should be confirmed against the machine-interface
    /// documentation when new supply models appear.
    ArcTimeHigh = 0x209F,
}

impl From<PmxRegister> for u16 {
    fn from(value: PmxRegister) -> Self {
        value as u16
    }
}

impl PmxRegister {
    /// Conversion between raw counts and physical units for this register.
    pub const fn scale(self) -> Scale {
        match self {
            Self::Current | Self::CurrentMin | Self::CurrentMax => Scale::CURRENT,
            Self::Pressure | Self::PressureMin | Self::PressureMax => Scale::PRESSURE,
            _ => Scale::UNITY,
        }
    }

    /// Whether the host may write this register.
    pub const fn writable(self) -> bool {
        matches!(self, Self::Mode | Self::Current | Self::Pressure)
    }
}

/// Cut modes accepted by the mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum CutMode {
    /// Standard cutting.
    #[default]
    Normal = 1,
    /// Constant pilot arc, for expanded or mesh material.
    Cpa = 2,
    /// Gouging and marking.
    Gouge = 3,
}

impl From<CutMode> for u16 {
    fn from(value: CutMode) -> Self {
        value as u16
    }
}

impl TryFrom<u16> for CutMode {
    type Error = ();
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CutMode::Normal),
            2 => Ok(CutMode::Cpa),
            3 => Ok(CutMode::Gouge),
            _ => Err(()),
        }
    }
}
