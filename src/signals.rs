//! The command/feedback boundary between the CNC host and the bridge.
//!
//! Each slot has exactly one writer: the host owns [`Commands`], the
//! bridge owns [`Feedback`]. The single sanctioned exception is
//! [`Commands::enable`], which the bridge clears when the automatic-fault
//! latch trips so a dead link needs an explicit re-enable instead of
//! silently flapping.

use fugit::Duration;

use crate::registers::CutMode;

/// Host-written setpoints and the enable switch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Commands {
    /// Master switch for supply communications.
    pub enable: bool,
    /// Requested cut mode.
    pub mode_set: CutMode,
    /// Requested cutting current, amperes.
    pub current_set: f64,
    /// Requested gas pressure, psi. Zero selects automatic regulation.
    pub pressure_set: f64,
}

/// Bridge-written readings.
///
/// Slots hold the most recent good reading; they stop updating (and are
/// never rolled back) while [`status`](Self::status) is false.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Feedback {
    /// Cut mode read back from the supply.
    pub mode: u16,
    /// Cutting current read back from the supply, amperes.
    pub current: f64,
    /// Gas pressure read back from the supply, psi.
    pub pressure: f64,
    /// Active fault code, zero while clear.
    pub fault: u16,
    /// True while the link is up and polls are succeeding.
    pub status: bool,
    /// Smallest current setpoint the supply accepts, amperes.
    pub current_min: f64,
    /// Largest current setpoint the supply accepts, amperes.
    pub current_max: f64,
    /// Smallest pressure setpoint the supply accepts, psi.
    pub pressure_min: f64,
    /// Largest pressure setpoint the supply accepts, psi.
    pub pressure_max: f64,
    /// Accumulated arc-on time, seconds.
    pub arc_time_s: u32,
}

impl Feedback {
    /// Accumulated arc-on time as a duration.
    pub fn arc_on_time(&self) -> Duration<u32, 1, 1> {
        Duration::<u32, 1, 1>::secs(self.arc_time_s)
    }
}

/// The full signal surface shared by host and bridge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SignalBus {
    pub commands: Commands,
    pub feedback: Feedback,
}
