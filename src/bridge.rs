//! The connection state machine tying the host signal bus to the supply.

use embedded_io::{Read, Write};
use tracing::{debug, info, warn};

use crate::error::{OpenError, Result};
use crate::fault::FaultCode;
use crate::registers::PmxRegister;
use crate::session::Session;
use crate::signals::SignalBus;

/// Failing ticks tolerated before the link is declared dead.
const FAILURE_THRESHOLD: u32 = 3;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeState {
    /// No session; waiting for the host to raise enable.
    #[default]
    Disabled,
    /// Enable is up but the open/setpoint-push/limit-read sequence has
    /// not completed yet.
    Starting,
    /// Steady-state reconciliation loop.
    Polling,
}

/// The writable setpoints the polling loop reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setpoint {
    Mode,
    Current,
    Pressure,
}

impl Setpoint {
    fn register(self) -> PmxRegister {
        match self {
            Self::Mode => PmxRegister::Mode,
            Self::Current => PmxRegister::Current,
            Self::Pressure => PmxRegister::Pressure,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Mode => Self::Current,
            Self::Current => Self::Pressure,
            Self::Pressure => Self::Mode,
        }
    }
}

/// Protocol bridge between the host signal bus and the supply.
///
/// Constructed once by the driving loop, which calls [`tick`](Self::tick)
/// at its poll rate with the shared [`SignalBus`]. The opener is invoked
/// at the start of each enable cycle and must hand back a freshly claimed
/// link; the link is released again whenever the bridge disables.
pub struct Bridge<S, F>
where
    S: Read + Write,
    F: FnMut() -> core::result::Result<S, OpenError>,
{
    open_link: F,
    session: Option<Session<S>>,
    state: BridgeState,
    opened_once: bool,
    /// Last written or read raw counts per setpoint register. `None`
    /// until the starting push seeds them.
    mode: Option<u16>,
    current: Option<u16>,
    pressure: Option<u16>,
    rotation: Setpoint,
    failed_ticks: u32,
}

impl<S, F> Bridge<S, F>
where
    S: Read + Write,
    F: FnMut() -> core::result::Result<S, OpenError>,
{
    pub fn new(open_link: F) -> Self {
        Self {
            open_link,
            session: None,
            state: BridgeState::Disabled,
            opened_once: false,
            mode: None,
            current: None,
            pressure: None,
            rotation: Setpoint::Mode,
            failed_ticks: 0,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Run one reconciliation step.
    ///
    /// Not reentrant; the driving loop must finish each call before the
    /// next. Returns an error only when the very first connection attempt
    /// of the process cannot claim the serial device; every later failure
    /// is the state machine's business.
    pub fn tick(&mut self, bus: &mut SignalBus) -> core::result::Result<(), OpenError> {
        match self.state {
            BridgeState::Disabled => {
                if bus.commands.enable {
                    info!("enable raised, connecting to the supply");
                    self.state = BridgeState::Starting;
                    self.start(bus)?;
                }
            }
            BridgeState::Starting => {
                if bus.commands.enable {
                    self.start(bus)?;
                } else {
                    self.shutdown(bus, false);
                }
            }
            BridgeState::Polling => {
                if bus.commands.enable {
                    self.poll(bus);
                } else {
                    self.shutdown(bus, false);
                }
            }
        }
        Ok(())
    }

    /// One attempt at the full open + setpoint push + limit discovery
    /// sequence. Any miss abandons the session and the next tick starts
    /// the whole sequence over.
    fn start(&mut self, bus: &mut SignalBus) -> core::result::Result<(), OpenError> {
        if self.session.is_none() {
            match (self.open_link)() {
                Ok(link) => {
                    self.session = Some(Session::new(link));
                    self.opened_once = true;
                }
                Err(e) if !self.opened_once => return Err(e),
                Err(e) => {
                    warn!(error = %e, "serial device unavailable, retrying");
                    return Ok(());
                }
            }
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let mode = u16::from(bus.commands.mode_set);
        let current = PmxRegister::Current.scale().to_counts(bus.commands.current_set);
        let pressure = PmxRegister::Pressure.scale().to_counts(bus.commands.pressure_set);

        match Self::push_and_discover(session, mode, current, pressure) {
            Ok(limits) => {
                self.mode = Some(mode);
                self.current = Some(current);
                self.pressure = Some(pressure);
                let (current_min, current_max, pressure_min, pressure_max) = limits;
                bus.feedback.current_min = PmxRegister::CurrentMin.scale().to_physical(current_min);
                bus.feedback.current_max = PmxRegister::CurrentMax.scale().to_physical(current_max);
                bus.feedback.pressure_min =
                    PmxRegister::PressureMin.scale().to_physical(pressure_min);
                bus.feedback.pressure_max =
                    PmxRegister::PressureMax.scale().to_physical(pressure_max);
                bus.feedback.status = true;
                self.failed_ticks = 0;
                self.rotation = Setpoint::Mode;
                self.state = BridgeState::Polling;
                info!(
                    current_min = bus.feedback.current_min,
                    current_max = bus.feedback.current_max,
                    pressure_min = bus.feedback.pressure_min,
                    pressure_max = bus.feedback.pressure_max,
                    "supply connected"
                );
            }
            Err(e) => {
                debug!(error = %e, "connection attempt failed, retrying next tick");
                self.session = None;
            }
        }
        Ok(())
    }

    /// Push the host setpoints (each verified by echo), then fetch the
    /// supply's allowed setpoint ranges.
    fn push_and_discover(
        session: &mut Session<S>,
        mode: u16,
        current: u16,
        pressure: u16,
    ) -> Result<(u16, u16, u16, u16), S::Error> {
        session.write_register(PmxRegister::Mode, mode)?;
        session.write_register(PmxRegister::Current, current)?;
        session.write_register(PmxRegister::Pressure, pressure)?;
        Ok((
            session.read_register(PmxRegister::CurrentMin)?,
            session.read_register(PmxRegister::CurrentMax)?,
            session.read_register(PmxRegister::PressureMin)?,
            session.read_register(PmxRegister::PressureMax)?,
        ))
    }

    /// One steady-state tick: reconcile a single setpoint register, then
    /// read the fault and arc-time registers.
    fn poll(&mut self, bus: &mut SignalBus) {
        let Some(session) = self.session.as_mut() else {
            // Session lost out from under us; go back through Starting.
            self.state = BridgeState::Starting;
            return;
        };

        let mut misses = 0u32;

        // Write the first setpoint the host has moved; with nothing to
        // write, read the next register of the rotation back instead.
        // Either way one request reconciles one field on the half-duplex
        // link this tick.
        let wanted = [
            (Setpoint::Mode, u16::from(bus.commands.mode_set), self.mode),
            (
                Setpoint::Current,
                PmxRegister::Current.scale().to_counts(bus.commands.current_set),
                self.current,
            ),
            (
                Setpoint::Pressure,
                PmxRegister::Pressure.scale().to_counts(bus.commands.pressure_set),
                self.pressure,
            ),
        ];
        let dirty = wanted.iter().find(|(_, want, have)| Some(*want) != *have);

        if let Some(&(field, want, _)) = dirty {
            match session.write_register(field.register(), want) {
                Ok(()) => match field {
                    Setpoint::Mode => self.mode = Some(want),
                    Setpoint::Current => self.current = Some(want),
                    Setpoint::Pressure => self.pressure = Some(want),
                },
                Err(e) => {
                    debug!(register = ?field.register(), error = %e, "setpoint write failed");
                    misses += 1;
                }
            }
        } else {
            let field = self.rotation;
            self.rotation = field.next();
            match session.read_register(field.register()) {
                Ok(raw) => match field {
                    Setpoint::Mode => {
                        self.mode = Some(raw);
                        bus.feedback.mode = raw;
                    }
                    Setpoint::Current => {
                        self.current = Some(raw);
                        bus.feedback.current = PmxRegister::Current.scale().to_physical(raw);
                    }
                    Setpoint::Pressure => {
                        self.pressure = Some(raw);
                        bus.feedback.pressure = PmxRegister::Pressure.scale().to_physical(raw);
                    }
                },
                Err(e) => {
                    debug!(register = ?field.register(), error = %e, "read-back failed");
                    misses += 1;
                }
            }
        }

        match session.read_register(PmxRegister::Fault) {
            Ok(raw) => {
                if raw != bus.feedback.fault && raw != 0 {
                    let code = FaultCode(raw);
                    warn!(
                        code = %code,
                        description = code
                            .description(bus.feedback.current_max)
                            .unwrap_or("unknown fault code"),
                        "supply reported a fault"
                    );
                }
                bus.feedback.fault = raw;
            }
            Err(e) => {
                debug!(error = %e, "fault read failed");
                misses += 1;
            }
        }

        let low = session.read_register(PmxRegister::ArcTimeLow);
        let high = session.read_register(PmxRegister::ArcTimeHigh);
        match (low, high) {
            (Ok(low), Ok(high)) => {
                bus.feedback.arc_time_s = u32::from(low) | u32::from(high) << 16;
            }
            (low, high) => {
                misses += u32::from(low.is_err()) + u32::from(high.is_err());
            }
        }

        if misses == 0 {
            self.failed_ticks = 0;
        } else {
            self.failed_ticks += 1;
            debug!(misses, consecutive = self.failed_ticks, "tick had failed exchanges");
            if self.failed_ticks > FAILURE_THRESHOLD {
                warn!("supply stopped answering, latching communications off");
                self.shutdown(bus, true);
            }
        }
    }

    /// Hand control back to the front panel and release the port.
    ///
    /// `latch` marks the automatic-fault path, which also clears the
    /// host's enable so an unresponsive supply is not retried until the
    /// host explicitly asks again.
    fn shutdown(&mut self, bus: &mut SignalBus, latch: bool) {
        if let Some(session) = self.session.as_mut() {
            // Zeroed setpoints return the supply to local control. The
            // link may already be dead, so misses here are ignored.
            let _ = session.write_register(PmxRegister::Mode, 0);
            let _ = session.write_register(PmxRegister::Current, 0);
            let _ = session.write_register(PmxRegister::Pressure, 0);
        }
        self.session = None;
        self.state = BridgeState::Disabled;
        self.mode = None;
        self.current = None;
        self.pressure = None;
        self.failed_ticks = 0;
        bus.feedback.status = false;
        if latch {
            bus.commands.enable = false;
            info!("communications latched off until re-enabled");
        } else {
            info!("disabled by host, supply handed back to local control");
        }
    }
}
