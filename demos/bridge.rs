use std::env;
use std::io::Write as _;
use std::time::Duration;

use inquire::Select;
use serialport::{DataBits, Parity, SerialPort, StopBits};

use powermax_rs485::bridge::{Bridge, BridgeState};
use powermax_rs485::error::OpenError;
use powermax_rs485::fault::FaultCode;
use powermax_rs485::registers::CutMode;
use powermax_rs485::session::{BAUD_RATE, READ_TIMEOUT_MS};
use powermax_rs485::signals::SignalBus;

// Configuration constants - adjust these for your setup
const TICK_INTERVAL_MS: u64 = 100;
const CUT_MODE: CutMode = CutMode::Normal;
const CUT_CURRENT_A: f64 = 45.0;
const GAS_PRESSURE_PSI: f64 = 0.0; // 0 = the supply regulates pressure itself

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            std::io::ErrorKind::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn open_port(path: &str) -> Result<PortWrapper, OpenError> {
    serialport::new(path, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::Even)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(READ_TIMEOUT_MS))
        .open()
        .map(PortWrapper)
        .map_err(|e| OpenError(e.to_string()))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {port_name}");

    let mut bridge = Bridge::new({
        let path = port_name.clone();
        move || open_port(&path)
    });

    // Stand in for the CNC host: raise enable with a fixed set of
    // setpoints and watch the feedback half of the bus.
    let mut bus = SignalBus::default();
    bus.commands.enable = true;
    bus.commands.mode_set = CUT_MODE;
    bus.commands.current_set = CUT_CURRENT_A;
    bus.commands.pressure_set = GAS_PRESSURE_PSI;

    let mut last_fault = FaultCode::CLEAR;
    loop {
        if let Err(e) = bridge.tick(&mut bus) {
            eprintln!("{e}");
            std::process::exit(1);
        }

        if bridge.state() == BridgeState::Polling {
            let fault = FaultCode(bus.feedback.fault);
            if fault != last_fault && !fault.is_clear() {
                let text = fault
                    .description(bus.feedback.current_max)
                    .unwrap_or("unknown fault code");
                eprintln!("\nsupply fault {fault}: {text}");
            }
            last_fault = fault;

            print!(
                "\rmode {} | {:5.1} A (range {:.0}-{:.0}) | {:5.1} psi (range {:.0}-{:.0}) | arc-on {} s | fault {}  ",
                bus.feedback.mode,
                bus.feedback.current,
                bus.feedback.current_min,
                bus.feedback.current_max,
                bus.feedback.pressure,
                bus.feedback.pressure_min,
                bus.feedback.pressure_max,
                bus.feedback.arc_time_s,
                fault,
            );
            std::io::stdout().flush().ok();
        }

        if !bus.commands.enable {
            // The bridge latched itself off after repeated comms failures.
            eprintln!("\ncommunications latched off, exiting");
            std::process::exit(1);
        }

        std::thread::sleep(Duration::from_millis(TICK_INTERVAL_MS));
    }
}
