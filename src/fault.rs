//! Fault-code decoding for the operator.
//!
//! The fault register reports a decimal-coded number that the supply's
//! front panel displays split as `N-NN-N`. Descriptions follow the
//! operator manual's code table.

/// A fault code read from the fault register. Zero means no fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultCode(pub u16);

impl FaultCode {
    pub const CLEAR: Self = Self(0);

    pub fn is_clear(self) -> bool {
        self.0 == 0
    }

    /// Operator text for this code, if it is a known one.
    ///
    /// Code 0-21-0 is overloaded across the model range: supplies rated
    /// above 110 A report it for excessive arc voltage rather than lost
    /// gas flow, so the caller passes the discovered current limit.
    pub fn description(self, current_max: f64) -> Option<&'static str> {
        Some(match self.0 {
            110 => "Remote controller mode invalid",
            111 => "Remote controller current invalid",
            112 => "Remote controller pressure invalid",
            120 => "Low input gas pressure",
            121 => "Output gas pressure low",
            122 => "Output gas pressure high",
            123 => "Output gas pressure unstable",
            130 => "AC input power unstable",
            199 => "Power board hardware protection",
            200 => "Low gas pressure",
            210 if current_max > 110.0 => "Excessive arc voltage",
            210 => "Gas flow lost while cutting",
            220 => "No gas input",
            300 => "Torch stuck open",
            301 => "Torch stuck closed",
            320 => "End of consumable life",
            400 => "PFC/Boost IGBT module under temperature",
            401 => "PFC/Boost IGBT module over temperature",
            402 => "Inverter IGBT module under temperature",
            403 => "Inverter IGBT module over temperature",
            500 => "Retaining cap off",
            510 => "Start/trigger signal on at power up",
            520 => "Torch not connected",
            600 => "AC input voltage phase loss",
            601 => "AC input voltage too low",
            602 => "AC input voltage too high",
            610 => "AC input unstable",
            980 => "Internal communication failure",
            990 => "System hardware fault",
            1000 => "Digital signal processor fault",
            1100 => "A/D converter fault",
            1200 => "I/O fault",
            2000 => "A/D converter value out of range",
            2010 => "Auxiliary switch disconnected",
            2100 => "Inverter module temp sensor open",
            2101 => "Inverter module temp sensor shorted",
            2110 => "Pressure sensor is open",
            2111 => "Pressure sensor is shorted",
            2200 => "DSP does not recognize the torch",
            3000 => "Bus voltage fault",
            3100 => "Fan speed fault",
            3101 => "Fan fault",
            3110 => "PFC module temperature sensor open",
            3111 => "PFC module temperature sensor shorted",
            3112 => "PFC module temperature sensor circuit fault",
            3200 => "Fill valve",
            3201 => "Dump valve",
            3203 => "Electronic regulator is disconnected",
            3410 => "Drive fault",
            3420 => "5 or 24 VDC fault",
            3421 => "18 VDC fault",
            3430 => "Inverter capacitors unbalanced",
            3441 => "PFC over current",
            3511 => "Inverter saturation fault",
            3520 => "Inverter shoot-through fault",
            3600 => "Power board fault",
            3700 => "Internal serial communications fault",
            _ => return None,
        })
    }
}

impl core::fmt::Display for FaultCode {
    /// Front-panel form, e.g. `0-21-0` for code 210.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let code = self.0.min(9999);
        write!(f, "{}-{:02}-{}", code / 1000, code / 10 % 100, code % 10)
    }
}
