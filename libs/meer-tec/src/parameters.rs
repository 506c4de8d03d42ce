//! Parameter catalog
//!
//! Friendly names for the parameter IDs of TEC-family controllers. Only the commonly
//! used product, monitor, operation and temperature-control parameters are listed;
//! anything else can still be reached by numeric ID.

use mecom::ValueKind;
use serde::Serialize;
use std::fmt;

/// Whether a parameter can be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

impl Access {
    pub fn is_writable(self) -> bool {
        self == Access::ReadWrite
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::ReadOnly => write!(f, "ro"),
            Access::ReadWrite => write!(f, "rw"),
        }
    }
}

/// One catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub id: u16,
    pub name: &'static str,
    pub kind: ValueKind,
    pub access: Access,
    pub description: &'static str,
}

macro_rules! param {
    ($id:expr, $name:expr, $kind:ident, $access:ident, $desc:expr) => {
        ParameterSpec {
            id: $id,
            name: $name,
            kind: ValueKind::$kind,
            access: Access::$access,
            description: $desc,
        }
    };
}

/// Known parameters, ordered by ID
pub static PARAMETERS: &[ParameterSpec] = &[
    // Common product parameters
    param!(100, "device_type", Int, ReadOnly, "Device type (1122 = TEC-1122)"),
    param!(101, "hardware_version", Int, ReadOnly, "Hardware version (123 = 1.23)"),
    param!(102, "serial_number", Int, ReadOnly, "Serial number"),
    param!(103, "firmware_version", Int, ReadOnly, "Firmware version (123 = 1.23)"),
    param!(
        104,
        "device_status",
        Int,
        ReadOnly,
        "0 Init, 1 Ready, 2 Run, 3 Error, 4 Bootloader, 5 Reset within 200 ms"
    ),
    param!(105, "error_number", Int, ReadOnly, "Error number"),
    param!(106, "error_instance", Int, ReadOnly, "Error instance"),
    param!(107, "error_parameter", Int, ReadOnly, "Error parameter"),
    param!(
        108,
        "save_data_to_flash",
        Int,
        ReadWrite,
        "0 Enabled, 1 Disabled (parameters become RAM only)"
    ),
    param!(
        109,
        "flash_status",
        Int,
        ReadOnly,
        "0 All saved, 1 Save pending (do not power off), 2 Saving disabled"
    ),
    // Monitor
    param!(1000, "object_temperature", Float, ReadOnly, "Object temperature [°C]"),
    param!(1001, "sink_temperature", Float, ReadOnly, "Sink temperature [°C]"),
    param!(
        1010,
        "target_object_temperature_actual",
        Float,
        ReadOnly,
        "Target object temperature as currently applied [°C]"
    ),
    param!(
        1011,
        "nominal_temperature",
        Float,
        ReadOnly,
        "(Ramp) nominal object temperature [°C]"
    ),
    param!(
        1012,
        "thermal_power_model_current",
        Float,
        ReadOnly,
        "Thermal power model current [A]"
    ),
    param!(1020, "actual_output_current", Float, ReadOnly, "Actual output current [A]"),
    param!(1021, "actual_output_voltage", Float, ReadOnly, "Actual output voltage [V]"),
    param!(
        1080,
        "driver_status",
        Int,
        ReadOnly,
        "0 Init, 1 Ready, 2 Run, 3 Error, 4 Bootloader, 5 Reset within 200 ms"
    ),
    param!(
        1200,
        "temperature_stability",
        Int,
        ReadOnly,
        "0 Regulation not active, 1 Not stable, 2 Stable"
    ),
    // Operation
    param!(
        2010,
        "output_stage_status",
        Int,
        ReadWrite,
        "0 Static OFF, 1 Static ON, 2 Live OFF/ON, 3 HW Enable"
    ),
    // Temperature control
    param!(
        3000,
        "target_object_temperature",
        Float,
        ReadWrite,
        "Target object temperature [°C]"
    ),
    param!(3002, "proximity_width", Float, ReadWrite, "Proximity width [°C]"),
    param!(3003, "coarse_temp_ramp", Float, ReadWrite, "Coarse temperature ramp [K/s]"),
    param!(3010, "kp", Float, ReadWrite, "PID proportional gain Kp [A/K]"),
    param!(3011, "ti", Float, ReadWrite, "PID integral time Ti [s]"),
    param!(3012, "td", Float, ReadWrite, "PID derivative time Td [s]"),
    param!(3013, "d_part_damping_pt1", Float, ReadWrite, "D part damping PT1 [s]"),
    param!(
        3020,
        "mode",
        Int,
        ReadWrite,
        "0 Peltier full control, 1 Peltier heat only / cool only, 2 Resistor heat only"
    ),
    param!(3030, "current_limit", Float, ReadWrite, "Maximal current Imax [A]"),
    param!(3033, "delta_temperature_max", Float, ReadWrite, "Delta temperature dTmax [K]"),
    param!(3034, "positive_current_is", Int, ReadWrite, "Positive current is"),
];

/// Find a parameter by name (case-insensitive)
pub fn lookup(name: &str) -> Option<&'static ParameterSpec> {
    PARAMETERS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Find a parameter by numeric ID
pub fn by_id(id: u16) -> Option<&'static ParameterSpec> {
    PARAMETERS
        .binary_search_by_key(&id, |p| p.id)
        .ok()
        .map(|idx| &PARAMETERS[idx])
}

/// Resolve a name or a decimal ID
pub fn resolve(name_or_id: &str) -> Option<&'static ParameterSpec> {
    match name_or_id.trim().parse::<u16>() {
        Ok(id) => by_id(id),
        Err(_) => lookup(name_or_id.trim()),
    }
}
