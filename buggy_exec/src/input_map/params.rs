//! Parameters structure for the input mapper

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for input mapping.
///
/// These are loaded from `input_map.toml` and must stay in step with the
/// operator station's joystick range and the vehicle's drive train.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- SENSITIVITIES ----

    /// Raw drive deflection that maps to full-scale output. Larger values
    /// need more stick for the same speed.
    pub drive_sensitivity: i32,

    /// Raw steer deflection that maps to full-scale output.
    pub steer_sensitivity: i32,

    // ---- CAPABILITIES ----

    /// Smallest duty cycle that actually turns the wheels. Demands below
    /// this are floored up to it.
    ///
    /// Units: percent
    pub min_throttle_value: u8,

    /// Largest duty cycle the drive train may be asked for.
    ///
    /// Units: percent
    pub max_throttle_value: u8,

    /// Lowest steering angle the linkage can reach.
    ///
    /// Units: degrees
    pub min_steer_angle: u16,

    /// Highest steering angle the linkage can reach.
    ///
    /// Units: degrees
    pub max_steer_angle: u16
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        // Matches the deployed vehicle's params/input_map.toml
        Params {
            drive_sensitivity: 200,
            steer_sensitivity: 360,
            min_throttle_value: 40,
            max_throttle_value: 90,
            min_steer_angle: 70,
            max_steer_angle: 110
        }
    }
}
