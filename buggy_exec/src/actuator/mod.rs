//! # Actuator module
//!
//! This module defines the capability traits the control core drives the
//! hardware through, the process-wide hardware registry which enforces the
//! claim-once lifecycle, and the hardware variants implementing the traits.
//!
//! The control core never touches pins, PWM channels or I2C buses directly.
//! Everything goes through [`ActuatorPort`] and [`CameraMountPort`], which
//! keeps the mapping and session logic hardware-agnostic and unit-testable.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod registry;

/// Simulated actuators, used on workstations and in unit tests
pub mod sim;

/// [`ActuatorPort`]/[`CameraMountPort`] implementation for the PCA9685 16
/// channel servo driver board.
#[cfg(feature = "pca9685")]
pub mod pca9685;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use registry::*;

use crate::input_map::{MotorDirection, MountStep};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Home position of the mount pan servo.
///
/// Units: degrees
pub const PAN_HOME_DEG: f64 = 110.0;

/// Home position of the mount tilt servo.
///
/// Units: degrees
pub const TILT_HOME_DEG: f64 = 95.0;

/// Angle moved by a single mount step command.
///
/// Units: degrees
pub const MOUNT_STEP_DEG: f64 = 5.0;

/// Travel limits of the mount servos.
///
/// Units: degrees
pub const MOUNT_MIN_DEG: f64 = 0.0;
pub const MOUNT_MAX_DEG: f64 = 180.0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised by actuator hardware.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("An I2C error occured")]
    I2c,

    #[error("Duty cycle must be between 0.0 and 100.0, got {0}")]
    InvalidDutyCycle(f64),

    #[error("Hardware is not available: {0}")]
    Unavailable(String)
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Capability set for the vehicle's actuators.
///
/// One implementation exists per hardware target. The motor is driven
/// through a two-line direction encoding plus a duty cycle, the steering
/// servo through a PWM duty, and the light is a plain digital output.
pub trait ActuatorPort {

    /// Drive the motor in the given direction at the given duty cycle.
    ///
    /// A `Stop` direction is equivalent to [`ActuatorPort::stop_motor`]
    /// regardless of the duty value.
    fn drive_motor(
        &mut self,
        direction: MotorDirection,
        duty_percent: u8
    ) -> Result<(), ActuatorError>;

    /// De-energise both motor driver inputs and zero the duty cycle.
    fn stop_motor(&mut self) -> Result<(), ActuatorError>;

    /// Set the steering servo PWM duty cycle.
    ///
    /// Units: percent, must be in [0.0, 100.0]
    fn set_steer_duty(&mut self, duty_percent: f64) -> Result<(), ActuatorError>;

    /// Release the steering servo (no pulse).
    fn release_steer(&mut self) -> Result<(), ActuatorError>;

    /// Switch the auxiliary light output.
    fn set_light(&mut self, on: bool) -> Result<(), ActuatorError>;
}

/// Capability set for the pan/tilt camera mount.
pub trait CameraMountPort {

    /// Step the pan servo in the given direction.
    fn step_pan(&mut self, step: MountStep) -> Result<(), ActuatorError>;

    /// Step the tilt servo in the given direction.
    fn step_tilt(&mut self, step: MountStep) -> Result<(), ActuatorError>;

    /// Return both servos to their home positions.
    fn reset(&mut self) -> Result<(), ActuatorError>;
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Apply a mount step to an angle, clamped to the servo travel.
///
/// Units: degrees
pub fn step_angle(angle_deg: f64, step: MountStep) -> f64 {
    let stepped = match step {
        MountStep::Increase => angle_deg + MOUNT_STEP_DEG,
        MountStep::Decrease => angle_deg - MOUNT_STEP_DEG,
        MountStep::Hold => angle_deg
    };

    util::maths::clamp(&stepped, &MOUNT_MIN_DEG, &MOUNT_MAX_DEG)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_step_angle() {
        assert_eq!(step_angle(90.0, MountStep::Increase), 95.0);
        assert_eq!(step_angle(90.0, MountStep::Decrease), 85.0);
        assert_eq!(step_angle(90.0, MountStep::Hold), 90.0);

        // Travel limits are enforced
        assert_eq!(step_angle(179.0, MountStep::Increase), 180.0);
        assert_eq!(step_angle(1.0, MountStep::Decrease), 0.0);
    }
}
