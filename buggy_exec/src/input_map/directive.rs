//! Directives produced by the input mapper

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Demand for the drive motor, derived from one command and consumed once.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct DriveDirective {
    /// The direction the motor shall turn in
    pub direction: MotorDirection,

    /// PWM duty cycle to drive the motor at.
    ///
    /// Units: percent, in [0, 100]. Never inside the dead band between zero
    /// and the minimum effective throttle.
    pub duty_percent: u8
}

/// Demand for the camera mount, direction only.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct MountDirective {
    /// Pan step, positive steer deflections pan right
    pub pan: MountStep,

    /// Tilt step, positive drive deflections tilt up
    pub tilt: MountStep
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible drive motor directions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum MotorDirection {
    /// Drive forwards
    Forward,

    /// Drive backwards
    Reverse,

    /// De-energise both motor driver inputs
    Stop
}

/// Possible camera mount step directions for one axis.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum MountStep {
    /// Step the axis angle up
    Increase,

    /// Step the axis angle down
    Decrease,

    /// Leave the axis angle unchanged
    Hold
}

/// Demand for the steering servo, derived from one command and consumed
/// once.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum SteerDirective {
    /// Hold the given absolute steering angle.
    ///
    /// Units: degrees, within the mechanical window of the linkage.
    Angle(u16),

    /// Release the servo, no pulse is sent
    Neutral
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteerDirective {

    /// Get the servo PWM duty cycle for this directive.
    ///
    /// The conversion is `duty = angle/18 + 2`, mapping 0 to 180 degrees
    /// onto the 2 to 12 percent pulse range of a 50 Hz hobby servo. This is
    /// a hardware contract and must be reproduced exactly. `Neutral` gives a
    /// zero duty, which releases the servo.
    ///
    /// Units: percent
    pub fn servo_duty(&self) -> f64 {
        match self {
            SteerDirective::Angle(a) => *a as f64 / 18.0 + 2.0,
            SteerDirective::Neutral => 0.0
        }
    }
}
