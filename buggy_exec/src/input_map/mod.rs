//! # Input mapping module
//!
//! Pure functions turning raw joystick commands into actuator directives.
//! This is the algorithmic heart of the control core: symmetric saturation
//! of the raw deflections, direction and duty cycle derivation for the drive
//! motor, steering angle derivation for the servo, and the sign-only pan and
//! tilt stepping for the camera mount.
//!
//! All functions here are total over the integers. Out of range inputs are
//! clamped, never rejected, so mapping can never fail.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod directive;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use directive::*;
pub use params::*;

use comms_if::msg::Command;
use util::maths;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Duty cycle produced by a full-scale drive deflection, before the throttle
/// window is applied.
///
/// Units: percent
const FULL_SCALE_DUTY: f64 = 90.0;

/// Angle produced by a full-scale steer deflection.
///
/// Units: degrees
const FULL_SCALE_ANGLE: f64 = 180.0;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a raw drive deflection into a drive directive.
///
/// A released axis (`None`) maps to a full stop with no duty. Otherwise the
/// deflection is clamped to `[-drive_sensitivity, +drive_sensitivity]`, the
/// sign selects the direction (strictly positive is forward, zero or
/// negative is reverse, see the note below), and the magnitude is rescaled
/// to a duty cycle which is then clamped into the throttle window
/// `[min_throttle_value, max_throttle_value]`.
///
/// The second clamp means a deflection too small to move the vehicle is
/// floored up to the minimum effective throttle rather than producing a weak
/// signal that draws power without motion.
///
/// # Notes
/// - The zero-deflection tie-break (exactly 0 maps to reverse) matches the
///   behaviour of the deployed vehicles and is kept for compatibility, see
///   DESIGN.md.
pub fn map_drive(raw: Option<i32>, params: &Params) -> DriveDirective {
    let raw = match raw {
        Some(r) => r,
        None => return DriveDirective {
            direction: MotorDirection::Stop,
            duty_percent: 0
        }
    };

    let sensitivity = params.drive_sensitivity;

    // Symmetric saturation, not wraparound
    let clamped = maths::clamp(&raw, &-sensitivity, &sensitivity);

    let direction = if clamped > 0 {
        MotorDirection::Forward
    }
    else {
        MotorDirection::Reverse
    };

    // Rescale the magnitude to a duty cycle
    let duty = ((clamped.abs() as f64 / sensitivity as f64)
        * FULL_SCALE_DUTY)
        .round() as u8;

    // Floor weak demands up to the motion threshold, cap strong ones at the
    // safe ceiling
    let duty_percent = maths::clamp(
        &duty,
        &params.min_throttle_value,
        &params.max_throttle_value
    );

    DriveDirective {
        direction,
        duty_percent
    }
}

/// Map a raw steer deflection into a steer directive.
///
/// A released axis (`None`) maps to `Neutral`, which releases the servo (no
/// pulse). Otherwise the deflection is clamped to
/// `[-steer_sensitivity, +steer_sensitivity]`, negated, shifted into
/// `[0, 2 * sensitivity]` and rescaled to degrees, then clamped into the
/// mechanical window `[min_steer_angle, max_steer_angle]`.
///
/// The negation encodes that a positive joystick deflection must decrease
/// the angle value. This is the convention of the physical steering linkage
/// and must not be changed.
pub fn map_steer(raw: Option<i32>, params: &Params) -> SteerDirective {
    let raw = match raw {
        Some(r) => r,
        None => return SteerDirective::Neutral
    };

    let sensitivity = params.steer_sensitivity;

    let clamped = maths::clamp(&raw, &-sensitivity, &sensitivity);

    // Negate for the linkage convention, then shift into [0, 2s]
    let shifted = -clamped + sensitivity;

    let angle = maths::lin_map(
        (0.0, 2.0 * sensitivity as f64),
        (0.0, FULL_SCALE_ANGLE),
        shifted as f64
    ).round() as u16;

    let angle = maths::clamp(
        &angle,
        &params.min_steer_angle,
        &params.max_steer_angle
    );

    SteerDirective::Angle(angle)
}

/// Map a vehicle-target command into its drive and steer directives.
pub fn map(cmd: &Command, params: &Params) -> (DriveDirective, SteerDirective) {
    (
        map_drive(cmd.drive, params),
        map_steer(cmd.steer, params)
    )
}

/// Map a camera-mount-target command into a mount directive.
///
/// Mount control is sign-only: the steer axis pans (positive pans right),
/// the drive axis tilts (positive tilts up), magnitudes are ignored. A
/// released or centred axis holds the mount still.
pub fn map_mount(cmd: &Command) -> MountDirective {
    MountDirective {
        pan: step_from_sign(cmd.steer),
        tilt: step_from_sign(cmd.drive)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the mount step corresponding to a raw axis value's sign.
fn step_from_sign(raw: Option<i32>) -> MountStep {
    match raw {
        Some(r) if r > 0 => MountStep::Increase,
        Some(r) if r < 0 => MountStep::Decrease,
        _ => MountStep::Hold
    }
}
