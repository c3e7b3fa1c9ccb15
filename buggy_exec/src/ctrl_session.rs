//! # Control session module
//!
//! A control session owns the actuator port for one connected operator and
//! applies mapped directives to it under the safety rules: the fail-safe
//! stop path is unconditional and idempotent, and the idle toggle never
//! touches the actuators.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, trace, warn};

// Internal
use crate::actuator::{ActuatorError, ActuatorPort};
use crate::input_map::{DriveDirective, MotorDirection, SteerDirective};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The control session for one connected operator.
pub struct ControlSession {
    port: Box<dyn ActuatorPort + Send>,

    mode: SessionMode,

    /// The last directive pair applied, kept for telemetry and diagnostics.
    /// The fail-safe path never reads this.
    last_directive: Option<(DriveDirective, SteerDirective)>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Session state machine.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SessionMode {
    /// Connected but not currently driving
    Idle,

    /// Actively driving
    Active,

    /// Brought to a stop by a neutral command or the fail-safe path
    Stopped,

    /// Terminal, the operator has gone away
    Disconnected
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlSession {

    /// Create a new session around the claimed actuator port.
    pub fn new(port: Box<dyn ActuatorPort + Send>) -> Self {
        Self {
            port,
            mode: SessionMode::Idle,
            last_directive: None
        }
    }

    /// Apply a mapped directive pair to the actuators.
    ///
    /// A fully neutral pair (both axes released) stops the vehicle and moves
    /// the session to `Stopped`. Any other pair (re)enters `Active`.
    pub fn apply(
        &mut self,
        drive: DriveDirective,
        steer: SteerDirective
    ) -> Result<(), ActuatorError> {
        if self.mode == SessionMode::Disconnected {
            warn!("Directive received after disconnect, ignored");
            return Ok(())
        }

        let neutral = drive.direction == MotorDirection::Stop
            && steer == SteerDirective::Neutral;

        match drive.direction {
            MotorDirection::Stop => self.port.stop_motor()?,
            direction => self.port.drive_motor(direction, drive.duty_percent)?
        }

        match steer {
            SteerDirective::Neutral => self.port.release_steer()?,
            angle => self.port.set_steer_duty(angle.servo_duty())?
        }

        self.last_directive = Some((drive, steer));

        self.mode = if neutral {
            SessionMode::Stopped
        }
        else {
            SessionMode::Active
        };

        trace!("Applied {:?} / {:?}, mode {:?}", drive, steer, self.mode);

        Ok(())
    }

    /// Fail-safe stop: unconditionally de-energise every actuator output.
    ///
    /// Idempotent, independent of the current state and of whatever the last
    /// directive was. Actuator errors on this path are logged and swallowed,
    /// stopping must always run to completion.
    pub fn emergency_stop(&mut self) {
        if let Err(e) = self.port.stop_motor() {
            error!("Fail-safe motor stop failed: {}", e);
        }

        if let Err(e) = self.port.release_steer() {
            error!("Fail-safe steer release failed: {}", e);
        }

        if self.mode != SessionMode::Disconnected {
            self.mode = SessionMode::Stopped;
        }

        debug!("Emergency stop complete");
    }

    /// Toggle between the idle and active states.
    ///
    /// This only flips the state flag. It must not stop the actuators, the
    /// driving safety stop is a separate path to the streaming pause.
    pub fn toggle_active(&mut self, active: bool) {
        match (self.mode, active) {
            (SessionMode::Active, false) => self.mode = SessionMode::Idle,
            (SessionMode::Idle, true) => self.mode = SessionMode::Active,
            _ => ()
        }

        trace!("Active toggled to {}, mode {:?}", active, self.mode);
    }

    /// Switch the auxiliary light output.
    pub fn set_light(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.port.set_light(on)
    }

    /// End the session, stopping everything and releasing the port handle.
    pub fn disconnect(mut self) -> Box<dyn ActuatorPort + Send> {
        self.emergency_stop();
        self.mode = SessionMode::Disconnected;

        self.port
    }

    /// Get the current session mode.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Get the last directive pair applied.
    pub fn last_directive(&self) -> Option<(DriveDirective, SteerDirective)> {
        self.last_directive
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::actuator::sim::SimActuators;

    fn test_session() -> (ControlSession, std::sync::Arc<std::sync::Mutex<
        crate::actuator::sim::SimActuatorState
    >>) {
        let actuators = SimActuators::new();
        let state = actuators.state_handle();

        (ControlSession::new(Box::new(actuators)), state)
    }

    #[test]
    fn test_apply_forward_drive() {
        let (mut session, state) = test_session();

        session.apply(
            DriveDirective {
                direction: MotorDirection::Forward,
                duty_percent: 45
            },
            SteerDirective::Angle(90)
        ).unwrap();

        let s = state.lock().unwrap();
        assert_eq!(s.motor_direction, MotorDirection::Forward);
        assert_eq!(s.motor_duty, 45);
        assert_eq!(s.steer_duty, 7.0);

        assert_eq!(session.mode(), SessionMode::Active);
    }

    #[test]
    fn test_neutral_command_stops_session() {
        let (mut session, state) = test_session();

        session.apply(
            DriveDirective {
                direction: MotorDirection::Forward,
                duty_percent: 90
            },
            SteerDirective::Angle(110)
        ).unwrap();
        assert_eq!(session.mode(), SessionMode::Active);

        // Both axes released
        session.apply(
            DriveDirective {
                direction: MotorDirection::Stop,
                duty_percent: 0
            },
            SteerDirective::Neutral
        ).unwrap();

        assert_eq!(session.mode(), SessionMode::Stopped);

        let s = state.lock().unwrap();
        assert_eq!(s.motor_direction, MotorDirection::Stop);
        assert_eq!(s.motor_duty, 0);
        assert_eq!(s.steer_duty, 0.0);
    }

    #[test]
    fn test_emergency_stop_de_energises_everything() {
        let (mut session, state) = test_session();

        // Full throttle in flight
        session.apply(
            DriveDirective {
                direction: MotorDirection::Forward,
                duty_percent: 90
            },
            SteerDirective::Angle(110)
        ).unwrap();

        session.emergency_stop();

        let s = *state.lock().unwrap();
        assert_eq!(s.motor_direction, MotorDirection::Stop);
        assert_eq!(s.motor_duty, 0);
        assert_eq!(s.steer_duty, 0.0);
        assert_eq!(session.mode(), SessionMode::Stopped);

        // Idempotent: a second stop leaves the same actuator state
        session.emergency_stop();
        assert_eq!(*state.lock().unwrap(), s);
    }

    #[test]
    fn test_emergency_stop_without_prior_directive() {
        // The fail-safe must not depend on a directive ever having existed
        let (mut session, state) = test_session();

        session.emergency_stop();

        let s = state.lock().unwrap();
        assert_eq!(s.motor_direction, MotorDirection::Stop);
        assert_eq!(s.steer_duty, 0.0);
    }

    #[test]
    fn test_stopped_session_reactivates_on_command() {
        let (mut session, _state) = test_session();

        session.emergency_stop();
        assert_eq!(session.mode(), SessionMode::Stopped);

        session.apply(
            DriveDirective {
                direction: MotorDirection::Reverse,
                duty_percent: 40
            },
            SteerDirective::Neutral
        ).unwrap();

        assert_eq!(session.mode(), SessionMode::Active);
    }

    #[test]
    fn test_toggle_active_does_not_touch_actuators() {
        let (mut session, state) = test_session();

        session.apply(
            DriveDirective {
                direction: MotorDirection::Forward,
                duty_percent: 60
            },
            SteerDirective::Angle(80)
        ).unwrap();

        let before = *state.lock().unwrap();

        session.toggle_active(false);
        assert_eq!(session.mode(), SessionMode::Idle);

        // Actuator outputs unchanged by the idle toggle
        assert_eq!(*state.lock().unwrap(), before);

        session.toggle_active(true);
        assert_eq!(session.mode(), SessionMode::Active);
    }

    #[test]
    fn test_disconnect_stops_and_releases() {
        let (mut session, state) = test_session();

        session.apply(
            DriveDirective {
                direction: MotorDirection::Forward,
                duty_percent: 90
            },
            SteerDirective::Angle(100)
        ).unwrap();

        let _port = session.disconnect();

        let s = state.lock().unwrap();
        assert_eq!(s.motor_direction, MotorDirection::Stop);
        assert_eq!(s.steer_duty, 0.0);
    }
}
