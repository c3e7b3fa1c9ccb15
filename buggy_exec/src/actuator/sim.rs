//! Simulated actuator implementations
//!
//! These stand in for the real pin and PWM hardware on workstation builds,
//! recording the last outputs so tests can assert on the actuator state the
//! control core produced.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use std::sync::{Arc, Mutex};

// Internal
use super::{
    step_angle, ActuatorError, ActuatorPort, CameraMountPort,
    PAN_HOME_DEG, TILT_HOME_DEG
};
use crate::input_map::{MotorDirection, MountStep};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Recorded output state of the simulated vehicle actuators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimActuatorState {
    /// Last commanded motor direction
    pub motor_direction: MotorDirection,

    /// Last commanded motor duty cycle in percent
    pub motor_duty: u8,

    /// Last commanded steering servo duty cycle in percent
    pub steer_duty: f64,

    /// Current light output
    pub light_on: bool
}

/// Simulated vehicle actuators.
pub struct SimActuators {
    state: Arc<Mutex<SimActuatorState>>
}

/// Recorded state of the simulated camera mount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimMountState {
    /// Current pan angle in degrees
    pub pan_deg: f64,

    /// Current tilt angle in degrees
    pub tilt_deg: f64
}

/// Simulated pan/tilt camera mount.
pub struct SimMount {
    state: Arc<Mutex<SimMountState>>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimActuatorState {
    fn default() -> Self {
        SimActuatorState {
            motor_direction: MotorDirection::Stop,
            motor_duty: 0,
            steer_duty: 0.0,
            light_on: false
        }
    }
}

impl SimActuators {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimActuatorState::default()))
        }
    }

    /// Get a shared handle on the recorded state, used by tests to observe
    /// the outputs after the port has been moved into a session.
    pub fn state_handle(&self) -> Arc<Mutex<SimActuatorState>> {
        self.state.clone()
    }
}

impl ActuatorPort for SimActuators {
    fn drive_motor(
        &mut self,
        direction: MotorDirection,
        duty_percent: u8
    ) -> Result<(), ActuatorError> {
        let mut state = self.state.lock().unwrap();

        match direction {
            MotorDirection::Stop => {
                state.motor_direction = MotorDirection::Stop;
                state.motor_duty = 0;
            },
            d => {
                state.motor_direction = d;
                state.motor_duty = duty_percent;
            }
        }

        trace!(
            "sim motor: {:?} at {}%",
            state.motor_direction, state.motor_duty
        );

        Ok(())
    }

    fn stop_motor(&mut self) -> Result<(), ActuatorError> {
        let mut state = self.state.lock().unwrap();

        state.motor_direction = MotorDirection::Stop;
        state.motor_duty = 0;

        trace!("sim motor: stopped");

        Ok(())
    }

    fn set_steer_duty(&mut self, duty_percent: f64) -> Result<(), ActuatorError> {
        if !(0.0..=100.0).contains(&duty_percent) {
            return Err(ActuatorError::InvalidDutyCycle(duty_percent))
        }

        self.state.lock().unwrap().steer_duty = duty_percent;

        trace!("sim steer: {:.2}%", duty_percent);

        Ok(())
    }

    fn release_steer(&mut self) -> Result<(), ActuatorError> {
        self.state.lock().unwrap().steer_duty = 0.0;

        trace!("sim steer: released");

        Ok(())
    }

    fn set_light(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.state.lock().unwrap().light_on = on;

        trace!("sim light: {}", on);

        Ok(())
    }
}

impl SimMount {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimMountState {
                pan_deg: PAN_HOME_DEG,
                tilt_deg: TILT_HOME_DEG
            }))
        }
    }

    /// Get a shared handle on the recorded state.
    pub fn state_handle(&self) -> Arc<Mutex<SimMountState>> {
        self.state.clone()
    }
}

impl CameraMountPort for SimMount {
    fn step_pan(&mut self, step: MountStep) -> Result<(), ActuatorError> {
        let mut state = self.state.lock().unwrap();

        state.pan_deg = step_angle(state.pan_deg, step);

        trace!("sim mount pan: {:.1} deg", state.pan_deg);

        Ok(())
    }

    fn step_tilt(&mut self, step: MountStep) -> Result<(), ActuatorError> {
        let mut state = self.state.lock().unwrap();

        state.tilt_deg = step_angle(state.tilt_deg, step);

        trace!("sim mount tilt: {:.1} deg", state.tilt_deg);

        Ok(())
    }

    fn reset(&mut self) -> Result<(), ActuatorError> {
        let mut state = self.state.lock().unwrap();

        state.pan_deg = PAN_HOME_DEG;
        state.tilt_deg = TILT_HOME_DEG;

        trace!("sim mount: reset to home");

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_actuators_record_outputs() {
        let mut actuators = SimActuators::new();
        let state = actuators.state_handle();

        actuators.drive_motor(MotorDirection::Forward, 45).unwrap();
        actuators.set_steer_duty(7.0).unwrap();

        {
            let s = state.lock().unwrap();
            assert_eq!(s.motor_direction, MotorDirection::Forward);
            assert_eq!(s.motor_duty, 45);
            assert_eq!(s.steer_duty, 7.0);
        }

        actuators.stop_motor().unwrap();
        actuators.release_steer().unwrap();

        let s = state.lock().unwrap();
        assert_eq!(s.motor_direction, MotorDirection::Stop);
        assert_eq!(s.motor_duty, 0);
        assert_eq!(s.steer_duty, 0.0);
    }

    #[test]
    fn test_sim_steer_rejects_bad_duty() {
        let mut actuators = SimActuators::new();

        assert!(actuators.set_steer_duty(-1.0).is_err());
        assert!(actuators.set_steer_duty(100.5).is_err());
    }

    #[test]
    fn test_sim_mount_steps_and_resets() {
        let mut mount = SimMount::new();
        let state = mount.state_handle();

        mount.step_pan(MountStep::Decrease).unwrap();
        mount.step_tilt(MountStep::Increase).unwrap();

        {
            let s = state.lock().unwrap();
            assert_eq!(s.pan_deg, PAN_HOME_DEG - 5.0);
            assert_eq!(s.tilt_deg, TILT_HOME_DEG + 5.0);
        }

        mount.reset().unwrap();

        let s = state.lock().unwrap();
        assert_eq!(s.pan_deg, PAN_HOME_DEG);
        assert_eq!(s.tilt_deg, TILT_HOME_DEG);
    }
}
