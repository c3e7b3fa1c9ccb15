//! # Session coordinator module
//!
//! The session coordinator binds one connected operator to the hardware: it
//! claims the actuator singletons on connect, routes commands through the
//! input mapper into the control session, relays idle toggles to the stream
//! worker, and tears everything down (fail-safe stop included) on
//! disconnect.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;

// Internal
use comms_if::msg::{Command, DeviceTarget, TelemetryMsg};

use crate::actuator::{
    ActuatorError, CameraMountPort, HardwareHandles, HardwareRegistry,
    RegistryError
};
use crate::ctrl_session::{ControlSession, SessionMode};
use crate::input_map::{self, Params};
use crate::stream_worker::StreamWorker;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Coordinator for one operator session.
///
/// Owns the control session and the stream worker for the connection's
/// lifetime. Created by [`SessionCoordinator::on_connect`], consumed by
/// [`SessionCoordinator::on_disconnect`].
pub struct SessionCoordinator {
    ctrl: ControlSession,

    mount: Box<dyn CameraMountPort + Send>,

    stream: StreamWorker,

    telem: Sender<TelemetryMsg>,

    map_params: Params
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can refuse a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not claim the hardware: {0}")]
    HardwareUnavailable(RegistryError),

    #[error("Could not reset the hardware to neutral: {0}")]
    NeutralResetFailed(ActuatorError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SessionCoordinator {

    /// Start a session for a newly connected operator.
    ///
    /// Claims the hardware singletons, resets the actuators and camera mount
    /// to neutral and starts the stream worker. If any of this fails the
    /// hardware is handed straight back and no partial session exists.
    pub fn on_connect(
        registry: &mut HardwareRegistry,
        telem: Sender<TelemetryMsg>,
        map_params: Params,
        stream_period: Duration
    ) -> Result<Self, SessionError> {
        let handles = registry.claim_once()
            .map_err(SessionError::HardwareUnavailable)?;

        let HardwareHandles {
            mut actuators,
            mut mount,
            frames
        } = handles;

        // Everything neutral before the operator gets control
        let reset_result = actuators.stop_motor()
            .and_then(|_| actuators.release_steer())
            .and_then(|_| mount.reset());

        if let Err(e) = reset_result {
            registry.release(HardwareHandles {
                actuators,
                mount,
                frames
            });
            return Err(SessionError::NeutralResetFailed(e))
        }

        let stream = StreamWorker::start(frames, telem.clone(), stream_period);

        info!("Session started");

        Ok(Self {
            ctrl: ControlSession::new(actuators),
            mount,
            stream,
            telem,
            map_params
        })
    }

    /// Route an operator command to the device it targets.
    ///
    /// Processed commands are acknowledged with a `command_status` echo.
    /// Actuator errors are logged and the echo withheld, a single bad
    /// hardware write is not fatal to the session.
    pub fn on_command(&mut self, cmd: &Command) {
        match cmd.device {
            DeviceTarget::Vehicle => {
                let (drive, steer) = input_map::map(cmd, &self.map_params);

                if let Err(e) = self.ctrl.apply(drive, steer) {
                    warn!("Could not apply a drive command: {}", e);
                    return
                }
            },
            DeviceTarget::CameraMount => {
                let directive = input_map::map_mount(cmd);

                let result = self.mount.step_pan(directive.pan)
                    .and_then(|_| self.mount.step_tilt(directive.tilt));

                if let Err(e) = result {
                    warn!("Could not move the camera mount: {}", e);
                    return
                }
            }
        }

        if self.telem.send(TelemetryMsg::CommandStatus(*cmd)).is_err() {
            warn!("Could not acknowledge the command, telemetry sink closed");
        }
    }

    /// Fail-safe entry point for a reported latency problem.
    ///
    /// Stops the vehicle unconditionally, whatever the session state.
    pub fn on_latency_problem(&mut self) {
        warn!("Latency problem reported, stopping the vehicle");

        self.ctrl.emergency_stop();
    }

    /// Relay an idle toggle.
    ///
    /// Idling pauses the stream worker and flags the control session
    /// inactive. It never stops the worker and never touches the actuators,
    /// resuming must stay cheap.
    pub fn on_idle(&mut self, is_idle: bool) {
        if is_idle {
            self.stream.pause();
        }
        else {
            self.stream.resume();
        }

        self.ctrl.toggle_active(!is_idle);
    }

    /// Relay a light toggle.
    pub fn on_light(&mut self, on: bool) {
        if let Err(e) = self.ctrl.set_light(on) {
            warn!("Could not switch the light: {}", e);
        }
    }

    /// End the session.
    ///
    /// Stops the stream worker, forces the fail-safe stop and returns the
    /// hardware claims to the registry.
    pub fn on_disconnect(mut self, registry: &mut HardwareRegistry) {
        let frames = self.stream.stop();

        // Actuators must never stay energised past the session
        let actuators = self.ctrl.disconnect();

        match frames {
            Some(frames) => registry.release(HardwareHandles {
                actuators,
                mount: self.mount,
                frames
            }),
            // Without the producer the claim cannot be rearmed, further
            // sessions are refused rather than given half the hardware
            None => log::error!(
                "Stream worker lost the camera handle, hardware claim \
                abandoned"
            )
        }

        info!("Session ended");
    }

    /// Get the control session mode.
    pub fn mode(&self) -> SessionMode {
        self.ctrl.mode()
    }

    /// True if the stream worker is currently paused.
    pub fn is_stream_paused(&self) -> bool {
        self.stream.is_paused()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::actuator::sim::{
        SimActuators, SimActuatorState, SimMount, SimMountState
    };
    use crate::actuator::{PAN_HOME_DEG, TILT_HOME_DEG};
    use crate::frame_producer::TestPatternProducer;
    use crate::input_map::MotorDirection;
    use comms_if::msg::DeviceTarget;
    use std::sync::mpsc::{channel, Receiver};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    struct TestRig {
        registry: HardwareRegistry,
        act_state: Arc<Mutex<SimActuatorState>>,
        mount_state: Arc<Mutex<SimMountState>>,
        telem_rx: Receiver<TelemetryMsg>,
        telem_tx: Sender<TelemetryMsg>
    }

    fn test_rig() -> TestRig {
        let actuators = SimActuators::new();
        let act_state = actuators.state_handle();

        let mount = SimMount::new();
        let mount_state = mount.state_handle();

        let registry = HardwareRegistry::new(HardwareHandles {
            actuators: Box::new(actuators),
            mount: Box::new(mount),
            frames: Box::new(TestPatternProducer::new(16, 12, 50))
        });

        let (telem_tx, telem_rx) = channel();

        TestRig {
            registry,
            act_state,
            mount_state,
            telem_rx,
            telem_tx
        }
    }

    fn connect(rig: &mut TestRig) -> SessionCoordinator {
        SessionCoordinator::on_connect(
            &mut rig.registry,
            rig.telem_tx.clone(),
            Params::default(),
            Duration::from_millis(5)
        ).unwrap()
    }

    fn vehicle_cmd(drive: Option<i32>, steer: Option<i32>) -> Command {
        Command {
            device: DeviceTarget::Vehicle,
            drive,
            steer
        }
    }

    #[test]
    fn test_connect_claims_and_streams() {
        let mut rig = test_rig();

        let session = connect(&mut rig);
        assert!(rig.registry.is_claimed());

        // Frames arrive without any command being sent
        thread::sleep(Duration::from_millis(50));
        let got_frame = rig.telem_rx.try_iter().any(|tm| matches!(
            tm,
            TelemetryMsg::VideoFrame { .. }
        ));
        assert!(got_frame);

        session.on_disconnect(&mut rig.registry);
    }

    #[test]
    fn test_second_session_refused() {
        let mut rig = test_rig();

        let session = connect(&mut rig);

        let second = SessionCoordinator::on_connect(
            &mut rig.registry,
            rig.telem_tx.clone(),
            Params::default(),
            Duration::from_millis(5)
        );
        assert!(matches!(
            second,
            Err(SessionError::HardwareUnavailable(_))
        ));

        session.on_disconnect(&mut rig.registry);
    }

    #[test]
    fn test_command_drives_and_acknowledges() {
        let mut rig = test_rig();
        let mut session = connect(&mut rig);

        session.on_command(&vehicle_cmd(Some(100), None));

        {
            let s = rig.act_state.lock().unwrap();
            assert_eq!(s.motor_direction, MotorDirection::Forward);
            assert_eq!(s.motor_duty, 45);
            assert_eq!(s.steer_duty, 0.0);
        }

        // The processed command is echoed back
        let echoed = rig.telem_rx.try_iter().any(|tm| match tm {
            TelemetryMsg::CommandStatus(cmd) => cmd.drive == Some(100),
            _ => false
        });
        assert!(echoed);

        session.on_disconnect(&mut rig.registry);
    }

    #[test]
    fn test_mount_command_steps_servos() {
        let mut rig = test_rig();
        let mut session = connect(&mut rig);

        session.on_command(&Command {
            device: DeviceTarget::CameraMount,
            drive: Some(50),
            steer: Some(-50)
        });

        {
            let s = rig.mount_state.lock().unwrap();
            assert_eq!(s.pan_deg, PAN_HOME_DEG - 5.0);
            assert_eq!(s.tilt_deg, TILT_HOME_DEG + 5.0);
        }

        session.on_disconnect(&mut rig.registry);
    }

    #[test]
    fn test_latency_problem_de_energises() {
        let mut rig = test_rig();
        let mut session = connect(&mut rig);

        // Full throttle in flight when the report arrives
        session.on_command(&vehicle_cmd(Some(100_000), Some(50)));
        assert_eq!(rig.act_state.lock().unwrap().motor_duty, 90);

        session.on_latency_problem();

        let s = *rig.act_state.lock().unwrap();
        assert_eq!(s.motor_direction, MotorDirection::Stop);
        assert_eq!(s.motor_duty, 0);
        assert_eq!(s.steer_duty, 0.0);
        assert_eq!(session.mode(), SessionMode::Stopped);

        session.on_disconnect(&mut rig.registry);
    }

    #[test]
    fn test_idle_pauses_stream_only() {
        let mut rig = test_rig();
        let mut session = connect(&mut rig);

        session.on_command(&vehicle_cmd(Some(100), Some(10)));
        let before = *rig.act_state.lock().unwrap();

        session.on_idle(true);
        assert!(session.is_stream_paused());

        // The actuators are untouched by going idle
        assert_eq!(*rig.act_state.lock().unwrap(), before);

        session.on_idle(false);
        assert!(!session.is_stream_paused());

        session.on_disconnect(&mut rig.registry);
    }

    #[test]
    fn test_light_toggle() {
        let mut rig = test_rig();
        let mut session = connect(&mut rig);

        session.on_light(true);
        assert!(rig.act_state.lock().unwrap().light_on);

        session.on_light(false);
        assert!(!rig.act_state.lock().unwrap().light_on);

        session.on_disconnect(&mut rig.registry);
    }

    #[test]
    fn test_disconnect_stops_and_releases() {
        let mut rig = test_rig();
        let mut session = connect(&mut rig);

        session.on_command(&vehicle_cmd(Some(200), Some(-100)));

        session.on_disconnect(&mut rig.registry);

        // Hardware is back in the registry and fully de-energised
        assert!(!rig.registry.is_claimed());

        let s = rig.act_state.lock().unwrap();
        assert_eq!(s.motor_direction, MotorDirection::Stop);
        assert_eq!(s.motor_duty, 0);
        assert_eq!(s.steer_duty, 0.0);
        drop(s);

        // And a new session can claim it again
        let session = connect(&mut rig);
        session.on_disconnect(&mut rig.registry);
    }
}
