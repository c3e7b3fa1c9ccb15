//! Process-wide hardware registry

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use thiserror::Error;

// Internal
use super::{ActuatorPort, CameraMountPort};
use crate::frame_producer::FrameProducer;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The set of hardware handles a session needs.
///
/// Motor driver, servos and camera are physical singletons, so exactly one
/// set of handles exists per process.
pub struct HardwareHandles {
    /// The vehicle's motor/servo/light actuators
    pub actuators: Box<dyn ActuatorPort + Send>,

    /// The pan/tilt camera mount
    pub mount: Box<dyn CameraMountPort + Send>,

    /// The camera frame source
    pub frames: Box<dyn FrameProducer + Send>
}

/// Registry owning the process-wide hardware singletons.
///
/// The hardware is claimed lazily by the first session to connect and must
/// be released before another claim can succeed. This makes the
/// one-active-session assumption explicit: a second concurrent claim is an
/// error, not a silent shared handle.
pub struct HardwareRegistry {
    handles: Option<HardwareHandles>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("The hardware is already claimed by another session")]
    AlreadyClaimed
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HardwareRegistry {

    /// Create a new registry owning the given handles.
    pub fn new(handles: HardwareHandles) -> Self {
        Self {
            handles: Some(handles)
        }
    }

    /// Claim the hardware for a session.
    ///
    /// Fails if the handles are currently held by another session.
    pub fn claim_once(&mut self) -> Result<HardwareHandles, RegistryError> {
        match self.handles.take() {
            Some(h) => {
                debug!("Hardware claimed");
                Ok(h)
            },
            None => {
                warn!("Hardware claim refused, already claimed");
                Err(RegistryError::AlreadyClaimed)
            }
        }
    }

    /// Return the hardware handles to the registry.
    pub fn release(&mut self, handles: HardwareHandles) {
        debug!("Hardware released");
        self.handles = Some(handles);
    }

    /// True if the hardware is currently claimed.
    pub fn is_claimed(&self) -> bool {
        self.handles.is_none()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::actuator::sim::{SimActuators, SimMount};
    use crate::frame_producer::TestPatternProducer;

    fn test_registry() -> HardwareRegistry {
        HardwareRegistry::new(HardwareHandles {
            actuators: Box::new(SimActuators::new()),
            mount: Box::new(SimMount::new()),
            frames: Box::new(TestPatternProducer::new(32, 24, 80))
        })
    }

    #[test]
    fn test_double_claim_rejected() {
        let mut registry = test_registry();

        let handles = registry.claim_once().unwrap();
        assert!(registry.is_claimed());

        assert!(matches!(
            registry.claim_once(),
            Err(RegistryError::AlreadyClaimed)
        ));

        registry.release(handles);
        assert!(!registry.is_claimed());

        // After a release the hardware can be claimed again
        assert!(registry.claim_once().is_ok());
    }
}
