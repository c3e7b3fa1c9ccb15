//! # Buggy library.
//!
//! This library hosts the control core of the teleoperated buggy: the
//! mapping from raw operator commands to actuator directives, the control
//! session applying them under the fail-safe rules, the frame streaming
//! worker, and the session coordinator tying one connected operator to the
//! hardware.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator capability traits, the hardware registry and the hardware
/// variants behind them
pub mod actuator;

/// Control session - applies mapped directives to the actuators and owns the
/// fail-safe stop path
pub mod ctrl_session;

/// Frame producer - captures, transforms and encodes single camera frames
pub mod frame_producer;

/// Input mapper - pure mapping from raw commands to actuator directives
pub mod input_map;

/// Exec-level parameters
pub mod params;

/// Session coordinator - binds one connected operator to the control session
/// and the stream worker
pub mod session_mgr;

/// Stream worker - cancellable periodic frame streaming loop
pub mod stream_worker;
