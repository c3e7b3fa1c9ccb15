//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: the
//! operator message set, the encoded video frame container, and the message
//! channel abstraction implemented by transports.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator message definitions (inbound commands and outbound telemetry)
pub mod msg;

/// Encoded video frame container
pub mod frame;

/// Message channel abstraction
pub mod channel;

/// Reference TCP transport (simple I/O wrapper, no core logic)
pub mod net;
