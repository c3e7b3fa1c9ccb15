//! # Message channel abstraction
//!
//! The transport delivering operator messages and carrying telemetry is
//! owned by a collaborator. This module defines the whole contract the
//! vehicle software sees: a poll/send pair over [`ClientEvent`] and
//! [`TelemetryMsg`]. A loopback implementation is provided for tests and
//! bench runs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::{channel, Receiver, Sender};

use crate::msg::{OperatorMsg, TelemetryMsg};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Events surfaced by a message channel.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// An operator client has connected
    Connected,

    /// The operator client has disconnected
    Disconnected,

    /// A message from the connected client
    Message(OperatorMsg)
}

/// Errors which can occur on a message channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("No client is connected")]
    NotConnected,

    #[error("Could not bind the channel endpoint: {0}")]
    BindError(std::io::Error),

    #[error("Could not send data to the client: {0}")]
    SendError(std::io::Error)
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A bidirectional message channel to the operator station.
///
/// Implementations must be non-blocking: `poll_event` returns `None` when
/// nothing is pending rather than waiting.
pub trait MessageChannel {
    /// Get the next pending event from the channel, if any.
    fn poll_event(&mut self) -> Option<ClientEvent>;

    /// Send the given telemetry message to the connected client.
    fn send(&mut self, msg: &TelemetryMsg) -> Result<(), ChannelError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// In-memory [`MessageChannel`] implementation backed by mpsc queues.
///
/// The paired [`LoopbackEndpoint`] plays the operator station's role. Used
/// by unit tests and bench runs which have no real transport.
pub struct LoopbackChannel {
    events: Receiver<ClientEvent>,
    telem: Sender<TelemetryMsg>
}

/// The operator's end of a [`LoopbackChannel`].
pub struct LoopbackEndpoint {
    events: Sender<ClientEvent>,
    telem: Receiver<TelemetryMsg>
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LoopbackChannel {
    /// Create a connected channel/endpoint pair.
    pub fn new() -> (LoopbackChannel, LoopbackEndpoint) {
        let (event_tx, event_rx) = channel();
        let (telem_tx, telem_rx) = channel();

        (
            LoopbackChannel {
                events: event_rx,
                telem: telem_tx
            },
            LoopbackEndpoint {
                events: event_tx,
                telem: telem_rx
            }
        )
    }
}

impl MessageChannel for LoopbackChannel {
    fn poll_event(&mut self) -> Option<ClientEvent> {
        self.events.try_recv().ok()
    }

    fn send(&mut self, msg: &TelemetryMsg) -> Result<(), ChannelError> {
        self.telem.send(msg.clone())
            .map_err(|_| ChannelError::NotConnected)
    }
}

impl LoopbackEndpoint {
    /// Push an event towards the vehicle.
    pub fn send_event(&self, event: ClientEvent) {
        self.events.send(event).ok();
    }

    /// Get the next telemetry message from the vehicle, if any.
    pub fn recv_telemetry(&self) -> Option<TelemetryMsg> {
        self.telem.try_recv().ok()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::msg::{Command, DeviceTarget};

    #[test]
    fn test_loopback_round_trip() {
        let (mut channel, endpoint) = LoopbackChannel::new();

        endpoint.send_event(ClientEvent::Connected);
        endpoint.send_event(ClientEvent::Message(OperatorMsg::LatencyProblem));

        assert!(matches!(channel.poll_event(), Some(ClientEvent::Connected)));
        assert!(matches!(
            channel.poll_event(),
            Some(ClientEvent::Message(OperatorMsg::LatencyProblem))
        ));
        assert!(channel.poll_event().is_none());

        channel.send(&TelemetryMsg::CommandStatus(Command {
            device: DeviceTarget::Vehicle,
            drive: None,
            steer: None
        })).unwrap();

        assert!(endpoint.recv_telemetry().is_some());
    }
}
