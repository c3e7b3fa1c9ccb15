//! # Network Module
//!
//! Reference transport for the operator link: newline-delimited JSON packets
//! over a single TCP connection. This is a plain I/O wrapper around the
//! [`MessageChannel`] contract, it contains no control logic of its own and
//! can be swapped for any other transport implementing the trait.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use log::{info, warn};

use crate::channel::{ChannelError, ClientEvent, MessageChannel};
use crate::msg::{OperatorMsg, TelemetryMsg};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum time a read may block waiting for client data. Keeps the event
/// pump responsive while leaving writes blocking.
const RECV_TIMEOUT_MS: u64 = 5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A [`MessageChannel`] carrying JSON lines over TCP.
///
/// Accepts at most one operator client at a time. Connection and
/// disconnection are surfaced as [`ClientEvent`]s from the accept and
/// end-of-stream conditions.
pub struct JsonLinesChannel {
    listener: TcpListener,

    client: Option<TcpStream>,

    read_buf: Vec<u8>,

    pending: VecDeque<ClientEvent>
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JsonLinesChannel {

    /// Bind the channel to the given endpoint, for example `0.0.0.0:8000`.
    ///
    /// This function does not wait for a client to connect.
    pub fn bind(endpoint: &str) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(endpoint)
            .map_err(ChannelError::BindError)?;

        listener.set_nonblocking(true)
            .map_err(ChannelError::BindError)?;

        info!("Operator channel listening on {}", endpoint);

        Ok(Self {
            listener,
            client: None,
            read_buf: Vec::new(),
            pending: VecDeque::new()
        })
    }

    /// Get the local address the channel is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Try to accept a new client if none is connected.
    fn poll_accept(&mut self) {
        if self.client.is_some() {
            return
        }

        match self.listener.accept() {
            Ok((stream, addr)) => {
                info!("Operator client connected from {}", addr);

                // Short read timeout so polls don't stall the event pump,
                // writes stay blocking.
                if let Err(e) = stream.set_read_timeout(
                    Some(Duration::from_millis(RECV_TIMEOUT_MS))
                ) {
                    warn!("Could not set the client read timeout: {}", e);
                }

                self.client = Some(stream);
                self.pending.push_back(ClientEvent::Connected);
            },
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => (),
            Err(e) => warn!("Error accepting a client connection: {}", e)
        }
    }

    /// Read any available bytes from the client and queue complete messages.
    fn poll_read(&mut self) {
        let mut lost_client = false;

        if let Some(ref mut stream) = self.client {
            let mut chunk = [0u8; 4096];

            match stream.read(&mut chunk) {
                // End of stream, the client has gone
                Ok(0) => lost_client = true,
                Ok(n) => self.read_buf.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock
                    || e.kind() == ErrorKind::TimedOut => (),
                Err(e) => {
                    warn!("Error reading from the client: {}", e);
                    lost_client = true
                }
            }
        }

        // Drain complete lines out of the buffer
        while let Some(pos) = self.read_buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.read_buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            if line.is_empty() {
                continue
            }

            match OperatorMsg::from_json(line) {
                Ok(m) => self.pending.push_back(ClientEvent::Message(m)),
                Err(e) => warn!("Could not deserialise message: {}", e)
            }
        }

        if lost_client {
            self.drop_client();
        }
    }

    /// Forget the current client, surfacing a disconnect event.
    fn drop_client(&mut self) {
        info!("Operator client disconnected");

        self.client = None;
        self.read_buf.clear();
        self.pending.push_back(ClientEvent::Disconnected);
    }
}

impl MessageChannel for JsonLinesChannel {

    fn poll_event(&mut self) -> Option<ClientEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event)
        }

        self.poll_accept();
        self.poll_read();

        self.pending.pop_front()
    }

    fn send(&mut self, msg: &TelemetryMsg) -> Result<(), ChannelError> {
        let stream = match self.client {
            Some(ref mut s) => s,
            None => return Err(ChannelError::NotConnected)
        };

        let mut packet = msg.to_json();
        packet.push('\n');

        match stream.write_all(packet.as_bytes()) {
            Ok(_) => Ok(()),
            Err(e) => {
                // A failed write means the client is unusable, surface the
                // disconnect so the session is torn down cleanly.
                self.drop_client();
                Err(ChannelError::SendError(e))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::msg::{Command, DeviceTarget};
    use std::io::BufRead;
    use std::thread;
    use std::time::Duration;

    /// Poll the channel until an event arrives or the tries run out.
    fn wait_event(channel: &mut JsonLinesChannel) -> Option<ClientEvent> {
        for _ in 0..100 {
            if let Some(event) = channel.poll_event() {
                return Some(event)
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_connect_message_disconnect() {
        let mut channel = JsonLinesChannel::bind("127.0.0.1:0").unwrap();
        let addr = channel.local_addr().unwrap();

        let mut client = std::net::TcpStream::connect(addr).unwrap();

        assert!(matches!(
            wait_event(&mut channel),
            Some(ClientEvent::Connected)
        ));

        client.write_all(
            b"{\"type\": \"command\", \"device\": \"vehicle\", \
            \"drive\": 42, \"steer\": null}\n"
        ).unwrap();

        match wait_event(&mut channel) {
            Some(ClientEvent::Message(OperatorMsg::Command(cmd))) => {
                assert_eq!(cmd.drive, Some(42));
            },
            e => panic!("Expected a command, got {:?}", e)
        }

        // Telemetry goes back as one JSON line
        channel.send(&TelemetryMsg::CommandStatus(Command {
            device: DeviceTarget::Vehicle,
            drive: Some(42),
            steer: None
        })).unwrap();

        let mut reader = std::io::BufReader::new(client.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert!(line.contains("\"command_status\""));

        // Closing the client surfaces a disconnect
        drop(reader);
        drop(client);

        assert!(matches!(
            wait_event(&mut channel),
            Some(ClientEvent::Disconnected)
        ));
    }

    #[test]
    fn test_send_without_client() {
        let mut channel = JsonLinesChannel::bind("127.0.0.1:0").unwrap();

        assert!(matches!(
            channel.send(&TelemetryMsg::VideoFrame {
                image: String::new()
            }),
            Err(ChannelError::NotConnected)
        ));
    }
}
