//! # Operator message module
//!
//! This module defines the messages exchanged with the operator station: the
//! inbound command set and the outbound telemetry set. Messages travel as
//! JSON packets tagged with a `type` field.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use serde_json::{self, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// All message types the operator station may send. Used to distinguish an
/// unknown type from a known type with a bad payload.
static KNOWN_MSG_TYPES: [&str; 4] = [
    "command",
    "latency_problem",
    "idle",
    "light"
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A raw control command from the operator's joysticks.
///
/// `drive` and `steer` are deflections in an arbitrary operator-defined
/// range, `None` meaning that axis has been released. Commands are transient,
/// one is built per inbound packet and consumed immediately.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Which device the command is aimed at
    pub device: DeviceTarget,

    /// Raw drive axis deflection, `None` if the axis is released
    pub drive: Option<i32>,

    /// Raw steer axis deflection, `None` if the axis is released
    pub steer: Option<i32>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Devices a [`Command`] can target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum DeviceTarget {
    /// The vehicle itself (drive motor and steering servo)
    #[serde(rename = "vehicle")]
    Vehicle,

    /// The pan/tilt camera mount
    #[serde(rename = "camera")]
    CameraMount
}

/// Messages sent by the operator station to the vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatorMsg {
    /// A joystick command for the vehicle or camera mount
    Command(Command),

    /// The operator station has detected a stale control link. The vehicle
    /// must stop immediately.
    LatencyProblem,

    /// The operator has gone idle (`active == false`) or become active
    /// again. Controls frame streaming only, never the actuators.
    Idle {
        active: bool
    },

    /// Toggle the auxiliary light output
    Light {
        on: bool
    }
}

/// Telemetry sent by the vehicle to the operator station.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryMsg {
    /// Echo of a processed command, acknowledging it was actioned
    CommandStatus(Command),

    /// One encoded video frame, base64 over the wire
    VideoFrame {
        image: String
    }
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum MsgParseError {
    #[error("Message contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Message has an invalid type ({0})")]
    InvalidType(String),

    #[error("Message of type \"{0}\" has an invalid payload: {1}")]
    InvalidPayload(String, serde_json::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OperatorMsg {

    /// Parse a new operator message from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, MsgParseError> {
        // Parse the JSON string into a value
        let val: Value = match serde_json::from_str(json_str) {
            Ok(v) => v,
            Err(e) => return Err(MsgParseError::InvalidJson(e))
        };

        // Get the type of the message
        let msg_type = match val["type"].as_str() {
            Some(s) => s.to_owned(),
            None => return Err(MsgParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        };

        // Deserialise the full message, distinguishing unknown types from
        // known types carrying a bad payload
        match serde_json::from_value::<OperatorMsg>(val) {
            Ok(m) => Ok(m),
            Err(e) => {
                if KNOWN_MSG_TYPES.contains(&msg_type.as_str()) {
                    Err(MsgParseError::InvalidPayload(msg_type, e))
                }
                else {
                    Err(MsgParseError::InvalidType(format!(
                        "{} is not a recognised message type", msg_type
                    )))
                }
            }
        }
    }
}

impl TelemetryMsg {

    /// Serialise this telemetry message into a JSON packet
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .expect("Telemetry serialisation failed. This should not happen")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_command() {
        let msg = OperatorMsg::from_json(
            r#"{"type": "command", "device": "vehicle", "drive": 100, "steer": null}"#
        ).unwrap();

        match msg {
            OperatorMsg::Command(cmd) => {
                assert_eq!(cmd.device, DeviceTarget::Vehicle);
                assert_eq!(cmd.drive, Some(100));
                assert_eq!(cmd.steer, None);
            },
            m => panic!("Expected a command, got {:?}", m)
        }
    }

    #[test]
    fn test_parse_mount_command() {
        let msg = OperatorMsg::from_json(
            r#"{"type": "command", "device": "camera", "drive": -40, "steer": 12}"#
        ).unwrap();

        match msg {
            OperatorMsg::Command(cmd) => {
                assert_eq!(cmd.device, DeviceTarget::CameraMount);
                assert_eq!(cmd.drive, Some(-40));
                assert_eq!(cmd.steer, Some(12));
            },
            m => panic!("Expected a command, got {:?}", m)
        }
    }

    #[test]
    fn test_parse_latency_problem() {
        let msg = OperatorMsg::from_json(r#"{"type": "latency_problem"}"#)
            .unwrap();

        assert!(matches!(msg, OperatorMsg::LatencyProblem));
    }

    #[test]
    fn test_parse_idle_and_light() {
        let msg = OperatorMsg::from_json(r#"{"type": "idle", "active": false}"#)
            .unwrap();
        assert!(matches!(msg, OperatorMsg::Idle { active: false }));

        let msg = OperatorMsg::from_json(r#"{"type": "light", "on": true}"#)
            .unwrap();
        assert!(matches!(msg, OperatorMsg::Light { on: true }));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let res = OperatorMsg::from_json(r#"{"type": "warp_drive"}"#);
        assert!(matches!(res, Err(MsgParseError::InvalidType(_))));
    }

    #[test]
    fn test_parse_rejects_bad_payload() {
        let res = OperatorMsg::from_json(
            r#"{"type": "command", "device": "spaceship", "drive": 1, "steer": 2}"#
        );
        assert!(matches!(res, Err(MsgParseError::InvalidPayload(_, _))));
    }

    #[test]
    fn test_telemetry_round_trip() {
        let tm = TelemetryMsg::CommandStatus(Command {
            device: DeviceTarget::Vehicle,
            drive: Some(57),
            steer: None
        });

        let json = tm.to_json();
        assert!(json.contains("\"command_status\""));

        let parsed: TelemetryMsg = serde_json::from_str(&json).unwrap();
        match parsed {
            TelemetryMsg::CommandStatus(cmd) => assert_eq!(cmd.drive, Some(57)),
            m => panic!("Expected a command status, got {:?}", m)
        }
    }
}
