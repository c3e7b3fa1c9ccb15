//! # Buggy script interpreter module
//!
//! This module provides an interpreter for buggy command scripts, allowing
//! operator messages to be replayed from a file at fixed session times. Used
//! to bench-test the exec without a connected operator.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::msg::{OperatorMsg, MsgParseError};
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An operator message which is scripted to occur at a specific time.
struct ScriptedMsg {
    /// The time the message is supposed to be delivered at
    exec_time_s: f64,

    /// The message itself
    msg: OperatorMsg
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_msgs` to acquire the messages that are due for delivery.
pub struct ScriptInterpreter {
    _script_path: PathBuf,
    msgs: VecDeque<ScriptedMsg>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid message at {0} s: {1}")]
    InvalidMsg(f64, MsgParseError)
}

pub enum PendingMsgs {
    None,
    Some(Vec<OperatorMsg>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.to_str().unwrap().to_string()));
        }

        // Load the script into a string
        let script = match fs::read_to_string(script_path) {
            Ok(s) => s,
            Err(e) => return Err(ScriptError::ScriptLoadError(e))
        };

        // Empty queue of messages
        let mut msg_queue: VecDeque<ScriptedMsg> = VecDeque::new();

        // Each script line is `<time>: <json>;`
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .unwrap();

        let mut num_caps = 0;

        for cap in re.captures_iter(&script) {
            // Parse the exec time
            let exec_time_s: f64 = match cap.get(1).unwrap().as_str().parse() {
                Ok(t) => t,
                Err(e) => return Err(
                    ScriptError::InvalidTimestamp(format!("{}", e)))
            };

            // Parse the message from the payload. The scripts contain JSON
            // only.
            let msg = match OperatorMsg::from_json(
                cap.get(3).unwrap().as_str())
            {
                Ok(m) => m,
                Err(e) => return Err(ScriptError::InvalidMsg(
                    exec_time_s, e
                ))
            };

            // Build the scripted message from the match
            msg_queue.push_back(ScriptedMsg {
                exec_time_s,
                msg
            });

            num_caps += 1;
        }

        if num_caps == 0 {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            _script_path: path,
            msgs: msg_queue
        })
    }

    /// Return a vector of pending messages, or `None` if no message is due
    /// for delivery now.
    pub fn get_pending_msgs(&mut self) -> PendingMsgs {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.msgs.is_empty() {
            return PendingMsgs::EndOfScript
        }

        let mut msg_vec: Vec<OperatorMsg> = vec![];

        let current_time_s = get_elapsed_seconds();

        // Peek items from the queue, if the head's exec time is lower than
        // the current time add it to the vector, and keep adding messages
        // until the exec times are larger than the current time.
        while
            !self.msgs.is_empty()
            &&
            self.msgs.front().unwrap().exec_time_s < current_time_s
        {
            msg_vec.push(self.msgs.pop_front().unwrap().msg);
        }

        // If the vector is longer than 0 return Some, otherwise None
        if !msg_vec.is_empty() {
            PendingMsgs::Some(msg_vec)
        }
        else {
            PendingMsgs::None
        }
    }

    /// Get the number of messages in the script
    pub fn get_num_msgs(&self) -> usize {
        self.msgs.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.msgs.back() {
            Some(m) => m.exec_time_s,
            None => 0f64
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_script(name: &str, content: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);

        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();

        path
    }

    #[test]
    fn test_parse_script() {
        let path = write_script(
            "buggy_si_parse_test.bgs",
            "0.5: {\"type\": \"command\", \"device\": \"vehicle\", \
                \"drive\": 100, \"steer\": null};\n\
            1.0: {\"type\": \"latency_problem\"};\n\
            2.5: {\"type\": \"idle\", \"active\": false};\n"
        );

        let si = ScriptInterpreter::new(&path).unwrap();

        assert_eq!(si.get_num_msgs(), 3);
        assert_eq!(si.get_duration(), 2.5);
    }

    #[test]
    fn test_empty_script_rejected() {
        let path = write_script(
            "buggy_si_empty_test.bgs",
            "# nothing but comments\n"
        );

        assert!(matches!(
            ScriptInterpreter::new(&path),
            Err(ScriptError::ScriptEmpty)
        ));
    }

    #[test]
    fn test_bad_message_rejected() {
        let path = write_script(
            "buggy_si_bad_msg_test.bgs",
            "1.0: {\"type\": \"warp_drive\"};\n"
        );

        assert!(matches!(
            ScriptInterpreter::new(&path),
            Err(ScriptError::InvalidMsg(_, _))
        ));
    }

    #[test]
    fn test_missing_script_rejected() {
        assert!(matches!(
            ScriptInterpreter::new("/nonexistent/script.bgs"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
