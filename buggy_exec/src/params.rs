//! # Buggy executable parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Top level parameters for the buggy executable.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecParams {

    /// Endpoint the operator channel binds to, for example `0.0.0.0:8000`
    pub channel_endpoint: String,

    /// Target frame rate of the video stream.
    ///
    /// Units: hertz
    pub frame_rate_hz: f64,

    /// Width of the streamed frames in pixels
    pub stream_width: u32,

    /// Height of the streamed frames in pixels
    pub stream_height: u32,

    /// JPEG quality of the streamed frames, between 1 and 100
    pub jpeg_quality: u8,

    /// Linux device path of the camera
    pub camera_device: String
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ExecParams {
    /// Get the streaming period corresponding to the configured frame rate.
    pub fn stream_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.frame_rate_hz)
    }
}
