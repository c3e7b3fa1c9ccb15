//! # Frame producer module
//!
//! A frame producer captures one camera frame per call, transforms it into
//! the orientation the operator expects, and encodes it for the wire. The
//! stream worker drives a producer at the stream cadence.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod test_pattern;

/// V4L2 camera capture
#[cfg(feature = "cam")]
mod v4l;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use test_pattern::*;

#[cfg(feature = "cam")]
pub use v4l::*;

use comms_if::frame::EncodedFrame;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors while producing a frame.
///
/// These are transient by design: the stream worker logs and skips the tick,
/// it never tears the loop down over a single bad frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameProducerError {
    #[error("Could not capture a frame: {0}")]
    CaptureFailed(String),

    #[error("Could not decode the captured frame: {0}")]
    DecodeFailed(image::ImageError),

    #[error("Could not encode the frame: {0}")]
    EncodeFailed(image::ImageError)
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of encoded camera frames.
pub trait FrameProducer {

    /// Produce the next frame.
    ///
    /// `Ok(None)` means no frame was available this tick, which is not an
    /// error condition.
    fn produce(&mut self) -> Result<Option<EncodedFrame>, FrameProducerError>;
}
