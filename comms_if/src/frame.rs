//! # Encoded frame module
//!
//! Defines the container for a single encoded camera frame as produced by
//! the streaming pipeline and consumed by the operator station.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc, serde::ts_milliseconds};
use image::{DynamicImage, ImageResult};

use crate::msg::TelemetryMsg;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An individual encoded frame from the camera
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EncodedFrame {

    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// The format of this frame
    pub format: FrameFormat,

    /// The formatted image data
    pub data: Vec<u8>
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible formats for camera frames. This is used rather than
/// image::ImageFormat to:
///     1. Restrict the formats that can be sent over the wire
///     2. Allow serialisation as image::ImageFormat does not implement serde.
#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub enum FrameFormat {
    /// PNG image
    Png,

    /// JPEG image with a quality value between 1 and 100, where 100 is best.
    Jpeg(u8)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EncodedFrame {
    /// Encode the given image into a frame with the given format
    pub fn from_dyn_image(
        image: &DynamicImage,
        format: FrameFormat,
        timestamp: DateTime<Utc>
    ) -> ImageResult<Self> {
        // Write data to the buffer
        let mut data = Vec::<u8>::new();

        // Get the output format type
        let output_format = match format {
            FrameFormat::Png => image::ImageOutputFormat::Png,
            FrameFormat::Jpeg(q) => image::ImageOutputFormat::Jpeg(q)
        };

        image.write_to(&mut data, output_format)?;

        // Return the frame
        Ok(EncodedFrame {
            timestamp,
            format,
            data
        })
    }

    /// Get the base64 representation of the frame data, as used in the
    /// `video_frame` telemetry payload.
    pub fn to_base64(&self) -> String {
        base64::encode(&self.data)
    }

    /// Convert this frame into the telemetry message carrying it.
    pub fn to_telemetry(&self) -> TelemetryMsg {
        TelemetryMsg::VideoFrame {
            image: self.to_base64()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_jpeg_encode() {
        let image = DynamicImage::new_rgb8(32, 24);

        let frame = EncodedFrame::from_dyn_image(
            &image,
            FrameFormat::Jpeg(80),
            Utc::now()
        ).unwrap();

        // JPEG data starts with the SOI marker
        assert_eq!(&frame.data[0..2], &[0xFF, 0xD8]);

        // The base64 payload must decode back to the same bytes
        let decoded = base64::decode(frame.to_base64()).unwrap();
        assert_eq!(decoded, frame.data);
    }

    #[test]
    fn test_to_telemetry() {
        let image = DynamicImage::new_rgb8(8, 8);

        let frame = EncodedFrame::from_dyn_image(
            &image,
            FrameFormat::Jpeg(50),
            Utc::now()
        ).unwrap();

        match frame.to_telemetry() {
            TelemetryMsg::VideoFrame { image } => assert!(!image.is_empty()),
            m => panic!("Expected a video frame, got {:?}", m)
        }
    }
}
