//! V4L2 camera frame producer

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use log::info;
use rscam::{Camera, Config};

// Internal
use comms_if::frame::{EncodedFrame, FrameFormat};
use super::{FrameProducer, FrameProducerError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Produces frames from a V4L2 camera device.
///
/// The camera is claimed when the producer is created and released when it
/// is dropped, so handing the producer back to the hardware registry frees
/// the device for the next session.
pub struct CameraProducer {
    camera: Camera,
    quality: u8
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CameraProducer {

    /// Open and start the given video device, for example `/dev/video0`.
    pub fn new(
        device: &str,
        resolution: (u32, u32),
        frame_rate_hz: u32,
        quality: u8
    ) -> Result<Self, FrameProducerError> {
        let mut camera = Camera::new(device)
            .map_err(|e| FrameProducerError::CaptureFailed(e.to_string()))?;

        camera.start(&Config {
            interval: (1, frame_rate_hz),
            resolution,
            format: b"MJPG",
            ..Default::default()
        }).map_err(|e| FrameProducerError::CaptureFailed(e.to_string()))?;

        info!(
            "Camera {} started at {}x{} {} Hz",
            device, resolution.0, resolution.1, frame_rate_hz
        );

        Ok(Self {
            camera,
            quality
        })
    }
}

impl FrameProducer for CameraProducer {
    fn produce(&mut self) -> Result<Option<EncodedFrame>, FrameProducerError> {
        let raw_frame = self.camera.capture()
            .map_err(|e| FrameProducerError::CaptureFailed(e.to_string()))?;

        let timestamp = Utc::now();

        // The camera delivers MJPG, decode so the frame can be reoriented
        let image = image::load_from_memory_with_format(
            &raw_frame,
            image::ImageFormat::Jpeg
        ).map_err(FrameProducerError::DecodeFailed)?;

        // The camera is mounted upside down on the chassis
        let image = image.flipv();

        let frame = EncodedFrame::from_dyn_image(
            &image,
            FrameFormat::Jpeg(self.quality),
            timestamp
        ).map_err(FrameProducerError::EncodeFailed)?;

        Ok(Some(frame))
    }
}
