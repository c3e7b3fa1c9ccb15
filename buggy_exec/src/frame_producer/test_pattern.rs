//! Synthetic frame producer for workstation builds and tests

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use image::{DynamicImage, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Internal
use comms_if::frame::{EncodedFrame, FrameFormat};
use super::{FrameProducer, FrameProducerError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Produces a moving synthetic gradient instead of real camera frames.
///
/// Stands in for the camera on builds without the `cam` feature. The setup
/// counter records how many times a capture pipeline was brought up, letting
/// tests assert that pause/resume never rebuilds the pipeline.
pub struct TestPatternProducer {
    width: u32,
    height: u32,
    quality: u8,
    frame_count: u64,
    setups: Arc<AtomicUsize>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TestPatternProducer {

    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self::with_setup_counter(
            width,
            height,
            quality,
            Arc::new(AtomicUsize::new(0))
        )
    }

    /// Create a producer sharing an externally observable setup counter.
    pub fn with_setup_counter(
        width: u32,
        height: u32,
        quality: u8,
        setups: Arc<AtomicUsize>
    ) -> Self {
        // Creating the producer is the analogue of opening the capture
        // pipeline
        setups.fetch_add(1, Ordering::SeqCst);

        Self {
            width,
            height,
            quality,
            frame_count: 0,
            setups
        }
    }

    /// Get the shared setup counter.
    pub fn setup_counter(&self) -> Arc<AtomicUsize> {
        self.setups.clone()
    }
}

impl FrameProducer for TestPatternProducer {
    fn produce(&mut self) -> Result<Option<EncodedFrame>, FrameProducerError> {
        self.frame_count += 1;

        let shift = (self.frame_count % 256) as u32;

        // A diagonal gradient that scrolls with the frame count, enough to
        // see motion in the operator's feed
        let image = RgbImage::from_fn(self.width, self.height, |x, y| {
            let v = ((x + y + shift) % 256) as u8;
            image::Rgb([v, 255 - v, 128])
        });

        // Same orientation transform as the camera path
        let image = DynamicImage::ImageRgb8(image).flipv();

        let frame = EncodedFrame::from_dyn_image(
            &image,
            FrameFormat::Jpeg(self.quality),
            Utc::now()
        ).map_err(FrameProducerError::EncodeFailed)?;

        Ok(Some(frame))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_produces_jpeg_frames() {
        let mut producer = TestPatternProducer::new(32, 24, 80);

        let frame = producer.produce().unwrap().unwrap();
        assert_eq!(&frame.data[0..2], &[0xFF, 0xD8]);

        // Each produce yields a fresh frame
        assert!(producer.produce().unwrap().is_some());

        // But the pipeline was only set up once
        assert_eq!(producer.setup_counter().load(Ordering::SeqCst), 1);
    }
}
