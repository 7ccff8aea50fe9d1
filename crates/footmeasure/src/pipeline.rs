//! Per-image pipeline and batch driver.

use crate::aggregate::{aggregate, AggregateResult};
use crate::decode::{decode_base64_image, decode_image_bytes};
use crate::error::{AggregateError, ImageError, ParamsError};
use crate::measure::{measure_foot, Measurement};
use crate::params::MeasureParams;
use crate::rectify::compute_transform;
use crate::segment::{luma_bt601, segment_foot, warp_to_canvas};
use footmeasure_aruco::{ArucoDetector, MarkerDetection};
use footmeasure_core::GrayImageView;
use image::RgbImage;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Per-image result: the measurement, or the reason the image was skipped.
pub type ImageOutcome = Result<Measurement, ImageError>;

/// Everything one batch produced, in input order.
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<ImageOutcome>,
    pub result: Result<AggregateResult, AggregateError>,
}

impl BatchReport {
    /// Successful measurements, in input order.
    pub fn measurements(&self) -> impl Iterator<Item = &Measurement> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_err()).count()
    }
}

/// Marker-referenced foot measurement.
///
/// Built once from validated parameters and shared by reference; holds no
/// mutable state.
#[derive(Clone, Debug)]
pub struct FootMeasurer {
    params: MeasureParams,
    detector: ArucoDetector,
}

impl FootMeasurer {
    pub fn new(params: MeasureParams) -> Result<Self, ParamsError> {
        params.validate()?;
        let detector = ArucoDetector::new(params.aruco.clone())?;
        Ok(Self { params, detector })
    }

    pub fn params(&self) -> &MeasureParams {
        &self.params
    }

    /// Reference markers in `image`, sorted by id.
    pub fn detect_markers(&self, image: &RgbImage) -> Vec<MarkerDetection> {
        let gray = luma_bt601(image);
        self.detector.detect(&gray_view(&gray))
    }

    /// Run detection, rectification, segmentation and measurement on one image.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(w = image.width(), h = image.height()))
    )]
    pub fn measure_image(&self, image: &RgbImage) -> Result<Measurement, ImageError> {
        let markers = self.detect_markers(image);
        log::debug!(
            "{} markers: ids {:?}",
            markers.len(),
            markers.iter().map(|m| m.id).collect::<Vec<_>>()
        );

        let transform = compute_transform(&markers, &self.params.rectify)?;
        let canvas = warp_to_canvas(image, &transform, &self.params.segment);
        let mask = segment_foot(&canvas, &self.params.segment);
        measure_foot(&mask, transform.pixels_per_cm)
    }

    /// Decode a base64 payload and measure it.
    pub fn measure_encoded(&self, payload: &str) -> Result<Measurement, ImageError> {
        let image = decode_base64_image(payload)?;
        self.measure_image(&image)
    }

    /// Measure every base64 payload and aggregate the successes.
    ///
    /// Failing images are logged and skipped.
    pub fn measure_batch<S>(&self, payloads: &[S]) -> BatchReport
    where
        S: AsRef<str> + Sync,
    {
        self.run_batch(payloads, |p| self.measure_encoded(p.as_ref()))
    }

    /// Like [`Self::measure_batch`] for raw compressed image bytes.
    pub fn measure_batch_bytes<B>(&self, images: &[B]) -> BatchReport
    where
        B: AsRef<[u8]> + Sync,
    {
        self.run_batch(images, |b| {
            let image = decode_image_bytes(b.as_ref())?;
            self.measure_image(&image)
        })
    }

    fn run_batch<T, F>(&self, inputs: &[T], run: F) -> BatchReport
    where
        T: Sync,
        F: Fn(&T) -> ImageOutcome + Sync,
    {
        #[cfg(feature = "rayon")]
        let outcomes: Vec<ImageOutcome> = inputs.par_iter().map(&run).collect();
        #[cfg(not(feature = "rayon"))]
        let outcomes: Vec<ImageOutcome> = inputs.iter().map(&run).collect();

        for (i, outcome) in outcomes.iter().enumerate() {
            match outcome {
                Ok(m) => log::debug!("image {}: {:.1} x {:.1} cm", i, m.length_cm, m.width_cm),
                Err(e) => log::warn!("skipping image {}: {}", i, e),
            }
        }

        let measurements: Vec<Measurement> =
            outcomes.iter().filter_map(|o| o.as_ref().ok().cloned()).collect();
        let result = aggregate(&measurements);
        match &result {
            Ok(r) => log::info!(
                "measured {}/{} images: {:.1} x {:.1} cm, confidence {:.2}",
                r.num_images_processed,
                inputs.len(),
                r.length_cm,
                r.width_cm,
                r.confidence
            ),
            Err(e) => log::info!("no usable image out of {}: {}", inputs.len(), e),
        }

        BatchReport { outcomes, result }
    }
}

/// Borrow an `image::GrayImage` as a [`GrayImageView`].
pub fn gray_view(img: &image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_params_are_rejected_up_front() {
        let mut params = MeasureParams::default();
        params.segment.morph_kernel = 4;
        assert!(FootMeasurer::new(params).is_err());
    }

    #[test]
    fn measurer_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FootMeasurer>();
    }

    #[test]
    fn blank_images_are_skipped_not_fatal() {
        let measurer = FootMeasurer::new(MeasureParams::default()).expect("measurer");
        let blank = RgbImage::from_pixel(64, 48, image::Rgb([255, 255, 255]));
        assert!(matches!(
            measurer.measure_image(&blank),
            Err(ImageError::InsufficientMarkers { found: 0 })
        ));

        let report = measurer.measure_batch(&["???", ""]);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.skipped(), 2);
        assert!(matches!(
            report.outcomes[0],
            Err(ImageError::Decode(crate::error::DecodeError::Base64(_)))
        ));
        assert_eq!(report.result, Err(AggregateError::NoValidMeasurements));
    }
}
