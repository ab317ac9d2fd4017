use serde::{Deserialize, Serialize};
use tgv_image::{Image, ImageSize, MAX_LUMINANCE};
use tgv_imgproc::{
    color::{luminance_from_rgba_slice, luminance_from_rgba_with_strategy},
    filter::box_blur_with_strategy,
    histogram::{compute_histogram_with_strategy, Histogram},
    morphology::dilate_with_strategy,
    parallel::ExecutionStrategy,
};

use crate::{
    errors::BlobError,
    extractor::{BlobExtractor, BlobSet, Connectivity},
    run_length::{run_length_encode_with_strategy, RunLengthImage},
};

/// How the scanner picks the run classification threshold.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdMode {
    /// A fixed luminance threshold, `0..=765`.
    Fixed(u16),
    /// Otsu's split point of the luminance histogram of each frame.
    #[default]
    Otsu,
}

/// Configuration for scanning frames into blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Radius of the dilation window, 0 to skip dilation.
    pub dilate_radius: usize,
    /// Radius of the box blur window, 0 to skip blurring.
    pub blur_radius: usize,
    /// Threshold selection.
    pub threshold: ThresholdMode,
    /// Connectivity rule for the blob extractor.
    pub connectivity: Connectivity,
    /// Execution strategy of the per-pixel stages.
    #[serde(skip)]
    pub strategy: ExecutionStrategy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            dilate_radius: 1,
            blur_radius: 1,
            threshold: ThresholdMode::default(),
            connectivity: Connectivity::default(),
            strategy: ExecutionStrategy::default(),
        }
    }
}

impl ScanConfig {
    /// Checks the parameters that can be out of range.
    pub fn validate(&self) -> Result<(), BlobError> {
        match self.threshold {
            ThresholdMode::Fixed(threshold) if threshold > MAX_LUMINANCE => {
                Err(BlobError::InvalidThreshold(threshold))
            }
            _ => Ok(()),
        }
    }
}

/// Everything a scan produced for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// The threshold used to classify the filtered luminance.
    pub threshold: u16,
    /// Histogram of the unfiltered luminance.
    pub histogram: Histogram,
    /// The run-length encoded rows.
    pub runs: RunLengthImage,
    /// The finalized blobs.
    pub blobs: BlobSet,
}

/// Frame scanner running the full pipeline from RGBA pixels to blobs.
///
/// The stages are luminance, histogram, dilation, box blur, thresholding,
/// run-length encoding and blob extraction. The intermediate buffers are
/// allocated once for the frame size and reused for every frame.
pub struct BlobScanner {
    config: ScanConfig,
    luminance: Image<u16, 1>,
    dilated: Image<u16, 1>,
    filtered: Image<u16, 1>,
    extractor: BlobExtractor,
}

impl BlobScanner {
    /// Creates a new `BlobScanner` for frames of the given size.
    ///
    /// # Arguments
    ///
    /// * `config` - The scan configuration.
    /// * `img_size` - The size of the frames to be processed.
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the new `BlobScanner` or a `BlobError`.
    pub fn new(config: ScanConfig, img_size: ImageSize) -> Result<Self, BlobError> {
        config.validate()?;

        Ok(Self {
            config,
            luminance: Image::from_size_val(img_size, 0)?,
            dilated: Image::from_size_val(img_size, 0)?,
            filtered: Image::from_size_val(img_size, 0)?,
            extractor: BlobExtractor::new(),
        })
    }

    /// Returns a reference to the scanner configuration.
    #[inline]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The frame size the scanner was built for.
    #[inline]
    pub fn size(&self) -> ImageSize {
        self.luminance.size()
    }

    /// Luminance of the last scanned frame, before filtering.
    pub fn luminance(&self) -> &Image<u16, 1> {
        &self.luminance
    }

    /// Dilated and blurred luminance of the last scanned frame.
    pub fn filtered(&self) -> &Image<u16, 1> {
        &self.filtered
    }

    /// Scans an RGBA frame into blobs.
    ///
    /// # Arguments
    ///
    /// * `src` - The RGBA frame, of the scanner size.
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the [`ScanResult`] or a `BlobError`.
    pub fn scan(&mut self, src: &Image<u8, 4>) -> Result<ScanResult, BlobError> {
        luminance_from_rgba_with_strategy(src, &mut self.luminance, self.config.strategy)?;
        self.scan_luminance()
    }

    /// Scans a raw RGBA byte buffer, row-major with 4 bytes per pixel.
    pub fn scan_rgba_slice(&mut self, data: &[u8]) -> Result<ScanResult, BlobError> {
        let size = self.size();
        luminance_from_rgba_slice(data, size, &mut self.luminance)?;
        self.scan_luminance()
    }

    fn scan_luminance(&mut self) -> Result<ScanResult, BlobError> {
        let strategy = self.config.strategy;
        log::debug!("scanning {} frame", self.size());

        // Step 1: Histogram and threshold
        let histogram = compute_histogram_with_strategy(&self.luminance, strategy);
        let threshold = match self.config.threshold {
            ThresholdMode::Fixed(threshold) => threshold,
            ThresholdMode::Otsu => histogram.otsu_threshold(),
        };
        log::debug!(
            "threshold {threshold} ({:?}), mean luminance {:?}",
            self.config.threshold,
            histogram.mean()
        );

        // Step 2: Dilation and box blur
        dilate_with_strategy(
            &self.luminance,
            &mut self.dilated,
            self.config.dilate_radius,
            strategy,
        )?;
        box_blur_with_strategy(
            &self.dilated,
            &mut self.filtered,
            self.config.blur_radius,
            strategy,
        )?;

        // Step 3: Run-length encoding
        let runs = run_length_encode_with_strategy(&self.filtered, threshold, strategy)?;
        log::debug!("encoded {} runs over {} rows", runs.len(), runs.num_rows());

        // Step 4: Blob extraction
        let blobs = self.extractor.extract(&runs, self.config.connectivity);

        Ok(ScanResult {
            threshold,
            histogram,
            runs,
            blobs,
        })
    }
}
