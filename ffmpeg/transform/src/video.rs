/*!
    Colour conversion with vertical flip.
*/

use std::{ffi::c_int, ptr};

use ffmpeg_next::{
    ffi,
    software::scaling::{context::Context as ScalerContext, flag::Flags as ScalerFlags},
    util::frame::video::Video as VideoFrameFFmpeg,
};
use tracing::debug;

use ffmpeg_types::{Error, PixelFormat, Result};

use crate::frame::pixel_format_to_ffmpeg;

/**
    Scaling algorithm used by the converter.

    Source and destination share dimensions, so this only affects chroma
    subsampling filters.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScalingAlgorithm {
    /// Nearest neighbor - fastest, lowest quality.
    Nearest,
    /// Bilinear interpolation - fast, acceptable quality.
    #[default]
    Bilinear,
    /// Bicubic interpolation - moderate speed, good quality.
    Bicubic,
    /// Lanczos resampling - slowest, highest quality.
    Lanczos,
}

impl ScalingAlgorithm {
    fn to_ffmpeg_flags(self) -> ScalerFlags {
        match self {
            Self::Nearest => ScalerFlags::POINT,
            Self::Bilinear => ScalerFlags::BILINEAR,
            Self::Bicubic => ScalerFlags::BICUBIC,
            Self::Lanczos => ScalerFlags::LANCZOS,
        }
    }
}

/**
    Configuration for a [`FlipConverter`].
*/
#[derive(Clone, Debug)]
pub struct ConverterConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Packed layout of the caller's buffers.
    pub source_format: PixelFormat,
    /// Layout of the destination frame.
    pub target_format: PixelFormat,
    /// Scaling algorithm to use.
    pub algorithm: ScalingAlgorithm,
}

impl ConverterConfig {
    /**
        RGB24 in, YUV420P out, same dimensions.
    */
    pub fn rgb24_to_yuv420p(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            source_format: PixelFormat::Rgb24,
            target_format: PixelFormat::Yuv420p,
            algorithm: ScalingAlgorithm::default(),
        }
    }

    /**
        Set the scaling algorithm.
    */
    pub fn with_algorithm(mut self, algorithm: ScalingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/**
    Converts packed pixel buffers into planar frames, flipping them vertically.

    Source buffers are read starting at their last row with a negative row
    stride, so the first row in memory becomes the bottom row of the output
    picture. Conversion and flip happen in one scaler pass without an
    intermediate copy.
*/
pub struct FlipConverter {
    config: ConverterConfig,
    context: ScalerContext,
    row_bytes: usize,
    source_stride: c_int,
}

impl FlipConverter {
    /**
        Create the scaler context for the given configuration.
    */
    pub fn new(config: ConverterConfig) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::allocation("ffmpeg_init", e.to_string()))?;

        let row_bytes = config.source_format.row_bytes(config.width).ok_or_else(|| {
            Error::invalid_argument(
                "sws_getContext",
                format!("source format {:?} is not packed", config.source_format),
            )
        })?;
        let source_stride = c_int::try_from(row_bytes).map_err(|_| {
            Error::invalid_argument(
                "sws_getContext",
                format!("row of {} bytes does not fit a stride", row_bytes),
            )
        })?;

        let context = ScalerContext::get(
            pixel_format_to_ffmpeg(config.source_format)?,
            config.width,
            config.height,
            pixel_format_to_ffmpeg(config.target_format)?,
            config.width,
            config.height,
            config.algorithm.to_ffmpeg_flags(),
        )
        .map_err(|e| Error::allocation("sws_getContext", e.to_string()))?;

        debug!(
            width = config.width,
            height = config.height,
            source = ?config.source_format,
            target = ?config.target_format,
            stride = -source_stride,
            "created flip converter"
        );

        Ok(Self {
            config,
            context,
            row_bytes,
            source_stride: -source_stride,
        })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /**
        Row stride used to address source buffers. Always negative.
    */
    pub fn source_stride(&self) -> i32 {
        self.source_stride
    }

    /**
        Number of rows read from each source buffer.
    */
    pub fn row_count(&self) -> u32 {
        self.config.height
    }

    /**
        Exact length in bytes a source buffer must have.
    */
    pub fn source_len(&self) -> usize {
        self.row_bytes * self.config.height as usize
    }

    /**
        Convert and flip `pixels` into `dst`.

        `pixels` must hold exactly [`source_len`](Self::source_len) bytes in
        the configured source layout. It is only read during this call.
        `dst` must be writable and match the configured target.
    */
    pub fn convert(&mut self, pixels: &[u8], dst: &mut VideoFrameFFmpeg) -> Result<()> {
        if pixels.len() != self.source_len() {
            return Err(Error::invalid_argument(
                "sws_scale",
                format!(
                    "expected {} bytes for {}x{} {:?}, got {}",
                    self.source_len(),
                    self.config.width,
                    self.config.height,
                    self.config.source_format,
                    pixels.len()
                ),
            ));
        }

        let target = pixel_format_to_ffmpeg(self.config.target_format)?;
        if dst.width() != self.config.width
            || dst.height() != self.config.height
            || dst.format() != target
        {
            return Err(Error::invalid_argument(
                "sws_scale",
                format!(
                    "destination frame {}x{} {:?} doesn't match converter {}x{} {:?}",
                    dst.width(),
                    dst.height(),
                    dst.format(),
                    self.config.width,
                    self.config.height,
                    target
                ),
            ));
        }

        let offset = last_row_offset(self.row_bytes, self.config.height);
        let rows = self.config.height as c_int;

        let ret = unsafe {
            // In bounds: offset + row_bytes == pixels.len(), and the scaler
            // walks backwards from there one stride per row.
            let src_slice: [*const u8; 4] =
                [pixels.as_ptr().add(offset), ptr::null(), ptr::null(), ptr::null()];
            let src_stride: [c_int; 4] = [self.source_stride, 0, 0, 0];
            let dst_ptr = dst.as_mut_ptr();

            ffi::sws_scale(
                self.context.as_mut_ptr(),
                src_slice.as_ptr(),
                src_stride.as_ptr(),
                0,
                rows,
                (*dst_ptr).data.as_ptr(),
                (*dst_ptr).linesize.as_ptr(),
            )
        };

        if ret <= 0 {
            return Err(Error::codec(
                "sws_scale",
                format!("scaler produced no output ({})", ret),
            ));
        }

        Ok(())
    }
}

/**
    Byte offset of the last row of a tightly packed buffer.
*/
fn last_row_offset(row_bytes: usize, rows: u32) -> usize {
    row_bytes * (rows as usize).saturating_sub(1)
}

impl std::fmt::Debug for FlipConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlipConverter")
            .field("config", &self.config)
            .field("source_stride", &self.source_stride)
            .finish_non_exhaustive()
    }
}
