/*!
    Media frame transformation for the ffmpeg crate ecosystem.

    This crate converts caller-supplied packed pixel buffers into the planar
    frames encoders consume. Conversion and vertical flip happen in a single
    scaler pass by addressing the source bottom-up with a negative stride.
*/

pub use ffmpeg_types::{Error, PixelFormat, Result};

mod frame;
mod video;

pub use frame::{alloc_frame, is_writable, make_writable};
pub use video::{ConverterConfig, FlipConverter, ScalingAlgorithm};
