/*!
    Stream description shared by the encoder and the recorder.
*/

use crate::{CodecId, PixelFormat, Rational};

/**
    What the single video stream of a recording looks like once negotiated.

    Fixed for the lifetime of the recording.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoStreamInfo {
    pub width: u32,
    pub height: u32,
    /// Layout the encoder consumes.
    pub pixel_format: PixelFormat,
    /// Unit of frame timestamps.
    pub time_base: Rational,
    pub codec_id: CodecId,
}

impl VideoStreamInfo {
    /**
        Bytes in one caller-supplied RGB24 frame of this size.
    */
    pub fn rgb24_frame_len(&self) -> usize {
        PixelFormat::Rgb24.frame_size(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ntsc() -> VideoStreamInfo {
        VideoStreamInfo {
            width: 640,
            height: 480,
            pixel_format: PixelFormat::Yuv420p,
            time_base: Rational::new(1, 30000),
            codec_id: CodecId::H264,
        }
    }

    #[test]
    fn frame_len() {
        assert_eq!(ntsc().rgb24_frame_len(), 640 * 480 * 3);
    }
}
