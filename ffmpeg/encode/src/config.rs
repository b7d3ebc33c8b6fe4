/*!
    Encoder configuration types.
*/

use ffmpeg_types::{CodecId, Error, PixelFormat, Rational, Result};

/**
    Default maximum distance between intra frames.
*/
pub const DEFAULT_KEYFRAME_INTERVAL: u32 = 12;

/**
    Speed/compression trade-off, passed as the encoder's `preset` option.

    Encoders without that option (mpeg4, mjpeg, ...) ignore it.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EncoderPreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl EncoderPreset {
    pub fn option_value(self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Superfast => "superfast",
            Self::Veryfast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::Veryslow => "veryslow",
        }
    }
}

/**
    How the encoder spends bits.
*/
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RateControl {
    /// Constant quality, 0 (lossless) to 51. Lower is better.
    Crf(u8),
    /// Constant bitrate in bits per second.
    Cbr(u64),
    /// Average bitrate in bits per second.
    Vbr(u64),
}

impl RateControl {
    /**
        Constant quality, clamped to the valid range.
    */
    pub fn crf(quality: u8) -> Self {
        Self::Crf(quality.min(51))
    }
}

/**
    Everything needed to open a video encoder.
*/
#[derive(Clone, Debug)]
pub struct VideoEncoderConfig {
    pub codec: CodecId,
    pub width: u32,
    pub height: u32,
    /// Unit of frame timestamps; also the time base of emitted packets.
    pub time_base: Rational,
    /// Layout of submitted frames.
    pub pixel_format: PixelFormat,
    /// Maximum number of frames between intra frames.
    pub keyframe_interval: u32,
    /// Put codec headers in extradata instead of in every keyframe.
    /// Set when the container stores stream headers separately.
    pub global_header: bool,
    /// None leaves the encoder default.
    pub preset: Option<EncoderPreset>,
    /// None leaves the encoder default.
    pub rate_control: Option<RateControl>,
}

impl VideoEncoderConfig {
    pub fn new(codec: CodecId, width: u32, height: u32, time_base: Rational) -> Self {
        Self {
            codec,
            width,
            height,
            time_base,
            pixel_format: PixelFormat::Yuv420p,
            keyframe_interval: DEFAULT_KEYFRAME_INTERVAL,
            global_header: false,
            preset: None,
            rate_control: None,
        }
    }

    pub fn with_rate_control(mut self, rate_control: RateControl) -> Self {
        self.rate_control = Some(rate_control);
        self
    }

    pub fn with_preset(mut self, preset: EncoderPreset) -> Self {
        self.preset = Some(preset);
        self
    }

    pub fn with_keyframe_interval(mut self, frames: u32) -> Self {
        self.keyframe_interval = frames;
        self
    }

    /**
        Request global headers (extradata) from the encoder.
    */
    pub fn with_global_header(mut self, global_header: bool) -> Self {
        self.global_header = global_header;
        self
    }

    /**
        Reject configurations no encoder can open.
    */
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid_argument(
                "avcodec_open2",
                format!("dimensions {}x{} must be positive", self.width, self.height),
            ));
        }
        if !self.time_base.is_valid_time_base() {
            return Err(Error::invalid_argument(
                "avcodec_open2",
                format!("invalid time base {}", self.time_base),
            ));
        }
        if self.keyframe_interval == 0 || i32::try_from(self.keyframe_interval).is_err() {
            return Err(Error::invalid_argument(
                "avcodec_open2",
                format!("keyframe interval {} out of range", self.keyframe_interval),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_types::ErrorKind;

    #[test]
    fn defaults() {
        let config = VideoEncoderConfig::new(CodecId::H264, 640, 480, Rational::new(1, 30000));
        assert_eq!(config.pixel_format, PixelFormat::Yuv420p);
        assert_eq!(config.keyframe_interval, 12);
        assert!(!config.global_header);
        assert!(config.preset.is_none());
        assert!(config.rate_control.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn crf_is_clamped() {
        assert_eq!(RateControl::crf(80), RateControl::Crf(51));
        assert_eq!(RateControl::crf(23), RateControl::Crf(23));
    }

    #[test]
    fn builders_chain() {
        let config = VideoEncoderConfig::new(CodecId::Mpeg4, 2, 2, Rational::new(1, 25))
            .with_rate_control(RateControl::Cbr(2_000_000))
            .with_preset(EncoderPreset::Fast)
            .with_keyframe_interval(30)
            .with_global_header(true);

        assert_eq!(config.rate_control, Some(RateControl::Cbr(2_000_000)));
        assert_eq!(config.preset.map(EncoderPreset::option_value), Some("fast"));
        assert_eq!(config.keyframe_interval, 30);
        assert!(config.global_header);
    }

    #[test]
    fn validate_rejects_unusable_settings() {
        let base = VideoEncoderConfig::new(CodecId::Mpeg4, 64, 48, Rational::new(1, 30));

        let mut zero = base.clone();
        zero.width = 0;
        let mut time_base = base.clone();
        time_base.time_base = Rational::new(1, 0);
        let gop = base.clone().with_keyframe_interval(0);

        for config in [zero, time_base, gop] {
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }
}
