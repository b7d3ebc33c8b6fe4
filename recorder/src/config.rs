/*!
    Recorder configuration.
*/

use ffmpeg_encode::{DEFAULT_KEYFRAME_INTERVAL, EncoderPreset, RateControl};
use ffmpeg_transform::ScalingAlgorithm;
use ffmpeg_types::CodecId;

/**
    Tuning knobs for a [`Recorder`](crate::Recorder).

    The defaults reproduce the plain behaviour: container-default codec, an
    intra frame at least every 12 frames, encoder defaults for everything else.
*/
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    /// Maximum number of frames between intra frames.
    pub keyframe_interval: u32,
    /// Codec to use (None = the container's default video codec).
    pub codec: Option<CodecId>,
    /// Encoder speed preset (None = encoder default).
    pub preset: Option<EncoderPreset>,
    /// Rate control mode (None = encoder default).
    pub rate_control: Option<RateControl>,
    /// Filter used for RGB to YUV conversion.
    pub scaling: ScalingAlgorithm,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            keyframe_interval: DEFAULT_KEYFRAME_INTERVAL,
            codec: None,
            preset: None,
            rate_control: None,
            scaling: ScalingAlgorithm::default(),
        }
    }
}

impl RecorderConfig {
    pub fn with_keyframe_interval(mut self, frames: u32) -> Self {
        self.keyframe_interval = frames;
        self
    }

    /**
        Use `codec` instead of the container's default.
    */
    pub fn with_codec(mut self, codec: CodecId) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_preset(mut self, preset: EncoderPreset) -> Self {
        self.preset = Some(preset);
        self
    }

    pub fn with_rate_control(mut self, rate_control: RateControl) -> Self {
        self.rate_control = Some(rate_control);
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingAlgorithm) -> Self {
        self.scaling = scaling;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RecorderConfig::default();
        assert_eq!(config.keyframe_interval, 12);
        assert!(config.codec.is_none());
        assert!(config.preset.is_none());
        assert!(config.rate_control.is_none());
        assert_eq!(config.scaling, ScalingAlgorithm::Bilinear);
    }

    #[test]
    fn builders() {
        let config = RecorderConfig::default()
            .with_keyframe_interval(60)
            .with_codec(CodecId::Mpeg4)
            .with_preset(EncoderPreset::Ultrafast)
            .with_rate_control(RateControl::Crf(20))
            .with_scaling(ScalingAlgorithm::Bicubic);

        assert_eq!(config.keyframe_interval, 60);
        assert_eq!(config.codec, Some(CodecId::Mpeg4));
        assert_eq!(config.preset, Some(EncoderPreset::Ultrafast));
        assert_eq!(config.rate_control, Some(RateControl::Crf(20)));
        assert_eq!(config.scaling, ScalingAlgorithm::Bicubic);
    }
}
