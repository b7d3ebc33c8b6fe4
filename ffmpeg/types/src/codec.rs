/*!
    Codec identifiers.
*/

use std::fmt;

/**
    Video codecs the recorder knows how to select.

    Containers pick one of these as their default video codec; callers may
    also request one explicitly.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    H264,
    H265,
    Mpeg4,
    Vp8,
    Vp9,
    Av1,
    ProRes,
    Mjpeg,
}

impl CodecId {
    pub const fn name(self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "hevc",
            Self::Mpeg4 => "mpeg4",
            Self::Vp8 => "vp8",
            Self::Vp9 => "vp9",
            Self::Av1 => "av1",
            Self::ProRes => "prores",
            Self::Mjpeg => "mjpeg",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
