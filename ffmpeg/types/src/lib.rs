/*!
    Shared types for the ffmpeg crate ecosystem.

    The types here cross crate boundaries: errors, time bases, pixel formats
    and codec identities. Nothing in this crate links FFmpeg.
*/

mod codec;
mod error;
mod format;
mod stream;
mod time;

pub use codec::CodecId;
pub use error::{Error, ErrorKind, Result};
pub use format::PixelFormat;
pub use stream::VideoStreamInfo;
pub use time::Rational;
