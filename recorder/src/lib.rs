/*!
    Record raw RGB24 frames into a finalized video file.

    The recorder ties the ffmpeg crates together: frames are flipped and
    converted to YUV420P by `ffmpeg-transform`, compressed by `ffmpeg-encode`
    and written by `ffmpeg-sink` into a container chosen from the file
    extension.

    ```ignore
    use video_recorder::Recorder;

    // 640x480, timestamps in 1/30000 s units
    let mut recorder = Recorder::init("capture.mp4", 640, 480, 1, 30000)?;

    for (i, pixels) in frames.iter().enumerate() {
        recorder.encode(pixels, i as i64 * 1001)?;
    }

    // Without this the file has no trailer and will not play
    recorder.close()?;
    ```

    The same lifecycle is exported over a C ABI for native hosts, see
    [`capi`].

    # Lifecycle

    1. `init` validates, negotiates codec and container, and writes the
       header. Nothing is left on disk if it fails.
    2. `encode` converts one frame and writes whatever packets the encoder
       releases. Encoders buffer for lookahead, so early frames may produce
       no output.
    3. `close` flushes the encoder, writes the trailer and releases
       everything. Only the first close does any work.
*/

pub use ffmpeg_types::{CodecId, Error, ErrorKind, Rational, Result, VideoStreamInfo};
pub use ffmpeg_encode::{EncoderPreset, RateControl};
pub use ffmpeg_transform::ScalingAlgorithm;

pub mod capi;
mod config;
mod recorder;

pub use config::RecorderConfig;
pub use recorder::Recorder;
