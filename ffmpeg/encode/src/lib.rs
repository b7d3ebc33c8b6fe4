/*!
    Media encoding for the ffmpeg crate ecosystem.

    This crate transforms raw frames into compressed packets. Encoders may
    buffer frames internally for lookahead and reordering, so output is pulled
    in a loop until the codec reports it needs more input, and a final flush
    drains whatever is left.

    # Video Encoding

    ```ignore
    use ffmpeg_encode::{CodecId, EncoderState, Rational, VideoEncoder, VideoEncoderConfig};

    // H.264 at 640x480, timestamps in 1/30000 s units
    let config = VideoEncoderConfig::new(CodecId::H264, 640, 480, Rational::new(1, 30000))
        .with_keyframe_interval(12);

    let mut encoder = VideoEncoder::new(config)?;

    for frame in frames {
        encoder.send_frame(&frame)?;
        // Pending: the encoder wants more input before it can emit anything
        let state = encoder.drain(|packet| muxer.write_packet(packet, tb))?;
        assert_eq!(state, EncoderState::Pending);
    }

    // Emit everything buffered for lookahead
    encoder.flush(|packet| muxer.write_packet(packet, tb))?;
    ```

    # Drain States

    - **Receiving**: a packet was produced, keep pulling.
    - **Pending**: nothing available until the next frame. Not an error.
    - **Finished**: fully drained, only after a flush. Not an error.

    Any other codec status is a fatal [`Error`].

    # Frame Requirements

    Encoders expect YUV420P input. Use `ffmpeg-transform` to convert frames to
    the required format before encoding.
*/

pub use ffmpeg_types::{CodecId, Error, PixelFormat, Rational, Result, VideoStreamInfo};

mod config;
mod video;

pub use config::{DEFAULT_KEYFRAME_INTERVAL, EncoderPreset, RateControl, VideoEncoderConfig};
pub use video::{EncoderState, VideoEncoder};
