/*!
    Media output and muxing for the ffmpeg crate ecosystem.

    This crate handles the output side of the media pipeline. It takes encoded
    packets from the encoder and writes them into a container file, picking the
    container format from the output filename.

    The container is built in stages so that nothing touches the filesystem
    until the stream is fully negotiated:

    1. [`Muxer::allocate`] guesses the format from the extension.
    2. [`Muxer::add_video_stream`] and [`Muxer::copy_parameters`] describe the
       single video stream.
    3. [`Muxer::open`] creates the file and [`Muxer::write_header`] writes the
       container header.
    4. [`Muxer::write_packet`] rescales and interleaves packets.
    5. [`Muxer::finish`] writes the trailer and closes the file. The file is
       not playable until this succeeds.
*/

pub use ffmpeg_types::{CodecId, Error, Rational, Result};

mod sink;

pub use sink::Muxer;
