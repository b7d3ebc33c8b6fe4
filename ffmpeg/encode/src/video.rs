/*!
    Video encoder implementation.
*/

use ffmpeg_next::{
    Dictionary, Packet as PacketFFmpeg, Rational as FFmpegRational,
    codec::{self, Id as CodecIdFFmpeg, encoder::Video as VideoEncoderFFmpeg},
    util::{error::EAGAIN, frame::video::Video as VideoFrameFFmpeg},
};
use tracing::{debug, trace};

use ffmpeg_types::{CodecId, Error, PixelFormat, Rational, Result, VideoStreamInfo};

use crate::config::{RateControl, VideoEncoderConfig};

/**
    Where the encoder is in its output cycle.

    "Try again" and "end of stream" from the codec are flow control, not
    failures, and are reported here rather than as errors.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderState {
    /// A packet was produced; more may follow.
    Receiving,
    /// No packet ready until more input arrives.
    Pending,
    /// Fully drained. Only reachable after [`VideoEncoder::flush`].
    Finished,
}

/**
    Video encoder.

    Encodes raw video frames into compressed packets. The codec may hold
    frames internally for lookahead or reordering, so one input can yield
    zero, one, or several packets.
*/
pub struct VideoEncoder {
    encoder: VideoEncoderFFmpeg,
    codec: CodecId,
    time_base: Rational,
    frames_sent: u64,
    packets_received: u64,
    flushing: bool,
}

impl VideoEncoder {
    /**
        Create and open a video encoder with the given configuration.
    */
    pub fn new(config: VideoEncoderConfig) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::allocation("ffmpeg_init", e.to_string()))?;

        config.validate()?;

        let codec_id = codec_id_to_ffmpeg(config.codec)?;
        let codec = ffmpeg_next::encoder::find(codec_id).ok_or_else(|| {
            Error::negotiation(
                "avcodec_find_encoder",
                format!("no encoder available for {}", config.codec),
            )
        })?;

        let encoder_ctx = codec::context::Context::new_with_codec(codec);
        let mut encoder = encoder_ctx
            .encoder()
            .video()
            .map_err(|e| Error::allocation("avcodec_alloc_context3", e.to_string()))?;

        encoder.set_width(config.width);
        encoder.set_height(config.height);
        encoder.set_format(pixel_format_to_ffmpeg(config.pixel_format)?);
        encoder.set_time_base(FFmpegRational::new(
            config.time_base.num,
            config.time_base.den,
        ));
        encoder.set_gop(config.keyframe_interval);

        if config.global_header {
            encoder.set_flags(codec::flag::Flags::GLOBAL_HEADER);
        }

        let mut opts = Dictionary::new();
        if let Some(preset) = config.preset {
            opts.set("preset", preset.option_value());
        }
        match config.rate_control {
            Some(RateControl::Crf(crf)) => {
                opts.set("crf", &crf.to_string());
            }
            Some(RateControl::Cbr(bitrate)) => {
                encoder.set_bit_rate(bitrate as usize);
                encoder.set_max_bit_rate(bitrate as usize);
            }
            Some(RateControl::Vbr(bitrate)) => {
                encoder.set_bit_rate(bitrate as usize);
            }
            None => {}
        }

        let encoder = encoder
            .open_with(opts)
            .map_err(|e| Error::negotiation("avcodec_open2", e.to_string()))?;

        // Encoders may adjust the time base while opening.
        let time_base = unsafe {
            let tb = (*encoder.as_ptr()).time_base;
            Rational::new(tb.num, tb.den)
        };

        debug!(
            codec = codec.name(),
            width = config.width,
            height = config.height,
            %time_base,
            gop = config.keyframe_interval,
            global_header = config.global_header,
            "opened video encoder"
        );

        Ok(Self {
            encoder,
            codec: config.codec,
            time_base,
            frames_sent: 0,
            packets_received: 0,
            flushing: false,
        })
    }

    /**
        Get the time base for encoded packets.
    */
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn codec(&self) -> CodecId {
        self.codec
    }

    /**
        Number of frames accepted by the encoder.
    */
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /**
        Number of packets the encoder has produced.
    */
    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    /**
        The underlying codec context, for copying parameters into a stream.
    */
    pub fn context(&self) -> &codec::Context {
        &self.encoder
    }

    /**
        Get stream info for the muxer.
    */
    pub fn stream_info(&self) -> VideoStreamInfo {
        VideoStreamInfo {
            width: self.encoder.width(),
            height: self.encoder.height(),
            pixel_format: PixelFormat::Yuv420p,
            time_base: self.time_base,
            codec_id: self.codec,
        }
    }

    /**
        Submit one frame.

        The encoder may keep a reference to the frame's buffers; callers that
        reuse the frame must make it writable before overwriting it.
    */
    pub fn send_frame(&mut self, frame: &VideoFrameFFmpeg) -> Result<()> {
        if self.flushing {
            return Err(Error::codec(
                "avcodec_send_frame",
                "encoder has already been flushed",
            ));
        }

        if frame.width() != self.encoder.width() || frame.height() != self.encoder.height() {
            return Err(Error::invalid_argument(
                "avcodec_send_frame",
                format!(
                    "frame dimensions {}x{} don't match encoder {}x{}",
                    frame.width(),
                    frame.height(),
                    self.encoder.width(),
                    self.encoder.height()
                ),
            ));
        }

        self.encoder
            .send_frame(frame)
            .map_err(|e| Error::codec("avcodec_send_frame", e.to_string()))?;
        self.frames_sent += 1;

        Ok(())
    }

    /**
        Pull the next packet into `packet`.

        Returns [`EncoderState::Receiving`] when `packet` holds new data,
        otherwise the flow-control state the codec reported.
    */
    pub fn receive_packet(&mut self, packet: &mut PacketFFmpeg) -> Result<EncoderState> {
        match self.encoder.receive_packet(packet) {
            Ok(()) => {
                self.packets_received += 1;
                trace!(
                    pts = ?packet.pts(),
                    dts = ?packet.dts(),
                    size = packet.size(),
                    key = packet.is_key(),
                    "received packet"
                );
                Ok(EncoderState::Receiving)
            }
            Err(ffmpeg_next::Error::Other { errno }) if errno == EAGAIN => {
                Ok(EncoderState::Pending)
            }
            Err(ffmpeg_next::Error::Eof) => Ok(EncoderState::Finished),
            Err(e) => Err(Error::codec("avcodec_receive_packet", e.to_string())),
        }
    }

    /**
        Receive every packet currently available, handing each to `write`.

        Stops at the first flow-control signal and returns it, either
        [`EncoderState::Pending`] or [`EncoderState::Finished`].
    */
    pub fn drain<F>(&mut self, mut write: F) -> Result<EncoderState>
    where
        F: FnMut(&mut PacketFFmpeg) -> Result<()>,
    {
        let mut packet = PacketFFmpeg::empty();

        loop {
            match self.receive_packet(&mut packet)? {
                EncoderState::Receiving => write(&mut packet)?,
                state => return Ok(state),
            }
        }
    }

    /**
        Signal end of stream and drain every buffered packet into `write`.

        No frames can be sent afterwards.
    */
    pub fn flush<F>(&mut self, write: F) -> Result<()>
    where
        F: FnMut(&mut PacketFFmpeg) -> Result<()>,
    {
        if !self.flushing {
            self.encoder
                .send_eof()
                .map_err(|e| Error::codec("avcodec_send_frame", e.to_string()))?;
            self.flushing = true;
        }

        match self.drain(write)? {
            EncoderState::Finished => {
                debug!(
                    frames = self.frames_sent,
                    packets = self.packets_received,
                    "encoder drained"
                );
                Ok(())
            }
            state => Err(Error::codec(
                "avcodec_receive_packet",
                format!("encoder stopped in {:?} state after flush", state),
            )),
        }
    }
}

/**
    Convert our CodecId to FFmpeg's codec ID.
*/
fn codec_id_to_ffmpeg(codec: CodecId) -> Result<CodecIdFFmpeg> {
    match codec {
        CodecId::H264 => Ok(CodecIdFFmpeg::H264),
        CodecId::H265 => Ok(CodecIdFFmpeg::HEVC),
        CodecId::Mpeg4 => Ok(CodecIdFFmpeg::MPEG4),
        CodecId::Vp8 => Ok(CodecIdFFmpeg::VP8),
        CodecId::Vp9 => Ok(CodecIdFFmpeg::VP9),
        CodecId::Av1 => Ok(CodecIdFFmpeg::AV1),
        CodecId::ProRes => Ok(CodecIdFFmpeg::PRORES),
        CodecId::Mjpeg => Ok(CodecIdFFmpeg::MJPEG),
        _ => Err(Error::negotiation(
            "avcodec_find_encoder",
            format!("video codec {:?} not supported for encoding", codec),
        )),
    }
}

/**
    Convert our PixelFormat to FFmpeg's Pixel format.
*/
fn pixel_format_to_ffmpeg(format: PixelFormat) -> Result<ffmpeg_next::format::Pixel> {
    use ffmpeg_next::format::Pixel;

    match format {
        PixelFormat::Yuv420p => Ok(Pixel::YUV420P),
        _ => Err(Error::negotiation(
            "avcodec_open2",
            format!("pixel format {:?} not supported for encoding", format),
        )),
    }
}

impl std::fmt::Debug for VideoEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoEncoder")
            .field("codec", &self.codec)
            .field("width", &self.encoder.width())
            .field("height", &self.encoder.height())
            .field("time_base", &self.time_base)
            .field("frames_sent", &self.frames_sent)
            .field("flushing", &self.flushing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_next::format::Pixel;
    use ffmpeg_types::ErrorKind;

    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 48;

    fn mpeg4_encoder() -> VideoEncoder {
        let config =
            VideoEncoderConfig::new(CodecId::Mpeg4, WIDTH, HEIGHT, Rational::new(1, 30000));
        VideoEncoder::new(config).unwrap()
    }

    fn gray_frame(width: u32, height: u32) -> VideoFrameFFmpeg {
        let mut frame = VideoFrameFFmpeg::new(Pixel::YUV420P, width, height);
        for plane in 0..3 {
            frame.data_mut(plane).fill(128);
        }
        frame
    }

    #[test]
    fn opens_with_requested_time_base() {
        let encoder = mpeg4_encoder();
        assert_eq!(encoder.time_base(), Rational::new(1, 30000));
        assert_eq!(encoder.codec(), CodecId::Mpeg4);

        let info = encoder.stream_info();
        assert_eq!((info.width, info.height), (WIDTH, HEIGHT));
        assert_eq!(info.pixel_format, PixelFormat::Yuv420p);
    }

    #[test]
    fn invalid_time_base_rejected() {
        let config = VideoEncoderConfig::new(CodecId::Mpeg4, WIDTH, HEIGHT, Rational::new(1, 0));
        let err = VideoEncoder::new(config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn flush_emits_one_packet_per_frame() {
        let mut encoder = mpeg4_encoder();
        let mut frame = gray_frame(WIDTH, HEIGHT);
        let mut pts = Vec::new();

        for i in 0..20i64 {
            frame.set_pts(Some(i * 1001));
            encoder.send_frame(&frame).unwrap();
            let state = encoder
                .drain(|packet| {
                    pts.push(packet.pts());
                    Ok(())
                })
                .unwrap();
            assert_eq!(state, EncoderState::Pending);
        }

        encoder
            .flush(|packet| {
                pts.push(packet.pts());
                Ok(())
            })
            .unwrap();

        assert_eq!(encoder.frames_sent(), 20);
        assert_eq!(pts.len(), 20);
        assert_eq!(encoder.packets_received(), 20);

        let mut sorted: Vec<i64> = pts.into_iter().flatten().collect();
        sorted.sort_unstable();
        let expected: Vec<i64> = (0..20).map(|i| i * 1001).collect();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn finished_is_sticky_and_rejects_frames() {
        let mut encoder = mpeg4_encoder();
        let mut frame = gray_frame(WIDTH, HEIGHT);
        frame.set_pts(Some(0));
        encoder.send_frame(&frame).unwrap();
        encoder.flush(|_| Ok(())).unwrap();

        let mut packet = PacketFFmpeg::empty();
        assert_eq!(
            encoder.receive_packet(&mut packet).unwrap(),
            EncoderState::Finished
        );

        let err = encoder.send_frame(&frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
    }

    #[test]
    fn write_errors_abort_drain() {
        let mut encoder = mpeg4_encoder();
        let mut frame = gray_frame(WIDTH, HEIGHT);
        frame.set_pts(Some(0));
        encoder.send_frame(&frame).unwrap();

        let err = encoder
            .flush(|_| Err(Error::io("av_interleaved_write_frame", "disk full")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.step(), "av_interleaved_write_frame");
    }

    #[test]
    fn mismatched_frame_rejected() {
        let mut encoder = mpeg4_encoder();
        let frame = gray_frame(WIDTH * 2, HEIGHT);
        let err = encoder.send_frame(&frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(encoder.frames_sent(), 0);
    }
}
