/*!
    The recording session: validate, negotiate, encode, finalize.
*/

use std::fmt;
use std::path::{Path, PathBuf};

use ffmpeg_encode::{VideoEncoder, VideoEncoderConfig};
use ffmpeg_next::util::frame::video::Video as VideoFrameFFmpeg;
use ffmpeg_sink::Muxer;
use ffmpeg_transform::{ConverterConfig, FlipConverter, alloc_frame, make_writable};
use ffmpeg_types::{Error, PixelFormat, Rational, Result, VideoStreamInfo};
use tracing::{debug, error, trace};

use crate::config::RecorderConfig;

/**
    Records raw RGB24 frames into a video file.

    The container format comes from the file extension. Frames are flipped
    vertically on the way in: the first row in memory ends up at the bottom
    of the picture. The file is only playable once [`Recorder::close`] has
    succeeded.

    Every operation on a closed recorder fails with
    [`ErrorKind::Closed`](ffmpeg_types::ErrorKind::Closed).
*/
pub struct Recorder {
    session: Option<Session>,
    path: PathBuf,
    info: VideoStreamInfo,
    stream_time_base: Rational,
    frames_encoded: u64,
    packets_written: u64,
}

// Fields drop in declaration order: frame, encoder, converter, container.
struct Session {
    frame: VideoFrameFFmpeg,
    encoder: VideoEncoder,
    converter: FlipConverter,
    muxer: Muxer,
}

impl Recorder {
    /**
        Start recording `width`x`height` frames to `path`.

        Timestamps passed to [`Recorder::encode`] are in units of
        `timebase_num / timebase_den` seconds. On success the container
        header is already on disk.
    */
    pub fn init<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        timebase_num: i32,
        timebase_den: i32,
    ) -> Result<Self> {
        Self::init_with(
            path,
            width,
            height,
            Rational::new(timebase_num, timebase_den),
            RecorderConfig::default(),
        )
    }

    /**
        Like [`Recorder::init`], with explicit tuning.
    */
    pub fn init_with<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        time_base: Rational,
        config: RecorderConfig,
    ) -> Result<Self> {
        Self::start(path.as_ref(), width, height, time_base, &config).inspect_err(report)
    }

    fn start(
        path: &Path,
        width: u32,
        height: u32,
        time_base: Rational,
        config: &RecorderConfig,
    ) -> Result<Self> {
        validate_dimensions(width, height)?;
        if !time_base.is_valid_time_base() {
            return Err(Error::invalid_argument(
                "recorder_init",
                format!("invalid time base {}", time_base),
            ));
        }

        let converter = FlipConverter::new(
            ConverterConfig::rgb24_to_yuv420p(width, height).with_algorithm(config.scaling),
        )?;

        let mut muxer = Muxer::allocate(path)?;
        let codec = match config.codec {
            Some(codec) => codec,
            None => muxer.default_video_codec()?,
        };
        muxer.add_video_stream(codec, time_base)?;

        let mut encoder_config = VideoEncoderConfig::new(codec, width, height, time_base)
            .with_keyframe_interval(config.keyframe_interval)
            .with_global_header(muxer.requires_global_header());
        if let Some(preset) = config.preset {
            encoder_config = encoder_config.with_preset(preset);
        }
        if let Some(rate_control) = config.rate_control {
            encoder_config = encoder_config.with_rate_control(rate_control);
        }
        let encoder = VideoEncoder::new(encoder_config)?;

        let frame = alloc_frame(PixelFormat::Yuv420p, width, height)?;

        muxer.copy_parameters(encoder.context())?;
        muxer.dump();
        muxer.open()?;
        muxer.write_header()?;

        let stream_time_base = muxer.stream_time_base().unwrap_or(time_base);
        let info = encoder.stream_info();

        debug!(
            path = %path.display(),
            format = muxer.format_name(),
            codec = %codec,
            width,
            height,
            time_base = %time_base,
            stream_time_base = %stream_time_base,
            "recording started"
        );

        Ok(Self {
            session: Some(Session {
                frame,
                encoder,
                converter,
                muxer,
            }),
            path: path.to_path_buf(),
            info,
            stream_time_base,
            frames_encoded: 0,
            packets_written: 0,
        })
    }

    /**
        Encode one frame.

        `pixels` holds `width * height * 3` bytes of tightly packed RGB24.
        `pts` is in the time base given at init and should increase between
        calls. Ordering is not checked here; encoders that care reject it.
    */
    pub fn encode(&mut self, pixels: &[u8], pts: i64) -> Result<()> {
        self.encode_frame(pixels, pts).inspect_err(report)
    }

    fn encode_frame(&mut self, pixels: &[u8], pts: i64) -> Result<()> {
        let Session {
            frame,
            encoder,
            converter,
            muxer,
        } = self
            .session
            .as_mut()
            .ok_or_else(|| Error::closed("recorder_encode_frame"))?;

        // The encoder may still reference the previous picture.
        make_writable(frame)?;
        converter.convert(pixels, frame)?;
        frame.set_pts(Some(pts));

        encoder.send_frame(frame)?;

        let time_base = encoder.time_base();
        let mut written = 0;
        let state = encoder.drain(|packet| {
            muxer.write_packet(packet, time_base)?;
            written += 1;
            Ok(())
        })?;

        self.frames_encoded += 1;
        self.packets_written += written;
        trace!(pts, packets = written, ?state, "frame encoded");

        Ok(())
    }

    /**
        Flush the encoder, write the container trailer and release everything.

        A second call fails with
        [`ErrorKind::Closed`](ffmpeg_types::ErrorKind::Closed). If flushing
        fails the recorder is still closed, but the file is not finalized.
    */
    pub fn close(&mut self) -> Result<()> {
        self.finish().inspect_err(report)
    }

    fn finish(&mut self) -> Result<()> {
        let mut session = self
            .session
            .take()
            .ok_or_else(|| Error::closed("recorder_close"))?;
        let Session { encoder, muxer, .. } = &mut session;

        let time_base = encoder.time_base();
        let mut written = 0;
        encoder.flush(|packet| {
            muxer.write_packet(packet, time_base)?;
            written += 1;
            Ok(())
        })?;
        self.packets_written += written;
        debug!(packets = written, "flushed buffered packets");

        muxer.finish()?;

        debug!(
            path = %self.path.display(),
            frames = self.frames_encoded,
            packets = self.packets_written,
            "recording finalized"
        );

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    /**
        Unit of the timestamps passed to [`Recorder::encode`].
    */
    pub fn time_base(&self) -> Rational {
        self.info.time_base
    }

    /**
        Time base the container chose for the stream once the header was
        written. Packets are rescaled into it.
    */
    pub fn stream_time_base(&self) -> Rational {
        self.stream_time_base
    }

    pub fn stream_info(&self) -> &VideoStreamInfo {
        &self.info
    }

    /**
        Bytes expected per frame passed to [`Recorder::encode`].
    */
    pub fn frame_len(&self) -> usize {
        self.info.rgb24_frame_len()
    }

    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("path", &self.path)
            .field("width", &self.info.width)
            .field("height", &self.info.height)
            .field("codec", &self.info.codec_id)
            .field("time_base", &self.info.time_base)
            .field("frames_encoded", &self.frames_encoded)
            .field("packets_written", &self.packets_written)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/**
    Dimensions must be positive and even (4:2:0 chroma subsampling), and a
    row of RGB24 must fit a signed 32-bit stride.
*/
fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_argument(
            "recorder_init",
            format!("dimensions {}x{} must be positive", width, height),
        ));
    }

    if width % 2 != 0 || height % 2 != 0 {
        return Err(Error::invalid_argument(
            "recorder_init",
            format!("dimensions {}x{} must be even", width, height),
        ));
    }

    let stride_fits = width
        .checked_mul(3)
        .is_some_and(|stride| i32::try_from(stride).is_ok());
    if !stride_fits || i32::try_from(height).is_err() {
        return Err(Error::invalid_argument(
            "recorder_init",
            format!("dimensions {}x{} are too large", width, height),
        ));
    }

    Ok(())
}

/**
    Log a failure once, at the public boundary.
*/
pub(crate) fn report(err: &Error) {
    error!(
        location = %err.location(),
        step = err.step(),
        kind = %err.kind(),
        "{}",
        err.message()
    );
}
