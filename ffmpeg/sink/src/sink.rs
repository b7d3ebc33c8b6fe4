/*!
    Container muxer implementation.
*/

use std::{
    ffi::{CString, c_int},
    path::{Path, PathBuf},
    ptr,
};

use ffmpeg_next::{
    Packet as PacketFFmpeg, Rational as FFmpegRational, codec, ffi,
    format::context::Output as OutputContext,
};
use tracing::{Level, debug, enabled, trace, warn};

use ffmpeg_types::{CodecId, Error, Rational, Result};

/**
    Writes encoded packets of a single video stream into a container file.

    The container format is inferred from the output path's extension.
*/
pub struct Muxer {
    output: OutputContext,
    path: PathBuf,
    c_path: CString,
    stream_index: Option<usize>,
    stream_time_base: Option<Rational>,
    opened: bool,
    header_written: bool,
    finished: bool,
}

impl Muxer {
    /**
        Allocate a container context for `path`.

        The format is guessed from the file extension. Nothing is created on
        disk until [`open`](Self::open).
    */
    pub fn allocate<P: AsRef<Path>>(path: P) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::allocation("ffmpeg_init", e.to_string()))?;

        let path = path.as_ref().to_path_buf();
        let c_path = path
            .to_str()
            .and_then(|p| CString::new(p).ok())
            .ok_or_else(|| {
                Error::invalid_argument(
                    "avformat_alloc_output_context2",
                    format!("unusable output path {}", path.display()),
                )
            })?;

        let mut ctx = ptr::null_mut();
        let ret = unsafe {
            ffi::avformat_alloc_output_context2(
                &mut ctx,
                ptr::null_mut(),
                ptr::null(),
                c_path.as_ptr(),
            )
        };
        if ret < 0 || ctx.is_null() {
            return Err(Error::negotiation(
                "avformat_alloc_output_context2",
                format!(
                    "no container format for {}: {}",
                    path.display(),
                    ffmpeg_next::Error::from(ret)
                ),
            ));
        }

        let output = unsafe { OutputContext::wrap(ctx) };

        debug!(path = %path.display(), format = %output.format().name(), "allocated container");

        Ok(Self {
            output,
            path,
            c_path,
            stream_index: None,
            stream_time_base: None,
            opened: false,
            header_written: false,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /**
        Short name of the guessed container format, e.g. `mov,mp4,m4a,3gp,3g2,mj2`.
    */
    pub fn format_name(&self) -> String {
        self.output.format().name().to_owned()
    }

    /**
        The video codec the container format prefers.
    */
    pub fn default_video_codec(&self) -> Result<CodecId> {
        let id: codec::Id = unsafe { (*(*self.output.as_ptr()).oformat).video_codec.into() };

        codec_id_from_ffmpeg(id).ok_or_else(|| {
            Error::negotiation(
                "avcodec_find_encoder",
                format!(
                    "container {} has no supported default video codec ({:?})",
                    self.format_name(),
                    id
                ),
            )
        })
    }

    /**
        Returns true if the container stores codec headers separately from
        packet data, in which case encoders must emit global headers.
    */
    pub fn requires_global_header(&self) -> bool {
        self.format_flags() & ffi::AVFMT_GLOBALHEADER as c_int != 0
    }

    fn format_flags(&self) -> c_int {
        unsafe { (*(*self.output.as_ptr()).oformat).flags }
    }

    /**
        Add the video stream. Only one stream is supported.

        Returns the stream index.
    */
    pub fn add_video_stream(&mut self, codec: CodecId, time_base: Rational) -> Result<usize> {
        if self.stream_index.is_some() {
            return Err(Error::invalid_argument(
                "avformat_new_stream",
                "container already has a video stream",
            ));
        }
        if !time_base.is_valid_time_base() {
            return Err(Error::invalid_argument(
                "avformat_new_stream",
                format!("invalid time base {}", time_base),
            ));
        }

        let codec_id = codec_id_to_ffmpeg(codec)?;
        let encoder = ffmpeg_next::encoder::find(codec_id).ok_or_else(|| {
            Error::negotiation(
                "avcodec_find_encoder",
                format!("no encoder available for {}", codec),
            )
        })?;

        let mut stream = self
            .output
            .add_stream(encoder)
            .map_err(|e| Error::allocation("avformat_new_stream", e.to_string()))?;

        stream.set_time_base(FFmpegRational::new(time_base.num, time_base.den));
        let index = stream.index();

        unsafe {
            let st = stream.as_mut_ptr();
            (*st).id = index as c_int;
            (*(*st).codecpar).codec_type = ffi::AVMediaType::AVMEDIA_TYPE_VIDEO;
            (*(*st).codecpar).codec_id = codec_id.into();
        }

        self.stream_index = Some(index);
        Ok(index)
    }

    /**
        Copy the opened encoder's final parameters into the stream.
    */
    pub fn copy_parameters(&mut self, context: &codec::Context) -> Result<()> {
        let index = self.require_stream("avcodec_parameters_from_context")?;
        let mut stream = self.output.stream_mut(index).ok_or_else(|| {
            Error::allocation("avcodec_parameters_from_context", "stream vanished")
        })?;

        let ret = unsafe {
            ffi::avcodec_parameters_from_context(
                (*stream.as_mut_ptr()).codecpar,
                context.as_ptr(),
            )
        };
        if ret < 0 {
            return Err(Error::allocation(
                "avcodec_parameters_from_context",
                ffmpeg_next::Error::from(ret).to_string(),
            ));
        }

        Ok(())
    }

    /**
        Log the container layout (av_dump_format) when debug logging is on.
    */
    pub fn dump(&self) {
        if !enabled!(Level::DEBUG) {
            return;
        }
        unsafe {
            ffi::av_dump_format(
                self.output.as_ptr() as *mut ffi::AVFormatContext,
                0,
                self.c_path.as_ptr(),
                1,
            );
        }
    }

    /**
        Create or truncate the output file.
    */
    pub fn open(&mut self) -> Result<()> {
        if self.opened {
            return Ok(());
        }
        if self.format_flags() & ffi::AVFMT_NOFILE as c_int == 0 {
            let ret = unsafe {
                ffi::avio_open(
                    &mut (*self.output.as_mut_ptr()).pb,
                    self.c_path.as_ptr(),
                    ffi::AVIO_FLAG_WRITE as c_int,
                )
            };
            if ret < 0 {
                return Err(Error::io(
                    "avio_open",
                    format!("{}: {}", self.path.display(), ffmpeg_next::Error::from(ret)),
                ));
            }
        }
        self.opened = true;
        Ok(())
    }

    /**
        Write the container header and push it to disk.

        On failure the output file is closed and removed.
    */
    pub fn write_header(&mut self) -> Result<()> {
        let index = self.require_stream("avformat_write_header")?;
        if !self.opened {
            return Err(Error::io("avformat_write_header", "output not opened"));
        }

        if let Err(e) = self.output.write_header() {
            self.discard();
            return Err(Error::io("avformat_write_header", e.to_string()));
        }
        self.header_written = true;

        unsafe {
            let pb = (*self.output.as_mut_ptr()).pb;
            if !pb.is_null() {
                ffi::avio_flush(pb);
            }
        }

        // The muxer may have picked its own time base for the stream.
        let time_base = self
            .output
            .stream(index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| Error::io("avformat_write_header", "stream vanished"))?;
        let time_base = Rational::new(time_base.numerator(), time_base.denominator());
        self.stream_time_base = Some(time_base);

        debug!(path = %self.path.display(), %time_base, "wrote container header");
        Ok(())
    }

    /**
        Time base of the stream as chosen by the muxer. Known once the header
        is written.
    */
    pub fn stream_time_base(&self) -> Option<Rational> {
        self.stream_time_base
    }

    /**
        Rescale `packet` from `time_base` into the stream's time base and hand
        it to the interleaving writer.
    */
    pub fn write_packet(&mut self, packet: &mut PacketFFmpeg, time_base: Rational) -> Result<()> {
        let (index, stream_time_base) = match (self.stream_index, self.stream_time_base) {
            (Some(index), Some(tb)) if self.header_written && !self.finished => (index, tb),
            _ => {
                return Err(Error::io(
                    "av_interleaved_write_frame",
                    "container is not accepting packets",
                ));
            }
        };

        packet.set_stream(index);
        packet.set_position(-1);
        packet.rescale_ts(
            FFmpegRational::new(time_base.num, time_base.den),
            FFmpegRational::new(stream_time_base.num, stream_time_base.den),
        );

        trace!(pts = ?packet.pts(), dts = ?packet.dts(), size = packet.size(), "writing packet");

        packet
            .write_interleaved(&mut self.output)
            .map_err(|e| Error::io("av_interleaved_write_frame", e.to_string()))
    }

    /**
        Write the trailer and close the output file.

        This writes trailing metadata (duration, seek index) and finalizes the
        container. The file is invalid if this is not called.
    */
    pub fn finish(&mut self) -> Result<()> {
        if !self.header_written || self.finished {
            return Err(Error::io("av_write_trailer", "container is not open"));
        }
        self.finished = true;

        self.output
            .write_trailer()
            .map_err(|e| Error::io("av_write_trailer", e.to_string()))?;

        let ret = unsafe { ffi::avio_closep(&mut (*self.output.as_mut_ptr()).pb) };
        if ret < 0 {
            return Err(Error::io(
                "avio_close",
                ffmpeg_next::Error::from(ret).to_string(),
            ));
        }

        debug!(path = %self.path.display(), "finalized container");
        Ok(())
    }

    fn require_stream(&self, step: &'static str) -> Result<usize> {
        self.stream_index
            .ok_or_else(|| Error::invalid_argument(step, "no video stream configured"))
    }

    /**
        Close and delete a file that never got a valid header.
    */
    fn discard(&mut self) {
        unsafe {
            ffi::avio_closep(&mut (*self.output.as_mut_ptr()).pb);
        }
        self.opened = false;
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove partial output");
        }
    }
}

impl Drop for Muxer {
    fn drop(&mut self) {
        if self.header_written && !self.finished {
            warn!(
                path = %self.path.display(),
                "container dropped without trailer, output file is incomplete"
            );
        }
    }
}

/**
    Convert our video CodecId to FFmpeg's codec ID.
*/
fn codec_id_to_ffmpeg(codec: CodecId) -> Result<codec::Id> {
    use codec::Id;

    match codec {
        CodecId::H264 => Ok(Id::H264),
        CodecId::H265 => Ok(Id::HEVC),
        CodecId::Mpeg4 => Ok(Id::MPEG4),
        CodecId::Vp8 => Ok(Id::VP8),
        CodecId::Vp9 => Ok(Id::VP9),
        CodecId::Av1 => Ok(Id::AV1),
        CodecId::ProRes => Ok(Id::PRORES),
        CodecId::Mjpeg => Ok(Id::MJPEG),
        _ => Err(Error::negotiation(
            "avformat_new_stream",
            format!("video codec {:?} not supported for muxing", codec),
        )),
    }
}

/**
    Convert FFmpeg's codec ID to our video CodecId.
*/
fn codec_id_from_ffmpeg(id: codec::Id) -> Option<CodecId> {
    use codec::Id;

    match id {
        Id::H264 => Some(CodecId::H264),
        Id::HEVC => Some(CodecId::H265),
        Id::MPEG4 => Some(CodecId::Mpeg4),
        Id::VP8 => Some(CodecId::Vp8),
        Id::VP9 => Some(CodecId::Vp9),
        Id::AV1 => Some(CodecId::Av1),
        Id::PRORES => Some(CodecId::ProRes),
        Id::MJPEG => Some(CodecId::Mjpeg),
        _ => None,
    }
}

impl std::fmt::Debug for Muxer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Muxer")
            .field("path", &self.path)
            .field("stream", &self.stream_index)
            .field("header_written", &self.header_written)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_types::ErrorKind;

    #[test]
    fn unknown_extension_fails_without_creating_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.notaformat");

        let err = Muxer::allocate(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Negotiation);
        assert_eq!(err.step(), "avformat_alloc_output_context2");
        assert!(!path.exists());
    }

    #[test]
    fn mov_allocates_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.mov");

        let muxer = Muxer::allocate(&path).unwrap();
        assert!(!path.exists());
        assert!(muxer.format_name().contains("mov"));
        assert!(muxer.requires_global_header());
        assert!(matches!(
            muxer.default_video_codec().unwrap(),
            CodecId::H264 | CodecId::Mpeg4
        ));
        assert_eq!(muxer.path(), path.as_path());
    }

    #[test]
    fn only_one_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut muxer = Muxer::allocate(dir.path().join("capture.mov")).unwrap();

        let index = muxer
            .add_video_stream(CodecId::Mpeg4, Rational::new(1, 30000))
            .unwrap();
        assert_eq!(index, 0);

        let err = muxer
            .add_video_stream(CodecId::Mpeg4, Rational::new(1, 30000))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn invalid_time_base_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut muxer = Muxer::allocate(dir.path().join("capture.mov")).unwrap();

        let err = muxer
            .add_video_stream(CodecId::Mpeg4, Rational::new(0, 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn packets_rejected_before_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut muxer = Muxer::allocate(dir.path().join("capture.mov")).unwrap();
        muxer
            .add_video_stream(CodecId::Mpeg4, Rational::new(1, 30000))
            .unwrap();

        let mut packet = PacketFFmpeg::copy(&[0, 0, 1, 0xb6]);
        let err = muxer
            .write_packet(&mut packet, Rational::new(1, 30000))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);

        let err = muxer.finish().unwrap_err();
        assert_eq!(err.step(), "av_write_trailer");
    }

    #[test]
    fn failed_header_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.mov");
        let mut muxer = Muxer::allocate(&path).unwrap();
        muxer
            .add_video_stream(CodecId::Mpeg4, Rational::new(1, 30000))
            .unwrap();

        muxer.open().unwrap();
        assert!(path.exists());

        // No encoder parameters were copied, so the dimensions are unset.
        let err = muxer.write_header().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.step(), "avformat_write_header");
        assert!(!path.exists());
    }

    #[test]
    fn header_requires_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut muxer = Muxer::allocate(dir.path().join("capture.mov")).unwrap();
        let err = muxer.write_header().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
