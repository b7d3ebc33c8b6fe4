/*!
    Reusable destination frames.
*/

use ffmpeg_next::{ffi, util::frame::video::Video as VideoFrameFFmpeg};

use ffmpeg_types::{Error, PixelFormat, Result};

/**
    Allocate a video frame with its own pixel buffers.

    The frame is meant to be reused for every input: call [`make_writable`]
    before overwriting it.
*/
pub fn alloc_frame(format: PixelFormat, width: u32, height: u32) -> Result<VideoFrameFFmpeg> {
    let pixel = pixel_format_to_ffmpeg(format)?;
    let frame = VideoFrameFFmpeg::new(pixel, width, height);

    // Video::new swallows av_frame_get_buffer failures, leaving no planes.
    let has_buffer = unsafe { !(*frame.as_ptr()).data[0].is_null() };
    if !has_buffer {
        return Err(Error::allocation(
            "av_frame_get_buffer",
            format!("failed to allocate {width}x{height} {format:?} frame"),
        ));
    }

    Ok(frame)
}

/**
    Returns true if nobody else holds a reference to the frame's buffers.
*/
pub fn is_writable(frame: &VideoFrameFFmpeg) -> bool {
    unsafe { ffi::av_frame_is_writable(frame.as_ptr() as *mut ffi::AVFrame) > 0 }
}

/**
    Ensure the frame's buffers are exclusively ours.

    An encoder may keep a reference to the buffers of a frame it was sent
    (lookahead, reordering). In that case a private copy is taken so the
    next conversion does not overwrite a picture the encoder still needs.
*/
pub fn make_writable(frame: &mut VideoFrameFFmpeg) -> Result<()> {
    let ret = unsafe { ffi::av_frame_make_writable(frame.as_mut_ptr()) };
    if ret < 0 {
        return Err(Error::allocation(
            "av_frame_make_writable",
            ffmpeg_next::Error::from(ret).to_string(),
        ));
    }
    Ok(())
}

/**
    Convert our PixelFormat to FFmpeg's Pixel format.
*/
pub(crate) fn pixel_format_to_ffmpeg(format: PixelFormat) -> Result<ffmpeg_next::format::Pixel> {
    use ffmpeg_next::format::Pixel;

    match format {
        PixelFormat::Yuv420p => Ok(Pixel::YUV420P),
        PixelFormat::Rgb24 => Ok(Pixel::RGB24),
        PixelFormat::Bgr24 => Ok(Pixel::BGR24),
        _ => Err(Error::invalid_argument(
            "pixel_format",
            format!("pixel format {:?} not supported", format),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_frame_matches_request() {
        let frame = alloc_frame(PixelFormat::Yuv420p, 64, 48).unwrap();
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert_eq!(frame.format(), ffmpeg_next::format::Pixel::YUV420P);
        assert!(frame.stride(0) >= 64);
        assert!(is_writable(&frame));
    }

    #[test]
    fn make_writable_detaches_retained_buffers() {
        let mut frame = alloc_frame(PixelFormat::Yuv420p, 32, 32).unwrap();
        frame.data_mut(0)[0] = 200;

        // Simulate an encoder holding on to the previous picture.
        let mut retained = unsafe { ffi::av_frame_alloc() };
        assert!(!retained.is_null());
        let ret = unsafe { ffi::av_frame_ref(retained, frame.as_ptr()) };
        assert_eq!(ret, 0);
        assert!(!is_writable(&frame));

        make_writable(&mut frame).unwrap();
        assert!(is_writable(&frame));

        // The private copy keeps the old contents; the retained one is untouched.
        frame.data_mut(0)[0] = 10;
        let retained_first = unsafe { *(*retained).data[0] };
        assert_eq!(retained_first, 200);

        unsafe { ffi::av_frame_free(&mut retained) };
    }
}
