/*!
    C ABI for hosts that load the recorder as a shared library.

    Every function returns `0` on success and `-1` on failure. Failures are
    logged through `tracing` before returning, so the host only needs the
    status code.

    The handle is an opaque pointer owned by the library between
    [`recorder_init`] and [`recorder_close`]. Close takes the address of the
    handle and nulls it, so a second close, or an encode after close, sees a
    null handle and fails instead of touching freed memory.
*/

use std::ffi::{CStr, c_char, c_int};
use std::{ptr, slice};

use ffmpeg_types::{Error, Result};

use crate::Recorder;
use crate::recorder::report;

const OK: c_int = 0;
const FAILED: c_int = -1;

fn status(result: Result<()>) -> c_int {
    match result {
        Ok(()) => OK,
        Err(_) => FAILED,
    }
}

/**
    Start a recording. On success `*recorder` receives the new handle.

    # Safety

    `recorder` must be valid for writes. `filename` must point to a
    NUL-terminated UTF-8 string.
*/
#[unsafe(no_mangle)]
pub unsafe extern "C" fn recorder_init(
    recorder: *mut *mut Recorder,
    filename: *const c_char,
    width: c_int,
    height: c_int,
    timebase_numerator: c_int,
    timebase_denominator: c_int,
) -> c_int {
    if recorder.is_null() {
        report(&Error::invalid_argument("recorder_init", "null handle pointer"));
        return FAILED;
    }
    unsafe { *recorder = ptr::null_mut() };

    if filename.is_null() {
        report(&Error::invalid_argument("recorder_init", "null filename"));
        return FAILED;
    }
    let Ok(filename) = unsafe { CStr::from_ptr(filename) }.to_str() else {
        report(&Error::invalid_argument("recorder_init", "filename is not UTF-8"));
        return FAILED;
    };

    let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
        report(&Error::invalid_argument(
            "recorder_init",
            format!("dimensions {}x{} must be positive", width, height),
        ));
        return FAILED;
    };

    match Recorder::init(
        filename,
        width,
        height,
        timebase_numerator,
        timebase_denominator,
    ) {
        Ok(handle) => {
            unsafe { *recorder = Box::into_raw(Box::new(handle)) };
            OK
        }
        Err(_) => FAILED,
    }
}

/**
    Encode one RGB24 frame of `width * height * 3` bytes.

    # Safety

    `recorder` must be null or a handle from [`recorder_init`] that has not
    been closed. `pixels` must be readable for `width * height * 3` bytes.
*/
#[unsafe(no_mangle)]
pub unsafe extern "C" fn recorder_encode_frame(
    recorder: *mut Recorder,
    pixels: *const u8,
    pts: i64,
) -> c_int {
    let Some(recorder) = (unsafe { recorder.as_mut() }) else {
        report(&Error::closed("recorder_encode_frame"));
        return FAILED;
    };

    if pixels.is_null() {
        report(&Error::invalid_argument(
            "recorder_encode_frame",
            "null pixel buffer",
        ));
        return FAILED;
    }
    let pixels = unsafe { slice::from_raw_parts(pixels, recorder.frame_len()) };

    status(recorder.encode(pixels, pts))
}

/**
    Finalize the file and free the handle. `*recorder` is set to null
    whether or not finalization succeeds.

    # Safety

    `recorder` must be valid for reads and writes, and `*recorder` must be
    null or a handle from [`recorder_init`].
*/
#[unsafe(no_mangle)]
pub unsafe extern "C" fn recorder_close(recorder: *mut *mut Recorder) -> c_int {
    if recorder.is_null() || unsafe { (*recorder).is_null() } {
        report(&Error::closed("recorder_close"));
        return FAILED;
    }

    let mut handle = unsafe { Box::from_raw(*recorder) };
    unsafe { *recorder = ptr::null_mut() };

    status(handle.close())
}
