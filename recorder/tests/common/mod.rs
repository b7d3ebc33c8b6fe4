//! Decode helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;

use ffmpeg_next::{
    Rational as FFmpegRational,
    codec::{context::Context as CodecContext, decoder::Video as VideoDecoder},
    format::{self, Pixel},
    media::Type,
    software::scaling::{Context as ScalerContext, Flags},
    util::frame::video::Video as VideoFrame,
};

/// One decoded picture, repacked as tightly packed RGB24.
pub struct DecodedFrame {
    pub pts: Option<i64>,
    pub rgb: Vec<u8>,
}

pub struct Decoded {
    pub width: u32,
    pub height: u32,
    pub time_base: FFmpegRational,
    /// Container duration in seconds, if known.
    pub duration: Option<f64>,
    pub frames: Vec<DecodedFrame>,
}

impl Decoded {
    /// Pixel at (x, y), y counted from the top of the picture.
    pub fn pixel(&self, frame: usize, x: u32, y: u32) -> [u8; 3] {
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        let rgb = &self.frames[frame].rgb;
        [rgb[offset], rgb[offset + 1], rgb[offset + 2]]
    }

    /// Presentation timestamps relative to the first one, in `to` units.
    pub fn relative_pts(&self, to: FFmpegRational) -> Vec<i64> {
        let mut pts: Vec<i64> = self.frames.iter().filter_map(|f| f.pts).collect();
        pts.sort_unstable();
        let Some(&first) = pts.first() else {
            return pts;
        };
        pts.iter()
            .map(|&p| {
                let delta = (p - first) as f64 * f64::from(self.time_base);
                (delta / f64::from(to)).round() as i64
            })
            .collect()
    }
}

/// Decode every video frame of `path` into RGB24.
pub fn decode(path: &Path) -> Decoded {
    ffmpeg_next::init().unwrap();

    let mut input = format::input(path).unwrap();
    let stream = input.streams().best(Type::Video).unwrap();
    let index = stream.index();
    let time_base = stream.time_base();

    let context = CodecContext::from_parameters(stream.parameters()).unwrap();
    let mut decoder = context.decoder().video().unwrap();
    let (width, height) = (decoder.width(), decoder.height());

    let mut scaler = ScalerContext::get(
        decoder.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        Flags::BILINEAR,
    )
    .unwrap();

    let mut frames = Vec::new();
    for (stream, packet) in input.packets() {
        if stream.index() == index {
            decoder.send_packet(&packet).unwrap();
            receive(&mut decoder, &mut scaler, &mut frames);
        }
    }
    decoder.send_eof().unwrap();
    receive(&mut decoder, &mut scaler, &mut frames);

    let duration = (input.duration() > 0)
        .then(|| input.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE));

    Decoded {
        width,
        height,
        time_base,
        duration,
        frames,
    }
}

fn receive(
    decoder: &mut VideoDecoder,
    scaler: &mut ScalerContext,
    frames: &mut Vec<DecodedFrame>,
) {
    let mut decoded = VideoFrame::empty();
    while decoder.receive_frame(&mut decoded).is_ok() {
        let mut rgb = VideoFrame::empty();
        scaler.run(&decoded, &mut rgb).unwrap();
        frames.push(DecodedFrame {
            pts: decoded.timestamp(),
            rgb: pack(&rgb),
        });
    }
}

fn pack(frame: &VideoFrame) -> Vec<u8> {
    let row = frame.width() as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);
    let mut out = Vec::with_capacity(row * frame.height() as usize);
    for y in 0..frame.height() as usize {
        out.extend_from_slice(&data[y * stride..y * stride + row]);
    }
    out
}

/// Solid RGB24 frame.
pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    rgb.repeat(width as usize * height as usize)
}

/// Frame whose first `height / 2` rows in memory are `first`, the rest `second`.
pub fn halves(width: u32, height: u32, first: [u8; 3], second: [u8; 3]) -> Vec<u8> {
    let half = width as usize * (height / 2) as usize;
    let mut out = first.repeat(half);
    out.extend(second.repeat(width as usize * height as usize - half));
    out
}
