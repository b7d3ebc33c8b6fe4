/*!
    Pixel layouts.
*/

/**
    Pixel layouts understood by the pipeline.

    Capture sources hand over one packed plane of 8-bit RGB or BGR samples;
    encoders take planar YUV 4:2:0.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0: full-size luma, chroma halved in both directions.
    Yuv420p,
    /// Packed R, G, B bytes.
    Rgb24,
    /// Packed B, G, R bytes.
    Bgr24,
}

impl PixelFormat {
    /**
        Bytes per pixel of a packed layout. `None` for planar layouts.
    */
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Yuv420p => None,
            Self::Rgb24 | Self::Bgr24 => Some(3),
        }
    }

    pub const fn is_planar(self) -> bool {
        matches!(self, Self::Yuv420p)
    }

    /**
        Length of one tightly packed row, or `None` for planar layouts.
    */
    pub const fn row_bytes(self, width: u32) -> Option<usize> {
        match self.bytes_per_pixel() {
            Some(bpp) => Some(width as usize * bpp),
            None => None,
        }
    }

    /**
        Bytes needed for a whole picture without row padding.

        Odd dimensions round the chroma planes up.
    */
    pub const fn frame_size(self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            Self::Yuv420p => w * h + 2 * w.div_ceil(2) * h.div_ceil(2),
            Self::Rgb24 | Self::Bgr24 => w * h * 3,
        }
    }
}
