/*!
    Timestamp and time base types.
*/

use std::fmt;

/**
    A rational number, used for time bases.

    Timestamp arithmetic stays in FFmpeg (`av_packet_rescale_ts`); this type
    only carries and validates the terms.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /**
        Returns true if both terms are strictly positive.

        Time bases must be valid to be handed to a stream or encoder.
    */
    pub const fn is_valid_time_base(self) -> bool {
        self.num > 0 && self.den > 0
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
