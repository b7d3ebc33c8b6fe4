/*!
    Error type shared by every stage of the pipeline.
*/

use std::fmt;
use std::panic::Location;

use thiserror::Error;

/**
    Convenience alias for results carrying our [`Error`].
*/
pub type Result<T, E = Error> = std::result::Result<T, E>;

/**
    Broad category of a failure.

    Every kind is fatal to the call that produced it. Flow-control signals
    from the encoder ("try again", "end of stream") are not errors and never
    show up here.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller passed an argument outside the accepted range.
    InvalidArgument,
    /// A context, frame, or converter could not be allocated.
    Allocation,
    /// No codec for the container, or the encoder rejected its configuration.
    Negotiation,
    /// Opening, writing, or closing the output byte stream failed.
    Io,
    /// The codec session rejected a frame or failed to produce a packet.
    Codec,
    /// The handle was already closed.
    Closed,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::Allocation => "allocation",
            Self::Negotiation => "negotiation",
            Self::Io => "i/o",
            Self::Codec => "codec",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/**
    A failed pipeline step.

    Carries the step name (usually the FFmpeg call that failed), a human
    readable message, and the source location where the failure was detected.
    Displays as `file:line step error: message`.
*/
#[derive(Debug, Clone, Error)]
#[error("{}:{} {step} error: {message}", location.file(), location.line())]
pub struct Error {
    kind: ErrorKind,
    step: &'static str,
    message: String,
    location: &'static Location<'static>,
}

impl Error {
    /**
        Create an error of the given kind, recording the caller's location.
    */
    #[track_caller]
    pub fn new(kind: ErrorKind, step: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            step,
            message: message.into(),
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn invalid_argument(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, step, message)
    }

    #[track_caller]
    pub fn allocation(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Allocation, step, message)
    }

    #[track_caller]
    pub fn negotiation(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Negotiation, step, message)
    }

    #[track_caller]
    pub fn io(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, step, message)
    }

    #[track_caller]
    pub fn codec(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Codec, step, message)
    }

    #[track_caller]
    pub fn closed(step: &'static str) -> Self {
        Self::new(ErrorKind::Closed, step, "recorder already closed")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /**
        Name of the step that failed.
    */
    pub fn step(&self) -> &'static str {
        self.step
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /**
        Source location where the failure was detected.
    */
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}
