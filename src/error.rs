//! Error taxonomy for the capture core.
//!
//! Nothing here is fatal: the worst outcomes are dropped events (absorbed at
//! the producer, visible only through [`CaptureStats`](crate::CaptureStats)
//! and the log) or an error returned to the immediate caller.

use axerrno::LinuxError;

/// Errors surfaced by the capture core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    /// The single session slot is already held by another consumer.
    Busy,
    /// A blocking wait was aborted by an external signal. Retryable; no
    /// data was consumed.
    Interrupted,
    /// The destination cannot hold even one event record. Non-retryable
    /// without a larger buffer; the queue is left unmodified.
    BufferTooSmall {
        /// Minimum destination capacity in bytes (one event record).
        required: usize,
    },
    /// The copy into the destination faulted mid-transfer. Only the prefix
    /// counted here was verified to land; the stream position was advanced
    /// by exactly this amount.
    PartialCopy {
        /// Bytes actually delivered before the fault.
        delivered: usize,
    },
    /// The controller is detaching or already detached.
    BadState,
    /// Rejected configuration at construction time.
    InvalidConfig(&'static str),
}

/// Result alias used throughout the crate.
pub type CaptureResult<T = ()> = Result<T, CaptureError>;

impl CaptureError {
    /// Whether the caller may simply retry the same call.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl core::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Busy => write!(f, "device is busy (session already held)"),
            Self::Interrupted => write!(f, "wait aborted by external signal"),
            Self::BufferTooSmall { required } => {
                write!(f, "destination smaller than one {required}-byte event record")
            }
            Self::PartialCopy { delivered } => {
                write!(f, "destination fault after {delivered} bytes")
            }
            Self::BadState => write!(f, "device is not active"),
            Self::InvalidConfig(why) => write!(f, "invalid configuration: {why}"),
        }
    }
}

/// errno mapping used by the character-stream front end.
impl From<CaptureError> for LinuxError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::Busy => LinuxError::EBUSY,
            CaptureError::Interrupted => LinuxError::EINTR,
            CaptureError::BufferTooSmall { .. } => LinuxError::EINVAL,
            CaptureError::PartialCopy { .. } => LinuxError::EFAULT,
            CaptureError::BadState => LinuxError::ENODEV,
            CaptureError::InvalidConfig(_) => LinuxError::EINVAL,
        }
    }
}
