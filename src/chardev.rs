//! Character-stream front end.
//!
//! Maps open/read/release 1:1 onto the controller contract with byte-stream
//! semantics: a per-file stream position, zero-length read as end-of-stream,
//! and errno codes at the boundary. The session is closed on drop, so every
//! exit path, normal or abnormal, releases the gate exactly once.

use alloc::sync::Arc;

use axerrno::LinuxError;

use crate::controller::DeviceController;
use crate::error::CaptureError;
use crate::registers::RegisterAccess;

/// One open file on a pushbutton device.
pub struct ButtonFile<R: RegisterAccess> {
    ctrl: Arc<DeviceController<R>>,
    pos: u64,
}

impl<R: RegisterAccess> ButtonFile<R> {
    /// Opens the device, blocking until the session slot is free.
    pub fn open(ctrl: Arc<DeviceController<R>>) -> Result<Self, LinuxError> {
        ctrl.open().map_err(LinuxError::from)?;
        Ok(Self { ctrl, pos: 0 })
    }

    /// Opens the device without blocking (`O_NONBLOCK` behaviour); fails
    /// with `EBUSY` when another session is open.
    pub fn open_nonblocking(ctrl: Arc<DeviceController<R>>) -> Result<Self, LinuxError> {
        ctrl.try_open().map_err(LinuxError::from)?;
        Ok(Self { ctrl, pos: 0 })
    }

    /// Reads captured events into `buf`.
    ///
    /// Returns the number of bytes read; `Ok(0)` signals end-of-stream. A
    /// copy fault after a non-empty prefix is reported as a short
    /// successful read, matching the errno contract; a fault before any
    /// byte landed is `EFAULT`.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinuxError> {
        match self.ctrl.read(buf, &mut self.pos) {
            Ok(n) => Ok(n),
            Err(CaptureError::PartialCopy { delivered }) if delivered > 0 => Ok(delivered),
            Err(e) => Err(e.into()),
        }
    }

    /// Current stream position in bytes.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// The underlying controller.
    pub fn controller(&self) -> &Arc<DeviceController<R>> {
        &self.ctrl
    }
}

impl<R: RegisterAccess> Drop for ButtonFile<R> {
    fn drop(&mut self) {
        self.ctrl.release();
    }
}
