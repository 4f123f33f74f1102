//! Destination-buffer boundary for the read path.
//!
//! The final copy of drained events lands in memory the core does not own
//! and cannot assume is writable end to end (a consumer-supplied buffer).
//! [`UserBuffer`] models that step: the implementation reports how many
//! bytes were verified to land, and a short count is a fault, not a
//! truncation request.

/// Consumer-visible destination for drained event bytes.
pub trait UserBuffer {
    /// Writable capacity in bytes.
    fn capacity(&self) -> usize;

    /// Copies `src` to the start of the buffer, returning the number of
    /// bytes verified written. A return value below `src.len()` means the
    /// destination faulted after that prefix.
    fn copy_from(&mut self, src: &[u8]) -> usize;
}

/// Plain in-memory buffers never fault.
impl UserBuffer for [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_from(&mut self, src: &[u8]) -> usize {
        let n = core::cmp::min(self.len(), src.len());
        self[..n].copy_from_slice(&src[..n]);
        n
    }
}
