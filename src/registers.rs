//! Register-access boundary and the pushbutton PIO register map.
//!
//! The core never touches hardware directly; it goes through
//! [`RegisterAccess`], which the platform implements over its mapped MMIO
//! window. Implementations must perform volatile, ordered accesses with no
//! caching.

/// Volatile 32-bit register access, implemented by the platform over the
/// device's mapped register window.
///
/// Offsets are byte offsets from the base of the window. The core only uses
/// the offsets in [`regmap`].
pub trait RegisterAccess: Send + Sync {
    /// Reads the register at `offset`.
    fn read_register(&self, offset: usize) -> u32;

    /// Writes `value` to the register at `offset`.
    fn write_register(&self, offset: usize, value: u32);
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &T {
    #[inline]
    fn read_register(&self, offset: usize) -> u32 {
        (**self).read_register(offset)
    }

    #[inline]
    fn write_register(&self, offset: usize, value: u32) {
        (**self).write_register(offset, value)
    }
}

/// Byte offsets of the pushbutton PIO block.
pub mod regmap {
    /// Current level of the input lines.
    pub const DATA: usize = 0x0;
    /// Per-line interrupt enable mask. Writing a set bit enables edge
    /// interrupts for that line.
    pub const IRQ_MASK: usize = 0x8;
    /// Sticky snapshot of lines that transitioned since last acknowledged.
    /// Writing a set bit clears (acknowledges) that line's capture.
    pub const EDGE_CAPTURE: usize = 0xC;
}

/// Typed view of the pushbutton PIO block over a [`RegisterAccess`]
/// implementation.
pub struct PioRegisters<R: RegisterAccess> {
    inner: R,
}

impl<R: RegisterAccess> PioRegisters<R> {
    /// Wraps a register window.
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Snapshot of the current line levels.
    #[inline]
    pub fn read_data(&self) -> u32 {
        self.inner.read_register(regmap::DATA)
    }

    /// Snapshot of the edge-capture register (the event payload).
    #[inline]
    pub fn read_edge_capture(&self) -> u32 {
        self.inner.read_register(regmap::EDGE_CAPTURE)
    }

    /// Acknowledges the captured edges in `mask` so the hardware can raise
    /// again. Must be called even when an event was dropped, otherwise the
    /// line stays asserted and the interrupt never re-fires.
    #[inline]
    pub fn ack_edges(&self, mask: u32) {
        self.inner.write_register(regmap::EDGE_CAPTURE, mask);
    }

    /// Programs the per-line interrupt enable mask. Zero disables all lines.
    #[inline]
    pub fn set_irq_mask(&self, mask: u32) {
        self.inner.write_register(regmap::IRQ_MASK, mask);
    }
}
