//! Per-instance capture configuration.

/// Configuration for one pushbutton controller instance.
///
/// The defaults match the reference hardware: interrupt line 40, four
/// pushbutton lines, an eight-entry capture queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Interrupt line assigned to this instance. Callbacks for any other
    /// line are declined, so shared lines behave correctly.
    pub irq: u32,
    /// Capacity of the bounded event queue. Must be at least 1.
    pub queue_capacity: usize,
    /// Mask of input lines to enable and acknowledge. Must be non-zero.
    pub line_mask: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            irq: 40,
            queue_capacity: 8,
            line_mask: 0xF,
        }
    }
}
