//! Device controller: open/read/release plus the interrupt callback.
//!
//! One `DeviceController` exists per physical device instance, constructed
//! by the platform's attach hook before the interrupt line is enabled and
//! torn down with [`DeviceController::detach`] after it is disabled. There
//! is deliberately no process-wide singleton; instances are independent.
//!
//! Per session the state machine is `Unopened -> Opened -> Closed`, with at
//! most one session in `Opened` at a time (enforced by the
//! [`SessionGate`]).

use alloc::vec::Vec;

use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::lifecycle::DeviceLifecycle;
use crate::queue::EventQueue;
use crate::registers::{PioRegisters, RegisterAccess};
use crate::session::SessionGate;
use crate::stats::CaptureStats;
use crate::uaccess::UserBuffer;
use crate::waiter::{AbortFlag, Waiter};

/// Byte width of one event record: the raw 32-bit edge-capture snapshot,
/// copied verbatim into the consumer-visible byte stream.
pub const EVENT_BYTES: usize = core::mem::size_of::<u32>();

/// Warn about queue-full drops on the first drop and then once per this
/// many further drops.
const DROP_WARN_INTERVAL: u64 = 64;

/// Outcome of an interrupt callback, for shared-line dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqStatus {
    /// The interrupt was ours and has been acknowledged.
    Handled,
    /// The interrupt belongs to another device on the line.
    NotMine,
}

/// Orchestrates the queue, waiter, session gate and register block into the
/// read/open/release + interrupt-callback contract.
pub struct DeviceController<R: RegisterAccess> {
    regs: PioRegisters<R>,
    irq: u32,
    line_mask: u32,
    queue: EventQueue,
    waiter: Waiter,
    gate: SessionGate,
    abort: AbortFlag,
    lifecycle: DeviceLifecycle,
    stats: CaptureStats,
}

impl<R: RegisterAccess> DeviceController<R> {
    /// Creates a controller over a mapped register window and programs the
    /// hardware: all configured lines enabled, stale edge captures cleared.
    ///
    /// Must be called before the platform enables the interrupt line.
    /// Construction is all-or-nothing; on a config error nothing has been
    /// written to the hardware.
    pub fn new(registers: R, config: CaptureConfig) -> CaptureResult<Self> {
        if config.queue_capacity == 0 {
            return Err(CaptureError::InvalidConfig("queue capacity must be at least 1"));
        }
        if config.line_mask == 0 {
            return Err(CaptureError::InvalidConfig("line mask must enable at least one line"));
        }

        let regs = PioRegisters::new(registers);
        regs.set_irq_mask(config.line_mask);
        regs.ack_edges(config.line_mask);
        debug!(
            "edge capture attached: irq {} capacity {} lines {:#x}",
            config.irq, config.queue_capacity, config.line_mask
        );

        Ok(Self {
            regs,
            irq: config.irq,
            line_mask: config.line_mask,
            queue: EventQueue::new(config.queue_capacity),
            waiter: Waiter::new(),
            gate: SessionGate::new(),
            abort: AbortFlag::new(),
            lifecycle: DeviceLifecycle::new(),
            stats: CaptureStats::new(),
        })
    }

    /// Interrupt callback. Runs in interrupt context: fast, non-blocking,
    /// touches only the queue and the hardware registers.
    pub fn on_interrupt(&self, irq: u32) -> IrqStatus {
        if irq != self.irq {
            return IrqStatus::NotMine;
        }
        if !self.lifecycle.try_begin_access() {
            // Detach in progress. Keep the line deasserted, queue nothing.
            self.regs.ack_edges(self.line_mask);
            return IrqStatus::Handled;
        }

        let event = self.regs.read_edge_capture();
        if self.queue.push(event) {
            self.stats.record_capture();
            trace!("captured edge event {event:#x}");
        } else {
            // Data loss is expected under sustained overload, never fatal.
            let dropped = self.stats.record_drop();
            if dropped == 1 || dropped % DROP_WARN_INTERVAL == 0 {
                warn!("capture queue full, {dropped} events dropped so far");
            }
        }
        self.waiter.notify_all();
        // Acknowledge even when the event was dropped, otherwise the line
        // stays asserted and never re-fires.
        self.regs.ack_edges(self.line_mask);

        self.lifecycle.end_access();
        IrqStatus::Handled
    }

    /// Opens a session, blocking until the single session slot is free.
    ///
    /// Fails with [`CaptureError::Interrupted`] when the wait is aborted,
    /// or [`CaptureError::BadState`] once detach has begun. No queue
    /// mutation happens on open.
    pub fn open(&self) -> CaptureResult {
        if !self.lifecycle.try_begin_access() {
            return Err(CaptureError::BadState);
        }
        if let Err(e) = self.gate.acquire(&self.abort) {
            self.lifecycle.end_access();
            return Err(e);
        }
        debug!("session opened on irq {}", self.irq);
        Ok(())
    }

    /// Opens a session without blocking; fails with
    /// [`CaptureError::Busy`] when another session holds the slot.
    pub fn try_open(&self) -> CaptureResult {
        if !self.lifecycle.try_begin_access() {
            return Err(CaptureError::BadState);
        }
        if !self.gate.try_acquire() {
            self.lifecycle.end_access();
            return Err(CaptureError::Busy);
        }
        debug!("session opened on irq {}", self.irq);
        Ok(())
    }

    /// Reads buffered events into `buf`, advancing `pos` by the bytes
    /// actually delivered.
    ///
    /// - Fails with [`CaptureError::BufferTooSmall`] when `buf` cannot hold
    ///   one event record; the queue is untouched.
    /// - Returns `Ok(0)` (end-of-stream) when this is not the first read of
    ///   the session (`pos > 0`) and the queue is empty: one session is a
    ///   one-shot drain unless later reads see a refreshed queue.
    /// - Otherwise blocks until the queue is non-empty; an aborted wait
    ///   surfaces as retryable [`CaptureError::Interrupted`] with no data
    ///   consumed.
    /// - A destination fault mid-copy yields
    ///   [`CaptureError::PartialCopy`] carrying the verified prefix length;
    ///   `pos` is advanced by exactly that prefix. Events drained but not
    ///   delivered are lost, never re-queued.
    pub fn read<B: UserBuffer + ?Sized>(&self, buf: &mut B, pos: &mut u64) -> CaptureResult<usize> {
        let cap = buf.capacity();
        if cap < EVENT_BYTES {
            return Err(CaptureError::BufferTooSmall {
                required: EVENT_BYTES,
            });
        }

        // A prior read in this session plus an empty queue is end-of-stream,
        // not a second block.
        if *pos > 0 && self.queue.is_empty() {
            return Ok(0);
        }

        self.waiter
            .wait_until(|| !self.queue.is_empty(), &self.abort)?;

        let max_events = core::cmp::min(cap / EVENT_BYTES, self.queue.capacity());
        let mut events: Vec<u32> = Vec::new();
        events.resize(max_events, 0);
        let n = self.queue.pop_all_into(&mut events);
        if n == 0 {
            // Drained by a reset between wakeup and pop.
            return Ok(0);
        }

        let mut bytes: Vec<u8> = Vec::with_capacity(n * EVENT_BYTES);
        for event in &events[..n] {
            bytes.extend_from_slice(&event.to_ne_bytes());
        }

        let delivered = buf.copy_from(&bytes);
        *pos += delivered as u64;
        if delivered < bytes.len() {
            self.stats.record_copy_fault();
            error!(
                "consumer buffer faulted after {delivered} of {} bytes",
                bytes.len()
            );
            return Err(CaptureError::PartialCopy { delivered });
        }

        self.stats.record_read();
        trace!("read drained {n} events");
        Ok(delivered)
    }

    /// Closes the session. Exactly one call per successful open, on every
    /// exit path, normal or abnormal.
    pub fn release(&self) {
        self.gate.release();
        self.lifecycle.end_access();
        debug!("session released on irq {}", self.irq);
    }

    /// Tears the instance down: refuses new work, unblocks any waiting
    /// consumer with [`CaptureError::Interrupted`], waits for in-flight
    /// work (including open sessions) to finish, then masks and
    /// acknowledges the hardware.
    ///
    /// The platform must have disabled the interrupt line before calling
    /// this, and must not destroy the controller until it returns.
    pub fn detach(&self) {
        if !self.lifecycle.begin_removal() {
            return;
        }
        self.abort.set();
        self.waiter.notify_all();
        self.lifecycle.wait_idle();

        self.regs.set_irq_mask(0);
        self.regs.ack_edges(self.line_mask);
        self.lifecycle.complete_removal();
        debug!("edge capture detached: irq {}", self.irq);
    }

    /// Discards buffered events so a later read does not replay stale ones.
    pub fn discard_pending(&self) {
        self.queue.reset();
    }

    /// Number of buffered events (snapshot).
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Snapshot of the current input line levels. Diagnostics only.
    pub fn sample_lines(&self) -> u32 {
        self.regs.read_data()
    }

    /// Capture-path counters for this instance.
    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    /// Interrupt line assigned to this instance.
    pub fn irq(&self) -> u32 {
        self.irq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::regmap;
    use alloc::sync::Arc;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    /// Shared array-backed register window with write-one-to-clear
    /// edge-capture semantics.
    #[derive(Clone)]
    struct MockRegs(Arc<Mutex<[u32; 4]>>);

    impl MockRegs {
        fn new() -> Self {
            Self(Arc::new(Mutex::new([0; 4])))
        }

        /// Simulates an edge on the given lines.
        fn raise_edges(&self, lines: u32) {
            self.0.lock().unwrap()[regmap::EDGE_CAPTURE / 4] |= lines;
        }

        fn word(&self, offset: usize) -> u32 {
            self.0.lock().unwrap()[offset / 4]
        }
    }

    impl RegisterAccess for MockRegs {
        fn read_register(&self, offset: usize) -> u32 {
            self.0.lock().unwrap()[offset / 4]
        }

        fn write_register(&self, offset: usize, value: u32) {
            let mut words = self.0.lock().unwrap();
            if offset == regmap::EDGE_CAPTURE {
                words[offset / 4] &= !value;
            } else {
                words[offset / 4] = value;
            }
        }
    }

    fn controller(capacity: usize) -> (Arc<DeviceController<MockRegs>>, MockRegs) {
        let regs = MockRegs::new();
        let cfg = CaptureConfig {
            queue_capacity: capacity,
            ..CaptureConfig::default()
        };
        let ctrl = Arc::new(DeviceController::new(regs.clone(), cfg).unwrap());
        (ctrl, regs)
    }

    /// Destination that faults after accepting a fixed number of bytes.
    struct FaultingBuffer {
        data: [u8; 64],
        cap: usize,
        fault_after: usize,
    }

    impl UserBuffer for FaultingBuffer {
        fn capacity(&self) -> usize {
            self.cap
        }

        fn copy_from(&mut self, src: &[u8]) -> usize {
            let n = core::cmp::min(self.fault_after, src.len());
            self.data[..n].copy_from_slice(&src[..n]);
            n
        }
    }

    #[test]
    fn new_rejects_bad_config() {
        let regs = MockRegs::new();
        let zero_cap = CaptureConfig {
            queue_capacity: 0,
            ..CaptureConfig::default()
        };
        assert!(matches!(
            DeviceController::new(regs.clone(), zero_cap),
            Err(CaptureError::InvalidConfig(_))
        ));
        // Nothing was written to the hardware.
        assert_eq!(regs.word(regmap::IRQ_MASK), 0);

        let empty_mask = CaptureConfig {
            line_mask: 0,
            ..CaptureConfig::default()
        };
        assert!(matches!(
            DeviceController::new(regs, empty_mask),
            Err(CaptureError::InvalidConfig(_))
        ));
    }

    #[test]
    fn new_programs_hardware() {
        let (_, regs) = controller(8);
        assert_eq!(regs.word(regmap::IRQ_MASK), 0xF);
        assert_eq!(regs.word(regmap::EDGE_CAPTURE), 0);
    }

    #[test]
    fn interrupt_for_another_line_is_declined() {
        let (ctrl, regs) = controller(8);
        regs.raise_edges(0b1);
        assert_eq!(ctrl.on_interrupt(ctrl.irq() + 1), IrqStatus::NotMine);
        // Neither queued nor acknowledged.
        assert_eq!(ctrl.pending_events(), 0);
        assert_eq!(regs.word(regmap::EDGE_CAPTURE), 0b1);
    }

    #[test]
    fn interrupt_captures_and_acknowledges() {
        let (ctrl, regs) = controller(8);
        regs.raise_edges(0b0101);
        assert_eq!(ctrl.on_interrupt(ctrl.irq()), IrqStatus::Handled);
        assert_eq!(ctrl.pending_events(), 1);
        assert_eq!(regs.word(regmap::EDGE_CAPTURE), 0);
        assert_eq!(ctrl.stats().captured(), 1);
    }

    #[test]
    fn overflow_drops_incoming_and_acknowledges() {
        let (ctrl, regs) = controller(8);
        for i in 1..=10u32 {
            regs.raise_edges(1 << (i % 4));
            assert_eq!(ctrl.on_interrupt(ctrl.irq()), IrqStatus::Handled);
            // Hardware re-armed even when the event was dropped.
            assert_eq!(regs.word(regmap::EDGE_CAPTURE), 0);
        }
        assert_eq!(ctrl.pending_events(), 8);
        assert_eq!(ctrl.stats().captured(), 8);
        assert_eq!(ctrl.stats().dropped(), 2);
    }

    #[test]
    fn read_rejects_sub_event_buffer() {
        let (ctrl, regs) = controller(8);
        regs.raise_edges(0b1);
        ctrl.on_interrupt(ctrl.irq());

        let mut small = [0u8; 3];
        let mut pos = 0u64;
        assert_eq!(
            ctrl.read(&mut small[..], &mut pos),
            Err(CaptureError::BufferTooSmall {
                required: EVENT_BYTES
            })
        );
        // Queue untouched, position unchanged.
        assert_eq!(ctrl.pending_events(), 1);
        assert_eq!(pos, 0);
    }

    #[test]
    fn read_drains_in_fifo_order() {
        let (ctrl, regs) = controller(8);
        for i in 0..3u32 {
            regs.raise_edges(1 << i);
            ctrl.on_interrupt(ctrl.irq());
        }

        let mut buf = [0u8; 32];
        let mut pos = 0u64;
        let n = ctrl.read(&mut buf[..], &mut pos).unwrap();
        assert_eq!(n, 3 * EVENT_BYTES);
        assert_eq!(pos, n as u64);
        for i in 0..3usize {
            let mut word = [0u8; EVENT_BYTES];
            word.copy_from_slice(&buf[i * EVENT_BYTES..(i + 1) * EVENT_BYTES]);
            assert_eq!(u32::from_ne_bytes(word), 1 << i);
        }
        assert_eq!(ctrl.pending_events(), 0);
    }

    #[test]
    fn second_read_on_empty_queue_is_end_of_stream() {
        let (ctrl, regs) = controller(8);
        regs.raise_edges(0b1);
        ctrl.on_interrupt(ctrl.irq());

        let mut buf = [0u8; 16];
        let mut pos = 0u64;
        assert_eq!(ctrl.read(&mut buf[..], &mut pos).unwrap(), EVENT_BYTES);
        // Same session, queue now empty: zero-length result, no block.
        assert_eq!(ctrl.read(&mut buf[..], &mut pos).unwrap(), 0);

        // New data refreshes the stream within the same session.
        regs.raise_edges(0b10);
        ctrl.on_interrupt(ctrl.irq());
        assert_eq!(ctrl.read(&mut buf[..], &mut pos).unwrap(), EVENT_BYTES);
    }

    #[test]
    fn blocked_read_wakes_on_interrupt() {
        let (ctrl, regs) = controller(8);
        ctrl.open().unwrap();

        let reader = {
            let ctrl = Arc::clone(&ctrl);
            thread::spawn(move || {
                let mut buf = [0u8; 16];
                let mut pos = 0u64;
                let n = ctrl.read(&mut buf[..], &mut pos)?;
                let mut word = [0u8; EVENT_BYTES];
                word.copy_from_slice(&buf[..EVENT_BYTES]);
                Ok::<_, CaptureError>((n, u32::from_ne_bytes(word)))
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!reader.is_finished());

        regs.raise_edges(0b100);
        ctrl.on_interrupt(ctrl.irq());

        let (n, event) = reader.join().unwrap().unwrap();
        assert_eq!(n, EVENT_BYTES);
        assert_eq!(event, 0b100);
        ctrl.release();
    }

    #[test]
    fn partial_copy_reports_verified_prefix() {
        let (ctrl, regs) = controller(8);
        for i in 0..2u32 {
            regs.raise_edges(1 << i);
            ctrl.on_interrupt(ctrl.irq());
        }

        let mut faulting = FaultingBuffer {
            data: [0; 64],
            cap: 64,
            fault_after: EVENT_BYTES,
        };
        let mut pos = 0u64;
        assert_eq!(
            ctrl.read(&mut faulting, &mut pos),
            Err(CaptureError::PartialCopy {
                delivered: EVENT_BYTES
            })
        );
        // Position advanced only by the verified prefix.
        assert_eq!(pos, EVENT_BYTES as u64);
        assert_eq!(ctrl.stats().copy_faults(), 1);
        let mut word = [0u8; EVENT_BYTES];
        word.copy_from_slice(&faulting.data[..EVENT_BYTES]);
        assert_eq!(u32::from_ne_bytes(word), 0b1);
    }

    #[test]
    fn open_is_exclusive_until_release() {
        let (ctrl, _) = controller(8);
        ctrl.open().unwrap();
        assert_eq!(ctrl.try_open(), Err(CaptureError::Busy));

        let second = {
            let ctrl = Arc::clone(&ctrl);
            thread::spawn(move || ctrl.open())
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!second.is_finished());

        ctrl.release();
        assert_eq!(second.join().unwrap(), Ok(()));
        ctrl.release();
    }

    #[test]
    fn sample_lines_reads_data_register() {
        let (ctrl, regs) = controller(8);
        regs.0.lock().unwrap()[regmap::DATA / 4] = 0b1010;
        assert_eq!(ctrl.sample_lines(), 0b1010);
    }

    #[test]
    fn discard_pending_flushes_stale_events() {
        let (ctrl, regs) = controller(8);
        regs.raise_edges(0b1);
        ctrl.on_interrupt(ctrl.irq());
        assert_eq!(ctrl.pending_events(), 1);

        ctrl.discard_pending();
        assert_eq!(ctrl.pending_events(), 0);
    }

    #[test]
    fn detach_unblocks_reader_and_masks_hardware() {
        let (ctrl, regs) = controller(8);
        ctrl.open().unwrap();

        let reader = {
            let ctrl = Arc::clone(&ctrl);
            thread::spawn(move || {
                let mut buf = [0u8; 16];
                let mut pos = 0u64;
                let result = ctrl.read(&mut buf[..], &mut pos);
                // Abnormal exit path still closes the session.
                ctrl.release();
                result
            })
        };

        thread::sleep(Duration::from_millis(20));
        ctrl.detach();
        assert_eq!(reader.join().unwrap(), Err(CaptureError::Interrupted));

        assert_eq!(regs.word(regmap::IRQ_MASK), 0);
        assert_eq!(ctrl.open(), Err(CaptureError::BadState));
        // Further interrupts are not queued.
        regs.raise_edges(0b1);
        assert_eq!(ctrl.on_interrupt(ctrl.irq()), IrqStatus::Handled);
        assert_eq!(ctrl.pending_events(), 0);
    }
}
