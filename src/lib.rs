#![no_std]

//! # Edge-capture driver core
//!
//! This crate implements the concurrency core of a driver for a
//! memory-mapped pushbutton controller: a hardware edge detector raises an
//! interrupt, the handler records the captured edge register without
//! blocking, and a consumer thread drains recorded events under a blocking,
//! cancellable read protocol.
//!
//! The crate is `no_std` + `alloc`. Everything platform-specific (register
//! mapping, interrupt registration, device-node creation) stays behind two
//! boundaries:
//!
//! - [`RegisterAccess`]: volatile, ordered 32-bit register reads and writes.
//! - The platform's attach/detach hooks, which construct a
//!   [`DeviceController`] before enabling the interrupt and call
//!   [`DeviceController::detach`] after disabling it.
//!
//! ## Architecture
//!
//! - [`EventQueue`]: bounded FIFO of raw edge-capture values, drop-on-full,
//!   guarded by a non-sleeping lock so the interrupt handler may push.
//! - [`Waiter`]: blocking-wait coordination between the interrupt-context
//!   producer and the consumer; the predicate is re-tested after every
//!   wakeup, so a wakeup is never trusted on its own.
//! - [`SessionGate`]: at most one concurrent open session on the device.
//! - [`DeviceController`]: ties the above into the open/read/release plus
//!   interrupt-callback contract.
//! - [`ButtonFile`]: character-stream front end with byte-stream semantics
//!   (stream position, zero-length read as end-of-stream, errno mapping).
//!
//! ## Execution contexts
//!
//! Exactly two: a non-preemptible producer ([`DeviceController::on_interrupt`])
//! that must never block, and ordinary consumer threads performing
//! open/read/release. The queue is the only state shared between them; its
//! lock is held for O(1) work and never across a suspension point. The
//! session gate is consumer-side only and is never touched from interrupt
//! context.
//!
//! ## Example
//!
//! ```rust,ignore
//! use edgecap::{ButtonFile, CaptureConfig, DeviceController};
//!
//! // Platform attach hook: map registers, then build the controller
//! // before enabling the interrupt line.
//! let ctrl = Arc::new(DeviceController::new(regs, CaptureConfig::default())?);
//!
//! // Interrupt handler:
//! ctrl.on_interrupt(irq);
//!
//! // Consumer thread:
//! let mut file = ButtonFile::open(ctrl.clone())?;
//! let mut buf = [0u8; 32];
//! let n = file.read(&mut buf)?;
//! ```

extern crate alloc;
#[macro_use]
extern crate log;

#[cfg(test)]
extern crate std;

mod chardev;
mod config;
mod controller;
mod error;
mod lifecycle;
mod queue;
mod registers;
mod session;
mod stats;
mod uaccess;
mod waiter;

pub use chardev::ButtonFile;
pub use config::CaptureConfig;
pub use controller::{DeviceController, EVENT_BYTES, IrqStatus};
pub use error::{CaptureError, CaptureResult};
pub use lifecycle::{DeviceLifecycle, DeviceState};
pub use queue::EventQueue;
pub use registers::{PioRegisters, RegisterAccess, regmap};
pub use session::SessionGate;
pub use stats::CaptureStats;
pub use uaccess::UserBuffer;
pub use waiter::{AbortFlag, Waiter};

// errno type used at the character-stream boundary.
pub use axerrno::LinuxError;
