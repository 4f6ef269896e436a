#![no_std]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

#[cfg(test)]
extern crate std;

// Keep first so the logging macros are visible to the other modules.
mod fmt;

pub mod platform;
pub mod regs;
mod ring_buffer;
mod telemetry;
mod uart;

pub use ring_buffer::{Consumer, Producer, RxQueue};
pub use telemetry::{NO_DATA, Protocol, TelemetryPort};
pub use uart::{RxInterrupt, Uart, Variant};

/// Receive queue depth used by the debug console.
pub const DEBUG_RX_CAPACITY: usize = 512;
