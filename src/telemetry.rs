//! Telemetry port adapter.
//!
//! A narrow read/write surface over the same physical UART, dedicated to
//! one wireless telemetry protocol's byte stream. The receive path here
//! polls the status register directly, bypassing the interrupt-driven
//! queue entirely — the two receive paths are never active at once.

use crate::platform::Platform;
use crate::regs::{Register, UartRegisters, ptcr, sr};
use crate::uart::Uart;

/// Sentinel returned by [`TelemetryPort::receive`] when no byte is
/// pending. Valid data always fits in the low byte, so callers must treat
/// any value above `0xFF` as "no data".
pub const NO_DATA: u16 = 0xFFFF;

/// Telemetry protocol family carried over the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    /// FrSky D-series hub telemetry.
    FrskyD,
}

impl Protocol {
    /// The fixed line rate of the protocol.
    pub const fn baudrate(self) -> u32 {
        match self {
            Protocol::FrskyD => 9_600,
        }
    }
}

/// The telemetry port.
///
/// Wraps a [`Variant::Polling`] UART: telemetry reception is foreground
/// polling, so the interrupt-driven console variant does not apply here.
///
/// [`Variant::Polling`]: crate::Variant::Polling
pub struct TelemetryPort<R, P> {
    uart: Uart<R, P>,
    protocol: Protocol,
    master_clock: u32,
}

impl<R, P> TelemetryPort<R, P>
where
    R: UartRegisters,
    P: Platform,
{
    /// Bind the port to a UART, a protocol and the system master clock
    /// frequency in Hz.
    pub const fn new(uart: Uart<R, P>, protocol: Protocol, master_clock: u32) -> Self {
        Self {
            uart,
            protocol,
            master_clock,
        }
    }

    /// Configure the UART at the protocol's fixed baud rate and arm the
    /// descriptor-based receive channel.
    ///
    /// The base configure path always disables both PDC channels;
    /// telemetry deliberately re-arms the receive side afterwards for
    /// throughput. The transmit channel stays off.
    pub fn init(&mut self) {
        self.uart.configure(self.protocol.baudrate(), self.master_clock);
        if self.uart.is_noop() {
            return;
        }

        self.uart
            .regs_mut()
            .write(Register::TransferControl, ptcr::RXTEN);
        debug!("telemetry port up at {} baud", self.protocol.baudrate());
    }

    /// Poll for one received byte.
    ///
    /// Returns the byte zero-extended to 16 bits, or [`NO_DATA`] when the
    /// receive-ready flag is clear. Foreground use only; must not be
    /// called from interrupt context.
    pub fn receive(&mut self) -> u16 {
        if self.uart.is_noop() {
            return NO_DATA;
        }

        let regs = self.uart.regs_mut();
        if regs.read(Register::Status) & sr::RXRDY != 0 {
            regs.read(Register::RxHolding) as u16
        } else {
            NO_DATA
        }
    }

    /// The protocol this port was bound to.
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }
}
