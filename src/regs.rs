//! SAM3S UART register interface.
//!
//! The driver core never touches memory-mapped hardware directly; it goes
//! through [`UartRegisters`] so the configuration sequencing can be
//! exercised against a recording fake on the host. [`Sam3sUart`] is the
//! hardware implementation backed by volatile MMIO access.

use core::ptr::{with_exposed_provenance, with_exposed_provenance_mut};

/// Registers of the UART control block that the driver interacts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Control register (write-only command bits).
    Control,
    /// Mode register.
    Mode,
    /// Interrupt enable register (write-only mask).
    InterruptEnable,
    /// Interrupt disable register (write-only mask).
    InterruptDisable,
    /// Status register (read-only flags).
    Status,
    /// Receive holding register. Reading it acknowledges the byte and
    /// clears [`sr::RXRDY`].
    RxHolding,
    /// Transmit holding register.
    TxHolding,
    /// Baud rate generator register.
    BaudDivisor,
    /// PDC transfer control register.
    TransferControl,
}

impl Register {
    /// Byte offset of the register within the UART control block.
    const fn offset(self) -> usize {
        match self {
            Register::Control => 0x000,
            Register::Mode => 0x004,
            Register::InterruptEnable => 0x008,
            Register::InterruptDisable => 0x00C,
            Register::Status => 0x014,
            Register::RxHolding => 0x018,
            Register::TxHolding => 0x01C,
            Register::BaudDivisor => 0x020,
            Register::TransferControl => 0x120,
        }
    }
}

/// Status register bits.
pub mod sr {
    /// A received byte is waiting in the receive holding register.
    pub const RXRDY: u32 = 1 << 0;
    /// The transmit holding register can accept a byte.
    pub const TXRDY: u32 = 1 << 1;
    /// Transmitter shift and holding registers are both empty.
    pub const TXEMPTY: u32 = 1 << 9;
}

/// Control register command bits.
pub mod cr {
    /// Reset the receiver.
    pub const RSTRX: u32 = 1 << 2;
    /// Reset the transmitter.
    pub const RSTTX: u32 = 1 << 3;
    /// Enable the receiver.
    pub const RXEN: u32 = 1 << 4;
    /// Disable the receiver.
    pub const RXDIS: u32 = 1 << 5;
    /// Enable the transmitter.
    pub const TXEN: u32 = 1 << 6;
    /// Disable the transmitter.
    pub const TXDIS: u32 = 1 << 7;
}

/// Mode register values.
pub mod mr {
    /// Normal channel mode, no parity.
    pub const NORMAL_NO_PARITY: u32 = 0x800;
}

/// Interrupt enable/disable register bits (IER and IDR share the layout).
pub mod irq {
    /// Receive-ready interrupt source.
    pub const RXRDY: u32 = 1 << 0;
}

/// PDC transfer control register bits.
pub mod ptcr {
    /// Enable the PDC receiver channel.
    pub const RXTEN: u32 = 1 << 0;
    /// Disable the PDC receiver channel.
    pub const RXTDIS: u32 = 1 << 1;
    /// Enable the PDC transmitter channel.
    pub const TXTEN: u32 = 1 << 8;
    /// Disable the PDC transmitter channel.
    pub const TXTDIS: u32 = 1 << 9;
}

/// Access to one UART control block.
pub trait UartRegisters {
    /// Read the current value of a register.
    fn read(&mut self, register: Register) -> u32;
    /// Write a value to a register.
    fn write(&mut self, register: Register, value: u32);
}

/// MMIO-backed register access for a SAM3S UART.
pub struct Sam3sUart {
    base: usize,
}

impl Sam3sUart {
    const UART0_BASE: usize = 0x400E_0600;

    /// Handle to the UART0 control block.
    ///
    /// # Safety
    ///
    /// The peripheral clock must be gated on before any register access
    /// (done by [`crate::Uart::configure`]). Multiple handles may exist
    /// only if their users never perform conflicting accesses concurrently,
    /// e.g. an interrupt handler that only reads the receive holding
    /// register alongside a foreground owner.
    pub const unsafe fn uart0() -> Self {
        Self {
            base: Self::UART0_BASE,
        }
    }
}

impl UartRegisters for Sam3sUart {
    #[inline]
    fn read(&mut self, register: Register) -> u32 {
        let ptr = with_exposed_provenance::<u32>(self.base + register.offset());
        // SAFETY: The constructor contract guarantees the address maps the
        // peripheral and that accesses from this handle do not conflict.
        unsafe { ptr.read_volatile() }
    }

    #[inline]
    fn write(&mut self, register: Register, value: u32) {
        let ptr = with_exposed_provenance_mut::<u32>(self.base + register.offset());
        // SAFETY: As in `read`.
        unsafe { ptr.write_volatile(value) }
    }
}
