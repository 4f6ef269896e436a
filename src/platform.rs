//! Board integration points for the UART driver.
//!
//! Pin multiplexing, the peripheral clock gate and the interrupt
//! controller line live outside the UART control block, so they sit behind
//! their own trait. [`Sam3sPlatform`] is the hardware implementation for
//! UART0 on the SAM3S (URXD0/UTXD0 on PA9/PA10, peripheral ID 8).

use core::ptr::{with_exposed_provenance, with_exposed_provenance_mut};

/// Platform services consumed by [`crate::Uart`].
pub trait Platform {
    /// Hand the RX/TX pins to the UART peripheral, as inputs without
    /// pull-ups.
    fn configure_pins(&mut self);
    /// Gate on the peripheral clock of the UART.
    fn enable_clock(&mut self);
    /// Unmask the UART interrupt line at the interrupt controller.
    fn enable_interrupt(&mut self);
    /// Mask the UART interrupt line at the interrupt controller.
    fn disable_interrupt(&mut self);
}

/// SAM3S platform glue for UART0.
pub struct Sam3sPlatform {
    irq: u32,
}

const PIOA_BASE: usize = 0x400E_0E00;
const PIO_PDR: usize = 0x004; // PIO disable: give pins to the peripheral
const PIO_PUDR: usize = 0x060; // pull-up disable
const PIO_ABCDSR1: usize = 0x070; // peripheral function select, low bit
const PIO_ABCDSR2: usize = 0x074; // peripheral function select, high bit

const PMC_BASE: usize = 0x400E_0400;
const PMC_PCER0: usize = 0x010; // peripheral clock enable

const NVIC_ISER0: usize = 0xE000_E100;
const NVIC_ICER0: usize = 0xE000_E180;

/// URXD0 and UTXD0.
const UART0_PINS: u32 = (1 << 9) | (1 << 10);
/// Peripheral identifier of UART0, used for both the clock gate and the
/// interrupt line.
const UART0_ID: u32 = 8;

#[inline]
fn reg_read(addr: usize) -> u32 {
    // SAFETY: Only called with fixed peripheral addresses owned by this
    // module; see the constructor contract of `Sam3sPlatform`.
    unsafe { with_exposed_provenance::<u32>(addr).read_volatile() }
}

#[inline]
fn reg_write(addr: usize, value: u32) {
    // SAFETY: As in `reg_read`.
    unsafe { with_exposed_provenance_mut::<u32>(addr).write_volatile(value) }
}

impl Sam3sPlatform {
    /// Platform glue for UART0.
    ///
    /// # Safety
    ///
    /// Must be the only code reconfiguring PA9/PA10, the UART0 clock gate
    /// and the UART0 interrupt line while the returned handle is live.
    pub const unsafe fn uart0() -> Self {
        Self { irq: UART0_ID }
    }
}

impl Platform for Sam3sPlatform {
    fn configure_pins(&mut self) {
        // Peripheral A on both pins: clear the select bits.
        reg_write(
            PIOA_BASE + PIO_ABCDSR1,
            reg_read(PIOA_BASE + PIO_ABCDSR1) & !UART0_PINS,
        );
        reg_write(
            PIOA_BASE + PIO_ABCDSR2,
            reg_read(PIOA_BASE + PIO_ABCDSR2) & !UART0_PINS,
        );
        reg_write(PIOA_BASE + PIO_PUDR, UART0_PINS);
        reg_write(PIOA_BASE + PIO_PDR, UART0_PINS);
    }

    fn enable_clock(&mut self) {
        reg_write(PMC_BASE + PMC_PCER0, 1 << UART0_ID);
    }

    fn enable_interrupt(&mut self) {
        reg_write(NVIC_ISER0, 1 << self.irq);
    }

    fn disable_interrupt(&mut self) {
        reg_write(NVIC_ICER0, 1 << self.irq);
    }
}
