//! Driver core: configuration sequencing, polled transmit and the receive
//! interrupt handler.

use crate::platform::Platform;
use crate::regs::{Register, UartRegisters, cr, irq, mr, ptcr, sr};
use crate::ring_buffer::Producer;

/// Driver behavior, selected once at construction.
///
/// Replaces scattered build-time switches with a single tagged choice: a
/// host-simulated build constructs [`Variant::NoOp`], a release build
/// [`Variant::Polling`], a debug build with console input
/// [`Variant::Interrupt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Variant {
    /// Every operation is elided. Used when the firmware runs on a
    /// simulated host with no hardware behind the register addresses.
    NoOp,
    /// Transmit and receive by register polling only; the receive
    /// interrupt is never enabled.
    Polling,
    /// Like `Polling`, plus interrupt-driven receive into an [`RxQueue`]
    /// via [`RxInterrupt`].
    ///
    /// [`RxQueue`]: crate::RxQueue
    Interrupt,
}

/// The auxiliary UART.
///
/// Owns the register handle and platform glue for one hardware channel.
/// All operations are infallible: register writes cannot fail, and the
/// failure modes that remain (a wedged transmitter, a dropped byte) are
/// not observable at this layer.
pub struct Uart<R, P> {
    regs: R,
    platform: P,
    variant: Variant,
}

impl<R, P> Uart<R, P>
where
    R: UartRegisters,
    P: Platform,
{
    /// Create the driver. No hardware is touched until
    /// [`configure`](Self::configure).
    pub const fn new(regs: R, platform: P, variant: Variant) -> Self {
        Self {
            regs,
            platform,
            variant,
        }
    }

    /// Program the channel for `baudrate` with the system clock running at
    /// `master_clock` Hz.
    ///
    /// The divisor is `master_clock / (baudrate * 16)`, truncating; the
    /// actual baud rate may differ slightly from the requested one. The
    /// caller must pick a pair whose divisor fits the hardware's divisor
    /// width.
    ///
    /// Fully re-initializes the channel each call, so repeated calls are
    /// idempotent. For [`Variant::Interrupt`] this also enables the
    /// receive-ready interrupt and unmasks the channel's interrupt line.
    pub fn configure(&mut self, baudrate: u32, master_clock: u32) {
        if self.is_noop() {
            return;
        }
        debug_assert!(baudrate > 0);
        debug_assert!(master_clock > 0);

        // The receive interrupt reads the same control block; keep it
        // masked for the whole register program so the two never
        // interleave.
        critical_section::with(|_| {
            self.platform.configure_pins();
            self.platform.enable_clock();

            // Force a known state before reprogramming.
            self.regs.write(
                Register::Control,
                cr::RSTRX | cr::RSTTX | cr::RXDIS | cr::TXDIS,
            );
            self.regs.write(Register::Mode, mr::NORMAL_NO_PARITY);
            self.regs
                .write(Register::BaudDivisor, master_clock / (baudrate * 16));
            // Register-level I/O only: the PDC channels stay off.
            self.regs
                .write(Register::TransferControl, ptcr::RXTDIS | ptcr::TXTDIS);
            self.regs.write(Register::Control, cr::RXEN | cr::TXEN);

            if matches!(self.variant, Variant::Interrupt) {
                self.regs.write(Register::InterruptEnable, irq::RXRDY);
                self.platform.enable_interrupt();
            }
        });

        trace!("uart configured at {} baud", baudrate);
    }

    /// Shut down interrupt delivery.
    ///
    /// Masks the receive-ready source and the channel's interrupt line,
    /// and nothing else: pins, clock gating and the receiver/transmitter
    /// themselves stay as configured. Idempotent.
    pub fn stop(&mut self) {
        if self.is_noop() {
            return;
        }

        critical_section::with(|_| {
            self.regs.write(Register::InterruptDisable, irq::RXRDY);
            self.platform.disable_interrupt();
        });

        trace!("uart receive interrupt stopped");
    }

    /// Transmit one byte synchronously.
    ///
    /// Spins without yielding or timing out until the transmitter is
    /// empty. If the hardware is wedged this never returns; acceptable for
    /// a debug output path, not for a production data channel.
    pub fn put_char(&mut self, byte: u8) {
        if self.is_noop() {
            return;
        }

        while self.regs.read(Register::Status) & sr::TXEMPTY == 0 {
            core::hint::spin_loop();
        }
        self.regs.write(Register::TxHolding, u32::from(byte));
    }

    pub(crate) fn is_noop(&self) -> bool {
        matches!(self.variant, Variant::NoOp)
    }

    pub(crate) fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }
}

impl<R, P> core::fmt::Write for Uart<R, P>
where
    R: UartRegisters,
    P: Platform,
{
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for byte in s.bytes() {
            self.put_char(byte);
        }
        Ok(())
    }
}

/// Receive interrupt handler.
///
/// Built only for [`Variant::Interrupt`]. Holds its own register handle
/// and the producer half of the receive queue, injected at construction —
/// call [`on_interrupt`](Self::on_interrupt) from the UART's interrupt
/// service routine.
pub struct RxInterrupt<'a, R, const N: usize> {
    regs: R,
    rx: Producer<'a, N>,
}

impl<'a, R, const N: usize> RxInterrupt<'a, R, N>
where
    R: UartRegisters,
{
    /// Bind the handler to its register handle and queue producer.
    pub const fn new(regs: R, rx: Producer<'a, N>) -> Self {
        Self { regs, rx }
    }

    /// Drain one byte from the receive holding register into the queue.
    ///
    /// The read acknowledges the byte and clears the ready condition.
    /// Runs to completion without blocking or allocating; a full queue
    /// drops the byte silently.
    #[inline]
    pub fn on_interrupt(&mut self) {
        let byte = self.regs.read(Register::RxHolding) as u8;
        let _ = self.rx.push(byte);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::platform::testing::{Call, FakePlatform};
    use crate::regs::testing::FakeUart;
    use crate::ring_buffer::RxQueue;
    use std::vec;
    use std::vec::Vec;

    const MCK: u32 = 48_000_000;

    fn configured(fake: &mut FakeUart, plat: &mut FakePlatform, variant: Variant) {
        let mut uart = Uart::new(&mut *fake, &mut *plat, variant);
        uart.configure(19_200, MCK);
    }

    #[test]
    fn divisor_is_truncating_division() {
        let mut fake = FakeUart::new();
        let mut plat = FakePlatform::new();
        configured(&mut fake, &mut plat, Variant::Polling);

        // 48 MHz / (19200 * 16) = 156.25, truncated.
        assert_eq!(fake.baud_divisor, 156);
    }

    #[test]
    fn divisor_examples() {
        for (baudrate, expect) in [(9_600, 312), (57_600, 52), (115_200, 26)] {
            let mut fake = FakeUart::new();
            let mut plat = FakePlatform::new();
            let mut uart = Uart::new(&mut fake, &mut plat, Variant::Polling);
            uart.configure(baudrate, MCK);
            drop(uart);
            assert_eq!(fake.baud_divisor, expect, "at {baudrate} baud");
        }
    }

    #[test]
    fn reset_precedes_enable() {
        let mut fake = FakeUart::new();
        let mut plat = FakePlatform::new();
        configured(&mut fake, &mut plat, Variant::Polling);

        let reset = fake.position(|&(r, v)| {
            r == Register::Control && v == (cr::RSTRX | cr::RSTTX | cr::RXDIS | cr::TXDIS)
        });
        let enable =
            fake.position(|&(r, v)| r == Register::Control && v == (cr::RXEN | cr::TXEN));
        assert!(reset < enable);
    }

    #[test]
    fn full_register_program() {
        let mut fake = FakeUart::new();
        let mut plat = FakePlatform::new();
        configured(&mut fake, &mut plat, Variant::Interrupt);

        assert_eq!(
            fake.writes,
            vec![
                (
                    Register::Control,
                    cr::RSTRX | cr::RSTTX | cr::RXDIS | cr::TXDIS
                ),
                (Register::Mode, mr::NORMAL_NO_PARITY),
                (Register::BaudDivisor, 156),
                (Register::TransferControl, ptcr::RXTDIS | ptcr::TXTDIS),
                (Register::Control, cr::RXEN | cr::TXEN),
                (Register::InterruptEnable, irq::RXRDY),
            ]
        );
        assert_eq!(plat.calls, vec![Call::Pins, Call::Clock, Call::IrqEnable]);
    }

    #[test]
    fn base_driver_leaves_pdc_disabled() {
        let mut fake = FakeUart::new();
        let mut plat = FakePlatform::new();
        configured(&mut fake, &mut plat, Variant::Interrupt);

        assert!(!fake.pdc_rx_enabled);
        assert!(!fake.pdc_tx_enabled);
    }

    #[test]
    fn polling_variant_never_arms_the_interrupt() {
        let mut fake = FakeUart::new();
        let mut plat = FakePlatform::new();
        configured(&mut fake, &mut plat, Variant::Polling);

        assert_eq!(fake.interrupt_mask, 0);
        assert!(!plat.calls.contains(&Call::IrqEnable));
    }

    #[test]
    fn configure_is_idempotent() {
        let mut once = FakeUart::new();
        let mut plat_once = FakePlatform::new();
        configured(&mut once, &mut plat_once, Variant::Interrupt);

        let mut twice = FakeUart::new();
        let mut plat_twice = FakePlatform::new();
        {
            let mut uart = Uart::new(&mut twice, &mut plat_twice, Variant::Interrupt);
            uart.configure(19_200, MCK);
            uart.configure(19_200, MCK);
        }

        assert_eq!(once.end_state(), twice.end_state());
        assert_eq!(plat_once.irq_enabled, plat_twice.irq_enabled);
    }

    #[test]
    fn stop_masks_interrupt_only() {
        let mut fake = FakeUart::new();
        let mut plat = FakePlatform::new();
        {
            let mut uart = Uart::new(&mut fake, &mut plat, Variant::Interrupt);
            uart.configure(19_200, MCK);
            uart.stop();
        }

        assert_eq!(fake.interrupt_mask & irq::RXRDY, 0);
        assert!(!plat.irq_enabled);
        // The receiver and transmitter stay up.
        assert!(fake.rx_enabled);
        assert!(fake.tx_enabled);
    }

    #[test]
    fn stopped_receive_path_leaves_queue_untouched() {
        let queue: RxQueue<8> = RxQueue::new();
        let (producer, mut consumer) = queue.try_split().unwrap();
        let mut fake = FakeUart::new();
        let mut plat = FakePlatform::new();
        {
            let mut uart = Uart::new(&mut fake, &mut plat, Variant::Interrupt);
            uart.configure(19_200, MCK);
            uart.stop();
        }

        // Receive-ready asserts, but both the source and the controller
        // line are masked: the handler is never dispatched.
        fake.load_rx(0x42);
        let armed = plat.irq_enabled && fake.interrupt_mask & irq::RXRDY != 0;
        if armed {
            let mut handler = RxInterrupt::new(&mut fake, producer);
            handler.on_interrupt();
        }

        assert!(!armed);
        assert!(consumer.is_empty());
    }

    #[test]
    fn put_char_writes_when_transmitter_empty() {
        let mut fake = FakeUart::new();
        fake.status = sr::TXEMPTY;
        let mut plat = FakePlatform::new();
        {
            let mut uart = Uart::new(&mut fake, &mut plat, Variant::Polling);
            uart.put_char(b'A');
            uart.put_char(b'B');
        }

        assert_eq!(fake.tx_data, vec![b'A', b'B']);
    }

    #[test]
    fn write_str_goes_through_put_char() {
        use core::fmt::Write;

        let mut fake = FakeUart::new();
        fake.status = sr::TXEMPTY;
        let mut plat = FakePlatform::new();
        {
            let mut uart = Uart::new(&mut fake, &mut plat, Variant::Polling);
            write!(uart, "ok {}", 7).unwrap();
        }

        assert_eq!(fake.tx_data, b"ok 7");
    }

    #[test]
    fn noop_variant_touches_nothing() {
        let mut fake = FakeUart::new();
        let mut plat = FakePlatform::new();
        {
            let mut uart = Uart::new(&mut fake, &mut plat, Variant::NoOp);
            uart.configure(19_200, MCK);
            // Returns immediately even though TXEMPTY is clear.
            uart.put_char(b'x');
            uart.stop();
        }

        assert!(fake.writes.is_empty());
        assert!(fake.tx_data.is_empty());
        assert!(plat.calls.is_empty());
    }

    /// Register fake for the interrupt handler: serves a scripted byte
    /// stream through the receive holding register.
    struct ScriptedRx {
        bytes: Vec<u8>,
        next: usize,
    }

    impl UartRegisters for &mut ScriptedRx {
        fn read(&mut self, register: Register) -> u32 {
            match register {
                Register::RxHolding => {
                    let byte = self.bytes[self.next];
                    self.next += 1;
                    u32::from(byte)
                }
                Register::Status => {
                    if self.next < self.bytes.len() {
                        sr::RXRDY
                    } else {
                        0
                    }
                }
                _ => 0,
            }
        }

        fn write(&mut self, _register: Register, _value: u32) {}
    }

    #[test]
    fn handler_preserves_arrival_order() {
        let queue: RxQueue<8> = RxQueue::new();
        let (producer, mut consumer) = queue.try_split().unwrap();
        let mut regs = ScriptedRx {
            bytes: vec![0x10, 0x20, 0x30, 0x40, 0x50],
            next: 0,
        };

        {
            let mut handler = RxInterrupt::new(&mut regs, producer);
            for _ in 0..5 {
                handler.on_interrupt();
            }
        }

        assert_eq!(regs.next, 5);
        for expect in [0x10, 0x20, 0x30, 0x40, 0x50] {
            assert_eq!(consumer.pop(), Some(expect));
        }
        assert_eq!(consumer.pop(), None);
    }

    #[test]
    fn handler_overflow_retains_earliest() {
        // Capacity 4, six interrupts: the first four bytes survive.
        let queue: RxQueue<4> = RxQueue::new();
        let (producer, mut consumer) = queue.try_split().unwrap();
        let mut regs = ScriptedRx {
            bytes: vec![1, 2, 3, 4, 5, 6],
            next: 0,
        };

        {
            let mut handler = RxInterrupt::new(&mut regs, producer);
            for _ in 0..6 {
                handler.on_interrupt();
            }
        }

        // Every byte was still acknowledged in hardware.
        assert_eq!(regs.next, 6);
        assert_eq!(consumer.len(), 4);
        for expect in [1, 2, 3, 4] {
            assert_eq!(consumer.pop(), Some(expect));
        }
        assert_eq!(consumer.pop(), None);
    }
}
