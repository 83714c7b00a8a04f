use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::interrupts::{Interrupt, InterruptMaster};
use super::map;
use super::mmu::Mmu;

/// Divider / TIMA timer block.
///
/// The DMG increments TIMA on the falling edge of an internal signal: the
/// AND of one bit of the free-running system counter (selected by the TAC
/// rate code) and the timer-enable flag. Modelling that edge directly, with
/// the previous signal kept in `tima_delay`, also reproduces the obscure
/// behaviour around TAC writes: disabling the timer drops the signal to
/// zero, and a prior 1-to-0 fall still counts as one final increment.
pub(super) struct Timers {
    /// Free-running 16-bit system counter; DIV exposes its upper 8 bits.
    pub(super) sys_clock: u16,
    /// TIMA (FF05).
    pub(super) tima: u8,
    /// Previous value of the "source bit AND enable" signal, used for
    /// falling-edge detection.
    pub(super) tima_delay: u8,
    mmu: Rc<RefCell<Mmu>>,
    interrupts: Rc<RefCell<InterruptMaster>>,
}

impl Timers {
    /// Wire a timer block to the MMU, registering the DIV and TAC write
    /// observers.
    pub(super) fn new(
        mmu: Rc<RefCell<Mmu>>,
        interrupts: Rc<RefCell<InterruptMaster>>,
    ) -> Rc<RefCell<Timers>> {
        let timers = Rc::new(RefCell::new(Timers {
            sys_clock: 0,
            tima: 0,
            tima_delay: 0,
            mmu: Rc::clone(&mmu),
            interrupts,
        }));

        {
            let mut mmu = mmu.borrow_mut();

            // Any write to DIV resets the system counter; the stored value
            // is always 0. The observer holds a weak handle so the
            // MMU-to-timer edge does not form a reference cycle.
            let handle: Weak<RefCell<Timers>> = Rc::downgrade(&timers);
            mmu.subscribe(
                map::DIVIDER_ADDR,
                Box::new(move |_mmu, _addr, _val| {
                    if let Some(timers) = handle.upgrade() {
                        timers.borrow_mut().sys_clock = 0;
                    }
                    0
                }),
            );

            // TAC is three bits wide; the unused upper bits read back as 1.
            mmu.subscribe(
                map::TAC_ADDR,
                Box::new(|_mmu, _addr, val| 0xF8 | (val & 0x07)),
            );
        }

        timers
    }

    /// Advance the block by `cycles` T-cycles, flagging the timer interrupt
    /// on TIMA overflow.
    pub(super) fn tick(&mut self, cycles: u32) {
        let mut mmu = self.mmu.borrow_mut();
        let (rate, running) = parse_tac(mmu.read(map::TAC_ADDR));

        for _ in 0..cycles {
            self.sys_clock = self.sys_clock.wrapping_add(1);

            let source_bit = match rate {
                4096 => (self.sys_clock >> 9) & 0x1,
                262_144 => (self.sys_clock >> 3) & 0x1,
                65_536 => (self.sys_clock >> 5) & 0x1,
                _ => (self.sys_clock >> 7) & 0x1,
            } as u8;
            let signal = if running { source_bit } else { 0 };

            if signal == 0 && self.tima_delay == 1 {
                self.tima = self.tima.wrapping_add(1);
                if self.tima == 0 {
                    // Start back up at the modulo value.
                    self.tima = mmu.read(map::TMA_ADDR);

                    let unmasked = mmu.read(map::IE_ADDR) & Interrupt::Timer.mask() != 0;
                    if self.interrupts.borrow().enabled() && unmasked {
                        mmu.flag_interrupt(Interrupt::Timer);
                    }
                }
            }

            self.tima_delay = signal;
        }

        // Publish the memory-visible halves of the timer state. The divider
        // register is the 8 most significant bits of the system counter.
        mmu.write_silent(map::DIVIDER_ADDR, (self.sys_clock >> 8) as u8);
        mmu.write_silent(map::TIMA_ADDR, self.tima);
    }
}

/// Decode TAC into the TIMA rate in Hz and the running flag.
fn parse_tac(tac: u8) -> (u32, bool) {
    let rate = match tac & 0x03 {
        0x00 => 4096,
        0x01 => 262_144,
        0x02 => 65_536,
        _ => 16_384,
    };
    (rate, tac & 0x04 == 0x04)
}

#[cfg(test)]
mod tests {
    use super::parse_tac;

    #[test]
    fn tac_decodes_rate_and_running_bits() {
        assert_eq!(parse_tac(0x00), (4096, false));
        assert_eq!(parse_tac(0x05), (262_144, true));
        assert_eq!(parse_tac(0x06), (65_536, true));
        assert_eq!(parse_tac(0xFF), (16_384, true));
    }
}
