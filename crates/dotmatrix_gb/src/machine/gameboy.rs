use std::cell::RefCell;
use std::rc::Rc;

use dotmatrix_common::FrameSink;

use super::cartridge::{Cartridge, CartridgeError};
use super::interrupts::InterruptMaster;
use super::mmu::Mmu;
use super::timer::Timers;
use super::video::VideoController;

/// High-level DMG machine.
///
/// Owns the MMU, the timer block and the video controller and advances them
/// in a fixed order. The CPU is external: it reads and writes memory through
/// the shared [`Mmu`] handle, manages the master interrupt flag through the
/// shared [`InterruptMaster`] handle, and reports the T-cycles each
/// instruction consumed via [`GameBoy::tick`].
pub struct GameBoy {
    /// Memory management unit, shared with the external CPU.
    pub mmu: Rc<RefCell<Mmu>>,
    /// Master interrupt-enable state, shared with the external CPU.
    pub interrupts: Rc<RefCell<InterruptMaster>>,
    pub(super) timers: Rc<RefCell<Timers>>,
    pub(super) video: VideoController,
}

impl GameBoy {
    /// Build a machine around a ROM image, drawing frames into `sink`.
    pub fn new(rom: &[u8], sink: Box<dyn FrameSink>) -> Result<GameBoy, CartridgeError> {
        let cartridge = Cartridge::from_rom(rom)?;
        let mmu = Rc::new(RefCell::new(Mmu::new(cartridge)));
        let interrupts = Rc::new(RefCell::new(InterruptMaster::new()));
        let timers = Timers::new(Rc::clone(&mmu), Rc::clone(&interrupts));
        let video = VideoController::new(Rc::clone(&mmu), Rc::clone(&interrupts), sink);

        Ok(GameBoy {
            mmu,
            interrupts,
            timers,
            video,
        })
    }

    /// Advance every clocked subsystem by `cycles` T-cycles.
    ///
    /// Called once per CPU instruction with that instruction's cycle count.
    /// The order is fixed: delayed interrupt toggles, then the timer block,
    /// then the MMU's DMA engine, then the video controller. All cycles of
    /// an earlier subsystem land before any cycle of a later one.
    pub fn tick(&mut self, cycles: u32) {
        self.interrupts.borrow_mut().step();
        self.timers.borrow_mut().tick(cycles);
        self.mmu.borrow_mut().tick(cycles);
        self.video.tick(cycles);
    }
}
