mod cartridge;
mod gameboy;
mod interrupts;
mod map;
mod mmu;
mod timer;
mod video;

pub use cartridge::CartridgeError;
pub use gameboy::GameBoy;
pub use interrupts::{Interrupt, InterruptMaster};
pub use mmu::{Mmu, WriteObserver};
