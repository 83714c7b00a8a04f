pub mod machine;

pub use machine::{CartridgeError, GameBoy, Interrupt, InterruptMaster, Mmu, WriteObserver};

/// Logical screen width in pixels for the Game Boy DMG.
pub const SCREEN_WIDTH: usize = 160;
/// Logical screen height in pixels.
pub const SCREEN_HEIGHT: usize = 144;
