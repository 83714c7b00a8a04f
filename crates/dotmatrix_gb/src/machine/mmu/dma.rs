use super::Mmu;
use crate::machine::map;

/// Number of T-cycles an OAM DMA transfer holds the engine active for.
const DMA_CYCLE_LENGTH: u32 = 671;

/// OAM DMA engine state. All fields are zero while no transfer is active.
#[derive(Default)]
pub(in crate::machine) struct OamDma {
    /// Whether a transfer is in progress.
    pub(in crate::machine) active: bool,
    /// Next source address to be copied.
    pub(in crate::machine) cursor: u16,
    /// T-cycles elapsed since the transfer was armed.
    pub(in crate::machine) elapsed: u32,
}

impl Mmu {
    /// Progress the DMA engine by `cycles` T-cycles.
    ///
    /// While a transfer is active, one byte per cycle moves into OAM until
    /// all 160 bytes have landed; the engine then idles out the remainder of
    /// its fixed window. The copy runs alongside, not instead of, CPU and
    /// video activity.
    pub fn tick(&mut self, cycles: u32) {
        for _ in 0..cycles {
            if !self.dma.active {
                return;
            }

            let offset = self.dma.cursor & 0x00FF;
            if offset < 0xA0 {
                let byte = self.read(self.dma.cursor);
                self.write_silent(map::OAM_START + offset, byte);
                self.dma.cursor = self.dma.cursor.wrapping_add(1);
            }

            self.dma.elapsed += 1;
            if self.dma.elapsed >= DMA_CYCLE_LENGTH {
                self.dma = OamDma::default();
            }
        }
    }

    /// Observer for the DMA register: arms a transfer out of `val << 8`.
    ///
    /// Re-arming while a transfer is active restarts it from the new source.
    pub(super) fn on_dma_write(&mut self, val: u8) -> u8 {
        if self.dma.active {
            log::warn!(
                "OAM DMA armed from {:#06x} while a transfer is active; restarting",
                (val as u16) << 8
            );
        }
        self.dma.active = true;
        self.dma.cursor = (val as u16) << 8;
        self.dma.elapsed = 0;
        val
    }
}
