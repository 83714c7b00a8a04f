mod dma;

pub(super) use dma::OamDma;

use std::array;

use super::cartridge::Cartridge;
use super::interrupts::Interrupt;
use super::map::{self, Region};

/// Write observer, invoked by [`Mmu::write`] before the store commits.
///
/// The observer sees the unmodified destination and decides the byte that
/// is actually stored; it may also trigger side effects through the `&mut
/// Mmu` it receives. Observers fire only for subscriber-notifying writes:
/// hardware-originated stores go through [`Mmu::write_silent`] and never
/// re-enter an observer, which is what makes it safe for an observer to
/// borrow the subsystem that registered it.
pub type WriteObserver = Box<dyn FnMut(&mut Mmu, u16, u8) -> u8>;

/// Memory management unit.
///
/// Handles all memory traffic that is common to every cartridge and defers
/// to the cartridge's memory bank controller for cartridge-specific cases.
/// Also hosts the OAM DMA engine, which shares its view of the bus.
pub struct Mmu {
    /// Copy of the first 16 KiB of cartridge ROM, permanently mapped as
    /// bank 0.
    bank0_rom: [u8; 0x4000],
    /// Tile and map data for the video controller.
    video_ram: [u8; 0x2000],
    /// Sprite attribute data, and the destination of OAM DMA transfers.
    oam_ram: [u8; 0xA0],
    /// Memory-mapped hardware registers.
    io_ram: [u8; 0x80],
    /// High RAM; its last byte is the interrupt-enable register.
    hram: [u8; 0x80],
    /// The cartridge's memory bank controller.
    cartridge: Cartridge,
    /// OAM DMA engine state.
    pub(in crate::machine) dma: OamDma,
    /// At most one write observer per I/O register, indexed by
    /// `addr - 0xFF00`.
    subscribers: [Option<WriteObserver>; 0x80],
}

impl Mmu {
    /// Build an MMU around a mapper, copying the fixed ROM bank out of it so
    /// bank-0 reads never touch the mapper.
    pub(super) fn new(cartridge: Cartridge) -> Mmu {
        let mut bank0_rom = [0u8; 0x4000];
        for (i, byte) in bank0_rom.iter_mut().enumerate() {
            *byte = cartridge.read(i as u16);
        }

        let mut mmu = Mmu {
            bank0_rom,
            video_ram: [0; 0x2000],
            oam_ram: [0; 0xA0],
            io_ram: [0; 0x80],
            hram: [0; 0x80],
            cartridge,
            dma: OamDma::default(),
            subscribers: array::from_fn(|_| None),
        };

        mmu.subscribe(
            map::DMA_ADDR,
            Box::new(|mmu, _addr, val| mmu.on_dma_write(val)),
        );

        mmu
    }

    /// Read one byte.
    pub fn read(&self, addr: u16) -> u8 {
        match Region::of(addr) {
            Region::FixedRom => self.bank0_rom[addr as usize],
            // Banked ROM and all RAM windows belong to the mapper.
            Region::BankedRom | Region::ExternalRam | Region::WorkRam => {
                self.cartridge.read(addr)
            }
            // The echo area mirrors work RAM; forward it to the mapper
            // disguised as a regular work-RAM access.
            Region::Echo => self.cartridge.read(addr - 0x2000),
            Region::VideoRam => self.video_ram[(addr - map::VIDEO_RAM_START) as usize],
            Region::Oam => self.oam_ram[(addr - map::OAM_START) as usize],
            Region::Invalid => {
                log::debug!("read from invalid memory address {addr:#06x}");
                0xFF
            }
            Region::Io => self.io_ram[(addr - map::IO_START) as usize],
            Region::HighRam | Region::InterruptEnable => {
                self.hram[(addr - map::HRAM_START) as usize]
            }
        }
    }

    /// Write one byte, running the address's write observer first.
    ///
    /// The byte committed to memory is the observer's return value; without
    /// an observer the value is stored as-is.
    pub fn write(&mut self, addr: u16, val: u8) {
        let val = self.notify_subscriber(addr, val);
        self.write_silent(addr, val);
    }

    /// Write one byte without notifying observers.
    ///
    /// Used for hardware-originated stores: timer and video register
    /// publication, interrupt flagging and DMA byte transfers.
    pub fn write_silent(&mut self, addr: u16, val: u8) {
        match Region::of(addr) {
            // "Writes" to ROM areas are bank-control commands for the
            // mapper and never modify ROM.
            Region::FixedRom | Region::BankedRom => self.cartridge.write(addr, val),
            Region::ExternalRam | Region::WorkRam => self.cartridge.write(addr, val),
            Region::Echo => self.cartridge.write(addr - 0x2000, val),
            Region::VideoRam => self.video_ram[(addr - map::VIDEO_RAM_START) as usize] = val,
            Region::Oam => self.oam_ram[(addr - map::OAM_START) as usize] = val,
            Region::Invalid => {
                log::debug!("write of {val:#04x} to invalid memory address {addr:#06x} dropped");
            }
            Region::Io => self.io_ram[(addr - map::IO_START) as usize] = val,
            Region::HighRam | Region::InterruptEnable => {
                self.hram[(addr - map::HRAM_START) as usize] = val;
            }
        }
    }

    /// Register `observer` for writes to `addr`.
    ///
    /// Observed addresses must fall inside the I/O register window, and at
    /// most one observer may watch an address; violating either is a
    /// programming error and panics.
    pub fn subscribe(&mut self, addr: u16, observer: WriteObserver) {
        assert!(
            (map::IO_START..map::HRAM_START).contains(&addr),
            "write observers only cover the I/O register window, got {addr:#06x}"
        );
        let slot = (addr - map::IO_START) as usize;
        assert!(
            self.subscribers[slot].is_none(),
            "attempt to register a second write observer for {addr:#06x}"
        );
        self.subscribers[slot] = Some(observer);
    }

    /// Set an interrupt source's bit in IF.
    pub fn flag_interrupt(&mut self, interrupt: Interrupt) {
        let flags = self.read(map::IF_ADDR) | interrupt.mask();
        self.write_silent(map::IF_ADDR, flags);
    }

    fn notify_subscriber(&mut self, addr: u16, val: u8) -> u8 {
        if !(map::IO_START..map::HRAM_START).contains(&addr) {
            return val;
        }
        let slot = (addr - map::IO_START) as usize;
        match self.subscribers[slot].take() {
            Some(mut observer) => {
                let out = observer(self, addr, val);
                self.subscribers[slot] = Some(observer);
                out
            }
            None => val,
        }
    }
}
