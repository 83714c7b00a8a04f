mod mbc1;
mod nombc;

pub(super) use mbc1::Mbc1Cartridge;
pub(super) use nombc::NoMbcCartridge;

use thiserror::Error;

/// Fatal problems with a ROM image, reported to the host at load time.
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("ROM image is {0} bytes, smaller than one 16 KiB bank")]
    TruncatedRom(usize),
    #[error("unsupported cartridge type {0:#04x} in header")]
    UnsupportedMapper(u8),
}

/// Wrapper enum for supported cartridge mappers.
///
/// The MMU forwards every ROM read, every ROM-area write (bank control) and
/// every RAM access to the mapper, including accesses to the internal
/// work-RAM window, so banked and fixed RAM stay behind one interface.
pub(super) enum Cartridge {
    NoMbc(NoMbcCartridge),
    Mbc1(Mbc1Cartridge),
}

impl Cartridge {
    /// Build a mapper from a raw ROM image, dispatching on the cartridge-type
    /// byte in the header.
    pub(super) fn from_rom(rom: &[u8]) -> Result<Cartridge, CartridgeError> {
        if rom.len() < 0x4000 {
            return Err(CartridgeError::TruncatedRom(rom.len()));
        }
        match rom[0x147] {
            0x00 | 0x08 | 0x09 => Ok(Cartridge::NoMbc(NoMbcCartridge::new(rom))),
            0x01..=0x03 => Ok(Cartridge::Mbc1(Mbc1Cartridge::new(rom))),
            other => Err(CartridgeError::UnsupportedMapper(other)),
        }
    }

    pub(super) fn read(&self, addr: u16) -> u8 {
        match self {
            Cartridge::NoMbc(c) => c.read(addr),
            Cartridge::Mbc1(c) => c.read(addr),
        }
    }

    pub(super) fn write(&mut self, addr: u16, value: u8) {
        match self {
            Cartridge::NoMbc(c) => c.write(addr, value),
            Cartridge::Mbc1(c) => c.write(addr, value),
        }
    }
}

/// Number of 8 KiB external RAM banks for a header RAM-size code.
fn ram_banks_for_code(code: u8) -> u8 {
    match code {
        0x00 => 0,  // no RAM
        0x01 => 1,  // 2 KiB, rounded up to one 8 KiB bank
        0x02 => 1,  // 8 KiB
        0x03 => 4,  // 32 KiB
        0x04 => 16, // 128 KiB
        0x05 => 8,  // 64 KiB
        _ => 0,
    }
}
