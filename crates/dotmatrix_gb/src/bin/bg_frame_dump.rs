//! Headless background-renderer dump tool.
//!
//! Loads a raw tile-data image into VRAM through the MMU, programs the video
//! registers with post-boot-style values, runs one frame and writes the
//! result as rgb24. Useful for eyeballing the tile decoder and scanline
//! renderer without a CPU in the loop.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use dotmatrix_common::FrameBuffer;
use dotmatrix_gb::{GameBoy, SCREEN_HEIGHT, SCREEN_WIDTH};

/// T-cycles in one full frame.
const FRAME_CYCLES: u32 = 70_224;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let usage = || {
        eprintln!("Usage: bg_frame_dump <tile_data_path> <out_rgb24_path>");
        std::process::exit(2);
    };
    let tiles_path: PathBuf = args.next().map(PathBuf::from).unwrap_or_else(usage);
    let out_path: PathBuf = args.next().map(PathBuf::from).unwrap_or_else(usage);

    let tiles = std::fs::read(&tiles_path).unwrap_or_else(|err| {
        eprintln!("Failed to read '{}': {err}", tiles_path.display());
        std::process::exit(1);
    });

    // A blank 32 KiB no-mapper ROM; the tool only exercises the video path.
    let rom = vec![0u8; 0x8000];
    let frame = Rc::new(RefCell::new(FrameBuffer::new(
        SCREEN_WIDTH as u32,
        SCREEN_HEIGHT as u32,
    )));
    let mut gb = GameBoy::new(&rom, Box::new(Rc::clone(&frame))).unwrap_or_else(|err| {
        eprintln!("Failed to build machine: {err}");
        std::process::exit(1);
    });

    {
        let mut mmu = gb.mmu.borrow_mut();

        // Copy the raw image into VRAM, at most the full 8 KiB.
        for (i, &byte) in tiles.iter().take(0x2000).enumerate() {
            mmu.write(0x8000 + i as u16, byte);
        }

        // If the image is tile data only, lay down an identity tile map so
        // tiles 0..=255 appear in reading order.
        if tiles.len() <= 0x1800 {
            for i in 0..0x400u16 {
                mmu.write(0x9800 + i, (i % 256) as u8);
            }
        }

        // LCD and background on, unsigned tile data, map at 0x9800.
        mmu.write(0xFF40, 0x91);
        // Identity palette: dot codes map straight to shades.
        mmu.write(0xFF47, 0x1B);
    }

    gb.tick(FRAME_CYCLES);

    let frame = frame.borrow();
    let rgba = frame.as_rgba_bytes();
    let mut rgb = Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT * 3);
    for pixel in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&pixel[..3]);
    }

    std::fs::write(&out_path, &rgb).unwrap_or_else(|err| {
        eprintln!("Failed to write '{}': {err}", out_path.display());
        std::process::exit(1);
    });

    println!(
        "Wrote {} bytes ({}x{} rgb24) to '{}'",
        rgb.len(),
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        out_path.display()
    );
}
